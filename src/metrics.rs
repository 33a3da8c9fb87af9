//! Score functions derived from true/false positive/negative counts.
//!
//! Every function returns 0 whenever `tp == 0`, which also covers the
//! all-empty case where the ratio would otherwise be undefined. Counts are
//! `f64` because area mode feeds areas rather than object counts.

use serde::Serialize;
use std::fmt;

use crate::error::GeoscoreError;

/// Confusion counts: object counts, point counts, areas or pixel counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ConfusionCounts {
    pub tp: f64,
    pub fp: f64,
    pub tn: f64,
    #[serde(rename = "fn")]
    pub fn_: f64,
}

impl ConfusionCounts {
    pub fn new(tp: f64, fp: f64, tn: f64, fn_: f64) -> Self {
        Self { tp, fp, tn, fn_ }
    }

    /// Rejects negative or NaN counts.
    pub fn check(&self) -> Result<(), GeoscoreError> {
        let valid = |v: f64| v >= 0.0;
        if valid(self.tp) && valid(self.fp) && valid(self.tn) && valid(self.fn_) {
            Ok(())
        } else {
            Err(GeoscoreError::NegativeCount {
                tp: self.tp,
                fp: self.fp,
                tn: self.tn,
                fn_: self.fn_,
            })
        }
    }
}

impl fmt::Display for ConfusionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "True Positive = {}, False Negative = {}, False Positive = {}",
            self.tp, self.fn_, self.fp
        )
    }
}

/// A registered score function.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScoreFunction {
    Precision,
    Recall,
    F1,
    FBeta(f64),
    Accuracy,
    Jaccard,
}

impl ScoreFunction {
    /// Names accepted by [`ScoreFunction::from_name`].
    pub const NAMES: [&'static str; 6] = [
        "precision",
        "recall",
        "f1_score",
        "f_score",
        "accuracy",
        "jaccard",
    ];

    /// Looks a function up by name.
    ///
    /// `beta` is only read by `f_score`, which defaults to β = 1 when it is
    /// absent. A non-positive or non-finite β is a configuration error.
    pub fn from_name(name: &str, beta: Option<f64>) -> Result<Self, GeoscoreError> {
        match name {
            "precision" => Ok(ScoreFunction::Precision),
            "recall" => Ok(ScoreFunction::Recall),
            "f1_score" => Ok(ScoreFunction::F1),
            "f_score" => {
                let beta = beta.unwrap_or(1.0);
                if !(beta.is_finite() && beta > 0.0) {
                    return Err(GeoscoreError::InvalidBeta(beta));
                }
                Ok(ScoreFunction::FBeta(beta))
            }
            "accuracy" => Ok(ScoreFunction::Accuracy),
            "jaccard" => Ok(ScoreFunction::Jaccard),
            other => Err(GeoscoreError::UnknownScoreFunction {
                name: other.to_string(),
                allowed: Self::NAMES.to_vec(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScoreFunction::Precision => "precision",
            ScoreFunction::Recall => "recall",
            ScoreFunction::F1 => "f1_score",
            ScoreFunction::FBeta(_) => "f_score",
            ScoreFunction::Accuracy => "accuracy",
            ScoreFunction::Jaccard => "jaccard",
        }
    }

    /// Whether the result depends on the true-negative count.
    pub fn uses_true_negatives(&self) -> bool {
        matches!(self, ScoreFunction::Accuracy)
    }

    /// Evaluates the function on `counts`.
    pub fn evaluate(&self, counts: &ConfusionCounts) -> Result<f64, GeoscoreError> {
        match self {
            ScoreFunction::Precision => precision(counts),
            ScoreFunction::Recall => recall(counts),
            ScoreFunction::F1 => f1_score(counts),
            ScoreFunction::FBeta(beta) => f_beta(counts, *beta),
            ScoreFunction::Accuracy => accuracy(counts),
            ScoreFunction::Jaccard => jaccard(counts),
        }
    }
}

impl fmt::Display for ScoreFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreFunction::FBeta(beta) => write!(f, "f_score(beta={beta})"),
            other => f.write_str(other.name()),
        }
    }
}

pub fn precision(c: &ConfusionCounts) -> Result<f64, GeoscoreError> {
    c.check()?;
    if c.tp == 0.0 {
        return Ok(0.0);
    }
    Ok(c.tp / (c.tp + c.fp))
}

pub fn recall(c: &ConfusionCounts) -> Result<f64, GeoscoreError> {
    c.check()?;
    if c.tp == 0.0 {
        return Ok(0.0);
    }
    Ok(c.tp / (c.tp + c.fn_))
}

/// Weighted harmonic mean of precision and recall; `beta > 1` favours recall.
pub fn f_beta(c: &ConfusionCounts, beta: f64) -> Result<f64, GeoscoreError> {
    if !(beta.is_finite() && beta > 0.0) {
        return Err(GeoscoreError::InvalidBeta(beta));
    }
    c.check()?;
    if c.tp == 0.0 {
        return Ok(0.0);
    }
    let pr = precision(c)?;
    let rec = recall(c)?;
    let b2 = beta * beta;
    Ok((1.0 + b2) * pr * rec / (b2 * pr + rec))
}

pub fn f1_score(c: &ConfusionCounts) -> Result<f64, GeoscoreError> {
    f_beta(c, 1.0)
}

pub fn accuracy(c: &ConfusionCounts) -> Result<f64, GeoscoreError> {
    c.check()?;
    if c.tp == 0.0 {
        return Ok(0.0);
    }
    Ok((c.tp + c.tn) / (c.tp + c.tn + c.fp + c.fn_))
}

pub fn jaccard(c: &ConfusionCounts) -> Result<f64, GeoscoreError> {
    c.check()?;
    if c.tp == 0.0 {
        return Ok(0.0);
    }
    Ok(c.tp / (c.tp + c.fn_ + c.fp))
}
