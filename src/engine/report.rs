//! Score report types and text formatting.

use log::debug;
use serde::Serialize;
use std::fmt;

use crate::matching::MatchedPair;
use crate::metrics::ConfusionCounts;

/// Diagnostic trace collected during one scoring call.
///
/// Lines are always logged at debug level and kept only when verbose.
#[derive(Clone, Debug, Default)]
pub struct Trace {
    verbose: bool,
    lines: Vec<String>,
}

impl Trace {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            lines: Vec::new(),
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Records one diagnostic line.
    pub fn note(&mut self, line: impl Into<String>) {
        let line = line.into();
        debug!("{line}");
        if self.verbose {
            self.lines.push(line);
        }
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Result of one scoring call.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ScoreReport {
    /// The score, in [0, 1].
    pub score: f64,
    /// Diagnostic trace; empty unless verbose.
    #[serde(rename = "log")]
    pub diagnostics: Vec<String>,
    /// Confusion counts behind the score, absent for total-area mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<ConfusionCounts>,
    /// Matched pairs, object and point modes with verbose only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<MatchedPair>>,
}

impl ScoreReport {
    /// The 0.0 sentinel carrying an error message, for service boundaries.
    pub fn sentinel(message: impl Into<String>) -> Self {
        Self {
            score: 0.0,
            diagnostics: vec![message.into()],
            counts: None,
            matches: None,
        }
    }
}

impl fmt::Display for ScoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Score: {:.6}", self.score)?;

        if let Some(counts) = &self.counts {
            writeln!(
                f,
                "Counts: tp={} fp={} fn={} tn={}",
                counts.tp, counts.fp, counts.fn_, counts.tn
            )?;
        }

        if !self.diagnostics.is_empty() {
            writeln!(f)?;
            writeln!(f, "Log:")?;
            for line in &self.diagnostics {
                writeln!(f, "  {line}")?;
            }
        }

        if let Some(matches) = &self.matches {
            writeln!(f)?;
            writeln!(f, "Matches ({}):", matches.len())?;
            if matches.is_empty() {
                writeln!(f, "  - (none)")?;
            }
            for pair in matches {
                match pair.iou {
                    Some(iou) => writeln!(
                        f,
                        "  - gt#{} <- pred#{} (IoU {:.4})",
                        pair.gt_id, pair.pred_id, iou
                    )?,
                    None => writeln!(f, "  - gt#{} <- pred#{}", pair.gt_id, pair.pred_id)?,
                }
            }
        }

        Ok(())
    }
}
