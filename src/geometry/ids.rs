//! Newtype ID for features within a geometry set.

use serde::Serialize;
use std::fmt;

/// Position-derived identifier of a feature inside its [`GeometrySet`](super::GeometrySet).
///
/// Ordering on IDs is what breaks IoU ties during matching, so IDs are
/// assigned in input order and never renumbered after filtering.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FeatureId(pub u64);

impl From<u64> for FeatureId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<usize> for FeatureId {
    fn from(id: usize) -> Self {
        Self(id as u64)
    }
}

impl fmt::Debug for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeatureId({})", self.0)
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
