//! Ordinal risk bands

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::RiskThresholds;

/// Risk band of a provider, ordered `Low < Medium < High`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl RiskCategory {
    /// All categories from lowest to highest
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Band for a composite score. Bands are checked high to low and each
    /// threshold is an inclusive lower bound.
    #[must_use]
    pub fn from_score(score: f64, thresholds: &RiskThresholds) -> Self {
        if score >= thresholds.high {
            Self::High
        } else if score >= thresholds.medium {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Label written to the output table
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::Medium => "Medium Risk",
            Self::High => "High Risk",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
