use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ValidationError;

/// Flood severity tier, totally ordered `Low < Medium < High < Critical`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Map a total risk score onto a tier. Upper bounds are inclusive.
    pub fn from_score(score: f64) -> Self {
        if score <= 25.0 {
            Severity::Low
        } else if score <= 50.0 {
            Severity::Medium
        } else if score <= 75.0 {
            Severity::High
        } else {
            Severity::Critical
        }
    }

    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// Whether an event at this tier triggers outbound alerts
    pub fn is_alerting(&self) -> bool {
        *self >= Severity::High
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::Severity(s.to_string()))
    }
}
