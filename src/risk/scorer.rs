use serde::{Deserialize, Serialize};

use crate::model::{EnvironmentalReading, Severity};

/// Rainfall bins as (lower bound inclusive, points), highest first
const RAINFALL_BINS: [(f64, u32); 5] = [(50.0, 60), (30.0, 50), (15.0, 35), (5.0, 20), (0.0, 10)];

/// Elevation bins as (upper bound exclusive, points), lowest first
const ELEVATION_BINS: [(f64, u32); 4] = [(10.0, 40), (50.0, 30), (100.0, 20), (200.0, 10)];
const HIGH_GROUND_POINTS: u32 = 5;

pub fn rainfall_points(rainfall_mm: f64) -> u32 {
    RAINFALL_BINS
        .iter()
        .find(|(lower, _)| rainfall_mm >= *lower)
        .map(|(_, points)| *points)
        .unwrap_or(10)
}

pub fn elevation_points(elevation_m: f64) -> u32 {
    ELEVATION_BINS
        .iter()
        .find(|(upper, _)| elevation_m < *upper)
        .map(|(_, points)| *points)
        .unwrap_or(HIGH_GROUND_POINTS)
}

/// Qualitative rainfall level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RainfallLevel {
    Low,
    Medium,
    High,
}

impl RainfallLevel {
    pub fn from_rainfall(rainfall_mm: f64) -> Self {
        if rainfall_mm > 30.0 {
            RainfallLevel::High
        } else if rainfall_mm > 15.0 {
            RainfallLevel::Medium
        } else {
            RainfallLevel::Low
        }
    }

    fn adjective(&self) -> &'static str {
        match self {
            RainfallLevel::High => "heavy",
            RainfallLevel::Medium => "moderate",
            RainfallLevel::Low => "light",
        }
    }
}

/// Qualitative risk contributed by terrain height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElevationRisk {
    #[serde(rename = "High risk")]
    High,
    #[serde(rename = "Medium risk")]
    Medium,
    #[serde(rename = "Low risk")]
    Low,
}

impl ElevationRisk {
    pub fn from_elevation(elevation_m: f64) -> Self {
        if elevation_m < 50.0 {
            ElevationRisk::High
        } else if elevation_m < 100.0 {
            ElevationRisk::Medium
        } else {
            ElevationRisk::Low
        }
    }

    fn terrain(&self) -> &'static str {
        match self {
            ElevationRisk::High => "low",
            ElevationRisk::Medium => "moderate",
            ElevationRisk::Low => "high",
        }
    }
}

/// Breakdown explaining how a score was reached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactors {
    pub rainfall_points: u32,
    pub elevation_points: u32,
    pub rainfall_contribution: RainfallLevel,
    pub elevation_contribution: ElevationRisk,
    pub explanation: String,
}

/// Score, tier and explanation for one reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: f64,
    pub severity: Severity,
    pub reading: EnvironmentalReading,
    pub factors: RiskFactors,
}

/// Stateless scorer; identical readings always produce identical assessments
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScorer;

impl RiskScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, reading: EnvironmentalReading) -> RiskAssessment {
        let rain = rainfall_points(reading.rainfall_mm);
        let terrain = elevation_points(reading.elevation_m);
        let score = f64::from(rain + terrain);
        let severity = Severity::from_score(score);

        RiskAssessment {
            score,
            severity,
            reading,
            factors: Self::factors(reading, rain, terrain, score),
        }
    }

    fn factors(reading: EnvironmentalReading, rain: u32, terrain: u32, score: f64) -> RiskFactors {
        let rainfall_contribution = RainfallLevel::from_rainfall(reading.rainfall_mm);
        let elevation_contribution = ElevationRisk::from_elevation(reading.elevation_m);

        let overall = if score > 50.0 {
            "elevated"
        } else if score > 25.0 {
            "moderate"
        } else {
            "low"
        };

        RiskFactors {
            rainfall_points: rain,
            elevation_points: terrain,
            rainfall_contribution,
            elevation_contribution,
            explanation: format!(
                "Risk is {} due to {} rainfall and {} elevation.",
                overall,
                rainfall_contribution.adjective(),
                elevation_contribution.terrain()
            ),
        }
    }
}
