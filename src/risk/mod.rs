//! Flood risk scoring
//!
//! Score = rainfall points (10..=60) + elevation points (5..=40).
//!
//! | rainfall mm | points |   | elevation m | points |
//! |-------------|--------|---|-------------|--------|
//! | [0, 5)      | 10     |   | [0, 10)     | 40     |
//! | [5, 15)     | 20     |   | [10, 50)    | 30     |
//! | [15, 30)    | 35     |   | [50, 100)   | 20     |
//! | [30, 50)    | 50     |   | [100, 200)  | 10     |
//! | [50, ∞)     | 60     |   | [200, ∞)    | 5      |
//!
//! Severity: `<= 25` Low, `<= 50` Medium, `<= 75` High, otherwise Critical.

pub mod scorer;

pub use scorer::{
    elevation_points, rainfall_points, ElevationRisk, RainfallLevel, RiskAssessment, RiskFactors,
    RiskScorer,
};
