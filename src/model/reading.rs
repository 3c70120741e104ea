use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Rainfall and elevation observed for one evaluation. Both are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalReading {
    pub rainfall_mm: f64,
    pub elevation_m: f64,
}

impl EnvironmentalReading {
    pub fn new(rainfall_mm: f64, elevation_m: f64) -> Result<Self, ValidationError> {
        Ok(Self {
            rainfall_mm: check_rainfall(rainfall_mm)?,
            elevation_m: check_elevation(elevation_m)?,
        })
    }
}

pub fn check_rainfall(mm: f64) -> Result<f64, ValidationError> {
    if mm.is_finite() && mm >= 0.0 {
        Ok(mm)
    } else {
        Err(ValidationError::Rainfall(mm))
    }
}

pub fn check_elevation(m: f64) -> Result<f64, ValidationError> {
    if m.is_finite() && m >= 0.0 {
        Ok(m)
    } else {
        Err(ValidationError::Elevation(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative_values() {
        assert_eq!(
            EnvironmentalReading::new(-1.0, 10.0),
            Err(ValidationError::Rainfall(-1.0))
        );
        assert_eq!(
            EnvironmentalReading::new(1.0, -10.0),
            Err(ValidationError::Elevation(-10.0))
        );
        assert!(EnvironmentalReading::new(0.0, 0.0).is_ok());
        assert!(EnvironmentalReading::new(f64::INFINITY, 0.0).is_err());
    }
}
