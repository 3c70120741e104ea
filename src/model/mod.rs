//! Domain value types shared by every pipeline stage

pub mod location;
pub mod reading;
pub mod severity;
pub mod subscription;

pub use location::Location;
pub use reading::EnvironmentalReading;
pub use severity::Severity;
pub use subscription::{ContactChannels, Subscription};

/// Input rejected before it enters the pipeline
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Latitude {0} is outside [-90, 90]")]
    Latitude(f64),

    #[error("Longitude {0} is outside [-180, 180]")]
    Longitude(f64),

    #[error("Radius {0} km must be a positive number")]
    Radius(f64),

    #[error("Rainfall {0} mm must be a non-negative number")]
    Rainfall(f64),

    #[error("Elevation {0} m must be a non-negative number")]
    Elevation(f64),

    #[error("Unknown severity: {0}")]
    Severity(String),

    #[error("At least one contact method (email or phone) is required")]
    NoContact,

    #[error("Invalid email address: {0}")]
    Email(String),

    #[error("Invalid phone number: {0}")]
    Phone(String),
}
