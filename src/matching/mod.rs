//! Geospatial and severity subscriber matching

use crate::model::{Location, Severity, Subscription};

/// Kilometres per degree used by the planar distance approximation
pub const KM_PER_DEGREE: f64 = 111.0;

/// Planar distance between two points: `sqrt(dlat^2 + dlon^2) * 111`.
///
/// No cos(latitude) correction is applied to the longitude difference, so
/// east-west distances are overstated away from the equator. Matching
/// results depend on this exact formula.
pub fn approx_distance_km(a: Location, b: Location) -> f64 {
    let dlat = a.latitude() - b.latitude();
    let dlon = a.longitude() - b.longitude();
    (dlat * dlat + dlon * dlon).sqrt() * KM_PER_DEGREE
}

/// Filters candidate subscriptions down to those an event should alert
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscriberMatcher;

impl SubscriberMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Whether `subscription` wants an event of `severity` at `location`
    pub fn is_match(
        &self,
        location: Location,
        severity: Severity,
        subscription: &Subscription,
    ) -> bool {
        subscription.active
            && approx_distance_km(location, subscription.location) <= subscription.radius_km
            && severity >= subscription.min_severity
    }

    /// Subset of `subscriptions` matching the event. Output order is unspecified.
    pub fn matches(
        &self,
        location: Location,
        severity: Severity,
        subscriptions: &[Subscription],
    ) -> Vec<Subscription> {
        subscriptions
            .iter()
            .filter(|sub| self.is_match(location, severity, sub))
            .cloned()
            .collect()
    }
}
