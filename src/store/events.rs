use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::matching::approx_distance_km;
use crate::model::{Location, Severity};
use crate::risk::RiskAssessment;

/// A scored flood event as recorded by the caller of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodEvent {
    pub id: u64,
    pub location_name: String,
    pub location: Location,
    pub description: Option<String>,
    pub severity: Severity,
    pub risk_score: f64,
    pub rainfall_mm: f64,
    pub elevation_m: f64,
    pub timestamp: DateTime<Utc>,
}

/// Recorded flood events keyed by id
pub struct EventLog {
    events: DashMap<u64, FloodEvent>,
    next_id: AtomicU64,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn record(
        &self,
        location_name: impl Into<String>,
        location: Location,
        description: Option<String>,
        assessment: &RiskAssessment,
    ) -> FloodEvent {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let event = FloodEvent {
            id,
            location_name: location_name.into(),
            location,
            description,
            severity: assessment.severity,
            risk_score: assessment.score,
            rainfall_mm: assessment.reading.rainfall_mm,
            elevation_m: assessment.reading.elevation_m,
            timestamp: Utc::now(),
        };
        self.events.insert(id, event.clone());
        event
    }

    pub fn get(&self, id: u64) -> Option<FloodEvent> {
        self.events.get(&id).map(|e| e.clone())
    }

    /// Most recent first, optionally restricted to one severity
    pub fn list(&self, skip: usize, limit: usize, severity: Option<Severity>) -> Vec<FloodEvent> {
        let mut events: Vec<FloodEvent> = self
            .events
            .iter()
            .filter(|e| severity.map_or(true, |s| e.severity == s))
            .map(|e| e.clone())
            .collect();
        sort_newest_first(&mut events);
        events.into_iter().skip(skip).take(limit).collect()
    }

    /// Events within `radius_km` of `center`, using the same planar distance
    /// as subscriber matching
    pub fn nearby(&self, center: Location, radius_km: f64) -> Vec<FloodEvent> {
        let mut events: Vec<FloodEvent> = self
            .events
            .iter()
            .filter(|e| approx_distance_km(center, e.location) <= radius_km)
            .map(|e| e.clone())
            .collect();
        sort_newest_first(&mut events);
        events
    }

    pub fn delete(&self, id: u64) -> Option<FloodEvent> {
        self.events.remove(&id).map(|(_, e)| e)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

// ids break timestamp ties so ordering is stable
fn sort_newest_first(events: &mut [FloodEvent]) {
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EnvironmentalReading;
    use crate::risk::RiskScorer;

    fn loc(lat: f64, lon: f64) -> Location {
        Location::new(lat, lon).unwrap()
    }

    fn assessment(rainfall_mm: f64, elevation_m: f64) -> RiskAssessment {
        RiskScorer::new().score(EnvironmentalReading::new(rainfall_mm, elevation_m).unwrap())
    }

    #[test]
    fn test_record_copies_assessment() {
        let log = EventLog::new();
        let event = log.record("Main Street", loc(40.7128, -74.006), None, &assessment(35.2, 15.5));

        assert_eq!(event.id, 1);
        assert_eq!(event.severity, Severity::Critical);
        assert_eq!(event.risk_score, 80.0);
        assert_eq!(event.rainfall_mm, 35.2);
        assert_eq!(log.get(1), Some(event));
    }

    #[test]
    fn test_list_newest_first_with_filter() {
        let log = EventLog::new();
        log.record("a", loc(0.0, 0.0), None, &assessment(0.0, 500.0));
        log.record("b", loc(0.0, 0.0), None, &assessment(60.0, 0.0));
        log.record("c", loc(0.0, 0.0), None, &assessment(60.0, 5.0));

        let names: Vec<String> = log
            .list(0, 10, None)
            .into_iter()
            .map(|e| e.location_name)
            .collect();
        assert_eq!(names, vec!["c", "b", "a"]);

        let critical = log.list(0, 10, Some(Severity::Critical));
        assert_eq!(critical.len(), 2);
        assert_eq!(log.list(1, 1, None)[0].location_name, "b");
    }

    #[test]
    fn test_nearby_and_delete() {
        let log = EventLog::new();
        log.record("near", loc(0.01, 0.01), None, &assessment(1.0, 1.0));
        log.record("far", loc(5.0, 5.0), None, &assessment(1.0, 1.0));

        let nearby = log.nearby(loc(0.0, 0.0), 5.0);
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].location_name, "near");

        assert!(log.delete(1).is_some());
        assert!(log.nearby(loc(0.0, 0.0), 5.0).is_empty());
        assert_eq!(log.len(), 1);
    }
}
