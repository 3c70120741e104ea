use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::subscription::check_radius;
use crate::model::{ContactChannels, Location, Severity, Subscription, ValidationError};
use crate::pipeline::{StoreError, SubscriptionStore};

/// Partial update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpdate {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<Location>,
    pub radius_km: Option<f64>,
    pub min_severity: Option<Severity>,
    pub active: Option<bool>,
}

/// Alert subscriptions keyed by id
pub struct SubscriptionRegistry {
    subscriptions: DashMap<u64, Subscription>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Store a new active subscription and return it with its assigned id
    pub fn create(
        &self,
        location: Location,
        radius_km: f64,
        min_severity: Severity,
        channels: ContactChannels,
    ) -> Result<Subscription, ValidationError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let subscription = Subscription::new(id, location, radius_km, min_severity, channels)?;
        self.subscriptions.insert(id, subscription.clone());
        Ok(subscription)
    }

    pub fn get(&self, id: u64) -> Option<Subscription> {
        self.subscriptions.get(&id).map(|s| s.clone())
    }

    /// Subscriptions ordered by id
    pub fn list(&self, active_only: bool, skip: usize, limit: usize) -> Vec<Subscription> {
        let mut subscriptions: Vec<Subscription> = self
            .subscriptions
            .iter()
            .filter(|s| !active_only || s.active)
            .map(|s| s.clone())
            .collect();
        subscriptions.sort_by_key(|s| s.id);
        subscriptions.into_iter().skip(skip).take(limit).collect()
    }

    pub fn update(
        &self,
        id: u64,
        update: SubscriptionUpdate,
    ) -> Result<Option<Subscription>, ValidationError> {
        let Some(mut entry) = self.subscriptions.get_mut(&id) else {
            return Ok(None);
        };

        // validate everything before touching the stored record
        let channels = if update.email.is_some() || update.phone.is_some() {
            Some(ContactChannels::new(
                update.email.or_else(|| entry.channels.email.clone()),
                update.phone.or_else(|| entry.channels.phone.clone()),
            )?)
        } else {
            None
        };
        let radius_km = update.radius_km.map(check_radius).transpose()?;

        let subscription = entry.value_mut();
        if let Some(channels) = channels {
            subscription.channels = channels;
        }
        if let Some(radius_km) = radius_km {
            subscription.radius_km = radius_km;
        }
        if let Some(location) = update.location {
            subscription.location = location;
        }
        if let Some(min_severity) = update.min_severity {
            subscription.min_severity = min_severity;
        }
        if let Some(active) = update.active {
            subscription.active = active;
        }

        Ok(Some(subscription.clone()))
    }

    pub fn delete(&self, id: u64) -> Option<Subscription> {
        self.subscriptions.remove(&id).map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionStore for SubscriptionRegistry {
    /// Every active subscription; the matcher applies radius and severity
    async fn find_active_subscriptions_near(
        &self,
        _location: Location,
        _severity: Severity,
    ) -> Result<Vec<Subscription>, StoreError> {
        Ok(self
            .subscriptions
            .iter()
            .filter(|s| s.active)
            .map(|s| s.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(lat: f64, lon: f64) -> Location {
        Location::new(lat, lon).unwrap()
    }

    fn registry_with_two() -> SubscriptionRegistry {
        let registry = SubscriptionRegistry::new();
        let email = ContactChannels::email("a@example.com").unwrap();
        let phone = ContactChannels::phone("+15550000002").unwrap();
        registry.create(loc(1.0, 1.0), 5.0, Severity::Medium, email).unwrap();
        registry.create(loc(2.0, 2.0), 10.0, Severity::High, phone).unwrap();
        registry
    }

    #[test]
    fn test_create_assigns_sequential_ids() {
        let registry = registry_with_two();
        let ids: Vec<u64> = registry.list(false, 0, 100).iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_create_rejects_bad_radius() {
        let registry = SubscriptionRegistry::new();
        let result = registry.create(
            loc(0.0, 0.0),
            0.0,
            Severity::Low,
            ContactChannels::email("a@example.com").unwrap(),
        );
        assert_eq!(result, Err(ValidationError::Radius(0.0)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_update_is_partial_and_validated() {
        let registry = registry_with_two();

        let updated = registry
            .update(
                1,
                SubscriptionUpdate {
                    phone: Some("+15550000009".to_string()),
                    active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.channels.email.as_deref(), Some("a@example.com"));
        assert_eq!(updated.channels.phone.as_deref(), Some("+15550000009"));
        assert!(!updated.active);

        let rejected = registry.update(
            1,
            SubscriptionUpdate {
                radius_km: Some(-1.0),
                min_severity: Some(Severity::Critical),
                ..Default::default()
            },
        );
        assert!(rejected.is_err());
        assert_eq!(registry.get(1).map(|s| s.min_severity), Some(Severity::Medium));

        assert_eq!(registry.update(99, SubscriptionUpdate::default()), Ok(None));
    }

    #[tokio::test]
    async fn test_candidates_are_active_only() {
        let registry = registry_with_two();
        let deactivate = SubscriptionUpdate {
            active: Some(false),
            ..Default::default()
        };
        registry.update(2, deactivate).unwrap();

        let candidates = registry
            .find_active_subscriptions_near(loc(0.0, 0.0), Severity::Critical)
            .await
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, 1);
        assert_eq!(registry.list(true, 0, 10).len(), 1);
    }

    #[test]
    fn test_delete() {
        let registry = registry_with_two();
        assert!(registry.delete(1).is_some());
        assert!(registry.delete(1).is_none());
        assert!(registry.get(1).is_none());
    }
}
