//! In-memory record stores backing the HTTP API

pub mod events;
pub mod subscriptions;

pub use events::{EventLog, FloodEvent};
pub use subscriptions::{SubscriptionRegistry, SubscriptionUpdate};
