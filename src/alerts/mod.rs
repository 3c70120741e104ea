//! Multi-channel alert dispatch
//!
//! Matched subscribers are notified over SMS and email independently. A
//! failure for one recipient or one channel is counted, never propagated.

pub mod dispatcher;
pub mod email;
pub mod message;
pub mod sms;

pub use dispatcher::{AlertDispatcher, Channel, DispatchOutcome, TestNotificationResult};
pub use email::{EmailProvider, HttpMailClient};
pub use message::{AlertContent, EmailMessage};
pub use sms::{SmsProvider, TwilioClient};
