//! Alert message renderings

use serde::{Deserialize, Serialize};

use crate::model::{Location, Severity, Subscription};

const SIGNATURE: &str = "Hyperlocal Urban Flood Forecaster";

/// Facts an alert is rendered from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertContent {
    pub location_name: String,
    pub severity: Severity,
    pub score: f64,
    pub location: Location,
}

/// One email: subject, plain text and an optional HTML alternative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
}

impl AlertContent {
    pub fn new(
        location_name: impl Into<String>,
        severity: Severity,
        score: f64,
        location: Location,
    ) -> Self {
        Self {
            location_name: location_name.into(),
            severity,
            score,
            location,
        }
    }

    /// Short text for SMS
    pub fn sms_text(&self) -> String {
        format!(
            "FLOOD ALERT: {} risk at {}\n\
             Risk Score: {:.1}/100\n\
             Location: {}\n\
             Take necessary precautions.",
            self.severity, self.location_name, self.score, self.location
        )
    }

    pub fn email(&self) -> EmailMessage {
        let subject = format!(
            "Flood Alert: {} Risk at {}",
            self.severity, self.location_name
        );

        let text_body = format!(
            "Flood Risk Alert\n\n\
             Location: {}\n\
             Risk Level: {}\n\
             Risk Score: {:.1}/100\n\
             Coordinates: {}\n\n\
             Please take necessary precautions and stay safe.\n\n\
             This is an automated alert from the {}.\n",
            self.location_name, self.severity, self.score, self.location, SIGNATURE
        );

        EmailMessage {
            subject,
            text_body,
            html_body: Some(self.html_body()),
        }
    }

    fn html_body(&self) -> String {
        format!(
            r#"<html>
<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <div style="background: #4a5fc1; padding: 20px; text-align: center;">
    <h1 style="color: white; margin: 0;">Flood Risk Alert</h1>
  </div>
  <div style="padding: 20px; background-color: #f8f9fa;">
    <div style="background: white; padding: 20px; border-radius: 8px;">
      <h2 style="color: {color};">{severity} Risk Level</h2>
      <p><strong>Location:</strong> {name}</p>
      <p><strong>Risk Score:</strong> {score:.1}/100</p>
      <p><strong>Coordinates:</strong> {coords}</p>
    </div>
    <p style="color: #856404;">
      Please take necessary precautions and stay alert. Monitor local authorities for updates.
    </p>
  </div>
  <div style="background: #343a40; padding: 15px; text-align: center; color: white;">
    <small>{signature} - Automated Alert System</small>
  </div>
</body>
</html>"#,
            color = severity_color(self.severity),
            severity = self.severity,
            name = escape_html(&self.location_name),
            score = self.score,
            coords = self.location,
            signature = SIGNATURE,
        )
    }
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::High | Severity::Critical => "#dc3545",
        Severity::Medium => "#ffc107",
        Severity::Low => "#28a745",
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn test_sms_text() -> String {
    "Test notification from Flood Forecaster. Your alerts are configured correctly!".to_string()
}

pub fn test_email() -> EmailMessage {
    EmailMessage {
        subject: "Test Notification - Flood Forecaster".to_string(),
        text_body: format!(
            "This is a test notification from the {}.\n\n\
             Your email alerts are configured correctly!",
            SIGNATURE
        ),
        html_body: Some(
            "<h2>Test Notification</h2><p>Your email alerts are configured correctly!</p>"
                .to_string(),
        ),
    }
}

/// Sent once when a subscription with an email address is created
pub fn confirmation_email(subscription: &Subscription) -> EmailMessage {
    EmailMessage {
        subject: "Flood Alert Subscription Confirmed".to_string(),
        text_body: format!(
            "You're now subscribed to flood alerts for location ({}) within {}km radius.",
            subscription.location, subscription.radius_km
        ),
        html_body: Some(format!(
            "<h2>Subscription Confirmed</h2>\
             <p>You're now subscribed to flood alerts for:</p>\
             <ul>\
             <li><strong>Location:</strong> {}</li>\
             <li><strong>Radius:</strong> {} km</li>\
             <li><strong>Minimum Severity:</strong> {}</li>\
             </ul>\
             <p>You'll receive alerts via email when floods are detected in your area.</p>",
            subscription.location, subscription.radius_km, subscription.min_severity
        )),
    }
}
