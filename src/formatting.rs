// src/formatting.rs

use crate::core::Notification;
use serde_json::json;

/// A trait for rendering a notification as a single output line.
pub trait NotificationFormatter: Send + Sync {
    fn format(&self, notification: &Notification) -> String;
}

/// The human-readable delivery line.
pub struct PlainTextFormatter;

impl NotificationFormatter for PlainTextFormatter {
    fn format(&self, notification: &Notification) -> String {
        format!(
            "Sending notification to User {} - {}: {}",
            notification.recipient_id, notification.category, notification.message
        )
    }
}

/// One JSON object per line.
pub struct JsonFormatter;

impl NotificationFormatter for JsonFormatter {
    fn format(&self, notification: &Notification) -> String {
        json!({
            "recipient_id": notification.recipient_id,
            "category": notification.category.label(),
            "channel": notification.channel.as_str(),
            "message": &*notification.message,
            "created_at": notification.created_at.to_rfc3339(),
        })
        .to_string()
    }
}
