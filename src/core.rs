//! Core domain types and service traits for the dispatcher
//!
//! This module defines the recipients, categories, delivery channels and
//! notifications that flow through the pipeline, and the `Output` trait that
//! delivery sinks implement.

use crate::config::RecipientConfig;
use crate::error::DispatchError;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The classification of a recipient, deciding which channel delivers to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    DeliveryAgent,
    Staff,
    EndUser,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::DeliveryAgent, Category::Staff, Category::EndUser];

    /// Position of this category in `Category::ALL`.
    pub const fn index(self) -> usize {
        match self {
            Category::DeliveryAgent => 0,
            Category::Staff => 1,
            Category::EndUser => 2,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Category::DeliveryAgent => "Delivery Agent",
            Category::Staff => "Staff",
            Category::EndUser => "End User",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lowercases and folds `_`/`-` separators into single spaces.
fn normalize(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl FromStr for Category {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "delivery agent" | "delivery man" | "deliveryagent" => Ok(Category::DeliveryAgent),
            "staff" | "employee" | "swiggy employee" => Ok(Category::Staff),
            "end user" | "enduser" | "user" => Ok(Category::EndUser),
            _ => Err(DispatchError::UnknownCategory(s.to_string())),
        }
    }
}

/// One of the fixed notification transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryChannel {
    Sms,
    Email,
    Push,
}

impl DeliveryChannel {
    pub const ALL: [DeliveryChannel; 3] =
        [DeliveryChannel::Sms, DeliveryChannel::Email, DeliveryChannel::Push];

    pub const fn index(self) -> usize {
        match self {
            DeliveryChannel::Sms => 0,
            DeliveryChannel::Email => 1,
            DeliveryChannel::Push => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DeliveryChannel::Sms => "sms",
            DeliveryChannel::Email => "email",
            DeliveryChannel::Push => "push",
        }
    }
}

impl fmt::Display for DeliveryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryChannel {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "sms" => Ok(DeliveryChannel::Sms),
            "email" | "e mail" => Ok(DeliveryChannel::Email),
            "push" => Ok(DeliveryChannel::Push),
            _ => Err(DispatchError::UnknownChannel(s.to_string())),
        }
    }
}

/// Someone who should receive a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub id: u64,
    pub name: String,
    pub category: Category,
}

impl Recipient {
    pub fn new(id: u64, name: impl Into<String>, category: Category) -> Self {
        Self {
            id,
            name: name.into(),
            category,
        }
    }
}

impl TryFrom<&RecipientConfig> for Recipient {
    type Error = DispatchError;

    fn try_from(raw: &RecipientConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.id,
            name: raw.name.clone(),
            category: raw.category.parse()?,
        })
    }
}

/// A single message addressed to one recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub recipient_id: u64,
    pub message: Arc<str>,
    pub category: Category,
    pub channel: DeliveryChannel,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Service Traits
// =============================================================================

/// Delivers notifications to a destination
#[async_trait]
pub trait Output: Send + Sync {
    /// A short name for the output (e.g., "stdout"), used in logs.
    fn name(&self) -> &str;

    /// Delivers one notification.
    ///
    /// # Returns
    /// * `Ok(())` if the notification was delivered
    /// * `Err` if delivery failed; the worker logs it and moves on
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}
