//! Category to delivery channel routing.

use crate::core::{Category, DeliveryChannel};
use crate::error::Result;
use std::collections::BTreeMap;
use tracing::debug;

/// A total mapping from every `Category` to exactly one `DeliveryChannel`.
///
/// The table is indexed by `Category::index`, so every category always has an
/// entry and none can map to two channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingTable {
    routes: [DeliveryChannel; Category::ALL.len()],
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self {
            routes: [DeliveryChannel::Sms, DeliveryChannel::Email, DeliveryChannel::Push],
        }
    }
}

impl RoutingTable {
    /// Returns the channel that delivers notifications for `category`.
    pub fn route(&self, category: Category) -> DeliveryChannel {
        self.routes[category.index()]
    }

    /// Replaces the route for a single category.
    pub fn with_route(mut self, category: Category, channel: DeliveryChannel) -> Self {
        self.routes[category.index()] = channel;
        self
    }

    /// Builds a table from the defaults plus textual overrides, as found in the
    /// `[routing]` config section.
    pub fn from_overrides(overrides: &BTreeMap<String, String>) -> Result<Self> {
        overrides
            .iter()
            .try_fold(Self::default(), |table, (category, channel)| {
                let category: Category = category.parse()?;
                let channel: DeliveryChannel = channel.parse()?;
                debug!(%category, %channel, "Overriding route");
                Ok(table.with_route(category, channel))
            })
    }

    /// Iterates over every (category, channel) pair.
    pub fn iter(&self) -> impl Iterator<Item = (Category, DeliveryChannel)> + '_ {
        Category::ALL.iter().map(move |&category| (category, self.route(category)))
    }
}
