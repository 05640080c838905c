//! Device configuration addressing

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A device configuration item, addressed by category and item name
/// (e.g. `Audio Mixer` / `Vol UltiSid 1`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId {
    /// Config category
    pub category: String,
    /// Item within the category
    pub item: String,
}

impl ChannelId {
    /// Create a channel id
    pub fn new(category: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            item: item.into(),
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.item)
    }
}

/// Batch of config writes, grouped by category then item
pub type ConfigBatch = BTreeMap<String, BTreeMap<String, String>>;

/// Build a batch from `(channel, value)` pairs
pub fn config_batch<'a>(values: impl IntoIterator<Item = (&'a ChannelId, &'a str)>) -> ConfigBatch {
    let mut batch = ConfigBatch::new();
    for (channel, value) in values {
        batch
            .entry(channel.category.clone())
            .or_default()
            .insert(channel.item.clone(), value.to_string());
    }
    batch
}
