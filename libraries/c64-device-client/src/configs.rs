//! Configuration endpoints.
//!
//! Item reads return a JSON document keyed by category and item:
//!
//! ```text
//! { "Audio Mixer": { "Vol UltiSid 1": { "current": "0 dB", "values": [...] } }, "errors": [] }
//! ```
//!
//! Older firmware answers with the bare value instead of an object.

use crate::client::C64DeviceClient;
use crate::error::{DeviceClientError, Result};
use c64_core::ConfigBatch;
use serde_json::Value;
use tracing::debug;
use url::Url;

impl C64DeviceClient {
    /// Current value of a config item.
    pub async fn config_value(&self, category: &str, item: &str) -> Result<String> {
        let url = self.config_url(&[category, item])?;
        let response = self
            .execute("configs:get", self.http.get(url), self.config.control_timeout())
            .await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| DeviceClientError::ParseError(format!("Failed to parse config: {}", e)))?;

        let value = extract_value(&body, category, item).ok_or_else(|| {
            DeviceClientError::ParseError(format!("no value for {category}/{item} in response"))
        })?;
        debug!(category, item, value = %value, "Read config item");
        Ok(value)
    }

    /// Set a single config item.
    pub async fn set_config(&self, category: &str, item: &str, value: &str) -> Result<()> {
        let url = self.config_url(&[category, item])?;
        self.command(
            "configs:set",
            self.http.put(url).query(&[("value", value)]),
            self.config.control_timeout(),
        )
        .await
    }

    /// Set many config items in one request.
    pub async fn set_configs(&self, values: &ConfigBatch) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let items: usize = values.values().map(|items| items.len()).sum();
        debug!(categories = values.len(), items, "Batch config write");
        self.command(
            "configs:batch",
            self.http.post(self.endpoint("/v1/configs")).json(values),
            self.config.control_timeout(),
        )
        .await
    }

    /// `/v1/configs/<segments>` with each segment percent-encoded.
    fn config_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint("/v1/configs"))
            .map_err(|e| DeviceClientError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| DeviceClientError::InvalidUrl(self.url().to_string()))?
            .extend(segments);
        Ok(url)
    }
}

fn extract_value(body: &Value, category: &str, item: &str) -> Option<String> {
    match body.get(category)?.get(item)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        detail @ Value::Object(_) => ["current", "value", "selected", "default"]
            .iter()
            .find_map(|key| match detail.get(*key)? {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            }),
        _ => None,
    }
}
