//! Main device client.

use crate::error::{DeviceClientError, Result};
use crate::types::{DeviceConfig, MachineCommand, Runner, VersionInfo};
use async_trait::async_trait;
use c64_core::{C64Error, ConfigBatch, DeviceApi, Drive, MediaCategory, MediaSource};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Client for the REST interface of an Ultimate 64 / C64U.
///
/// Control commands use the short control timeout; commands that carry a
/// file upload use the upload timeout.
///
/// # Example
///
/// ```ignore
/// use c64_device_client::{C64DeviceClient, DeviceConfig};
///
/// let client = C64DeviceClient::new(DeviceConfig::new("http://c64u"))?;
/// let info = client.version().await?;
/// println!("REST API v{}", info.version);
/// ```
pub struct C64DeviceClient {
    pub(crate) http: Client,
    pub(crate) base_url: String,
    pub(crate) config: DeviceConfig,
}

impl C64DeviceClient {
    /// Create a new client with the given configuration.
    pub fn new(config: DeviceConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(DeviceClientError::InvalidUrl("URL cannot be empty".into()));
        }

        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(DeviceClientError::InvalidUrl(
                "URL must start with http:// or https://".into(),
            ));
        }

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(format!("c64-player/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    /// Get the device URL (without trailing slash).
    pub fn url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request, turning transport failures and error statuses into
    /// errors.
    pub(crate) async fn execute(
        &self,
        operation: &str,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<Response> {
        let request = match &self.config.password {
            Some(password) => request.header("X-Password", password),
            None => request,
        };

        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(DeviceClientError::from_transport)?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().await.unwrap_or_default();
            warn!(operation, status = status.as_u16(), message = %message, "Device rejected command");
            Err(DeviceClientError::Rejected {
                operation: operation.to_string(),
                status: status.as_u16(),
                message,
            })
        }
    }

    /// Send a command whose JSON reply may carry an `errors` list.
    pub(crate) async fn command(
        &self,
        operation: &str,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<()> {
        let response = self.execute(operation, request, timeout).await?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(DeviceClientError::from_transport)?;
        check_errors(operation, status, &body)
    }

    // ===== Info =====

    /// Test the connection and get the REST API version.
    pub async fn version(&self) -> Result<VersionInfo> {
        let response = self
            .execute(
                "version",
                self.http.get(self.endpoint("/v1/version")),
                self.config.control_timeout(),
            )
            .await?;

        let info: VersionInfo = response.json().await.map_err(|e| {
            DeviceClientError::ParseError(format!("Failed to parse version: {}", e))
        })?;
        info!(version = %info.version, url = %self.base_url, "Connected to device");
        Ok(info)
    }

    // ===== Machine =====

    /// Send a machine command.
    pub async fn machine(&self, command: MachineCommand) -> Result<()> {
        let operation = format!("machine:{}", command.as_str());
        debug!(operation = %operation, "Machine command");
        self.command(
            &operation,
            self.http.put(self.endpoint(&format!("/v1/{operation}"))),
            self.config.control_timeout(),
        )
        .await
    }

    // ===== Memory =====

    /// Read `length` bytes starting at `address`.
    pub async fn read_memory(&self, address: u16, length: u16) -> Result<Vec<u8>> {
        let request = self
            .http
            .get(self.endpoint("/v1/machine:readmem"))
            .query(&[("address", hex_address(address)), ("length", length.to_string())]);

        let response = self
            .execute("machine:readmem", request, self.config.control_timeout())
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(DeviceClientError::from_transport)?;

        if bytes.len() != usize::from(length) {
            return Err(DeviceClientError::ParseError(format!(
                "short read at ${:04X}: expected {} bytes, got {}",
                address,
                length,
                bytes.len()
            )));
        }
        Ok(bytes.to_vec())
    }

    /// Write a few bytes with a hex-encoded query parameter.
    pub async fn write_memory(&self, address: u16, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        debug!(address = %hex_address(address), len = data.len(), "Memory write");
        let request = self
            .http
            .put(self.endpoint("/v1/machine:writemem"))
            .query(&[("address", hex_address(address)), ("data", hex_data(data))]);
        self.command("machine:writemem", request, self.config.control_timeout())
            .await
    }

    /// Write a block of memory with a binary request body.
    pub async fn write_memory_block(&self, address: u16, data: &[u8]) -> Result<()> {
        debug!(address = %hex_address(address), len = data.len(), "Memory block write");
        let request = self
            .http
            .post(self.endpoint("/v1/machine:writemem"))
            .query(&[("address", hex_address(address))])
            .header("Content-Type", "application/octet-stream")
            .body(data.to_vec());
        self.command("machine:writemem", request, self.config.upload_timeout())
            .await
    }
}

/// Four-digit uppercase hex, as the device expects for addresses.
pub(crate) fn hex_address(address: u16) -> String {
    format!("{address:04X}")
}

fn hex_data(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02X}")).collect()
}

/// The device reports some failures as HTTP 200 with an `errors` list.
fn check_errors(operation: &str, status: u16, body: &str) -> Result<()> {
    #[derive(Deserialize)]
    struct Reply {
        #[serde(default)]
        errors: Vec<serde_json::Value>,
    }

    let Ok(reply) = serde_json::from_str::<Reply>(body) else {
        return Ok(());
    };
    if reply.errors.is_empty() {
        return Ok(());
    }

    let message = reply
        .errors
        .iter()
        .map(|e| match e {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("; ");
    Err(DeviceClientError::Rejected {
        operation: operation.to_string(),
        status,
        message,
    })
}

#[async_trait]
impl DeviceApi for C64DeviceClient {
    async fn mount_image(&self, drive: Drive, image: MediaSource) -> c64_core::Result<()> {
        Ok(self.mount(drive, image).await?)
    }

    async fn reboot(&self) -> c64_core::Result<()> {
        Ok(self.machine(MachineCommand::Reboot).await?)
    }

    async fn reset(&self) -> c64_core::Result<()> {
        Ok(self.machine(MachineCommand::Reset).await?)
    }

    async fn pause(&self) -> c64_core::Result<()> {
        Ok(self.machine(MachineCommand::Pause).await?)
    }

    async fn resume(&self) -> c64_core::Result<()> {
        Ok(self.machine(MachineCommand::Resume).await?)
    }

    async fn read_memory(&self, address: u16, length: u16) -> c64_core::Result<Vec<u8>> {
        Ok(C64DeviceClient::read_memory(self, address, length).await?)
    }

    async fn write_memory(&self, address: u16, data: &[u8]) -> c64_core::Result<()> {
        Ok(C64DeviceClient::write_memory(self, address, data).await?)
    }

    async fn write_memory_block(&self, address: u16, data: &[u8]) -> c64_core::Result<()> {
        Ok(C64DeviceClient::write_memory_block(self, address, data).await?)
    }

    async fn play_audio(&self, source: MediaSource, song_number: Option<u16>) -> c64_core::Result<()> {
        let runner = match MediaCategory::from_path(source.file_name()) {
            Some(MediaCategory::Mod) => Runner::ModPlay,
            Some(MediaCategory::Sid) => Runner::SidPlay,
            _ => {
                return Err(C64Error::unsupported_media(format!(
                    "{} is not a SID or MOD tune",
                    source.file_name()
                )))
            }
        };
        // Only the SID player understands subsongs
        let song_number = song_number.filter(|_| runner == Runner::SidPlay);
        Ok(self.run(runner, source, song_number).await?)
    }

    async fn run_program(&self, source: MediaSource) -> c64_core::Result<()> {
        Ok(self.run(Runner::RunPrg, source, None).await?)
    }

    async fn load_program(&self, source: MediaSource) -> c64_core::Result<()> {
        Ok(self.run(Runner::LoadPrg, source, None).await?)
    }

    async fn run_cartridge(&self, source: MediaSource) -> c64_core::Result<()> {
        Ok(self.run(Runner::RunCrt, source, None).await?)
    }

    async fn get_config_value(&self, category: &str, item: &str) -> c64_core::Result<String> {
        Ok(self.config_value(category, item).await?)
    }

    async fn set_config_value(&self, category: &str, item: &str, value: &str) -> c64_core::Result<()> {
        Ok(self.set_config(category, item, value).await?)
    }

    async fn batch_set_config_values(&self, values: &ConfigBatch) -> c64_core::Result<()> {
        Ok(self.set_configs(values).await?)
    }
}
