//! Runner and drive endpoints: play, run, load and mount, either by path on
//! the device or by multipart upload.

use crate::client::C64DeviceClient;
use crate::error::{DeviceClientError, Result};
use crate::types::Runner;
use bytes::Bytes;
use c64_core::{file_extension, Drive, MediaSource};
use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use tracing::{debug, info};

impl C64DeviceClient {
    /// Start a runner on a file.
    ///
    /// Paths are passed as `file=`; uploads are sent as a multipart `file`
    /// part. `song_number` is forwarded as `songnr`.
    pub async fn run(
        &self,
        runner: Runner,
        source: MediaSource,
        song_number: Option<u16>,
    ) -> Result<()> {
        let operation = format!("runners:{}", runner.as_str());
        let url = self.endpoint(&format!("/v1/{operation}"));

        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(song) = song_number {
            query.push(("songnr", song.to_string()));
        }

        match source {
            MediaSource::Path(path) => {
                debug!(operation = %operation, path = %path, song_number, "Runner by path");
                query.push(("file", path));
                self.command(
                    &operation,
                    self.http.put(url).query(&query),
                    self.config.control_timeout(),
                )
                .await
            }
            MediaSource::Upload { file_name, data } => {
                self.upload(&operation, self.http.post(url).query(&query), file_name, data)
                    .await
            }
        }
    }

    /// Mount a disk image on a drive.
    ///
    /// Uploaded images are mounted read-only with their type taken from the
    /// file extension.
    pub async fn mount(&self, drive: Drive, image: MediaSource) -> Result<()> {
        let operation = format!("drives/{}:mount", drive.as_str());
        let url = self.endpoint(&format!("/v1/{operation}"));

        match image {
            MediaSource::Path(path) => {
                info!(drive = %drive, image = %path, "Mounting image from device storage");
                self.command(
                    &operation,
                    self.http.put(url).query(&[("image", path)]),
                    self.config.control_timeout(),
                )
                .await
            }
            MediaSource::Upload { file_name, data } => {
                let image_type = file_extension(&file_name).unwrap_or_else(|| "d64".to_string());
                info!(drive = %drive, image = %file_name, image_type = %image_type, "Uploading image");
                let request = self
                    .http
                    .post(url)
                    .query(&[("type", image_type.as_str()), ("mode", "readonly")]);
                self.upload(&operation, request, file_name, data).await
            }
        }
    }

    /// Send file content as the multipart `file` part.
    async fn upload(
        &self,
        operation: &str,
        request: RequestBuilder,
        file_name: String,
        data: Bytes,
    ) -> Result<()> {
        let size = data.len();
        let part = Part::bytes(data.to_vec())
            .file_name(file_name.clone())
            .mime_str("application/octet-stream")?;
        let form = Form::new().part("file", part);

        match self
            .command(operation, request.multipart(form), self.config.upload_timeout())
            .await
        {
            Ok(()) => {
                debug!(operation, file = %file_name, size, "Upload accepted");
                Ok(())
            }
            Err(e @ DeviceClientError::Unreachable(_)) => Err(e),
            Err(e) => Err(DeviceClientError::UploadFailed {
                file_name,
                message: e.to_string(),
            }),
        }
    }
}
