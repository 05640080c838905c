//! Tests for the device client against a mock REST server.

use bytes::Bytes;
use c64_core::{config_batch, C64Error, ChannelId, DeviceApi, Drive, MediaSource};
use c64_device_client::{C64DeviceClient, DeviceClientError, DeviceConfig, MachineCommand};
use std::time::Duration;
use wiremock::matchers::{body_bytes, body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> C64DeviceClient {
    C64DeviceClient::new(DeviceConfig::new(server.uri())).unwrap()
}

fn ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "errors": [] }))
}

// =============================================================================
// Machine
// =============================================================================

mod machine {
    use super::*;

    #[tokio::test]
    async fn test_machine_commands_use_put() {
        let server = MockServer::start().await;
        for command in ["reset", "reboot", "pause", "resume"] {
            Mock::given(method("PUT"))
                .and(path(format!("/v1/machine:{command}")))
                .respond_with(ok())
                .expect(1)
                .mount(&server)
                .await;
        }

        let client = client_for(&server);
        client.reset().await.unwrap();
        client.reboot().await.unwrap();
        client.pause().await.unwrap();
        client.resume().await.unwrap();
    }

    #[tokio::test]
    async fn test_password_header_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/machine:pause"))
            .and(header("X-Password", "hunter2"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        let client =
            C64DeviceClient::new(DeviceConfig::new(server.uri()).with_password("hunter2")).unwrap();
        client.machine(MachineCommand::Pause).await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/machine:reboot"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
            .mount(&server)
            .await;

        let err = client_for(&server).reboot().await.unwrap_err();
        match err {
            C64Error::DeviceRejected {
                operation, status, ..
            } => {
                assert_eq!(operation, "machine:reboot");
                assert_eq!(status, 403);
            }
            other => panic!("Expected DeviceRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        let client = C64DeviceClient::new(DeviceConfig::new("http://127.0.0.1:1")).unwrap();
        let err = client.machine(MachineCommand::Reset).await.unwrap_err();
        assert!(matches!(err, DeviceClientError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/machine:reset"))
            .respond_with(ok().set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let config = DeviceConfig {
            control_timeout_ms: 100,
            ..DeviceConfig::new(server.uri())
        };
        let client = C64DeviceClient::new(config).unwrap();
        let err = client.reset().await.unwrap_err();
        assert!(err.is_unreachable());
    }
}

// =============================================================================
// Memory
// =============================================================================

mod memory {
    use super::*;

    #[tokio::test]
    async fn test_read_memory_returns_raw_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/machine:readmem"))
            .and(query_param("address", "00C6"))
            .and(query_param("length", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![3u8]))
            .mount(&server)
            .await;

        let bytes = DeviceApi::read_memory(&client_for(&server), 0x00C6, 1)
            .await
            .unwrap();
        assert_eq!(bytes, vec![3]);
    }

    #[tokio::test]
    async fn test_short_read_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/machine:readmem"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2]))
            .mount(&server)
            .await;

        let err = DeviceApi::read_memory(&client_for(&server), 0x0400, 16)
            .await
            .unwrap_err();
        assert!(matches!(err, C64Error::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_small_write_uses_hex_query() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/machine:writemem"))
            .and(query_param("address", "0277"))
            .and(query_param("data", "4C4F4144"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        DeviceApi::write_memory(&client_for(&server), 0x0277, b"LOAD")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_block_write_posts_binary_body() {
        let server = MockServer::start().await;
        let stub = vec![0x0Bu8, 0x08, 0x00, 0x00, 0x93];
        Mock::given(method("POST"))
            .and(path("/v1/machine:writemem"))
            .and(query_param("address", "0801"))
            .and(body_bytes(stub.clone()))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        DeviceApi::write_memory_block(&client_for(&server), 0x0801, &stub)
            .await
            .unwrap();
    }
}

// =============================================================================
// Runners and drives
// =============================================================================

mod runners {
    use super::*;

    #[tokio::test]
    async fn test_remote_sid_with_song_number() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/runners:sidplay"))
            .and(query_param("file", "/Usb0/Music/Commando.sid"))
            .and(query_param("songnr", "3"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .play_audio(MediaSource::Path("/Usb0/Music/Commando.sid".into()), Some(3))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_local_mod_is_uploaded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/runners:modplay"))
            .and(body_string_contains("name=\"file\""))
            .and(body_string_contains("space.mod"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        let source = MediaSource::Upload {
            file_name: "space.mod".into(),
            data: Bytes::from_static(b"M.K."),
        };
        client_for(&server).play_audio(source, Some(2)).await.unwrap();
    }

    #[tokio::test]
    async fn test_program_and_cartridge_runners() {
        let server = MockServer::start().await;
        for runner in ["run_prg", "load_prg", "run_crt"] {
            Mock::given(method("PUT"))
                .and(path(format!("/v1/runners:{runner}")))
                .respond_with(ok())
                .expect(1)
                .mount(&server)
                .await;
        }

        let client = client_for(&server);
        client
            .run_program(MediaSource::Path("/Usb0/a.prg".into()))
            .await
            .unwrap();
        client
            .load_program(MediaSource::Path("/Usb0/a.prg".into()))
            .await
            .unwrap();
        client
            .run_cartridge(MediaSource::Path("/Usb0/a.crt".into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_uploaded_image_is_mounted_readonly() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/drives/b:mount"))
            .and(query_param("type", "d64"))
            .and(query_param("mode", "readonly"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        let image = MediaSource::Upload {
            file_name: "Elite.D64".into(),
            data: Bytes::from(vec![0u8; 64]),
        };
        client_for(&server).mount_image(Drive::B, image).await.unwrap();
    }

    #[tokio::test]
    async fn test_mount_by_path() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/drives/a:mount"))
            .and(query_param("image", "/Usb0/Games/Elite.d64"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .mount_image(Drive::A, MediaSource::Path("/Usb0/Games/Elite.d64".into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_error_list_in_ok_response_fails() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/drives/a:mount"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "errors": ["Could not mount image"] })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .mount_image(Drive::A, MediaSource::Path("/Usb0/broken.d64".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, C64Error::DeviceRejected { ref message, .. } if message.contains("Could not mount")));
    }

    #[tokio::test]
    async fn test_rejected_upload_is_upload_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/runners:run_prg"))
            .respond_with(ResponseTemplate::new(413).set_body_string("Too large"))
            .mount(&server)
            .await;

        let source = MediaSource::Upload {
            file_name: "game.prg".into(),
            data: Bytes::from_static(&[0x01, 0x08]),
        };
        let err = client_for(&server).run_program(source).await.unwrap_err();
        assert!(matches!(err, C64Error::UploadFailed(_)));
    }

    #[tokio::test]
    async fn test_non_audio_is_not_played() {
        let server = MockServer::start().await;
        let err = client_for(&server)
            .play_audio(MediaSource::Path("/Usb0/a.prg".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, C64Error::UnsupportedMedia(_)));
    }
}

// =============================================================================
// Config
// =============================================================================

mod config {
    use super::*;

    #[tokio::test]
    async fn test_get_config_value_reads_current() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/configs/Audio%20Mixer/Vol%20UltiSid%201"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Audio Mixer": { "Vol UltiSid 1": { "current": "+1 dB", "default": "0 dB" } },
                "errors": []
            })))
            .mount(&server)
            .await;

        let value = client_for(&server)
            .get_config_value("Audio Mixer", "Vol UltiSid 1")
            .await
            .unwrap();
        assert_eq!(value, "+1 dB");
    }

    #[tokio::test]
    async fn test_set_config_value() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/configs/Audio%20Mixer/Vol%20Socket%201"))
            .and(query_param("value", "OFF"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .set_config_value("Audio Mixer", "Vol Socket 1", "OFF")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_batch_posts_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/configs"))
            .and(body_json(serde_json::json!({
                "Audio Mixer": { "Vol UltiSid 1": "OFF", "Vol UltiSid 2": "OFF" }
            })))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        let a = ChannelId::new("Audio Mixer", "Vol UltiSid 1");
        let b = ChannelId::new("Audio Mixer", "Vol UltiSid 2");
        client_for(&server)
            .batch_set_config_values(&config_batch([(&a, "OFF"), (&b, "OFF")]))
            .await
            .unwrap();
    }
}
