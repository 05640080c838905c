//! Shared fakes for the controller tests

#![allow(dead_code)]

use async_trait::async_trait;
use c64_core::{C64Error, ConfigBatch, DeviceApi, Drive, KeyValueStore, MediaSource};
use c64_playback::PlaybackEvent;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;

/// Device command as seen by the fake
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    Mount(Drive, String),
    Reboot,
    Reset,
    Pause,
    Resume,
    ReadMemory(u16),
    WriteMemory(u16, Vec<u8>),
    WriteBlock(u16, Vec<u8>),
    PlayAudio(String, Option<u16>),
    RunProgram(String),
    LoadProgram(String),
    RunCartridge(String),
    GetConfig(String, String),
    SetConfig(String, String, String),
    Batch(ConfigBatch),
}

/// Device that records every command and always reports an empty keyboard
/// buffer
pub struct RecordingDevice {
    calls: Mutex<Vec<DeviceCall>>,
    config: Mutex<BTreeMap<(String, String), String>>,
    fail_mount: AtomicBool,
    play_delay_ms: AtomicU64,
}

impl RecordingDevice {
    pub fn new() -> Self {
        let mut config = BTreeMap::new();
        for (item, level) in [
            ("Vol UltiSid 1", "0 dB"),
            ("Vol UltiSid 2", "-6 dB"),
            ("Vol Socket 1", "+1 dB"),
            ("Vol Socket 2", "0 dB"),
        ] {
            config.insert(("Audio Mixer".to_string(), item.to_string()), level.to_string());
        }
        Self {
            calls: Mutex::new(Vec::new()),
            config: Mutex::new(config),
            fail_mount: AtomicBool::new(false),
            play_delay_ms: AtomicU64::new(0),
        }
    }

    pub fn fail_mounts(&self) {
        self.fail_mount.store(true, Ordering::SeqCst);
    }

    /// Make every audio start take `delay` before it is acknowledged
    pub fn slow_play(&self, delay: Duration) {
        self.play_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls().iter().filter(|call| pred(call)).count()
    }

    pub fn level(&self, item: &str) -> Option<String> {
        self.config
            .lock()
            .unwrap()
            .get(&("Audio Mixer".to_string(), item.to_string()))
            .cloned()
    }

    fn record(&self, call: DeviceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn name(source: &MediaSource) -> String {
    source.file_name().to_string()
}

#[async_trait]
impl DeviceApi for RecordingDevice {
    async fn mount_image(&self, drive: Drive, image: MediaSource) -> c64_core::Result<()> {
        self.record(DeviceCall::Mount(drive, name(&image)));
        if self.fail_mount.load(Ordering::SeqCst) {
            return Err(C64Error::rejected("mount", 400, "image is corrupt"));
        }
        Ok(())
    }

    async fn reboot(&self) -> c64_core::Result<()> {
        self.record(DeviceCall::Reboot);
        Ok(())
    }

    async fn reset(&self) -> c64_core::Result<()> {
        self.record(DeviceCall::Reset);
        Ok(())
    }

    async fn pause(&self) -> c64_core::Result<()> {
        self.record(DeviceCall::Pause);
        Ok(())
    }

    async fn resume(&self) -> c64_core::Result<()> {
        self.record(DeviceCall::Resume);
        Ok(())
    }

    async fn read_memory(&self, address: u16, length: u16) -> c64_core::Result<Vec<u8>> {
        self.record(DeviceCall::ReadMemory(address));
        Ok(vec![0; usize::from(length)])
    }

    async fn write_memory(&self, address: u16, data: &[u8]) -> c64_core::Result<()> {
        self.record(DeviceCall::WriteMemory(address, data.to_vec()));
        Ok(())
    }

    async fn write_memory_block(&self, address: u16, data: &[u8]) -> c64_core::Result<()> {
        self.record(DeviceCall::WriteBlock(address, data.to_vec()));
        Ok(())
    }

    async fn play_audio(&self, source: MediaSource, song: Option<u16>) -> c64_core::Result<()> {
        self.record(DeviceCall::PlayAudio(name(&source), song));
        let delay = self.play_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(())
    }

    async fn run_program(&self, source: MediaSource) -> c64_core::Result<()> {
        self.record(DeviceCall::RunProgram(name(&source)));
        Ok(())
    }

    async fn load_program(&self, source: MediaSource) -> c64_core::Result<()> {
        self.record(DeviceCall::LoadProgram(name(&source)));
        Ok(())
    }

    async fn run_cartridge(&self, source: MediaSource) -> c64_core::Result<()> {
        self.record(DeviceCall::RunCartridge(name(&source)));
        Ok(())
    }

    async fn get_config_value(&self, category: &str, item: &str) -> c64_core::Result<String> {
        self.record(DeviceCall::GetConfig(category.to_string(), item.to_string()));
        self.config
            .lock()
            .unwrap()
            .get(&(category.to_string(), item.to_string()))
            .cloned()
            .ok_or_else(|| C64Error::rejected("config", 404, "no such item"))
    }

    async fn set_config_value(&self, category: &str, item: &str, value: &str) -> c64_core::Result<()> {
        self.record(DeviceCall::SetConfig(
            category.to_string(),
            item.to_string(),
            value.to_string(),
        ));
        self.config
            .lock()
            .unwrap()
            .insert((category.to_string(), item.to_string()), value.to_string());
        Ok(())
    }

    async fn batch_set_config_values(&self, values: &ConfigBatch) -> c64_core::Result<()> {
        self.record(DeviceCall::Batch(values.clone()));
        let mut config = self.config.lock().unwrap();
        for (category, items) in values {
            for (item, value) in items {
                config.insert((category.clone(), item.clone()), value.clone());
            }
        }
        Ok(())
    }
}

/// In-memory key/value store
#[derive(Default)]
pub struct MemoryKv(Mutex<HashMap<String, Vec<u8>>>);

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> c64_core::Result<Option<Vec<u8>>> {
        Ok(self.0.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> c64_core::Result<()> {
        self.0.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}

/// Minimal PSID header with the given song counts
pub fn sid_bytes(songs: u16, start_song: u16) -> Vec<u8> {
    let mut data = vec![0u8; 0x7C];
    data[0..4].copy_from_slice(b"PSID");
    data[4..6].copy_from_slice(&2u16.to_be_bytes());
    data[0x0E..0x10].copy_from_slice(&songs.to_be_bytes());
    data[0x10..0x12].copy_from_slice(&start_song.to_be_bytes());
    data
}

/// Wait (in virtual time) for the first event matching `pred`
pub async fn wait_for(
    events: &mut broadcast::Receiver<PlaybackEvent>,
    pred: impl Fn(&PlaybackEvent) -> bool,
) -> PlaybackEvent {
    tokio::time::timeout(Duration::from_secs(3600), async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("event did not arrive")
}

/// Let spawned tasks run without moving the clock
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}
