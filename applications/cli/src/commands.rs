/// Subcommand implementations
use crate::config::AppConfig;
use crate::error::{CliError, Result};
use c64_core::{DeviceApi, Drive, PlayRequest, PlaylistItem};
use c64_device_client::C64DeviceClient;
use c64_playback::{
    AutostartStrategy, LoadMode, PlayOptions, PlaybackEvent, PlaybackState, PlaylistController,
    SongLengthDatabase,
};
use c64_storage::{FsSourceReader, SqliteStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

/// Options for `play`
#[derive(Debug, Clone, Default)]
pub struct PlayArgs {
    pub files: Vec<PathBuf>,
    /// Files are paths on the device rather than on this machine
    pub remote: bool,
    pub song: Option<u16>,
    pub drive: Drive,
    pub load_only: bool,
    pub no_reboot: bool,
    pub shuffle: bool,
    pub repeat: bool,
    pub dma: bool,
}

impl PlayArgs {
    pub fn play_options(&self) -> PlayOptions {
        PlayOptions {
            load_mode: if self.load_only {
                LoadMode::LoadOnly
            } else {
                LoadMode::Run
            },
            drive: self.drive,
            reset_before_mount: !self.no_reboot,
        }
    }
}

/// Add the files to the playlist and play from the first of them until
/// playback stops or Ctrl-C is pressed.
pub async fn play(config: &AppConfig, args: PlayArgs) -> Result<()> {
    if args.files.is_empty() {
        return Err(CliError::InvalidArgument("no files to play".to_string()));
    }

    let device = Arc::new(C64DeviceClient::new(config.device_config())?);
    let store = Arc::new(SqliteStore::open(&config.storage.database_url).await?);

    let mut reader = FsSourceReader::new();
    if let Some(root) = &config.storage.remote_mirror {
        reader = reader.with_remote_root(root);
    }

    let mut builder = PlaylistController::builder(device, store)
        .config(config.playback_config())
        .reader(Arc::new(reader));
    if let Some(path) = &config.playback.songlengths {
        let database = SongLengthDatabase::parse(&tokio::fs::read_to_string(path).await?);
        info!(path = %path.display(), entries = database.len(), "Loaded song-length database");
        builder = builder.oracle(Arc::new(database));
    }
    let controller = builder.open().await;

    if args.dma {
        controller
            .set_autostart_strategy(AutostartStrategy::Dma)
            .await?;
    }

    let mut items = Vec::with_capacity(args.files.len());
    for file in &args.files {
        items.push(playlist_item(file, args.remote, args.song).await?);
    }
    let first = items
        .first()
        .map(|item| item.id.clone())
        .ok_or_else(|| CliError::InvalidArgument("no files to play".to_string()))?;
    let added = controller.add_items(items).await;
    info!(added, files = args.files.len(), "Playlist updated");

    controller.set_repeat(args.repeat).await;
    if args.shuffle != controller.snapshot().await.shuffle_enabled {
        controller.toggle_shuffle().await?;
    }

    let index = controller
        .items()
        .await
        .iter()
        .position(|item| item.id == first)
        .ok_or_else(|| CliError::InvalidArgument("item vanished from playlist".to_string()))?;

    let mut events = controller.subscribe();
    controller.play_with(index, args.play_options()).await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted; stopping playback");
                controller.stop().await?;
                break;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if report(&event) {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => warn!(missed, "Dropped playback events"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    controller.shutdown().await;
    Ok(())
}

async fn playlist_item(path: &Path, remote: bool, song: Option<u16>) -> Result<PlaylistItem> {
    let display = path.to_string_lossy().into_owned();
    let mut request = if remote {
        PlayRequest::remote(display)
    } else {
        let content = tokio::fs::read(path).await?;
        PlayRequest::local(display, content)
    };
    if let Some(song) = song {
        request = request.with_song(song);
    }

    let item = PlaylistItem::new(request)?;
    if remote {
        return Ok(item);
    }
    let metadata = tokio::fs::metadata(path).await?;
    let modified = metadata.modified().ok().map(Into::into);
    Ok(item.with_file_info(metadata.len(), modified))
}

/// Log an event; true once playback has stopped
fn report(event: &PlaybackEvent) -> bool {
    match event {
        PlaybackEvent::CurrentItemChanged {
            index,
            item_id: Some(id),
        } => info!(index, item_id = %id, "Now playing"),
        PlaybackEvent::DurationResolved {
            duration_ms,
            subsong_count,
            source,
            ..
        } => info!(duration_ms, subsong_count, source = ?source, "Duration resolved"),
        PlaybackEvent::AutostartPhaseChanged { phase, .. } => info!(phase = ?phase, "Autostart"),
        PlaybackEvent::Error { message } => error!(message = %message, "Playback error"),
        PlaybackEvent::StateChanged { state } => {
            info!(state = ?state, "Playback state");
            return *state == PlaybackState::Stopped;
        }
        _ => {}
    }
    false
}

/// Read memory and print it as a hex dump
pub async fn ram_read(device: &dyn DeviceApi, address: u16, length: u16) -> Result<String> {
    let data = device.read_memory(address, length).await?;
    Ok(hex_dump(address, &data))
}

/// Write memory with the CPU frozen.
///
/// The machine is resumed even when the write fails.
pub async fn ram_write(device: &dyn DeviceApi, address: u16, data: &[u8]) -> Result<()> {
    if usize::from(address) + data.len() > 0x1_0000 {
        return Err(CliError::InvalidArgument(format!(
            "{} bytes at ${address:04X} run past $FFFF",
            data.len()
        )));
    }

    device.pause().await?;
    let written = device.write_memory_block(address, data).await;
    let resumed = device.resume().await;
    written?;
    resumed?;

    info!(address = %format!("${address:04X}"), bytes = data.len(), "Memory written");
    Ok(())
}

pub async fn config_get(device: &dyn DeviceApi, category: &str, item: &str) -> Result<String> {
    Ok(device.get_config_value(category, item).await?)
}

pub async fn config_set(device: &dyn DeviceApi, category: &str, item: &str, value: &str) -> Result<()> {
    device.set_config_value(category, item, value).await?;
    info!(category, item, value, "Config updated");
    Ok(())
}

/// Parse `$0801`, `0x0801` or `0801` (hex)
pub fn parse_address(text: &str) -> Result<u16> {
    let digits = text
        .strip_prefix('$')
        .or_else(|| text.strip_prefix("0x"))
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u16::from_str_radix(digits, 16)
        .map_err(|_| CliError::InvalidArgument(format!("not a 16-bit hex address: {text}")))
}

/// Parse hex bytes, ignoring whitespace (`A9 00 8D 20 D0`)
pub fn parse_hex_bytes(text: &str) -> Result<Vec<u8>> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.is_empty() || digits.len() % 2 != 0 {
        return Err(CliError::InvalidArgument(format!(
            "expected an even number of hex digits: {text}"
        )));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().collect();
            u8::from_str_radix(&byte, 16)
                .map_err(|_| CliError::InvalidArgument(format!("bad hex byte: {byte}")))
        })
        .collect()
}

fn hex_dump(address: u16, data: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in data.chunks(16).enumerate() {
        let offset = address.wrapping_add(u16::try_from(row * 16).unwrap_or(u16::MAX));
        let bytes: Vec<String> = chunk.iter().map(|b| format!("{b:02X}")).collect();
        out.push_str(&format!("${offset:04X}: {}\n", bytes.join(" ")));
    }
    out
}
