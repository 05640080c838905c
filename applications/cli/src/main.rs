/// C64 Player - play files and poke at an Ultimate 64 / C64U from the shell
use c64_core::Drive;
use c64_device_client::C64DeviceClient;
use c64_player::commands::{self, PlayArgs};
use c64_player::AppConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "c64-player")]
#[command(about = "Play SID, MOD, PRG, CRT and disk images on an Ultimate 64 / C64U", long_about = None)]
struct Cli {
    /// Configuration file path (default: ./c64-player.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add files to the playlist and play them
    Play(PlayCommand),
    /// Read and hex-dump device memory
    RamRead {
        /// Start address in hex ($0801, 0x0801 or 0801)
        address: String,
        /// Number of bytes
        #[arg(short, long, default_value_t = 256)]
        length: u16,
    },
    /// Write bytes to device memory with the CPU paused
    RamWrite {
        /// Start address in hex
        address: String,
        /// Bytes in hex ("A9 00 8D 20 D0")
        #[arg(conflicts_with = "file", required_unless_present = "file")]
        data: Option<String>,
        /// Write the contents of a file instead
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Print a device config value
    ConfigGet {
        /// Config category ("Audio Mixer")
        category: String,
        /// Item within the category ("Vol UltiSid 1")
        item: String,
    },
    /// Change a device config value
    ConfigSet {
        category: String,
        item: String,
        value: String,
    },
}

#[derive(Args)]
struct PlayCommand {
    /// Files to play, in order
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Files are paths on the device's storage
    #[arg(long)]
    remote: bool,
    /// Subsong to start (SID)
    #[arg(short, long)]
    song: Option<u16>,
    /// Drive to mount disk images on (a or b)
    #[arg(short, long, default_value = "a")]
    drive: Drive,
    /// Load programs and disks without running them
    #[arg(long)]
    load_only: bool,
    /// Mount disk images without rebooting the machine
    #[arg(long)]
    no_reboot: bool,
    /// Shuffle the playlist
    #[arg(long)]
    shuffle: bool,
    /// Start over after the last item
    #[arg(long)]
    repeat: bool,
    /// Boot disks by writing a loader into RAM instead of typing LOAD
    #[arg(long)]
    dma: bool,
}

impl From<PlayCommand> for PlayArgs {
    fn from(cmd: PlayCommand) -> Self {
        Self {
            files: cmd.files,
            remote: cmd.remote,
            song: cmd.song,
            drive: cmd.drive,
            load_only: cmd.load_only,
            no_reboot: cmd.no_reboot,
            shuffle: cmd.shuffle,
            repeat: cmd.repeat,
            dma: cmd.dma,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "c64_player=info,c64_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    config.validate()?;
    tracing::debug!(url = %config.device.url, device_id = %config.device.id, "Configuration loaded");

    match cli.command {
        Commands::Play(cmd) => {
            commands::play(&config, cmd.into()).await?;
        }
        Commands::RamRead { address, length } => {
            let client = C64DeviceClient::new(config.device_config())?;
            let address = commands::parse_address(&address)?;
            print!("{}", commands::ram_read(&client, address, length).await?);
        }
        Commands::RamWrite {
            address,
            data,
            file,
        } => {
            let client = C64DeviceClient::new(config.device_config())?;
            let address = commands::parse_address(&address)?;
            let bytes = match (data, file) {
                (_, Some(path)) => tokio::fs::read(path).await?,
                (Some(hex), None) => commands::parse_hex_bytes(&hex)?,
                (None, None) => anyhow::bail!("nothing to write"),
            };
            commands::ram_write(&client, address, &bytes).await?;
        }
        Commands::ConfigGet { category, item } => {
            let client = C64DeviceClient::new(config.device_config())?;
            println!("{}", commands::config_get(&client, &category, &item).await?);
        }
        Commands::ConfigSet {
            category,
            item,
            value,
        } => {
            let client = C64DeviceClient::new(config.device_config())?;
            commands::config_set(&client, &category, &item, &value).await?;
        }
    }

    Ok(())
}
