use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use camdemo_client::formats::extension;
use camdemo_client::{CameraClient, CaptureSummary, FrameSummary};
use camdemo_core::RouteKind;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about = "Grab frames from the ESP32 camera demo", long_about = None)]
struct Args {
    /// ESP32 server URL (e.g., http://192.168.1.100)
    #[arg(short, long)]
    server: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Print a JSON summary of the captured frames to stdout
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download a single image
    Snapshot {
        #[arg(value_enum)]
        format: SnapshotFormat,

        /// Output file (defaults to capture.<ext>)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Save frames from a multipart stream
    Stream {
        #[arg(value_enum)]
        format: StreamFormat,

        /// Stop after this many frames
        #[arg(short, long, default_value_t = 10)]
        frames: usize,

        /// Directory for frame_<n>.<ext> files
        #[arg(short, long, default_value = "frames")]
        out_dir: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SnapshotFormat {
    Pgm,
    Bmp,
    Jpg,
}

impl SnapshotFormat {
    fn route(self) -> RouteKind {
        match self {
            SnapshotFormat::Pgm => RouteKind::Pgm,
            SnapshotFormat::Bmp => RouteKind::Bmp,
            SnapshotFormat::Jpg => RouteKind::Jpg,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StreamFormat {
    Bmp,
    Jpg,
}

impl StreamFormat {
    fn route(self) -> RouteKind {
        match self {
            StreamFormat::Bmp => RouteKind::BmpStream,
            StreamFormat::Jpg => RouteKind::JpgStream,
        }
    }
}

async fn snapshot(client: &CameraClient, kind: RouteKind, out: Option<PathBuf>) -> Result<CaptureSummary> {
    let (bytes, info) = client.snapshot(kind).await?;

    let path = out.unwrap_or_else(|| PathBuf::from(format!("capture.{}", extension(kind))));
    fs::write(&path, &bytes).with_context(|| format!("writing {}", path.display()))?;
    log::info!("Saved {}", path.display());

    Ok(CaptureSummary {
        route: kind,
        frames: vec![FrameSummary {
            index: 0,
            path: path.display().to_string(),
            info,
        }],
    })
}

async fn stream(client: &CameraClient, kind: RouteKind, frames: usize, out_dir: PathBuf) -> Result<CaptureSummary> {
    fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let mut saved = Vec::new();
    client
        .stream(kind, frames, |index, part, info| {
            let path = out_dir.join(format!("frame_{}.{}", index, extension(kind)));
            fs::write(&path, &part.data).with_context(|| format!("writing {}", path.display()))?;
            log::info!("Frame {}: {} bytes -> {}", index, part.data.len(), path.display());

            saved.push(FrameSummary {
                index,
                path: path.display().to_string(),
                info,
            });
            Ok(())
        })
        .await?;

    Ok(CaptureSummary {
        route: kind,
        frames: saved,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.debug {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    log::info!("Server: {}", args.server);

    let client = CameraClient::new(&args.server).context("Failed to initialize client")?;

    let summary = match args.command {
        Command::Snapshot { format, out } => snapshot(&client, format.route(), out).await?,
        Command::Stream {
            format,
            frames,
            out_dir,
        } => stream(&client, format.route(), frames, out_dir).await?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}
