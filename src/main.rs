use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber;

use clipforge::{
    config::Config,
    editor::VideoEditor,
    geometry::Rect,
    media::MediaProbe,
    overlay::TextOverlay,
    timeline::MergeStrategy,
};

#[derive(Parser)]
#[command(
    name = "clipforge",
    version,
    about = "Edit short-form video from the command line",
    long_about = "clipforge trims clips, applies pixel effects, burns in fading text overlays, swaps audio tracks, and merges multiple clips into a single MP4 output."
)]
struct Cli {
    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Trim a clip to a [start, end) window
    Trim {
        input: PathBuf,

        /// Trim start in seconds
        #[arg(short, long)]
        start: f64,

        /// Trim end in seconds
        #[arg(short, long)]
        end: f64,
    },

    /// Apply a named pixel effect to a clip
    Effect {
        input: PathBuf,

        /// Effect name (see `clipforge effects`)
        #[arg(short, long)]
        name: String,
    },

    /// Burn a fading text overlay into one or more clips merged serially
    Text {
        /// Input clips, merged in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Overlay text
        #[arg(short, long)]
        text: String,

        /// Font size in display units
        #[arg(long, default_value_t = 40.0)]
        font_size: f64,

        /// Time the text fades in, in seconds
        #[arg(long, default_value_t = 0.0)]
        show: f64,

        /// Time the text fades out, in seconds (0 keeps it visible)
        #[arg(long, default_value_t = 0.0)]
        hide: f64,

        /// Overlay rectangle in display units: x y width height
        #[arg(long, num_args = 4, value_names = ["X", "Y", "W", "H"])]
        frame: Option<Vec<f64>>,
    },

    /// Replace a clip's audio with a separate audio file
    MergeAudio {
        video: PathBuf,
        audio: PathBuf,
    },

    /// Merge clips into one output
    Merge {
        /// Input clips, merged in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Overlap clips picture-in-picture instead of placing them
        /// back-to-back
        #[arg(long)]
        simultaneous: bool,

        /// Fade clips instead of hard-cutting between them
        #[arg(long)]
        animation: bool,
    },

    /// List the available pixel effects
    Effects,

    /// Delete everything in the shared temp directory
    Cleanup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    info!("Starting clipforge v{}", env!("CARGO_PKG_VERSION"));

    let config = match cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(&config_path)?
        }
        None => Config::default(),
    };
    config.validate()?;

    let editor = VideoEditor::new(config);

    match cli.command {
        Command::Trim { input, start, end } => {
            let source = MediaProbe::probe(&input)?;
            let output = editor.trim(&source, start, end).await?;
            println!("{}", output.display());
        }

        Command::Effect { input, name } => {
            let source = MediaProbe::probe(&input)?;
            let output = editor.apply_effect(&source, &name).await?;
            println!("{}", output.display());
        }

        Command::Text {
            inputs,
            text,
            font_size,
            show,
            hide,
            frame,
        } => {
            let sources = probe_all(&inputs)?;
            let frame = frame
                .map(|f| Rect::new(f[0], f[1], f[2], f[3]))
                .unwrap_or(Rect::new(0.0, 0.0, 390.0, 150.0));

            let overlay = TextOverlay {
                text,
                font_size,
                color: [0, 255, 0],
                frame,
                show_time: show,
                hide_time: hide,
            };
            let output = editor.add_text(&sources, &[overlay]).await?;
            println!("{}", output.display());
        }

        Command::MergeAudio { video, audio } => {
            let video_source = MediaProbe::probe(&video)?;
            let audio_source = MediaProbe::probe_audio(&audio)?;
            let output = editor.merge_audio(&video_source, &audio_source).await?;
            println!("{}", output.display());
        }

        Command::Merge {
            inputs,
            simultaneous,
            animation,
        } => {
            let sources = probe_all(&inputs)?;
            let strategy = if simultaneous {
                MergeStrategy::Simultaneous
            } else {
                MergeStrategy::Serial
            };
            let output = editor.merge(&sources, strategy, animation).await?;
            println!("{}", output.display());
        }

        Command::Effects => {
            for name in editor.effects().available_effects() {
                println!("{}", name);
            }
        }

        Command::Cleanup => {
            editor.cleanup_temp()?;
            info!("Temp directory swept");
        }
    }

    Ok(())
}

/// Probe every input, dropping the ones that cannot be read.
fn probe_all(inputs: &[PathBuf]) -> Result<Vec<clipforge::media::MediaSource>> {
    let mut sources = Vec::with_capacity(inputs.len());
    for input in inputs {
        match MediaProbe::probe(input) {
            Ok(source) => sources.push(source),
            Err(e) => tracing::warn!("Skipping {:?}: {}", input, e),
        }
    }

    if sources.is_empty() {
        anyhow::bail!("none of the inputs could be read");
    }
    Ok(sources)
}
