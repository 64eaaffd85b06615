// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use retrocam::{FilterVariant, Orientation};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "retrocam")]
#[command(about = "Real-time retro camera filters")]
#[command(version = retrocam::constants::app_info::version())]
struct Cli {
    /// Config file (default: ~/.config/retrocam/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available filters
    Filters,

    /// Apply a filter to an image
    Apply {
        /// Input image
        #[arg(short, long)]
        input: PathBuf,

        /// Filter id (see 'retrocam filters')
        #[arg(short, long, default_value = "eight-bit")]
        filter: FilterVariant,

        /// Output image path
        #[arg(short, long)]
        output: PathBuf,

        /// Run the kernels on the CPU
        #[arg(long)]
        cpu: bool,

        /// Seconds since pipeline start, drives animated stages
        #[arg(short, long, default_value = "0")]
        time: f32,
    },

    /// Estimate depth for an image
    Depth {
        /// Input image
        #[arg(short, long)]
        input: PathBuf,

        /// Output image path
        #[arg(short, long)]
        output: PathBuf,

        /// ONNX model (default: ~/.local/share/retrocam/models/)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Orientation the image was captured in
        #[arg(long, default_value = "landscape-right")]
        orientation: Orientation,
    },

    /// Replay images through the live pipeline
    Preview {
        /// Image file or directory of images
        #[arg(short, long)]
        input: PathBuf,

        /// Filter id (default: from config)
        #[arg(short, long)]
        filter: Option<FilterVariant>,

        /// Source frame rate
        #[arg(long, default_value = "30")]
        fps: u32,

        /// Largest random delay added between frames, in milliseconds
        #[arg(long, default_value = "0")]
        jitter_ms: u64,

        /// Stop after this many seconds
        #[arg(short, long, default_value = "10")]
        seconds: u64,

        /// Run the kernels on the CPU
        #[arg(long)]
        cpu: bool,

        /// Save the last processed frame as a photo
        #[arg(long)]
        capture: bool,

        /// Screen size used for the capture crop, as WIDTHxHEIGHT
        #[arg(long, default_value = "1080x1920")]
        screen: String,

        /// Device orientation
        #[arg(long, default_value = "portrait")]
        orientation: Orientation,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control log level, e.g. RUST_LOG=retrocam=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = cli::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Filters => cli::list_filters(),
        Commands::Apply {
            input,
            filter,
            output,
            cpu,
            time,
        } => cli::apply_filter(&config, &input, filter, &output, cpu, time),
        Commands::Depth {
            input,
            output,
            model,
            orientation,
        } => cli::estimate_depth(&config, &input, &output, model, orientation),
        Commands::Preview {
            input,
            filter,
            fps,
            jitter_ms,
            seconds,
            cpu,
            capture,
            screen,
            orientation,
        } => cli::run_preview(
            &config,
            cli::PreviewArgs {
                input,
                filter,
                fps,
                jitter_ms,
                seconds,
                cpu,
                capture,
                screen,
                orientation,
            },
        ),
    }
}
