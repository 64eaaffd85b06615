// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! - Listing filters
//! - Filtering a single image
//! - Depth estimation for a single image
//! - Replaying images through the live pipeline

use retrocam::backends::camera::{FrameSource, scheduler_callback};
use retrocam::backends::virtual_camera::{FileFrameSource, FileSourceOptions, load_image_as_frame};
use retrocam::config::{Config, RenderBackendKind};
use retrocam::depth::DepthEstimator;
use retrocam::pipelines::photo::{PhotoCapture, screen_aspect};
use retrocam::shaders::{RenderPipeline, build_renderer};
use retrocam::{
    CameraFrame, FilterVariant, FrameScheduler, Orientation, OrientationState, SchedulerOptions,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Longest wait for the depth model to load
const MODEL_LOAD_TIMEOUT: Duration = Duration::from_secs(60);

pub struct PreviewArgs {
    pub input: PathBuf,
    pub filter: Option<FilterVariant>,
    pub fps: u32,
    pub jitter_ms: u64,
    pub seconds: u64,
    pub cpu: bool,
    pub capture: bool,
    pub screen: String,
    pub orientation: Orientation,
}

pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

/// List all filters
pub fn list_filters() -> CliResult {
    println!("Available filters:");
    println!();
    for variant in FilterVariant::ALL {
        let path = if variant.uses_depth_path() {
            "depth model"
        } else {
            "compute kernels"
        };
        println!("  {:<10} {:<10} ({})", variant.id(), variant.display_name(), path);
    }
    Ok(())
}

/// Apply one filter to one image
pub fn apply_filter(
    config: &Config,
    input: &Path,
    filter: FilterVariant,
    output: &Path,
    cpu: bool,
    time: f32,
) -> CliResult {
    if filter.uses_depth_path() {
        return Err("the depth filter runs through 'retrocam depth'".into());
    }

    let frame = load_image_as_frame(input)?;
    let kind = backend_kind(config, cpu);

    let rt = tokio::runtime::Runtime::new()?;
    let pipeline = rt.block_on(RenderPipeline::new(kind, config.kernel_dir.as_deref()))?;
    println!("Backend: {}", pipeline.backend_name());

    let started = Instant::now();
    let rendered = pipeline.render_frame(
        &frame,
        filter,
        &config.shader,
        Duration::from_secs_f32(time.max(0.0)),
    )?;
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "Filter applied");

    save_frame(&rendered, output)?;
    println!("{} applied: {}", filter, output.display());
    Ok(())
}

/// Run depth estimation on one image
pub fn estimate_depth(
    config: &Config,
    input: &Path,
    output: &Path,
    model: Option<PathBuf>,
    orientation: Orientation,
) -> CliResult {
    let frame = load_image_as_frame(input)?;

    let mut depth_config = config.depth.clone();
    if model.is_some() {
        depth_config.model_path = model;
    }

    println!("Loading depth model...");
    let estimator = DepthEstimator::from_config(&depth_config);
    let start = Instant::now();
    while !estimator.is_ready() {
        if estimator.has_failed() {
            return Err("depth model failed to load (see log)".into());
        }
        if start.elapsed() > MODEL_LOAD_TIMEOUT {
            return Err("timed out waiting for the depth model".into());
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    let depth = estimator.process_frame_blocking(&frame, orientation)?;
    save_frame(&depth, output)?;
    println!("Depth map saved: {}", output.display());
    Ok(())
}

/// Replay images through the scheduler until time runs out or Ctrl+C
pub fn run_preview(config: &Config, args: PreviewArgs) -> CliResult {
    let filter = args.filter.unwrap_or(config.default_filter);
    let screen = parse_screen(&args.screen)?;

    let mut config = config.clone();
    config.render_backend = backend_kind(&config, args.cpu);

    let mut source = FileFrameSource::open(
        &args.input,
        FileSourceOptions {
            fps: args.fps,
            jitter: Duration::from_millis(args.jitter_ms),
            ..FileSourceOptions::default()
        },
    )?;

    let rt = tokio::runtime::Runtime::new()?;
    let orientation = OrientationState::new(args.orientation);

    let handle = rt.block_on(async {
        let renderer = build_renderer(&config).await;
        let depth = filter
            .uses_depth_path()
            .then(|| DepthEstimator::from_config(&config.depth));
        FrameScheduler::spawn(SchedulerOptions {
            renderer,
            depth,
            orientation: orientation.clone(),
            filter,
            config: config.shader,
        })
    });

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    println!("Previewing {} with {} (press Ctrl+C to stop early)", source.name(), filter);
    source.start(scheduler_callback(handle.clone()))?;

    let start = Instant::now();
    let target = Duration::from_secs(args.seconds);
    while start.elapsed() < target && source.is_running() {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Stopping early...");
            break;
        }

        let stats = handle.stats();
        print!(
            "\rReceived {:>5}  published {:>5}  dropped {:>5}",
            stats.received,
            stats.published,
            stats.dropped_busy + stats.dropped_overflow + stats.superseded
        );
        std::io::Write::flush(&mut std::io::stdout())?;

        std::thread::sleep(Duration::from_millis(100));
    }
    println!();

    source.stop();
    rt.block_on(handle.shutdown());

    let stats = handle.stats();
    let secs = start.elapsed().as_secs_f64().max(f64::EPSILON);
    println!(
        "Published {} of {} frames ({:.1} fps), {} failed",
        stats.published,
        stats.received,
        stats.published as f64 / secs,
        stats.failed
    );

    if args.capture {
        let aspect = screen_aspect(orientation.current(), screen.0, screen.1);
        let capture = PhotoCapture::from_config(&config.photo);
        match rt.block_on(capture.capture(handle.latest(), aspect)) {
            Some(path) => println!("Photo saved: {}", path.display()),
            None => println!("No photo captured"),
        }
    }

    Ok(())
}

fn backend_kind(config: &Config, cpu: bool) -> RenderBackendKind {
    if cpu {
        RenderBackendKind::Cpu
    } else {
        config.render_backend
    }
}

fn save_frame(frame: &CameraFrame, output: &Path) -> CliResult {
    let image = frame
        .to_image()
        .ok_or("processed frame does not match its size")?;
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    image.save(output)?;
    Ok(())
}

/// Parse `WIDTHxHEIGHT`
fn parse_screen(screen: &str) -> Result<(u32, u32), Box<dyn std::error::Error>> {
    let (w, h) = screen
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("screen size '{}' is not WIDTHxHEIGHT", screen))?;
    let (w, h): (u32, u32) = (w.trim().parse()?, h.trim().parse()?);
    if w == 0 || h == 0 {
        return Err(format!("screen size '{}' has a zero side", screen).into());
    }
    Ok((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_screen() {
        assert_eq!(parse_screen("1080x1920").unwrap(), (1080, 1920));
        assert_eq!(parse_screen("640X480").unwrap(), (640, 480));
        assert!(parse_screen("1080").is_err());
        assert!(parse_screen("0x10").is_err());
    }
}
