// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the render pipeline, orientation tables and capture crop

use retrocam::config::{Config, RenderBackendKind};
use retrocam::depth::{ImageOrientation, display_orientation, model_input_orientation};
use retrocam::errors::RenderError;
use retrocam::pipelines::photo::{crop_rect, crop_to_aspect};
use retrocam::shaders::composition::plan;
use retrocam::shaders::cpu_kernels::run_kernel;
use retrocam::shaders::{
    CpuKernelBackend, Kernel, KernelLibrary, RenderPipeline, StageParams, build_renderer,
};
use retrocam::{CameraFrame, FilterVariant, Orientation, ShaderConfig};
use std::time::Duration;

/// Gradient with some structure in every channel
fn test_frame(width: u32, height: u32) -> CameraFrame {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[
                (x * 255 / width) as u8,
                (y * 255 / height) as u8,
                ((x + y) * 7 % 256) as u8,
                255,
            ]);
        }
    }
    CameraFrame::from_rgba(width, height, data).unwrap()
}

fn cpu_pipeline() -> RenderPipeline {
    RenderPipeline::from_backend(Box::new(CpuKernelBackend))
}

#[test]
fn test_eight_bit_without_glitch_is_fixed_chain() {
    let config = ShaderConfig {
        glitch_enabled: false,
        ..ShaderConfig::default()
    };
    let frame = test_frame(40, 24);
    let elapsed = Duration::from_millis(2500);

    let rendered = cpu_pipeline()
        .render_frame(&frame, FilterVariant::EightBit, &config, elapsed)
        .unwrap();

    let (w, h) = (frame.width, frame.height);
    let pixellated = run_kernel(
        Kernel::Pixellate,
        &StageParams {
            pixel_size: config.pixel_size,
            ..StageParams::plain()
        }
        .to_kernel_params(w, h),
        &frame.data,
    );
    let scanned = run_kernel(
        Kernel::CrtScreen,
        &StageParams {
            time: 2.5,
            scanline_intensity: config.scanline_intensity,
            scanline_frequency: config.scanline_frequency,
            ..StageParams::plain()
        }
        .to_kernel_params(w, h),
        &pixellated,
    );
    let glitched = run_kernel(
        Kernel::Glitch,
        &StageParams::plain().to_kernel_params(w, h),
        &scanned,
    );

    // Glitch at time zero changes nothing
    assert_eq!(glitched, scanned);
    assert_eq!(&rendered.data[..], &glitched[..]);
}

#[test]
fn test_disabled_glitch_is_deterministic() {
    let config = ShaderConfig {
        glitch_enabled: false,
        ..ShaderConfig::default()
    };
    let frame = test_frame(32, 32);
    let pipeline = cpu_pipeline();
    let elapsed = Duration::from_secs(3);

    let a = pipeline
        .render_frame(&frame, FilterVariant::EightBit, &config, elapsed)
        .unwrap();
    let b = pipeline
        .render_frame(&frame, FilterVariant::EightBit, &config, elapsed)
        .unwrap();
    assert_eq!(a.data, b.data);

    let stages = plan(FilterVariant::EightBit, &config, 3.0).unwrap();
    let kernels: Vec<Kernel> = stages.iter().map(|(k, _)| *k).collect();
    assert_eq!(kernels, vec![Kernel::Pixellate, Kernel::CrtScreen, Kernel::Glitch]);
    assert_eq!(stages[2].1.time, 0.0);
}

#[test]
fn test_single_pass_filters_keep_size() {
    let frame = test_frame(17, 9);
    let pipeline = cpu_pipeline();
    for variant in FilterVariant::ALL
        .into_iter()
        .filter(|v| !v.uses_depth_path())
    {
        let out = pipeline
            .render_frame(&frame, variant, &ShaderConfig::default(), Duration::ZERO)
            .unwrap();
        assert_eq!((out.width, out.height), (17, 9), "{} changed size", variant);
    }
}

#[test]
fn test_passthrough_returns_input() {
    let frame = test_frame(8, 8);
    let out = cpu_pipeline()
        .render_frame(
            &frame,
            FilterVariant::Passthrough,
            &ShaderConfig::default(),
            Duration::from_secs(1),
        )
        .unwrap();
    assert_eq!(out.data, frame.data);
}

#[test]
fn test_missing_kernel_fails_library() {
    let bodies = Kernel::ALL
        .iter()
        .filter(|k| **k != Kernel::CrtScreen)
        .map(|k| (*k, k.embedded_body().to_string()));

    match KernelLibrary::from_bodies(bodies) {
        Err(RenderError::MissingKernel(name)) => assert_eq!(name, "crt_screen"),
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("library should not build without every kernel"),
    }
}

#[tokio::test]
async fn test_broken_kernel_means_no_renderer() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pixellate.wgsl"), "@compute fn main( {").unwrap();

    let config = Config {
        render_backend: RenderBackendKind::Cpu,
        kernel_dir: Some(dir.path().to_path_buf()),
        ..Config::default()
    };
    assert!(build_renderer(&config).await.is_none());

    let healthy = Config {
        render_backend: RenderBackendKind::Cpu,
        ..Config::default()
    };
    assert!(build_renderer(&healthy).await.is_some());
}

#[test]
fn test_orientation_tables_are_independent() {
    assert_eq!(
        model_input_orientation(Orientation::Portrait),
        ImageOrientation::Right
    );
    assert_eq!(display_orientation(Orientation::Portrait), ImageOrientation::Left);
    assert_eq!(
        model_input_orientation(Orientation::PortraitUpsideDown),
        ImageOrientation::Left
    );
    assert_eq!(
        display_orientation(Orientation::PortraitUpsideDown),
        ImageOrientation::Right
    );
    for orientation in [Orientation::LandscapeLeft, Orientation::LandscapeRight] {
        assert_eq!(
            model_input_orientation(orientation),
            display_orientation(orientation)
        );
    }
}

#[test]
fn test_crop_wide_frame_for_tall_screen() {
    let (x, y, w, h) = crop_rect(1920, 1080, 9.0 / 16.0).unwrap();
    assert_eq!((y, h), (0, 1080));
    assert_eq!(w, 608);
    assert_eq!(x, (1920 - 608) / 2);

    let image = image::RgbaImage::new(1920, 1080);
    let cropped = crop_to_aspect(&image, 9.0 / 16.0).unwrap();
    assert_eq!(cropped.dimensions(), (608, 1080));
}

#[test]
fn test_crop_margins_equal_for_common_sizes() {
    for (width, height) in [(1280, 720), (3840, 2160), (160, 90), (1920, 1080)] {
        let (x, y, w, h) = crop_rect(width, height, 9.0 / 16.0).unwrap();
        assert_eq!((y, h), (0, height));
        assert_eq!(x, width - x - w, "{}x{}", width, height);
        let ideal = height as f64 * 9.0 / 16.0;
        assert!((w as f64 - ideal).abs() <= 1.0, "{}x{} -> {}", width, height, w);
    }
}
