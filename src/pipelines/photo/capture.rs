// SPDX-License-Identifier: GPL-3.0-only

//! Aspect-ratio crop for captured photos
//!
//! The preview shows the frame scaled to fill the screen, so a photo is cut
//! down to what was visible: the longer dimension is center-cropped until the
//! image matches the screen's aspect ratio.

use image::{RgbaImage, imageops};
use tracing::debug;

use crate::errors::PhotoError;
use crate::orientation::Orientation;

/// Width over height of the screen as the user holds it
pub fn screen_aspect(orientation: Orientation, screen_width: u32, screen_height: u32) -> f64 {
    let long = screen_width.max(screen_height) as f64;
    let short = screen_width.min(screen_height).max(1) as f64;
    if orientation.is_landscape() {
        long / short
    } else {
        short / long.max(1.0)
    }
}

/// Offset and length of a centered span, nudged so both margins are equal
fn centered_span(full: u32, ideal: f64) -> (u32, u32) {
    let mut len = (ideal.round() as u32).clamp(1, full);
    if (full - len) % 2 == 1 {
        len = if len > 1 { len - 1 } else { len + 1 };
    }
    ((full - len) / 2, len)
}

/// Crop window `(x, y, width, height)` for a center crop to `target_aspect`
pub fn crop_rect(width: u32, height: u32, target_aspect: f64) -> Option<(u32, u32, u32, u32)> {
    if width == 0 || height == 0 || !target_aspect.is_finite() || target_aspect <= 0.0 {
        return None;
    }

    let aspect = width as f64 / height as f64;
    let rect = if aspect > target_aspect {
        let (x, new_width) = centered_span(width, height as f64 * target_aspect);
        (x, 0, new_width, height)
    } else {
        let (y, new_height) = centered_span(height, width as f64 / target_aspect);
        (0, y, width, new_height)
    };
    Some(rect)
}

/// Center-crop an image to `target_aspect`
pub fn crop_to_aspect(image: &RgbaImage, target_aspect: f64) -> Result<RgbaImage, PhotoError> {
    let (width, height) = image.dimensions();
    let (x, y, w, h) = crop_rect(width, height, target_aspect).ok_or_else(|| {
        PhotoError::CaptureFailed(format!(
            "cannot crop {}x{} to aspect {}",
            width, height, target_aspect
        ))
    })?;

    if (w, h) == (width, height) {
        return Ok(image.clone());
    }

    debug!(x, y, w, h, "Cropping photo to screen aspect");
    Ok(imageops::crop_imm(image, x, y, w, h).to_image())
}
