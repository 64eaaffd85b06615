// SPDX-License-Identifier: GPL-3.0-only

//! Orientation conventions of the depth path
//!
//! Two separate tables convert the video orientation: one to tag the model
//! input, one to tag the visualization for display. They are deliberately not
//! the same (Portrait is `Right` on the way in and `Left` on the way out), so
//! each is its own exhaustive match rather than one derived from the other.

use image::{RgbaImage, imageops};

use crate::orientation::Orientation;

/// EXIF-style image orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageOrientation {
    Up,
    Down,
    Left,
    Right,
}

impl ImageOrientation {
    /// Transform an image tagged with this orientation into upright pixels
    ///
    /// `Right` means the stored image must turn 90 degrees clockwise to be
    /// upright, `Left` 90 degrees counter-clockwise.
    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        match self {
            ImageOrientation::Up => image.clone(),
            ImageOrientation::Down => imageops::rotate180(image),
            ImageOrientation::Left => imageops::rotate270(image),
            ImageOrientation::Right => imageops::rotate90(image),
        }
    }

    /// Whether applying this orientation swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, ImageOrientation::Left | ImageOrientation::Right)
    }
}

/// Orientation the model input is tagged with
pub fn model_input_orientation(orientation: Orientation) -> ImageOrientation {
    match orientation {
        Orientation::Portrait => ImageOrientation::Right,
        Orientation::PortraitUpsideDown => ImageOrientation::Left,
        Orientation::LandscapeLeft => ImageOrientation::Down,
        Orientation::LandscapeRight => ImageOrientation::Up,
    }
}

/// Orientation the depth visualization is displayed with
pub fn display_orientation(orientation: Orientation) -> ImageOrientation {
    match orientation {
        Orientation::Portrait => ImageOrientation::Left,
        Orientation::PortraitUpsideDown => ImageOrientation::Right,
        Orientation::LandscapeLeft => ImageOrientation::Down,
        Orientation::LandscapeRight => ImageOrientation::Up,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_table() {
        assert_eq!(model_input_orientation(Orientation::Portrait), ImageOrientation::Right);
        assert_eq!(
            model_input_orientation(Orientation::PortraitUpsideDown),
            ImageOrientation::Left
        );
        assert_eq!(
            model_input_orientation(Orientation::LandscapeLeft),
            ImageOrientation::Down
        );
        assert_eq!(
            model_input_orientation(Orientation::LandscapeRight),
            ImageOrientation::Up
        );
    }

    #[test]
    fn test_display_table() {
        assert_eq!(display_orientation(Orientation::Portrait), ImageOrientation::Left);
        assert_eq!(
            display_orientation(Orientation::PortraitUpsideDown),
            ImageOrientation::Right
        );
        assert_eq!(display_orientation(Orientation::LandscapeLeft), ImageOrientation::Down);
        assert_eq!(display_orientation(Orientation::LandscapeRight), ImageOrientation::Up);
    }

    #[test]
    fn test_tables_differ_for_portrait_only() {
        for orientation in Orientation::ALL {
            let same = model_input_orientation(orientation) == display_orientation(orientation);
            assert_eq!(same, orientation.is_landscape(), "{:?}", orientation);
        }
    }

    #[test]
    fn test_pixel_transforms() {
        let mut image = RgbaImage::new(3, 2);
        image.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));

        let right = ImageOrientation::Right.apply(&image);
        assert_eq!(right.dimensions(), (2, 3));
        // Clockwise turn moves the top-left corner to the top-right
        assert_eq!(right.get_pixel(1, 0)[0], 255);

        let left = ImageOrientation::Left.apply(&image);
        assert_eq!(left.get_pixel(0, 2)[0], 255);

        let down = ImageOrientation::Down.apply(&image);
        assert_eq!(down.get_pixel(2, 1)[0], 255);

        assert_eq!(ImageOrientation::Up.apply(&image), image);
        assert!(ImageOrientation::Right.swaps_dimensions());
        assert!(!ImageOrientation::Down.swaps_dimensions());
    }
}
