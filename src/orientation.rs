// SPDX-License-Identifier: GPL-3.0-only

//! Device orientation as an observable current value
//!
//! The orientation is owned by whatever senses device rotation and read by the
//! depth path (to upright the model input) and by photo capture (to pick the
//! crop aspect).

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Video orientation of the frame stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::Portrait,
        Orientation::PortraitUpsideDown,
        Orientation::LandscapeLeft,
        Orientation::LandscapeRight,
    ];

    pub fn is_landscape(&self) -> bool {
        matches!(self, Orientation::LandscapeLeft | Orientation::LandscapeRight)
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "portrait-upside-down" | "upside-down" => Ok(Orientation::PortraitUpsideDown),
            "landscape-left" => Ok(Orientation::LandscapeLeft),
            "landscape-right" => Ok(Orientation::LandscapeRight),
            other => Err(format!("unknown orientation '{}'", other)),
        }
    }
}

/// Raw reading from a device motion sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceOrientation {
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    FaceUp,
    FaceDown,
    Unknown,
}

impl DeviceOrientation {
    /// Video orientation for a device reading
    ///
    /// Landscape is mirrored: rotating the device left turns the sensor image
    /// right. Flat and unknown readings carry no rotation and return `None`.
    pub fn to_video_orientation(self) -> Option<Orientation> {
        match self {
            DeviceOrientation::Portrait => Some(Orientation::Portrait),
            DeviceOrientation::PortraitUpsideDown => Some(Orientation::PortraitUpsideDown),
            DeviceOrientation::LandscapeLeft => Some(Orientation::LandscapeRight),
            DeviceOrientation::LandscapeRight => Some(Orientation::LandscapeLeft),
            DeviceOrientation::FaceUp | DeviceOrientation::FaceDown | DeviceOrientation::Unknown => {
                None
            }
        }
    }
}

/// Current-value cell holding the prevailing orientation
#[derive(Debug, Clone)]
pub struct OrientationState {
    sender: Arc<watch::Sender<Orientation>>,
}

impl OrientationState {
    pub fn new(initial: Orientation) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn current(&self) -> Orientation {
        *self.sender.borrow()
    }

    pub fn set(&self, orientation: Orientation) {
        let changed = self.sender.send_if_modified(|current| {
            if *current == orientation {
                false
            } else {
                *current = orientation;
                true
            }
        });
        if changed {
            debug!(?orientation, "Orientation changed");
        }
    }

    /// Apply a sensor reading, ignoring readings without a rotation
    pub fn update_from_device(&self, reading: DeviceOrientation) {
        if let Some(orientation) = reading.to_video_orientation() {
            self.set(orientation);
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Orientation> {
        self.sender.subscribe()
    }
}

impl Default for OrientationState {
    fn default() -> Self {
        Self::new(Orientation::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_landscape_is_mirrored() {
        assert_eq!(
            DeviceOrientation::LandscapeLeft.to_video_orientation(),
            Some(Orientation::LandscapeRight)
        );
        assert_eq!(
            DeviceOrientation::LandscapeRight.to_video_orientation(),
            Some(Orientation::LandscapeLeft)
        );
    }

    #[test]
    fn test_flat_readings_are_ignored() {
        let state = OrientationState::new(Orientation::LandscapeLeft);
        state.update_from_device(DeviceOrientation::FaceUp);
        state.update_from_device(DeviceOrientation::Unknown);
        assert_eq!(state.current(), Orientation::LandscapeLeft);
    }

    #[tokio::test]
    async fn test_subscribers_observe_changes() {
        let state = OrientationState::default();
        let mut rx = state.subscribe();
        state.set(Orientation::PortraitUpsideDown);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Orientation::PortraitUpsideDown);
    }
}
