//! YAML configuration.
//!
//! ```yaml
//! origin:
//!   position: { latitude: 52.4993, longitude: 13.4215, altitude: 38.0 }
//!   heading: 0.0
//!   pitch: 90.0
//! translation_factor: 1000.0
//! plane_color: [255, 255, 0, 100]
//! replay:
//!   playback_rate: 1.0
//! ```
//!
//! Every field is optional.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::origin::{OriginCamera, TranslationFactor};
use crate::positioning::FixedPosition;
use crate::scene::{ScenePreset, find_preset};
use crate::system::events::DEFAULT_EVENT_CAPACITY;
use crate::tracking::FieldOfView;
use crate::viz::OverlayColor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Intrinsics reported by the replayed session.
    pub field_of_view: FieldOfView,
    /// `1.0` is real time, `0.0` as fast as possible.
    pub playback_rate: f64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            field_of_view: FieldOfView::default(),
            playback_rate: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArConfig {
    pub origin: OriginCamera,
    pub translation_factor: TranslationFactor,
    /// Built-in scene preset; overrides `origin` and `translation_factor`.
    pub scene: Option<String>,
    /// Drop poses while the source reports degraded tracking.
    pub mask_interrupted_poses: bool,
    pub event_capacity: usize,
    pub plane_color: Option<OverlayColor>,
    pub point_cloud_color: Option<OverlayColor>,
    /// Height of the reference surface above the ellipsoid, metres.
    pub surface_height: f64,
    /// Positioning installed for scenes that ask for one when the host has
    /// not provided its own source.
    pub positioning: Option<FixedPosition>,
    pub replay: ReplayConfig,
}

impl Default for ArConfig {
    fn default() -> Self {
        Self {
            origin: OriginCamera::default(),
            translation_factor: TranslationFactor::FULL_SCALE,
            scene: None,
            mask_interrupted_poses: true,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            plane_color: None,
            point_cloud_color: None,
            surface_height: 0.0,
            positioning: None,
            replay: ReplayConfig::default(),
        }
    }
}

impl ArConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        serde_yaml::from_reader(file).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse configuration")
    }

    /// The configured scene preset, if any.
    pub fn preset(&self) -> Result<Option<ScenePreset>> {
        match &self.scene {
            None => Ok(None),
            Some(name) => find_preset(name)
                .map(Some)
                .ok_or_else(|| anyhow!("unknown scene preset '{}'", name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ArConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, ArConfig::default());
        assert!(config.mask_interrupted_poses);
        assert!(config.translation_factor.is_full_scale());
    }

    #[test]
    fn test_partial_config() {
        let config = ArConfig::from_yaml_str(
            "origin:\n  position: { latitude: 48.3808, longitude: -4.49492, altitude: 48.2511 }\n\
             translation_factor: 500.0\n\
             point_cloud_color: [0, 0, 255, 255]\n\
             replay:\n  playback_rate: 0.0\n",
        )
        .unwrap();

        assert_relative_eq!(config.origin.position.latitude, 48.3808);
        assert_relative_eq!(config.origin.pitch, 90.0);
        assert_relative_eq!(config.translation_factor.get(), 500.0);
        assert_eq!(config.point_cloud_color, Some(OverlayColor::rgba(0, 0, 255, 255)));
        assert!(config.plane_color.is_none());
        assert_relative_eq!(config.replay.playback_rate, 0.0);
    }

    #[test]
    fn test_invalid_factor_rejected() {
        assert!(ArConfig::from_yaml_str("translation_factor: 0.0").is_err());
        assert!(ArConfig::from_yaml_str("translation_factor: -3").is_err());
    }

    #[test]
    fn test_positioning_fix() {
        let config = ArConfig::from_yaml_str(
            "positioning:\n  position: { latitude: 52.52, longitude: 13.405, altitude: 34.0 }\n",
        )
        .unwrap();
        let fix = config.positioning.unwrap();
        assert_relative_eq!(fix.position.longitude, 13.405);
        assert!(fix.heading.is_none());
    }

    #[test]
    fn test_preset_lookup() {
        let config = ArConfig::from_yaml_str("scene: yosemite").unwrap();
        assert_eq!(config.preset().unwrap().unwrap().name, "yosemite");

        let config = ArConfig::from_yaml_str("scene: nowhere").unwrap();
        assert!(config.preset().is_err());
    }
}
