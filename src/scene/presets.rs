//! Built-in scene configurations.
//!
//! Full-scale scenes anchor at the device location reported by positioning;
//! tabletop scenes pin a fixed origin and shrink the world by a large
//! translation factor.

use serde::{Deserialize, Serialize};

use crate::origin::{OriginCamera, TranslationFactor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArMode {
    FullScale,
    Tabletop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenePreset {
    pub name: String,
    pub mode: ArMode,
    pub origin: OriginCamera,
    pub translation_factor: TranslationFactor,
    /// Keep a positioning source running while this scene is active.
    pub use_positioning: bool,
}

impl ScenePreset {
    pub fn full_scale(name: &str, use_positioning: bool) -> Self {
        Self {
            name: name.to_string(),
            mode: ArMode::FullScale,
            origin: OriginCamera::default(),
            translation_factor: TranslationFactor::FULL_SCALE,
            use_positioning,
        }
    }

    /// Tabletop scene looking level and north from `(lat, lon, alt)`.
    ///
    /// Factors are compile-time constants here; an invalid one falls back to
    /// full scale.
    pub fn tabletop(name: &str, latitude: f64, longitude: f64, altitude: f64, factor: f64) -> Self {
        Self {
            name: name.to_string(),
            mode: ArMode::Tabletop,
            origin: OriginCamera::new(latitude, longitude, altitude, 0.0, 90.0, 0.0),
            translation_factor: TranslationFactor::new(factor).unwrap_or_default(),
            use_positioning: false,
        }
    }
}

pub fn builtin_presets() -> Vec<ScenePreset> {
    vec![
        ScenePreset::full_scale("empty", true),
        ScenePreset::full_scale("streets", true),
        ScenePreset::full_scale("imagery", true),
        ScenePreset::full_scale("full-scale-test", false),
        ScenePreset::tabletop("point-cloud", 39.7712, -74.1197, 1.0, 18000.0),
        ScenePreset::tabletop("yosemite", 37.7308, -119.612, 1212.0, 18000.0),
        ScenePreset::tabletop("us-mexico-border", 32.5337, -116.925, 126.0, 10000.0),
        ScenePreset::tabletop("brest", 48.3808, -4.49492, 48.2511, 500.0),
        ScenePreset::tabletop("berlin", 52.4993, 13.4215, 38.0, 1000.0),
        ScenePreset::tabletop("tabletop-test", 0.0, 0.0, 0.0, 10.0),
    ]
}

/// Case-insensitive lookup by name.
pub fn find_preset(name: &str) -> Option<ScenePreset> {
    builtin_presets()
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_berlin_preset() {
        let berlin = find_preset("Berlin").unwrap();
        assert_eq!(berlin.mode, ArMode::Tabletop);
        assert!(!berlin.use_positioning);
        assert_relative_eq!(berlin.translation_factor.get(), 1000.0);
        assert_relative_eq!(berlin.origin.position.latitude, 52.4993);
        assert_relative_eq!(berlin.origin.pitch, 90.0);
    }

    #[test]
    fn test_full_scale_presets_use_unit_factor() {
        for preset in builtin_presets()
            .iter()
            .filter(|p| p.mode == ArMode::FullScale)
        {
            assert!(preset.translation_factor.is_full_scale(), "{}", preset.name);
        }
        assert!(find_preset("streets").unwrap().use_positioning);
        assert!(!find_preset("full-scale-test").unwrap().use_positioning);
    }

    #[test]
    fn test_unknown_preset() {
        assert!(find_preset("atlantis").is_none());
    }
}
