use std::collections::BTreeMap;

use crate::foundation::core::{Rgba8Premul, parse_hex_color};

pub const SPEED_RANGE: (f64, f64) = (0.5, 10.0);
pub const INTENSITY_RANGE: (f64, f64) = (10.0, 200.0);

const DEFAULT_SPEED: f64 = 1.0;
const DEFAULT_INTENSITY: f64 = 100.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Which backdrop strategy is mounted into the surface.
pub enum BackendKind {
    ParticlePreset,
    Fireworks,
    PointCloud,
    #[default]
    None,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Immutable snapshot of the backdrop configuration. Snapshots are
/// shallow-compared to decide re-provision vs. no-op; they are never mutated
/// in place after hand-off to the manager.
pub struct AnimationSettings {
    pub enabled: bool,
    pub kind: BackendKind,
    /// Motion multiplier, clamped into [`SPEED_RANGE`].
    pub speed: f64,
    /// Density percentage, clamped into [`INTENSITY_RANGE`]. Particle and
    /// point counts are always `base_count * intensity / 100`.
    pub intensity: f64,
    /// Backend-specific knobs (preset name, palette, links, module url).
    #[serde(default)]
    pub options: BTreeMap<String, serde_json::Value>,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: BackendKind::None,
            speed: DEFAULT_SPEED,
            intensity: DEFAULT_INTENSITY,
            options: BTreeMap::new(),
        }
    }
}

impl AnimationSettings {
    /// Returns a copy with all numeric fields forced into their valid ranges.
    /// Out-of-range input (infinities included) clamps to the nearest bound;
    /// NaN falls back to the default. It never errors.
    pub fn sanitized(&self) -> Self {
        Self {
            enabled: self.enabled,
            kind: self.kind,
            speed: clamp_or(self.speed, SPEED_RANGE, DEFAULT_SPEED),
            intensity: clamp_or(self.intensity, INTENSITY_RANGE, DEFAULT_INTENSITY),
            options: self.options.clone(),
        }
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_str())
    }

    pub fn option_bool(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(|v| v.as_bool())
    }

    /// Palette from the `palette` option (array of hex strings). Entries that
    /// fail to parse are skipped; an empty result falls back to the caller's
    /// default.
    pub fn option_palette(&self) -> Option<Vec<Rgba8Premul>> {
        let arr = self.options.get("palette")?.as_array()?;
        let colors: Vec<Rgba8Premul> = arr
            .iter()
            .filter_map(|v| v.as_str())
            .filter_map(|s| parse_hex_color(s).ok())
            .collect();
        if colors.is_empty() { None } else { Some(colors) }
    }
}

fn clamp_or(value: f64, range: (f64, f64), default: f64) -> f64 {
    // Infinities clamp to the nearest bound like any other out-of-range
    // value; only NaN has no nearest bound and takes the default.
    if value.is_nan() {
        default
    } else {
        value.clamp(range.0, range.1)
    }
}

/// Derives an element count from a preset base count and the intensity
/// percentage. Never reads raw user input without scaling.
pub fn scaled_count(base: usize, intensity: f64) -> usize {
    ((base as f64) * intensity / 100.0).round().max(1.0) as usize
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ElementKind {
    #[default]
    Emoji,
    Image,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// How a decorative element moves. Everything except `Revolve` keeps a static
/// anchor and animates via a periodic transform; `Revolve` travels the border
/// path itself.
pub enum AnimationKind {
    #[default]
    Float,
    Blink,
    Pulse,
    Bounce,
    Shake,
    RotateCw,
    RotateCcw,
    Revolve,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// A small emoji or image pinned to the border path.
pub struct DecorativeElement {
    pub id: String,
    pub kind: ElementKind,
    /// Emoji text or image reference, interpreted by the host.
    pub content: String,
    /// Cyclic position along the border, interpreted modulo 100.
    pub position_percent: f64,
    pub size_px: f64,
    pub animation: AnimationKind,
    pub period_seconds: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// Frame within which perimeter coordinates are computed, derived from the
/// host's border style.
pub struct BorderGeometry {
    pub width_px: f64,
    pub radius_px: f64,
    pub container_width_px: f64,
    pub container_height_px: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Declarative point-system presets for the particle-preset backend.
pub enum ParticlePreset {
    #[default]
    Constellation,
    Nebula,
    Snow,
    Embers,
}

impl ParticlePreset {
    pub fn from_options(settings: &AnimationSettings) -> Self {
        match settings.option_str("preset") {
            Some("nebula") => Self::Nebula,
            Some("snow") => Self::Snow,
            Some("embers") => Self::Embers,
            Some("constellation") | None => Self::Constellation,
            Some(other) => {
                tracing::warn!(preset = other, "unknown particle preset, using constellation");
                Self::Constellation
            }
        }
    }

    /// Particle count at intensity 100.
    pub fn base_count(self) -> usize {
        match self {
            Self::Constellation => 80,
            Self::Nebula => 120,
            Self::Snow => 150,
            Self::Embers => 60,
        }
    }

    /// Whether nearby particles are connected by faint lines by default.
    pub fn links_by_default(self) -> bool {
        matches!(self, Self::Constellation)
    }

    pub fn default_palette(self) -> Vec<Rgba8Premul> {
        let hex: &[&str] = match self {
            Self::Constellation => &["#ffffff", "#9db4ff", "#c8d8ff"],
            Self::Nebula => &["#b388ff", "#7c4dff", "#448aff", "#ff80ab"],
            Self::Snow => &["#ffffff", "#e3f2fd"],
            Self::Embers => &["#ffb74d", "#ff8a65", "#ffd54f"],
        };
        hex.iter().filter_map(|h| parse_hex_color(h).ok()).collect()
    }
}
