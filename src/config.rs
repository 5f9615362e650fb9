//! Editor configuration module.
//!
//! Handles loading, validating, and merging `stache.toml`. Stock defaults are
//! the base layer; a user file only needs the keys it wants to change.
//!
//! ## Config File Location
//!
//! `stache.toml` in the working directory is picked up automatically. Pass
//! `--config <path>` to use a file elsewhere.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [detection]
//! backend = "none"          # "landmarks", "seetaface" or "none"
//! # model_path = "faces.json"
//! min_face_size = 20        # Smallest face the detector looks for (px)
//!
//! [placement]
//! face_width = 0.6          # Overlay width / face box width
//! aspect = 0.4              # Overlay height / overlay width
//! lift = 0.8                # Lift above mouth center, in overlay heights
//! default_width = 0.15      # No-face overlay width / image width
//! default_top = 0.55        # No-face overlay top / image height
//!
//! [adjust]
//! rotate_step = 15.0        # Degrees per rotate click
//! resize_gain = 0.5         # Width change per pixel of pointer movement
//! height_per_width = 0.4    # Height change per unit of width change
//! min_width = 20.0
//! max_width_ratio = 0.8     # Of image width
//! min_height = 10.0
//! max_height_ratio = 0.4    # Of image height
//!
//! [output]
//! filename = "distinguished-photo.png"
//! default_style = "classic"
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::catalog;
use crate::imaging::{PlacementRatios, ResizeLimits};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "stache.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Editor configuration loaded from `stache.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StacheConfig {
    pub detection: DetectionConfig,
    pub placement: PlacementConfig,
    pub adjust: AdjustConfig,
    pub output: OutputConfig,
    pub processing: ProcessingConfig,
}

impl StacheConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("placement.face_width", self.placement.face_width),
            ("placement.aspect", self.placement.aspect),
            ("placement.default_width", self.placement.default_width),
            ("adjust.resize_gain", self.adjust.resize_gain),
            ("adjust.height_per_width", self.adjust.height_per_width),
            ("adjust.min_width", self.adjust.min_width),
            ("adjust.min_height", self.adjust.min_height),
        ];
        for (key, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::Validation(format!("{key} must be positive")));
            }
        }

        let fractions = [
            ("placement.default_width", self.placement.default_width),
            ("adjust.max_width_ratio", self.adjust.max_width_ratio),
            ("adjust.max_height_ratio", self.adjust.max_height_ratio),
        ];
        for (key, value) in fractions {
            if value.is_nan() || value <= 0.0 || value > 1.0 {
                return Err(ConfigError::Validation(format!("{key} must be in (0, 1]")));
            }
        }

        if !(0.0..1.0).contains(&self.placement.default_top) {
            return Err(ConfigError::Validation(
                "placement.default_top must be in [0, 1)".into(),
            ));
        }
        if !self.placement.lift.is_finite() || self.placement.lift < 0.0 {
            return Err(ConfigError::Validation(
                "placement.lift must be non-negative".into(),
            ));
        }
        if self.adjust.rotate_step.is_nan()
            || self.adjust.rotate_step <= 0.0
            || self.adjust.rotate_step >= 360.0
        {
            return Err(ConfigError::Validation(
                "adjust.rotate_step must be in (0, 360)".into(),
            ));
        }
        if self.detection.min_face_size < 20 {
            return Err(ConfigError::Validation(
                "detection.min_face_size must be at least 20".into(),
            ));
        }
        if self.output.filename.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output.filename must not be empty".into(),
            ));
        }
        if catalog::find_style(&self.output.default_style).is_none() {
            return Err(ConfigError::Validation(format!(
                "output.default_style '{}' is not a known style",
                self.output.default_style
            )));
        }
        Ok(())
    }
}

/// Which face detection backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    /// Landmarks exported by an external detector, read from `model_path`.
    Landmarks,
    /// SeetaFace frontal detector, weights at `model_path`.
    Seetaface,
    /// No detection: manual placement only.
    #[default]
    None,
}

/// Face detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    pub backend: DetectorKind,
    /// Landmark JSON or model weights, depending on `backend`.
    pub model_path: Option<PathBuf>,
    /// Smallest face, in pixels, the SeetaFace detector looks for.
    pub min_face_size: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            backend: DetectorKind::None,
            model_path: None,
            min_face_size: 20,
        }
    }
}

/// Proportions used for initial placements.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlacementConfig {
    pub face_width: f64,
    pub aspect: f64,
    pub lift: f64,
    pub default_width: f64,
    pub default_top: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        let r = PlacementRatios::default();
        Self {
            face_width: r.face_width,
            aspect: r.aspect,
            lift: r.lift,
            default_width: r.default_width,
            default_top: r.default_top,
        }
    }
}

impl PlacementConfig {
    pub fn ratios(&self) -> PlacementRatios {
        PlacementRatios {
            face_width: self.face_width,
            aspect: self.aspect,
            lift: self.lift,
            default_width: self.default_width,
            default_top: self.default_top,
        }
    }
}

/// Manual adjustment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdjustConfig {
    /// Degrees added or removed per rotate step.
    pub rotate_step: f64,
    pub resize_gain: f64,
    pub height_per_width: f64,
    pub min_width: f64,
    pub max_width_ratio: f64,
    pub min_height: f64,
    pub max_height_ratio: f64,
}

impl Default for AdjustConfig {
    fn default() -> Self {
        let l = ResizeLimits::default();
        Self {
            rotate_step: 15.0,
            resize_gain: l.gain,
            height_per_width: l.height_per_width,
            min_width: l.min_width,
            max_width_ratio: l.max_width_ratio,
            min_height: l.min_height,
            max_height_ratio: l.max_height_ratio,
        }
    }
}

impl AdjustConfig {
    pub fn limits(&self) -> ResizeLimits {
        ResizeLimits {
            gain: self.resize_gain,
            height_per_width: self.height_per_width,
            min_width: self.min_width,
            max_width_ratio: self.max_width_ratio,
            min_height: self.min_height,
            max_height_ratio: self.max_height_ratio,
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// File name used when no `--output` is given.
    pub filename: String,
    /// Style id used when no `--style` is given.
    pub default_style: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            filename: "distinguished-photo.png".to_string(),
            default_style: "classic".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel batch workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(StacheConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
pub fn read_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load `stache.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `stache.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(None);
    }
    read_raw_config(&config_path).map(Some)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<StacheConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: StacheConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `stache.toml` in the given directory, if present.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<StacheConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(dir)?)
}

/// Load config from an explicit file. A missing file is an error.
pub fn load_config_file(path: &Path) -> Result<StacheConfig, ConfigError> {
    resolve_config(stock_defaults_value(), Some(read_raw_config(path)?))
}

/// Returns a fully-commented stock `stache.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Stache Stash Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as ./stache.toml or pass --config <path>.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Face detection
# ---------------------------------------------------------------------------
[detection]
# "landmarks": read faces exported by an external detector (JSON, model_path).
# "seetaface": SeetaFace frontal detector, weights at model_path
#              (requires a build with the `rustface` feature).
# "none":      no detection; overlays start at the default position.
backend = "none"

# model_path = "faces.json"

# Smallest face, in pixels, the SeetaFace detector looks for (>= 20).
min_face_size = 20

# ---------------------------------------------------------------------------
# Initial placement
# ---------------------------------------------------------------------------
[placement]
# Overlay width as a fraction of the face bounding-box width.
face_width = 0.6

# Overlay height as a fraction of its width.
aspect = 0.4

# Lift above the mouth center, in overlay heights.
lift = 0.8

# Used when no face is found: overlay width as a fraction of the image
# width, top edge as a fraction of the image height.
default_width = 0.15
default_top = 0.55

# ---------------------------------------------------------------------------
# Manual adjustment
# ---------------------------------------------------------------------------
[adjust]
# Degrees per rotate step.
rotate_step = 15.0

# Width change per image pixel of horizontal resize movement.
resize_gain = 0.5

# Height change per unit of width change.
height_per_width = 0.4

# Size bounds. Maxima are fractions of the image size.
min_width = 20.0
max_width_ratio = 0.8
min_height = 10.0
max_height_ratio = 0.4

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
filename = "distinguished-photo.png"

# Style used when none is chosen. See `stache-stash styles`.
default_style = "classic"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel batch workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
