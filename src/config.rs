// ================================
// src/config.rs - tuning constants and node parameters
// ================================
use serde::Deserialize;
use std::{env, fs, io::ErrorKind, path::Path};
use tracing::info;

use crate::error::ConfigError;

// Perception
pub const ROI_TOP_RATIO: f64 = 0.75;
pub const DARK_THRESHOLD: u8 = 50;

// Control
pub const CRUISE_SPEED: f64 = 1.0;
pub const STEERING_DIVISOR: f64 = 130.0;
pub const SEARCH_LINEAR_SPEED: f64 = 0.03;
pub const SEARCH_ANGULAR_SPEED: f64 = 0.60;

// Preview
pub const PREVIEW_WIDTH_RATIO: f64 = 0.5;
pub const PREVIEW_HEIGHT_RATIO: f64 = 0.3;

pub const DEFAULT_CONFIG_PATH: &str = "./line_follower.toml";

/// Line follower parameters.
///
/// Every field falls back to the constant above, so a missing or partial
/// TOML file behaves exactly like the built-in tuning.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LineFollowerParams {
    // Node wiring
    pub node_name: String,
    pub image_topic: String,
    pub cmd_vel_topic: String,
    pub preview_topic: String,

    // Perception
    pub roi_top_ratio: f64,
    pub dark_threshold: u8,

    // Control
    pub cruise_speed: f64,
    pub steering_divisor: f64,
    pub search_linear_speed: f64,
    pub search_angular_speed: f64,

    // Preview
    pub show_preview: bool,
    pub preview_width_ratio: f64,
    pub preview_height_ratio: f64,

    // Replay harness
    pub frames_dir: String,
    pub preview_path: String,
    pub frame_period_ms: u64,

    // Debug options
    pub debug_mode: bool,
}

impl Default for LineFollowerParams {
    fn default() -> Self {
        Self {
            node_name: "line_follower".to_string(),
            image_topic: "/rrbot/camera1/image_raw".to_string(),
            cmd_vel_topic: "/cmd_vel".to_string(),
            preview_topic: "/line_follower/preview".to_string(),
            roi_top_ratio: ROI_TOP_RATIO,
            dark_threshold: DARK_THRESHOLD,
            cruise_speed: CRUISE_SPEED,
            steering_divisor: STEERING_DIVISOR,
            search_linear_speed: SEARCH_LINEAR_SPEED,
            search_angular_speed: SEARCH_ANGULAR_SPEED,
            show_preview: true,
            preview_width_ratio: PREVIEW_WIDTH_RATIO,
            preview_height_ratio: PREVIEW_HEIGHT_RATIO,
            frames_dir: "./frames".to_string(),
            preview_path: "./preview.png".to_string(),
            frame_period_ms: 33,
            debug_mode: false,
        }
    }
}

impl LineFollowerParams {
    /// Load parameters from the file named by `CONFIG_PATH`.
    ///
    /// A missing file is not an error: the built-in constants are used.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(config_path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(config_str) => {
                let params = Self::from_toml(&config_str).map_err(|e| match e {
                    ConfigError::Parse { source, .. } => ConfigError::Parse {
                        path: path.display().to_string(),
                        source,
                    },
                    other => other,
                })?;
                info!(path = %path.display(), "loaded line follower parameters");
                Ok(params)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "no parameter file, using built-in constants");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn from_toml(config_str: &str) -> Result<Self, ConfigError> {
        let params: Self = toml::from_str(config_str).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.roi_top_ratio) {
            return Err(ConfigError::Invalid {
                field: "roi_top_ratio",
                reason: format!("{} is outside [0, 1)", self.roi_top_ratio),
            });
        }
        if !self.steering_divisor.is_finite() || self.steering_divisor == 0.0 {
            return Err(ConfigError::Invalid {
                field: "steering_divisor",
                reason: format!("{} must be finite and non-zero", self.steering_divisor),
            });
        }
        for (field, ratio) in [
            ("preview_width_ratio", self.preview_width_ratio),
            ("preview_height_ratio", self.preview_height_ratio),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{} is outside (0, 1]", ratio),
                });
            }
        }
        Ok(())
    }
}
