//! Configuration structs with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the persisted configuration inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub globe: GlobeConfig,
    pub markers: MarkerConfig,
    pub sun: SunConfig,
    pub camera: CameraConfig,
    pub input: InputConfig,
    pub debug: DebugConfig,
}

/// Initial viewport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Viewport width in device pixels.
    pub width: u32,
    /// Viewport height in device pixels.
    pub height: u32,
    pub title: String,
}

/// Globe mesh and textures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlobeConfig {
    /// Globe radius in scene units. Markers stand on this sphere.
    pub radius: f32,
    /// Icosphere subdivision level.
    pub subdivisions: u32,
    /// Directory the three texture files are resolved against.
    pub texture_dir: PathBuf,
    pub color_map: String,
    pub bump_map: String,
    pub specular_map: String,
    pub bump_scale: f32,
    pub shininess: f32,
}

/// Feature dataset and marker appearance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarkerConfig {
    /// JSON dataset of feature records.
    pub dataset: PathBuf,
    /// Edge length of a marker's square footprint.
    pub footprint: f32,
    /// Initial position of the threshold control, in `[0, 1]`.
    pub threshold_control: f64,
}

/// Sun placement and lighting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SunConfig {
    pub orbit_radius: f64,
    /// Hours added to UTC when placing the sun.
    pub hour_offset: f64,
    pub intensity: f32,
    pub ambient_intensity: f32,
    /// Re-read the wall clock this often while idle. 0 reads it once at
    /// startup and afterwards only on explicit ticks.
    pub retick_seconds: u64,
}

/// Perspective camera.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Initial distance from the globe centre.
    pub start_distance: f32,
}

/// Orbit controls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    /// Radians of rotation per pixel of drag.
    pub rotate_speed: f32,
    /// Closest the camera may zoom to the globe centre.
    pub min_distance: f32,
    pub max_distance: f32,
    /// Invert vertical drag.
    pub invert_y: bool,
}

/// Debug/development settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Also write JSON logs to the data directory.
    pub log_to_file: bool,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Stress Globe".to_string(),
        }
    }
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            radius: 1.0,
            subdivisions: 5,
            texture_dir: PathBuf::from("textures"),
            color_map: "earth_color.jpg".to_string(),
            bump_map: "earth_bump.jpg".to_string(),
            specular_map: "earth_specular.jpg".to_string(),
            bump_scale: 0.005,
            shininess: 10.0,
        }
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("data/features.json"),
            footprint: 0.005,
            threshold_control: 0.0,
        }
    }
}

impl Default for SunConfig {
    fn default() -> Self {
        Self {
            orbit_radius: 10.0,
            hour_offset: 6.0,
            intensity: 1.0,
            ambient_intensity: 0.25,
            retick_seconds: 0,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
            start_distance: 3.0,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            rotate_speed: 0.005,
            min_distance: 1.2,
            max_distance: 20.0,
            invert_y: false,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: false,
        }
    }
}

impl GlobeConfig {
    /// Full paths of the color, bump and specular maps.
    pub fn texture_paths(&self) -> [PathBuf; 3] {
        [&self.color_map, &self.bump_map, &self.specular_map].map(|name| self.texture_dir.join(name))
    }
}

impl Config {
    /// Read `config.ron` from `config_dir`. A missing file is replaced by the
    /// defaults, which are written back so the user has something to edit.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            let defaults = Self::default();
            defaults.save(config_dir)?;
            log::info!("Wrote default config to {}", path.display());
            return Ok(defaults);
        }
        let config = Self::read(&path)?;
        log::info!("Using config {}", path.display());
        Ok(config)
    }

    /// Write `config.ron` into `config_dir`, creating the directory.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let path = config_dir.join(CONFIG_FILE_NAME);
        let write_error = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_error)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let text = ron::ser::to_string_pretty(self, pretty)?;
        std::fs::write(&path, text).map_err(write_error)
    }

    /// Reject values the scene cannot be built from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: &str| {
            Err(ConfigError::InvalidValue {
                field,
                reason: reason.to_string(),
            })
        };
        if !(self.globe.radius > 0.0) {
            return invalid("globe.radius", "must be positive");
        }
        if self.globe.subdivisions > 7 {
            return invalid("globe.subdivisions", "must be at most 7");
        }
        if !(0.0..=1.0).contains(&self.markers.threshold_control) {
            return invalid("markers.threshold_control", "must be within [0, 1]");
        }
        if !(self.camera.near > 0.0 && self.camera.far > self.camera.near) {
            return invalid("camera", "need 0 < near < far");
        }
        if self.input.min_distance > self.input.max_distance {
            return invalid("input.min_distance", "must not exceed max_distance");
        }
        Ok(())
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
