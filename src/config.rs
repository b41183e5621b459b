//! Runtime configuration.
//!
//! Settings are read from a TOML file. Every section and key is optional;
//! anything left out falls back to the defaults below, which reproduce the
//! stock tree scene.
//!
//! ```toml
//! [window]
//! width = 1280
//! height = 720
//!
//! [camera]
//! fov = 60.0
//!
//! [scene]
//! seed = 7
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "grove.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub window: WindowConfig,
  pub camera: CameraConfig,
  pub scene:  SceneConfig,
  pub assets: AssetConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
  pub width:  u32,
  pub height: u32,
  pub title:  String,
}

impl Default for WindowConfig {
  fn default() -> Self {
    Self {
      width:  640,
      height: 480,
      title:  "Grove".to_owned(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
  /// Vertical field of view in degrees
  pub fov:               f32,
  pub near:              f32,
  pub far:               f32,
  /// Starting position, Z up
  pub position:          [f64; 3],
  /// Degrees of yaw/pitch per pixel of mouse motion
  pub mouse_sensitivity: f64,
  /// World units walked per 60 Hz frame
  pub walk_speed:        f64,
}

impl Default for CameraConfig {
  fn default() -> Self {
    Self {
      fov:               45.0,
      near:              0.1,
      far:               50.0,
      position:          [-10.0, 0.0, 4.0],
      mouse_sensitivity: 0.1,
      walk_speed:        0.1,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneConfig {
  /// Seed for leaf placement. Fixed so runs are reproducible.
  pub seed:        u64,
  /// Tilt of the initial branch around X, in degrees
  pub branch_tilt: f32,
}

impl Default for SceneConfig {
  fn default() -> Self {
    Self {
      seed:        0,
      branch_tilt: 10.0,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetConfig {
  pub branch_model:   PathBuf,
  pub leaf_model:     PathBuf,
  pub branch_texture: PathBuf,
  pub leaf_texture:   PathBuf,
  /// Path prefix of the six `{prefix}_{face}.png` sky images
  pub sky_prefix:     PathBuf,
}

impl Default for AssetConfig {
  fn default() -> Self {
    Self {
      branch_model:   PathBuf::from("models/branch.obj"),
      leaf_model:     PathBuf::from("models/leaf.obj"),
      branch_texture: PathBuf::from("gfx/wood.jpeg"),
      leaf_texture:   PathBuf::from("gfx/leaf.jpeg"),
      sky_prefix:     PathBuf::from("gfx/sky"),
    }
  }
}

impl Config {
  /// Parses a config from TOML text. `path` is only used for error messages.
  pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
    toml::from_str(text).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_toml_str(&text, path)
  }

  /// Loads `explicit` if given, otherwise `grove.toml` when it exists,
  /// otherwise the defaults.
  pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
    if let Some(path) = explicit {
      return Self::load(path);
    }

    let fallback = Path::new(DEFAULT_CONFIG_FILE);
    if fallback.is_file() {
      log::info!("loading {}", fallback.display());
      Self::load(fallback)
    } else {
      log::info!("no {DEFAULT_CONFIG_FILE} found, using defaults");
      Ok(Self::default())
    }
  }
}
