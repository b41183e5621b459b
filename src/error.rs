//! Error types for asset loading and configuration.
//!
//! GPU setup code returns `anyhow::Result` and attaches context as it goes;
//! the types here cover the failures callers are expected to match on.

use std::path::PathBuf;

/// Failure while reading a mesh or texture from disk.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
  #[error("failed to read {}", .path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to decode image {}", .path.display())]
  Image {
    path:   PathBuf,
    #[source]
    source: image::ImageError,
  },

  #[error("failed to load OBJ model {}", .path.display())]
  Obj {
    path:   PathBuf,
    #[source]
    source: tobj::LoadError,
  },

  #[error("OBJ model {} contains no triangles", .path.display())]
  EmptyMesh { path: PathBuf },

  #[error("cubemap face {face} is {width}x{height}, expected {expected}x{expected}")]
  CubemapFace {
    face:     &'static str,
    width:    u32,
    height:   u32,
    expected: u32,
  },
}

/// Failure while loading `grove.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("failed to read config file {}", .path.display())]
  Read {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid config file {}", .path.display())]
  Parse {
    path:   PathBuf,
    #[source]
    source: toml::de::Error,
  },
}
