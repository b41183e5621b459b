//! Image loading for material textures and the sky cubemap.
//!
//! Decoding and face orientation happen here on the CPU; uploading the
//! result to the device lives in `render::texture`.

use std::{
  ffi::OsString,
  path::{Path, PathBuf},
};

use image::{RgbaImage, imageops};

use crate::error::AssetError;

/// Reads and decodes an image file into 8-bit RGBA, top row first.
pub fn load_rgba(path: &Path) -> Result<RgbaImage, AssetError> {
  let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  let image = image::load_from_memory(&bytes).map_err(|source| AssetError::Image {
    path: path.to_path_buf(),
    source,
  })?;
  log::debug!("decoded {} ({}x{})", path.display(), image.width(), image.height());
  Ok(image.to_rgba8())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FaceFixup {
  None,
  /// Upside down and mirrored, i.e. a half turn
  HalfTurn,
  QuarterTurnCounterClockwise,
  QuarterTurnClockwise,
}

impl FaceFixup {
  fn apply(self, image: RgbaImage) -> RgbaImage {
    match self {
      FaceFixup::None => image,
      FaceFixup::HalfTurn => imageops::rotate180(&image),
      FaceFixup::QuarterTurnCounterClockwise => imageops::rotate270(&image),
      FaceFixup::QuarterTurnClockwise => imageops::rotate90(&image),
    }
  }
}

/// Sky image suffix and the turn that lines it up with its cube layer,
/// listed in Vulkan layer order (+X, -X, +Y, -Y, +Z, -Z).
const CUBE_FACES: [(&str, FaceFixup); 6] = [
  ("front", FaceFixup::QuarterTurnCounterClockwise),
  ("back", FaceFixup::QuarterTurnClockwise),
  ("right", FaceFixup::HalfTurn),
  ("left", FaceFixup::None),
  ("top", FaceFixup::QuarterTurnCounterClockwise),
  ("bottom", FaceFixup::None),
];

/// Six square RGBA faces ready to copy into a cube-compatible image.
#[derive(Debug, Clone, PartialEq)]
pub struct CubemapImages {
  size:  u32,
  faces: [RgbaImage; 6],
}

impl CubemapImages {
  /// Builds a cubemap from unrotated source images given in layer order.
  pub fn from_sources(sources: [RgbaImage; 6]) -> Result<Self, AssetError> {
    let expected = sources[0].width();
    let mut faces = sources;

    for (i, face) in faces.iter_mut().enumerate() {
      let (name, fixup) = CUBE_FACES[i];
      if face.width() != expected || face.height() != expected {
        return Err(AssetError::CubemapFace {
          face: name,
          width: face.width(),
          height: face.height(),
          expected,
        });
      }
      *face = fixup.apply(std::mem::take(face));
    }

    Ok(Self { size: expected, faces })
  }

  /// Loads `{prefix}_front.png`, `{prefix}_back.png`, ... and orients them.
  pub fn load(prefix: &Path) -> Result<Self, AssetError> {
    let mut sources: [RgbaImage; 6] = Default::default();
    for (slot, (name, _)) in sources.iter_mut().zip(CUBE_FACES) {
      *slot = load_rgba(&face_path(prefix, name))?;
    }
    Self::from_sources(sources)
  }

  /// A cubemap with every texel set to `rgba`.
  pub fn solid(size: u32, rgba: [u8; 4]) -> Self {
    let face = RgbaImage::from_pixel(size, size, image::Rgba(rgba));
    Self {
      size,
      faces: std::array::from_fn(|_| face.clone()),
    }
  }

  pub fn size(&self) -> u32 {
    self.size
  }

  pub fn faces(&self) -> &[RgbaImage; 6] {
    &self.faces
  }

  /// All faces back to back, the layout a buffer-to-image copy expects.
  pub fn to_layer_bytes(&self) -> Vec<u8> {
    self
      .faces
      .iter()
      .flat_map(|face| face.as_raw().iter().copied())
      .collect()
  }
}

fn face_path(prefix: &Path, face: &str) -> PathBuf {
  let mut name = OsString::from(prefix.as_os_str());
  name.push(format!("_{face}.png"));
  PathBuf::from(name)
}
