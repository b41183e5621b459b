//! CPU texture sampling.
//!
//! Follows the Vulkan rules for a single mip level: nearest filtering picks
//! texel `floor(u * width)`, linear filtering blends the four texels around
//! `u * width - 0.5`, and the address mode is applied to each integer texel
//! coordinate before the fetch.

use glam::{Vec2, Vec4};
use image::RgbaImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
  Nearest,
  #[default]
  Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressMode {
  #[default]
  Repeat,
  MirroredRepeat,
  ClampToEdge,
}

impl AddressMode {
  /// Maps an integer texel coordinate into `0..size`.
  pub fn resolve(self, coord: i64, size: u32) -> u32 {
    let size = i64::from(size);
    let resolved = match self {
      AddressMode::Repeat => coord.rem_euclid(size),
      AddressMode::MirroredRepeat => {
        let t = coord.rem_euclid(2 * size);
        if t >= size { 2 * size - 1 - t } else { t }
      }
      AddressMode::ClampToEdge => coord.clamp(0, size - 1),
    };
    resolved as u32
  }
}

/// Sampler parameters, the CPU-side twin of `vulkano::image::sampler::SamplerCreateInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SamplerState {
  pub mag_filter:   Filter,
  pub min_filter:   Filter,
  pub address_mode: AddressMode,
}

impl SamplerState {
  /// Sampler used for material textures: repeat, linear up close, nearest far away.
  pub const MATERIAL: Self = Self {
    mag_filter:   Filter::Linear,
    min_filter:   Filter::Nearest,
    address_mode: AddressMode::Repeat,
  };

  /// Sampler used for the sky cubemap.
  pub const SKY: Self = Self {
    mag_filter:   Filter::Linear,
    min_filter:   Filter::Nearest,
    address_mode: AddressMode::ClampToEdge,
  };
}

/// A single-level RGBA texture with float channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture2d {
  width:  u32,
  height: u32,
  texels: Vec<Vec4>,
}

impl Texture2d {
  /// Builds a texture from row-major texels, top row first.
  ///
  /// # Panics
  /// If the texel count does not match `width * height` or either side is zero.
  pub fn from_texels(width: u32, height: u32, texels: Vec<Vec4>) -> Self {
    assert!(width > 0 && height > 0, "texture must not be empty");
    assert_eq!(
      texels.len(),
      width as usize * height as usize,
      "texel count does not match {width}x{height}"
    );
    Self { width, height, texels }
  }

  /// Converts 8-bit channels to `0.0..=1.0`. Values are kept as stored; no
  /// sRGB decoding happens here.
  ///
  /// # Panics
  /// If the image is empty, as [`Texture2d::from_texels`] does.
  pub fn from_rgba8(image: &RgbaImage) -> Self {
    let texels = image
      .pixels()
      .map(|p| Vec4::new(p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32) / 255.0)
      .collect();
    Self::from_texels(image.width(), image.height(), texels)
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  /// Direct texel fetch, like `texelFetch`.
  ///
  /// # Panics
  /// If `(x, y)` is outside the texture.
  pub fn texel(&self, x: u32, y: u32) -> Vec4 {
    assert!(x < self.width && y < self.height, "texel ({x}, {y}) out of bounds");
    self.texels[(y * self.width + x) as usize]
  }

  /// Samples at a normalized coordinate using the magnification filter.
  ///
  /// There is no mip chain, so this matches the GPU whenever a texel covers
  /// at least one pixel.
  pub fn sample(&self, uv: Vec2, sampler: &SamplerState) -> Vec4 {
    self.sample_with(uv, sampler.mag_filter, sampler.address_mode)
  }

  pub fn sample_with(&self, uv: Vec2, filter: Filter, address_mode: AddressMode) -> Vec4 {
    let (w, h) = (self.width as f32, self.height as f32);

    match filter {
      Filter::Nearest => {
        let x = address_mode.resolve((uv.x * w).floor() as i64, self.width);
        let y = address_mode.resolve((uv.y * h).floor() as i64, self.height);
        self.texel(x, y)
      }
      Filter::Linear => {
        let u = uv.x * w - 0.5;
        let v = uv.y * h - 0.5;
        let (i0, j0) = (u.floor(), v.floor());
        let (alpha, beta) = (u - i0, v - j0);
        let (i0, j0) = (i0 as i64, j0 as i64);

        let x0 = address_mode.resolve(i0, self.width);
        // huge or infinite coordinates saturate at i64::MAX
        let x1 = address_mode.resolve(i0.saturating_add(1), self.width);
        let y0 = address_mode.resolve(j0, self.height);
        let y1 = address_mode.resolve(j0.saturating_add(1), self.height);

        let top = self.texel(x0, y0).lerp(self.texel(x1, y0), alpha);
        let bottom = self.texel(x0, y1).lerp(self.texel(x1, y1), alpha);
        top.lerp(bottom, beta)
      }
    }
  }
}
