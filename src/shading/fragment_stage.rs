use glam::{Vec2, Vec3, Vec4};

use super::{
  sampler::{SamplerState, Texture2d},
  vertex_stage::VertexOutput,
};
use crate::texture::CubemapImages;

/// Interpolated values arriving at the fragment stage.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FragmentInput {
  /// `fragmentTexCoord`
  pub tex_coord:      Vec2,
  /// `fragmentNormal`
  pub normal:         Vec3,
  /// `fragmentPos`
  pub world_position: Vec3,
}

impl From<VertexOutput> for FragmentInput {
  /// The fragment sitting exactly on a vertex receives that vertex's outputs.
  fn from(out: VertexOutput) -> Self {
    Self {
      tex_coord:      out.tex_coord,
      normal:         out.normal,
      world_position: out.world_position,
    }
  }
}

/// Resources bound while the scene pipeline runs.
///
/// `sky_texture` and `viewer_pos` are reserved: they are part of the binding
/// contract so hosts keep binding them, but shading never reads either.
/// Whether they were meant for reflections is undecided.
#[derive(Debug, Clone, Copy)]
pub struct FragmentBindings<'a> {
  /// `imageTexture`
  pub image_texture: &'a Texture2d,
  pub image_sampler: SamplerState,
  /// `skyTexture` (reserved)
  pub sky_texture:   Option<&'a CubemapImages>,
  /// `viewerPos` (reserved)
  pub viewer_pos:    Vec3,
}

impl<'a> FragmentBindings<'a> {
  pub fn new(image_texture: &'a Texture2d) -> Self {
    Self {
      image_texture,
      image_sampler: SamplerState::MATERIAL,
      sky_texture: None,
      viewer_pos: Vec3::ZERO,
    }
  }
}

/// Runs the fragment stage: the output color is the sampled texel.
pub fn shade_fragment(input: &FragmentInput, bindings: &FragmentBindings) -> Vec4 {
  bindings
    .image_texture
    .sample(input.tex_coord, &bindings.image_sampler)
}

#[cfg(test)]
mod tests {
  use glam::Mat4;

  use super::*;
  use crate::shading::{
    sampler::{AddressMode, Filter},
    vertex_stage::{FrameUniforms, VertexInput, transform_vertex},
  };

  fn checker() -> Texture2d {
    Texture2d::from_texels(2, 2, vec![
      Vec4::new(1.0, 0.0, 0.0, 1.0),
      Vec4::new(0.0, 1.0, 0.0, 1.0),
      Vec4::new(0.0, 0.0, 1.0, 1.0),
      Vec4::new(1.0, 1.0, 0.0, 1.0),
    ])
  }

  fn clamp_bindings(texture: &Texture2d) -> FragmentBindings<'_> {
    FragmentBindings {
      image_sampler: SamplerState {
        mag_filter:   Filter::Linear,
        min_filter:   Filter::Linear,
        address_mode: AddressMode::ClampToEdge,
      },
      ..FragmentBindings::new(texture)
    }
  }

  #[test]
  fn output_is_the_sampled_texel() {
    let texture = checker();
    let bindings = clamp_bindings(&texture);

    let at = |u: f32, v: f32| {
      shade_fragment(
        &FragmentInput {
          tex_coord: Vec2::new(u, v),
          ..FragmentInput::default()
        },
        &bindings,
      )
    };

    assert_eq!(at(0.0, 0.0), texture.texel(0, 0));
    assert_eq!(at(1.0, 1.0), texture.texel(1, 1));
    assert_eq!(at(0.25, 0.75), texture.texel(0, 1));
  }

  #[test]
  fn reserved_bindings_do_not_change_the_color() {
    let texture = checker();
    let sky = CubemapImages::solid(1, [9, 9, 9, 255]);
    let input = FragmentInput {
      tex_coord:      Vec2::new(0.4, 0.6),
      normal:         Vec3::Z,
      world_position: Vec3::new(3.0, 2.0, 1.0),
    };

    let plain = shade_fragment(&input, &clamp_bindings(&texture));
    let with_reserved = shade_fragment(&input, &FragmentBindings {
      sky_texture: Some(&sky),
      viewer_pos: Vec3::new(-10.0, 0.0, 4.0),
      ..clamp_bindings(&texture)
    });

    assert_eq!(plain, with_reserved);
  }

  #[test]
  fn normal_and_position_do_not_affect_output() {
    let texture = checker();
    let bindings = FragmentBindings::new(&texture);
    let base = FragmentInput {
      tex_coord: Vec2::new(0.1, 0.9),
      ..FragmentInput::default()
    };
    let moved = FragmentInput {
      normal: Vec3::new(0.0, 1.0, 0.0),
      world_position: Vec3::splat(50.0),
      ..base
    };

    assert_eq!(shade_fragment(&base, &bindings), shade_fragment(&moved, &bindings));
  }

  #[test]
  fn identity_pipeline_end_to_end() {
    let texture = checker();
    let input = VertexInput {
      position:  Vec3::new(1.0, 2.0, 3.0),
      tex_coord: Vec2::new(0.5, 0.5),
      normal:    Vec3::new(0.0, 1.0, 0.0),
    };

    let out = transform_vertex(&input, &Mat4::IDENTITY, &FrameUniforms::default());
    assert_eq!(out.clip_position, Vec4::new(1.0, 2.0, 3.0, 1.0));

    let fragment = FragmentInput::from(out);
    assert_eq!(fragment.tex_coord, Vec2::new(0.5, 0.5));
    assert_eq!(fragment.normal, input.normal);
    assert_eq!(fragment.world_position, Vec3::new(1.0, 2.0, 3.0));

    // centre of a 2x2 texture is the average of all four texels
    let color = shade_fragment(&fragment, &clamp_bindings(&texture));
    assert!(color.abs_diff_eq(Vec4::new(0.5, 0.5, 0.25, 1.0), 1e-6));
  }
}
