use glam::{Mat4, Vec2, Vec3, Vec4};

/// One vertex as the vertex shader sees it, without the instance matrix.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexInput {
  /// Object-space position (location 0)
  pub position:  Vec3,
  /// Location 1
  pub tex_coord: Vec2,
  /// Object-space normal (location 2)
  pub normal:    Vec3,
}

/// Values constant across a draw call.
///
/// `viewer_pos` mirrors the `viewerPos` member of the uniform block. It is
/// uploaded every frame but no stage reads it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
  pub view:       Mat4,
  pub projection: Mat4,
  pub viewer_pos: Vec3,
}

impl Default for FrameUniforms {
  fn default() -> Self {
    Self {
      view:       Mat4::IDENTITY,
      projection: Mat4::IDENTITY,
      viewer_pos: Vec3::ZERO,
    }
  }
}

/// Everything `main()` in `vertex.glsl` writes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexOutput {
  /// `gl_Position`
  pub clip_position:  Vec4,
  /// `fragmentTexCoord`
  pub tex_coord:      Vec2,
  /// `fragmentNormal`, world space, not renormalized
  pub normal:         Vec3,
  /// `fragmentPos`, world space
  pub world_position: Vec3,
}

/// Runs the vertex stage for one vertex of one instance.
///
/// The normal goes through `model` with w = 0 rather than through the
/// inverse-transpose, so non-uniform scale skews it. `vertex.glsl` does the
/// same and the two must stay in step.
pub fn transform_vertex(input: &VertexInput, model: &Mat4, frame: &FrameUniforms) -> VertexOutput {
  let world = *model * input.position.extend(1.0);
  let clip_position = frame.projection * frame.view * world;

  VertexOutput {
    clip_position,
    tex_coord: input.tex_coord,
    normal: (*model * input.normal.extend(0.0)).truncate(),
    world_position: world.truncate(),
  }
}

#[cfg(test)]
mod tests {
  use std::f32::consts::FRAC_PI_3;

  use glam::Quat;

  use super::*;

  const EPSILON: f32 = 1e-5;

  fn sample_input() -> VertexInput {
    VertexInput {
      position:  Vec3::new(1.0, 2.0, 3.0),
      tex_coord: Vec2::new(0.5, 0.5),
      normal:    Vec3::new(0.0, 0.0, 1.0),
    }
  }

  fn camera_frame() -> FrameUniforms {
    FrameUniforms {
      view:       Mat4::look_at_rh(Vec3::new(-10.0, 0.0, 4.0), Vec3::new(-9.0, 0.0, 4.0), Vec3::Z),
      projection: Mat4::perspective_rh(45f32.to_radians(), 4.0 / 3.0, 0.1, 50.0),
      viewer_pos: Vec3::new(-10.0, 0.0, 4.0),
    }
  }

  fn instance_model() -> Mat4 {
    Mat4::from_scale_rotation_translation(
      Vec3::new(2.0, 0.5, 3.0),
      Quat::from_rotation_z(FRAC_PI_3) * Quat::from_rotation_x(0.3),
      Vec3::new(4.0, -1.0, 2.5),
    )
  }

  #[test]
  fn identity_everything_passes_vertex_through() {
    let input = sample_input();
    let out = transform_vertex(&input, &Mat4::IDENTITY, &FrameUniforms::default());

    assert_eq!(out.clip_position, Vec4::new(1.0, 2.0, 3.0, 1.0));
    assert_eq!(out.tex_coord, Vec2::new(0.5, 0.5));
    assert_eq!(out.normal, input.normal);
    assert_eq!(out.world_position, Vec3::new(1.0, 2.0, 3.0));
  }

  #[test]
  fn world_position_ignores_view_and_projection() {
    let input = sample_input();
    let model = instance_model();

    let with_camera = transform_vertex(&input, &model, &camera_frame());
    let without = transform_vertex(&input, &model, &FrameUniforms::default());

    let expected = (model * input.position.extend(1.0)).truncate();
    assert!(with_camera.world_position.abs_diff_eq(expected, EPSILON));
    assert_eq!(with_camera.world_position, without.world_position);
    assert_eq!(with_camera.normal, without.normal);
  }

  #[test]
  fn composition_is_associative() {
    let input = sample_input();
    let model = instance_model();
    let frame = camera_frame();

    let p = input.position.extend(1.0);
    let grouped_left = (frame.projection * frame.view) * (model * p);
    let grouped_right = frame.projection * (frame.view * (model * p));
    let out = transform_vertex(&input, &model, &frame);

    assert!(out.clip_position.abs_diff_eq(grouped_left, EPSILON));
    assert!(out.clip_position.abs_diff_eq(grouped_right, EPSILON));
  }

  #[test]
  fn order_is_projection_view_model() {
    let input = sample_input();
    let model = Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0));
    let frame = FrameUniforms {
      view: Mat4::from_rotation_z(FRAC_PI_3),
      ..FrameUniforms::default()
    };

    let out = transform_vertex(&input, &model, &frame);
    let swapped = model * frame.view * input.position.extend(1.0);

    assert!(!out.clip_position.abs_diff_eq(swapped, 1e-3));
  }

  #[test]
  fn uniform_scale_keeps_normal_direction() {
    let input = VertexInput {
      normal: Vec3::new(0.3, -0.4, 0.866).normalize(),
      ..sample_input()
    };
    let model = Mat4::from_scale(Vec3::splat(3.5)) * Mat4::from_translation(Vec3::new(1.0, 1.0, 1.0));

    let out = transform_vertex(&input, &model, &camera_frame());

    assert!(out.normal.normalize().abs_diff_eq(input.normal, EPSILON));
    assert!((out.normal.length() - 3.5).abs() < EPSILON);
  }

  #[test]
  fn normal_ignores_translation() {
    let input = sample_input();
    let model = Mat4::from_translation(Vec3::new(100.0, -7.0, 3.0));

    let out = transform_vertex(&input, &model, &FrameUniforms::default());
    assert_eq!(out.normal, input.normal);
  }

  #[test]
  fn non_uniform_scale_skews_normal() {
    // 45° surface in the XZ plane; stretching X flattens the true normal
    // but the stage scales the normal the same way as positions.
    let input = VertexInput {
      normal: Vec3::new(1.0, 0.0, 1.0).normalize(),
      ..sample_input()
    };
    let model = Mat4::from_scale(Vec3::new(4.0, 1.0, 1.0));

    let out = transform_vertex(&input, &model, &FrameUniforms::default());
    let direction = out.normal.normalize();

    assert!(direction.x > direction.z);
    assert!(direction.abs_diff_eq(Vec3::new(4.0, 0.0, 1.0).normalize(), EPSILON));
  }
}
