//! First-person camera.
//!
//! The world is Z-up. Orientation is stored as yaw (rotation about Z) and
//! pitch (elevation above the XY plane), both in degrees. From those the
//! camera derives an orthonormal basis each update:
//! * `forwards` from spherical coordinates
//! * `right` as `forwards × Z`
//! * `up` as `right × forwards`
//!
//! Positions are kept in 64-bit precision and narrowed to `f32` only when
//! matrices are handed to the GPU.
//!
//! # Example
//! ```
//! use grove::Camera;
//! use glam::DVec3;
//!
//! let mut camera = Camera::new(DVec3::new(-10.0, 0.0, 4.0));
//! camera.spin(90.0, 0.0); // face +Y
//! camera.walk(0.0, 1.0);  // one unit forwards
//! assert!((camera.position.y - 1.0).abs() < 1e-9);
//! ```

use glam::{DMat4, DVec3, Mat4, Vec3};

/// Largest pitch magnitude; stops the basis from degenerating at the poles.
pub const PITCH_LIMIT: f64 = 89.0;

/// Heading offset in degrees for a combination of held movement keys.
///
/// Keys are bit flags: W = 1, A = 2, S = 4, D = 8. Opposing keys cancel, so
/// e.g. W+S has no entry and the camera stays put.
pub fn walk_offset(keys: u8) -> Option<f64> {
  match keys {
    1 | 11 => Some(0.0),
    2 | 7 => Some(90.0),
    3 => Some(45.0),
    4 | 14 => Some(180.0),
    6 => Some(135.0),
    8 | 13 => Some(270.0),
    9 => Some(315.0),
    12 => Some(225.0),
    _ => None,
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
  /// Eye position in world space
  pub position: DVec3,
  /// Heading in degrees, kept within `0..=360`
  pub yaw:      f64,
  /// Elevation in degrees, kept within `-89..=89`
  pub pitch:    f64,
  /// Direction the camera is looking
  pub forwards: DVec3,
  pub right:    DVec3,
  pub up:       DVec3,
  /// Vertical field of view in degrees
  pub fov:      f32,
  pub near:     f32,
  pub far:      f32,
}

impl Camera {
  /// Creates a camera at `position` looking down +X.
  pub fn new(position: DVec3) -> Self {
    let mut camera = Self {
      position,
      yaw: 0.0,
      pitch: 0.0,
      forwards: DVec3::X,
      right: DVec3::NEG_Y,
      up: DVec3::Z,
      fov: 45.0,
      near: 0.1,
      far: 50.0,
    };
    camera.update_vectors();
    camera
  }

  /// Recomputes `forwards`, `right` and `up` from yaw and pitch.
  pub fn update_vectors(&mut self) {
    let (yaw_sin, yaw_cos) = self.yaw.to_radians().sin_cos();
    let (pitch_sin, pitch_cos) = self.pitch.to_radians().sin_cos();

    self.forwards = DVec3::new(yaw_cos * pitch_cos, yaw_sin * pitch_cos, pitch_sin);
    self.right = self.forwards.cross(DVec3::Z).normalize();
    self.up = self.right.cross(self.forwards).normalize();
  }

  /// Turns the camera by the given yaw and pitch deltas in degrees.
  ///
  /// Yaw is wrapped back into `0..=360` and pitch is clamped to
  /// `±PITCH_LIMIT`.
  pub fn spin(&mut self, yaw_delta: f64, pitch_delta: f64) {
    self.yaw += yaw_delta;
    if self.yaw < 0.0 {
      self.yaw += 360.0;
    } else if self.yaw > 360.0 {
      self.yaw -= 360.0;
    }

    self.pitch = (self.pitch + pitch_delta).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    self.update_vectors();
  }

  /// Moves `distance` units across the ground plane, `offset` degrees
  /// counter-clockwise from the current heading. Pitch does not matter.
  pub fn walk(&mut self, offset: f64, distance: f64) {
    let (sin, cos) = (self.yaw + offset).to_radians().sin_cos();
    self.position += DVec3::new(cos, sin, 0.0) * distance;
  }

  /// World to camera transform.
  pub fn view_matrix(&self) -> DMat4 {
    DMat4::look_at_rh(self.position, self.position + self.forwards, self.up)
  }

  /// Camera to clip transform for Vulkan: depth maps to `0..=1` and Y points
  /// down in clip space.
  pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
    let mut projection = Mat4::perspective_rh(self.fov.to_radians(), aspect_ratio, self.near, self.far);
    projection.y_axis.y = -projection.y_axis.y;
    projection
  }

  /// Basis vectors handed to the sky shader. `up` is shrunk by the aspect
  /// ratio so the sky is not stretched on wide windows.
  pub fn sky_basis(&self, aspect_ratio: f32) -> [Vec3; 3] {
    [
      self.forwards.as_vec3(),
      self.right.as_vec3(),
      self.up.as_vec3() / aspect_ratio,
    ]
  }
}

#[cfg(test)]
mod tests {
  use glam::Vec4;

  use super::*;

  const EPSILON: f64 = 1e-9;

  #[test]
  fn starts_looking_down_x() {
    let camera = Camera::new(DVec3::new(-10.0, 0.0, 4.0));
    assert!(camera.forwards.abs_diff_eq(DVec3::X, EPSILON));
    assert!(camera.right.abs_diff_eq(DVec3::NEG_Y, EPSILON));
    assert!(camera.up.abs_diff_eq(DVec3::Z, EPSILON));
  }

  #[test]
  fn basis_stays_orthonormal() {
    let mut camera = Camera::new(DVec3::ZERO);
    camera.spin(123.0, 37.0);

    assert!((camera.forwards.length() - 1.0).abs() < EPSILON);
    assert!(camera.forwards.dot(camera.right).abs() < EPSILON);
    assert!(camera.forwards.dot(camera.up).abs() < EPSILON);
    assert!(camera.right.dot(camera.up).abs() < EPSILON);
    assert!(camera.right.z.abs() < EPSILON);
  }

  #[test]
  fn yaw_wraps_and_pitch_clamps() {
    let mut camera = Camera::new(DVec3::ZERO);

    camera.spin(-30.0, 120.0);
    assert_eq!(camera.yaw, 330.0);
    assert_eq!(camera.pitch, PITCH_LIMIT);

    camera.spin(60.0, -500.0);
    assert!((camera.yaw - 30.0).abs() < EPSILON);
    assert_eq!(camera.pitch, -PITCH_LIMIT);
  }

  #[test]
  fn walking_follows_heading_and_offset() {
    let mut camera = Camera::new(DVec3::ZERO);
    camera.spin(0.0, 45.0);

    camera.walk(0.0, 2.0);
    assert!(camera.position.abs_diff_eq(DVec3::new(2.0, 0.0, 0.0), EPSILON));

    camera.walk(90.0, 1.0);
    assert!(camera.position.abs_diff_eq(DVec3::new(2.0, 1.0, 0.0), EPSILON));

    camera.walk(180.0, 2.0);
    assert!(camera.position.abs_diff_eq(DVec3::new(0.0, 1.0, 0.0), EPSILON));
  }

  #[test]
  fn key_combinations() {
    assert_eq!(walk_offset(1), Some(0.0));
    assert_eq!(walk_offset(1 | 2), Some(45.0));
    assert_eq!(walk_offset(2 | 4), Some(135.0));
    assert_eq!(walk_offset(4 | 8), Some(225.0));
    assert_eq!(walk_offset(1 | 8), Some(315.0));
    assert_eq!(walk_offset(1 | 2 | 8), Some(0.0));
    assert_eq!(walk_offset(1 | 4), None);
    assert_eq!(walk_offset(0), None);
  }

  #[test]
  fn view_puts_target_on_negative_z() {
    let camera = Camera::new(DVec3::new(-10.0, 0.0, 4.0));
    let ahead = camera.view_matrix().transform_point3(DVec3::new(-5.0, 0.0, 4.0));
    assert!(ahead.abs_diff_eq(DVec3::new(0.0, 0.0, -5.0), EPSILON));
  }

  #[test]
  fn projection_uses_vulkan_conventions() {
    let camera = Camera::new(DVec3::ZERO);
    let projection = camera.projection_matrix(1.0);

    let near = projection * Vec4::new(0.0, 0.0, -camera.near, 1.0);
    let far = projection * Vec4::new(0.0, 0.0, -camera.far, 1.0);
    assert!((near.z / near.w).abs() < 1e-5);
    assert!((far.z / far.w - 1.0).abs() < 1e-5);

    let above = projection * Vec4::new(0.0, 1.0, -1.0, 1.0);
    assert!(above.y < 0.0);
  }
}
