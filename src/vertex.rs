//! Vertex buffer layouts.
//!
//! Field names must match the `in` variables of the shaders; vulkano pairs
//! buffer members with shader inputs by name when building the pipeline's
//! vertex input state.

use glam::Mat4;
use vulkano::{buffer::BufferContents, pipeline::graphics::vertex_input::Vertex};

/// Interleaved per-vertex record, 32 bytes: position, tex_coord, normal.
#[derive(BufferContents, Vertex, Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct MeshVertex {
  #[format(R32G32B32_SFLOAT)]
  pub position:  [f32; 3],
  #[format(R32G32_SFLOAT)]
  pub tex_coord: [f32; 2],
  #[format(R32G32B32_SFLOAT)]
  pub normal:    [f32; 3],
}

/// Per-instance model matrix, four column vectors on consecutive locations.
#[derive(BufferContents, Vertex, Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct InstanceData {
  #[format(R32G32B32A32_SFLOAT)]
  pub model: [[f32; 4]; 4],
}

impl From<Mat4> for InstanceData {
  fn from(model: Mat4) -> Self {
    Self {
      model: model.to_cols_array_2d(),
    }
  }
}

/// Corner of the full-screen sky quad, in normalized device coordinates.
#[derive(BufferContents, Vertex, Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct SkyVertex {
  #[format(R32G32_SFLOAT)]
  pub position: [f32; 2],
}
