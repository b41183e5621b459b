//! GLSL shader compilation and loading.
//!
//! Shaders are compiled to SPIR-V at build time by the `vulkano_shaders`
//! macro, which also generates Rust types for their uniform blocks and push
//! constants. A GLSL error therefore fails `cargo build` rather than showing
//! up at runtime.

/// Scene vertex shader.
///
/// Transforms each vertex by its instance's model matrix, then by the view and
/// projection from `FrameData`, and forwards the texture coordinate plus the
/// world-space normal and position.
pub mod vs {
  vulkano_shaders::shader! {
    ty: "vertex",
    path: "src/shaders/vertex.glsl",
  }
}

/// Scene fragment shader.
///
/// Outputs the material texture sampled at the interpolated texture
/// coordinate. Declares `skyTexture` and `viewerPos` without reading them.
pub mod fs {
  vulkano_shaders::shader! {
    ty: "fragment",
    path: "src/shaders/fragment.glsl",
  }
}

/// Sky vertex shader: full-screen quad plus a view ray per corner.
pub mod sky_vs {
  vulkano_shaders::shader! {
    ty: "vertex",
    path: "src/shaders/sky_vertex.glsl",
  }
}

/// Sky fragment shader: samples the cubemap along the interpolated ray.
pub mod sky_fs {
  vulkano_shaders::shader! {
    ty: "fragment",
    path: "src/shaders/sky_fragment.glsl",
  }
}
