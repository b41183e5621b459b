pub mod model;
pub mod pipeline;
pub mod texture;

pub use model::{Drawable, MeshBuffers, upload_sky_quad};
pub use pipeline::{
  Pipelines,
  RenderContext,
  ShaderSet,
  WindowSizeSetupConfig,
  create_render_pass,
  reserve_sky_texture,
  window_size_dependent_setup,
};
pub use texture::{create_sampler, upload_cubemap, upload_texture_2d};
