pub mod app;
pub mod camera;
pub mod config;
pub mod core;
pub mod error;
pub mod interface;
pub mod model;
pub mod render;
pub mod scene;
pub mod shaders;
pub mod shading;
pub mod texture;
pub mod timing;
pub mod vertex;

// Re-export commonly used items
pub use app::App;
pub use camera::Camera;
pub use config::Config;
pub use error::{AssetError, ConfigError};
pub use model::MeshData;
pub use render::{RenderContext, WindowSizeSetupConfig, window_size_dependent_setup};
pub use scene::{ObjectKind, Scene};
pub use shaders::{fs, sky_fs, sky_vs, vs};
pub use vertex::{InstanceData, MeshVertex, SkyVertex};
