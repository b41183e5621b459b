//! CPU reference model of the scene shaders.
//!
//! `vertex.glsl` and `fragment.glsl` run on the GPU, where nothing can be
//! asserted on directly. The functions here compute the same values on the
//! CPU so the transform order, the normal handling and the texture lookup can
//! be tested. Every invocation is a pure function of its inputs.

pub mod fragment_stage;
pub mod sampler;
pub mod vertex_stage;

pub use fragment_stage::{FragmentBindings, FragmentInput, shade_fragment};
pub use sampler::{AddressMode, Filter, SamplerState, Texture2d};
pub use vertex_stage::{FrameUniforms, VertexInput, VertexOutput, transform_vertex};
