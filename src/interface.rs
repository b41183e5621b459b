//! Binding contract between the host and the scene shaders.
//!
//! Attribute locations, descriptor bindings and varying names here are fixed.
//! Buffers, descriptor writes and the GLSL sources all have to agree with
//! them; changing one side without the other breaks the pipeline.

/// Vertex input locations.
pub mod attribute {
  pub const POSITION: u32 = 0;
  pub const TEX_COORD: u32 = 1;
  pub const NORMAL: u32 = 2;
  /// First of the four locations holding the instance matrix columns.
  pub const MODEL: u32 = 3;
  pub const MODEL_LOCATIONS: u32 = 4;
}

/// Descriptor set shared by both scene stages.
pub const SCENE_SET: u32 = 0;
/// `FrameData { view, projection, viewerPos }`
pub const FRAME_DATA_BINDING: u32 = 0;
/// `skyTexture`, reserved. Always present in the layout and always written.
pub const SKY_TEXTURE_BINDING: u32 = 1;
/// `imageTexture`
pub const IMAGE_TEXTURE_BINDING: u32 = 2;

/// Cubemap binding in the sky pipeline's own set.
pub const SKY_PASS_TEXTURE_BINDING: u32 = 0;

/// Members of the `FrameData` block, in declaration order.
pub const FRAME_DATA_MEMBERS: [(&str, &str); 3] = [
  ("mat4", "view"),
  ("mat4", "projection"),
  ("vec3", "viewerPos"),
];

/// Vertex-to-fragment varyings, indexed by location.
pub const VARYINGS: [(&str, &str); 3] = [
  ("vec2", "fragmentTexCoord"),
  ("vec3", "fragmentNormal"),
  ("vec3", "fragmentPos"),
];

#[cfg(test)]
mod tests {
  use vulkano::{format::Format, pipeline::graphics::vertex_input::Vertex};

  use super::*;
  use crate::vertex::{InstanceData, MeshVertex};

  const VERTEX_SRC: &str = include_str!("shaders/vertex.glsl");
  const FRAGMENT_SRC: &str = include_str!("shaders/fragment.glsl");

  fn declares(src: &str, line: &str) -> bool {
    src.lines().any(|l| l.trim() == line)
  }

  #[test]
  fn vertex_inputs_sit_at_fixed_locations() {
    for (location, decl) in [
      (attribute::POSITION, "in vec3 position;"),
      (attribute::TEX_COORD, "in vec2 tex_coord;"),
      (attribute::NORMAL, "in vec3 normal;"),
      (attribute::MODEL, "in mat4 model;"),
    ] {
      let line = format!("layout(location = {location}) {decl}");
      assert!(declares(VERTEX_SRC, &line), "missing `{line}`");
    }
  }

  #[test]
  fn varyings_match_between_stages() {
    for (location, (ty, name)) in VARYINGS.iter().enumerate() {
      let out = format!("layout(location = {location}) out {ty} {name};");
      let input = format!("layout(location = {location}) in {ty} {name};");
      assert!(declares(VERTEX_SRC, &out), "vertex stage missing `{out}`");
      assert!(declares(FRAGMENT_SRC, &input), "fragment stage missing `{input}`");
    }
  }

  #[test]
  fn fragment_declares_every_binding() {
    let sky = format!("layout(set = {SCENE_SET}, binding = {SKY_TEXTURE_BINDING}) uniform samplerCube skyTexture;");
    let image = format!(
      "layout(set = {SCENE_SET}, binding = {IMAGE_TEXTURE_BINDING}) uniform sampler2D imageTexture;"
    );
    let frame = format!("layout(set = {SCENE_SET}, binding = {FRAME_DATA_BINDING}) uniform FrameData {{");

    assert!(declares(FRAGMENT_SRC, &sky));
    assert!(declares(FRAGMENT_SRC, &image));
    assert!(declares(FRAGMENT_SRC, &frame));
    assert!(declares(VERTEX_SRC, &frame));
  }

  #[test]
  fn frame_data_members_match_in_both_stages() {
    for src in [VERTEX_SRC, FRAGMENT_SRC] {
      let members: Vec<&str> = src
        .lines()
        .map(str::trim)
        .skip_while(|l| !l.ends_with("uniform FrameData {"))
        .skip(1)
        .take_while(|l| *l != "};")
        .collect();
      let expected: Vec<String> = FRAME_DATA_MEMBERS
        .iter()
        .map(|(ty, name)| format!("{ty} {name};"))
        .collect();
      assert_eq!(members, expected);
    }
  }

  #[test]
  fn transform_order_is_projection_view_model() {
    assert!(VERTEX_SRC.contains("gl_Position = projection * view * model * vec4(position, 1.0);"));
    assert!(FRAGMENT_SRC.contains("color = texture(imageTexture, fragmentTexCoord);"));
  }

  #[test]
  fn buffer_members_match_shader_inputs() {
    let per_vertex = MeshVertex::per_vertex();
    assert_eq!(per_vertex.members["position"].format, Format::R32G32B32_SFLOAT);
    assert_eq!(per_vertex.members["tex_coord"].format, Format::R32G32_SFLOAT);
    assert_eq!(per_vertex.members["normal"].format, Format::R32G32B32_SFLOAT);

    let per_instance = InstanceData::per_instance();
    assert_eq!(per_instance.members["model"].format, Format::R32G32B32A32_SFLOAT);
    assert_eq!(per_instance.stride, 16 * attribute::MODEL_LOCATIONS);
  }
}
