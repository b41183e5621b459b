//! Mesh loading from Wavefront OBJ files.

use std::path::Path;

use crate::{
  error::AssetError,
  vertex::{MeshVertex, SkyVertex},
};

/// Triangle list in the layout the scene pipeline consumes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
  pub vertices: Vec<MeshVertex>,
  pub indices:  Vec<u32>,
}

impl MeshData {
  /// Loads and triangulates every model in an OBJ file into one mesh.
  ///
  /// Texture V is flipped because images are stored top row first. Vertices
  /// without a normal or texture coordinate get zeros.
  pub fn load_obj(path: &Path) -> Result<Self, AssetError> {
    let (models, _materials) =
      tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS).map_err(|source| AssetError::Obj {
        path: path.to_path_buf(),
        source,
      })?;

    let mut data = MeshData::default();
    for model in &models {
      data.append(&model.mesh);
    }

    if data.indices.is_empty() {
      return Err(AssetError::EmptyMesh {
        path: path.to_path_buf(),
      });
    }

    log::info!(
      "loaded {} ({} vertices, {} triangles)",
      path.display(),
      data.vertices.len(),
      data.indices.len() / 3
    );
    Ok(data)
  }

  fn append(&mut self, mesh: &tobj::Mesh) {
    let base = self.vertices.len() as u32;
    let count = mesh.positions.len() / 3;

    self.vertices.extend((0..count).map(|i| {
      let tex_coord = mesh
        .texcoords
        .get(i * 2..i * 2 + 2)
        .map_or([0.0, 0.0], |uv| [uv[0], 1.0 - uv[1]]);
      let normal = mesh
        .normals
        .get(i * 3..i * 3 + 3)
        .map_or([0.0; 3], |n| [n[0], n[1], n[2]]);

      MeshVertex {
        position: [
          mesh.positions[i * 3],
          mesh.positions[i * 3 + 1],
          mesh.positions[i * 3 + 2],
        ],
        tex_coord,
        normal,
      }
    }));
    self.indices.extend(mesh.indices.iter().map(|i| base + i));
  }

  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }
}

/// Two triangles covering a rectangle given by its centre and half extents.
pub fn sky_quad(center: [f32; 2], half_size: [f32; 2]) -> [SkyVertex; 6] {
  let [x, y] = center;
  let [w, h] = half_size;
  [
    [x + w, y - h],
    [x - w, y - h],
    [x - w, y + h],
    [x - w, y + h],
    [x + w, y + h],
    [x + w, y - h],
  ]
  .map(|position| SkyVertex { position })
}
