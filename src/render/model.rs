use std::sync::Arc;

use anyhow::{Context, Result};
use vulkano::{
  buffer::{Buffer, BufferContents, BufferCreateInfo, BufferUsage, Subbuffer},
  image::view::ImageView,
  memory::allocator::{AllocationCreateInfo, MemoryTypeFilter, StandardMemoryAllocator},
};

use crate::{
  model::{MeshData, sky_quad},
  vertex::{MeshVertex, SkyVertex},
};

/// Device buffers for one indexed triangle mesh.
///
/// * `vertices`: interleaved [`MeshVertex`] records, bound at binding 0
/// * `indices`: three `u32` per triangle
///
/// Instance matrices are not part of the mesh; they are streamed every frame
/// and bound next to `vertices`.
pub struct MeshBuffers {
  pub vertices: Subbuffer<[MeshVertex]>,
  pub indices:  Subbuffer<[u32]>,
}

impl MeshBuffers {
  pub fn upload(memory_allocator: &Arc<StandardMemoryAllocator>, mesh: &MeshData) -> Result<Self> {
    let vertices = device_buffer(
      memory_allocator,
      BufferUsage::VERTEX_BUFFER,
      mesh.vertices.iter().copied(),
    )
    .context("failed to create vertex buffer")?;
    let indices = device_buffer(
      memory_allocator,
      BufferUsage::INDEX_BUFFER,
      mesh.indices.iter().copied(),
    )
    .context("failed to create index buffer")?;

    Ok(Self { vertices, indices })
  }
}

/// A mesh together with the texture bound as `imageTexture` when drawing it.
pub struct Drawable {
  pub mesh:    MeshBuffers,
  pub texture: Arc<ImageView>,
}

/// Vertex buffer for the sky pass: one quad covering the whole viewport.
pub fn upload_sky_quad(memory_allocator: &Arc<StandardMemoryAllocator>) -> Result<Subbuffer<[SkyVertex]>> {
  device_buffer(
    memory_allocator,
    BufferUsage::VERTEX_BUFFER,
    sky_quad([0.0, 0.0], [1.0, 1.0]),
  )
  .context("failed to create sky quad buffer")
}

fn device_buffer<T, I>(
  memory_allocator: &Arc<StandardMemoryAllocator>,
  usage: BufferUsage,
  data: I,
) -> Result<Subbuffer<[T]>>
where
  T: BufferContents,
  I: IntoIterator<Item = T>,
  I::IntoIter: ExactSizeIterator,
{
  Ok(Buffer::from_iter(
    memory_allocator.clone(),
    BufferCreateInfo {
      usage,
      ..Default::default()
    },
    AllocationCreateInfo {
      memory_type_filter: MemoryTypeFilter::PREFER_DEVICE | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
      ..Default::default()
    },
    data,
  )?)
}
