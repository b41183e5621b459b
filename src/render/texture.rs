//! Uploading decoded images to sampled GPU textures.
//!
//! Uploads only record copy commands into the given builder. The caller
//! submits the builder once every texture has been recorded and waits for it
//! before the views are used.

use std::sync::Arc;

use anyhow::{Context, Result};
use image::RgbaImage;
use vulkano::{
  buffer::{Buffer, BufferCreateInfo, BufferUsage},
  command_buffer::{AutoCommandBufferBuilder, CopyBufferToImageInfo, PrimaryAutoCommandBuffer},
  device::Device,
  format::Format,
  image::{
    Image,
    ImageCreateFlags,
    ImageCreateInfo,
    ImageType,
    ImageUsage,
    sampler::{Filter, Sampler, SamplerAddressMode, SamplerCreateInfo},
    view::{ImageView, ImageViewCreateInfo, ImageViewType},
  },
  memory::allocator::{AllocationCreateInfo, MemoryTypeFilter, StandardMemoryAllocator},
};

use crate::{
  shading::{self, SamplerState},
  texture::CubemapImages,
};

const CUBE_LAYERS: u32 = 6;

/// Records an upload of `pixels` into a new 2D sRGB texture.
pub fn upload_texture_2d(
  memory_allocator: &Arc<StandardMemoryAllocator>,
  builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
  pixels: &RgbaImage,
) -> Result<Arc<ImageView>> {
  let (width, height) = pixels.dimensions();
  let image = Image::new(
    memory_allocator.clone(),
    ImageCreateInfo {
      image_type: ImageType::Dim2d,
      format: Format::R8G8B8A8_SRGB,
      extent: [width, height, 1],
      usage: ImageUsage::TRANSFER_DST | ImageUsage::SAMPLED,
      ..Default::default()
    },
    AllocationCreateInfo {
      memory_type_filter: MemoryTypeFilter::PREFER_DEVICE,
      ..Default::default()
    },
  )
  .context("failed to create texture image")?;

  record_copy(memory_allocator, builder, pixels.as_raw().iter().copied(), image.clone())?;

  Ok(ImageView::new_default(image)?)
}

/// Records an upload of six cube faces into a cube-compatible image and
/// returns a cube view over it.
pub fn upload_cubemap(
  memory_allocator: &Arc<StandardMemoryAllocator>,
  builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
  cubemap: &CubemapImages,
) -> Result<Arc<ImageView>> {
  let size = cubemap.size();
  let image = Image::new(
    memory_allocator.clone(),
    ImageCreateInfo {
      flags: ImageCreateFlags::CUBE_COMPATIBLE,
      image_type: ImageType::Dim2d,
      format: Format::R8G8B8A8_SRGB,
      extent: [size, size, 1],
      array_layers: CUBE_LAYERS,
      usage: ImageUsage::TRANSFER_DST | ImageUsage::SAMPLED,
      ..Default::default()
    },
    AllocationCreateInfo {
      memory_type_filter: MemoryTypeFilter::PREFER_DEVICE,
      ..Default::default()
    },
  )
  .context("failed to create cubemap image")?;

  // buffer_image copies every array layer from tightly packed data
  record_copy(memory_allocator, builder, cubemap.to_layer_bytes(), image.clone())?;

  Ok(ImageView::new(
    image.clone(),
    ImageViewCreateInfo {
      view_type: ImageViewType::Cube,
      ..ImageViewCreateInfo::from_image(&image)
    },
  )?)
}

fn record_copy<I>(
  memory_allocator: &Arc<StandardMemoryAllocator>,
  builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
  bytes: I,
  image: Arc<Image>,
) -> Result<()>
where
  I: IntoIterator<Item = u8>,
  I::IntoIter: ExactSizeIterator,
{
  let staging_buffer = Buffer::from_iter(
    memory_allocator.clone(),
    BufferCreateInfo {
      usage: BufferUsage::TRANSFER_SRC,
      ..Default::default()
    },
    AllocationCreateInfo {
      memory_type_filter: MemoryTypeFilter::PREFER_HOST | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
      ..Default::default()
    },
    bytes,
  )
  .context("failed to create staging buffer")?;

  builder.copy_buffer_to_image(CopyBufferToImageInfo::buffer_image(staging_buffer, image))?;
  Ok(())
}

/// Creates the device sampler matching a CPU-side [`SamplerState`].
pub fn create_sampler(device: &Arc<Device>, state: &SamplerState) -> Result<Arc<Sampler>> {
  let address_mode = match state.address_mode {
    shading::AddressMode::Repeat => SamplerAddressMode::Repeat,
    shading::AddressMode::MirroredRepeat => SamplerAddressMode::MirroredRepeat,
    shading::AddressMode::ClampToEdge => SamplerAddressMode::ClampToEdge,
  };

  Ok(Sampler::new(
    device.clone(),
    SamplerCreateInfo {
      mag_filter: device_filter(state.mag_filter),
      min_filter: device_filter(state.min_filter),
      address_mode: [address_mode; 3],
      ..Default::default()
    },
  )?)
}

fn device_filter(filter: shading::Filter) -> Filter {
  match filter {
    shading::Filter::Nearest => Filter::Nearest,
    shading::Filter::Linear => Filter::Linear,
  }
}
