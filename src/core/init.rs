use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use vulkano::{
  VulkanLibrary,
  buffer::{
    BufferUsage,
    Subbuffer,
    allocator::{SubbufferAllocator, SubbufferAllocatorCreateInfo},
  },
  command_buffer::{
    AutoCommandBufferBuilder,
    CommandBufferUsage,
    PrimaryCommandBufferAbstract,
    allocator::StandardCommandBufferAllocator,
  },
  descriptor_set::allocator::StandardDescriptorSetAllocator,
  device::{
    Device,
    DeviceCreateInfo,
    DeviceExtensions,
    DeviceFeatures,
    Queue,
    QueueCreateInfo,
    QueueFlags,
    physical::PhysicalDeviceType,
  },
  image::sampler::Sampler,
  image::view::ImageView,
  instance::{Instance, InstanceCreateFlags, InstanceCreateInfo},
  memory::allocator::{MemoryTypeFilter, StandardMemoryAllocator},
  swapchain::Surface,
  sync::GpuFuture,
};
use winit::event_loop::EventLoop;

use crate::{
  config::AssetConfig,
  model::MeshData,
  render::{Drawable, MeshBuffers, create_sampler, upload_cubemap, upload_sky_quad, upload_texture_2d},
  scene::ObjectKind,
  shading::SamplerState,
  texture::{CubemapImages, load_rgba},
  vertex::SkyVertex,
};

/// Device objects and uploaded assets that live for the whole run.
pub struct InitializedVulkan {
  pub instance:                  Arc<Instance>,
  pub device:                    Arc<Device>,
  pub queue:                     Arc<Queue>,
  pub memory_allocator:          Arc<StandardMemoryAllocator>,
  pub descriptor_set_allocator:  Arc<StandardDescriptorSetAllocator>,
  pub command_buffer_allocator:  Arc<StandardCommandBufferAllocator>,
  /// Per-frame `FrameData` blocks
  pub uniform_buffer_allocator:  SubbufferAllocator,
  /// Per-frame instance matrices
  pub instance_buffer_allocator: SubbufferAllocator,
  pub assets:                    SceneAssets,
}

/// Meshes, textures and samplers the frame loop draws with.
pub struct SceneAssets {
  pub branch:           Drawable,
  pub leaf:             Drawable,
  pub sky_texture:      Arc<ImageView>,
  pub sky_quad:         Subbuffer<[SkyVertex]>,
  pub material_sampler: Arc<Sampler>,
  pub sky_sampler:      Arc<Sampler>,
}

impl SceneAssets {
  pub fn drawable(&self, kind: ObjectKind) -> &Drawable {
    match kind {
      ObjectKind::Branch => &self.branch,
      ObjectKind::Leaf => &self.leaf,
    }
  }
}

pub fn initialize_vulkan(event_loop: &EventLoop<()>, assets: &AssetConfig) -> Result<InitializedVulkan> {
  let library = VulkanLibrary::new().context("no Vulkan library found")?;
  let required_extensions = Surface::required_extensions(event_loop)?;
  let instance = Instance::new(
    library,
    InstanceCreateInfo {
      flags: InstanceCreateFlags::ENUMERATE_PORTABILITY,
      enabled_extensions: required_extensions,
      ..Default::default()
    },
  )
  .context("failed to create Vulkan instance")?;

  let device_extensions = DeviceExtensions {
    khr_swapchain: true,
    ..DeviceExtensions::empty()
  };

  let (physical_device, queue_family_index) = instance
    .enumerate_physical_devices()?
    .filter(|p| p.supported_extensions().contains(&device_extensions))
    .filter_map(|p| {
      p.queue_family_properties()
        .iter()
        .enumerate()
        .position(|(i, q)| {
          q.queue_flags.intersects(QueueFlags::GRAPHICS)
            && p.presentation_support(i as u32, event_loop).unwrap_or(false)
        })
        .map(|i| (p, i as u32))
    })
    .min_by_key(|(p, _)| match p.properties().device_type {
      PhysicalDeviceType::DiscreteGpu => 0,
      PhysicalDeviceType::IntegratedGpu => 1,
      PhysicalDeviceType::VirtualGpu => 2,
      PhysicalDeviceType::Cpu => 3,
      PhysicalDeviceType::Other => 4,
      _ => 5,
    })
    .ok_or_else(|| anyhow!("no GPU with graphics and presentation support"))?;

  log::info!(
    "using device: {} (type: {:?})",
    physical_device.properties().device_name,
    physical_device.properties().device_type,
  );

  let (device, mut queues) = Device::new(
    physical_device,
    DeviceCreateInfo {
      enabled_extensions: device_extensions,
      enabled_features: DeviceFeatures {
        #[cfg(target_os = "macos")]
        image_view_format_swizzle: true,
        ..DeviceFeatures::empty()
      },
      queue_create_infos: vec![QueueCreateInfo {
        queue_family_index,
        ..Default::default()
      }],
      ..Default::default()
    },
  )
  .context("failed to create logical device")?;

  let queue = queues.next().ok_or_else(|| anyhow!("device returned no queues"))?;

  let memory_allocator = Arc::new(StandardMemoryAllocator::new_default(device.clone()));
  let descriptor_set_allocator = Arc::new(StandardDescriptorSetAllocator::new(
    device.clone(),
    Default::default(),
  ));
  let command_buffer_allocator = Arc::new(StandardCommandBufferAllocator::new(
    device.clone(),
    Default::default(),
  ));

  let streaming_allocator = |buffer_usage| {
    SubbufferAllocator::new(
      memory_allocator.clone(),
      SubbufferAllocatorCreateInfo {
        buffer_usage,
        memory_type_filter: MemoryTypeFilter::PREFER_DEVICE | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
        ..Default::default()
      },
    )
  };
  let uniform_buffer_allocator = streaming_allocator(BufferUsage::UNIFORM_BUFFER);
  let instance_buffer_allocator = streaming_allocator(BufferUsage::VERTEX_BUFFER);

  let assets = load_scene_assets(
    &device,
    &queue,
    &memory_allocator,
    &command_buffer_allocator,
    assets,
  )?;

  Ok(InitializedVulkan {
    instance,
    device,
    queue,
    memory_allocator,
    descriptor_set_allocator,
    command_buffer_allocator,
    uniform_buffer_allocator,
    instance_buffer_allocator,
    assets,
  })
}

/// Reads every mesh and image from disk, then uploads them with a single
/// submission and waits for it to finish.
fn load_scene_assets(
  device: &Arc<Device>,
  queue: &Arc<Queue>,
  memory_allocator: &Arc<StandardMemoryAllocator>,
  command_buffer_allocator: &Arc<StandardCommandBufferAllocator>,
  config: &AssetConfig,
) -> Result<SceneAssets> {
  let branch_mesh = MeshData::load_obj(&config.branch_model)?;
  let leaf_mesh = MeshData::load_obj(&config.leaf_model)?;
  let branch_pixels = load_rgba(&config.branch_texture)?;
  let leaf_pixels = load_rgba(&config.leaf_texture)?;
  let sky = CubemapImages::load(&config.sky_prefix)?;
  log::info!("loaded sky cubemap {}: {}px faces", config.sky_prefix.display(), sky.size());

  let mut uploads = AutoCommandBufferBuilder::primary(
    command_buffer_allocator.clone(),
    queue.queue_family_index(),
    CommandBufferUsage::OneTimeSubmit,
  )?;

  let branch = Drawable {
    mesh:    MeshBuffers::upload(memory_allocator, &branch_mesh)?,
    texture: upload_texture_2d(memory_allocator, &mut uploads, &branch_pixels)?,
  };
  let leaf = Drawable {
    mesh:    MeshBuffers::upload(memory_allocator, &leaf_mesh)?,
    texture: upload_texture_2d(memory_allocator, &mut uploads, &leaf_pixels)?,
  };
  let sky_texture = upload_cubemap(memory_allocator, &mut uploads, &sky)?;

  uploads
    .build()?
    .execute(queue.clone())?
    .then_signal_fence_and_flush()?
    .wait(None)
    .context("texture upload did not complete")?;

  Ok(SceneAssets {
    branch,
    leaf,
    sky_texture,
    sky_quad: upload_sky_quad(memory_allocator)?,
    material_sampler: create_sampler(device, &SamplerState::MATERIAL)?,
    sky_sampler: create_sampler(device, &SamplerState::SKY)?,
  })
}
