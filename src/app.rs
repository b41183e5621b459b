//! Window, event handling and the frame loop.
//!
//! # Frame Loop
//! Each redraw:
//! 1. Counts the frame and, once a second, puts the frame rate in the title
//! 2. Walks the camera for the held WASD keys, scaled by the frame rate
//! 3. Advances the scene by one growth tick
//! 4. Streams the `FrameData` block and per-kind instance matrices
//! 5. Records the sky and scene draws, submits and presents
//!
//! Errors inside an event callback are logged with their context chain and
//! end the event loop.

use std::{sync::Arc, time::Instant};

use anyhow::{Context, Result, anyhow};
use vulkano::{
  Validated,
  VulkanError,
  buffer::allocator::SubbufferAllocator,
  command_buffer::{AutoCommandBufferBuilder, CommandBufferUsage, allocator::StandardCommandBufferAllocator},
  descriptor_set::{
    DescriptorSet,
    WriteDescriptorSet,
    allocator::StandardDescriptorSetAllocator,
    layout::DescriptorSetLayout,
  },
  device::{Device, Queue},
  format::Format,
  image::ImageUsage,
  instance::Instance,
  memory::allocator::StandardMemoryAllocator,
  pipeline::{GraphicsPipeline, Pipeline},
  swapchain::{
    CompositeAlpha,
    PresentMode,
    Surface,
    Swapchain,
    SwapchainCreateInfo,
    SwapchainPresentInfo,
    acquire_next_image,
  },
  sync::{self, GpuFuture},
};
use winit::{
  application::ApplicationHandler,
  dpi::LogicalSize,
  event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent},
  event_loop::{ActiveEventLoop, EventLoop},
  keyboard::{KeyCode, PhysicalKey},
  window::{CursorGrabMode, Window, WindowId},
};

use crate::{
  config::Config,
  core::{
    command_buffer_builder_ext::{AutoCommandBufferBuilderExt, BatchDraw, SkyDraw},
    init::{SceneAssets, initialize_vulkan},
  },
  interface::{FRAME_DATA_BINDING, IMAGE_TEXTURE_BINDING, SCENE_SET, SKY_PASS_TEXTURE_BINDING, SKY_TEXTURE_BINDING},
  render::{
    Pipelines,
    RenderContext,
    ShaderSet,
    WindowSizeSetupConfig,
    create_render_pass,
    window_size_dependent_setup,
  },
  scene::Scene,
  shaders::{sky_vs, vs},
  timing::FrameTimer,
  vertex::InstanceData,
};

/// Bit for a movement key in the mask understood by
/// [`crate::camera::walk_offset`].
fn walk_key_bit(code: KeyCode) -> Option<u8> {
  match code {
    KeyCode::KeyW => Some(1),
    KeyCode::KeyA => Some(2),
    KeyCode::KeyS => Some(4),
    KeyCode::KeyD => Some(8),
    _ => None,
  }
}

pub struct App {
  config: Config,

  // Vulkan resources
  instance:                  Arc<Instance>,
  device:                    Arc<Device>,
  queue:                     Arc<Queue>,
  memory_allocator:          Arc<StandardMemoryAllocator>,
  descriptor_set_allocator:  Arc<StandardDescriptorSetAllocator>,
  command_buffer_allocator:  Arc<StandardCommandBufferAllocator>,
  uniform_buffer_allocator:  SubbufferAllocator,
  instance_buffer_allocator: SubbufferAllocator,
  assets:                    SceneAssets,

  rcx: Option<RenderContext>,

  scene:       Scene,
  frame_timer: FrameTimer,

  // Input state
  held_keys:       u8,
  cursor_captured: bool,
}

impl App {
  /// Sets up the device and uploads every asset. The window is created later,
  /// in [`ApplicationHandler::resumed`].
  pub fn new(event_loop: &EventLoop<()>, config: Config) -> Result<Self> {
    let initialized = initialize_vulkan(event_loop, &config.assets)?;
    let scene = Scene::new(&config);

    Ok(App {
      instance: initialized.instance,
      device: initialized.device,
      queue: initialized.queue,
      memory_allocator: initialized.memory_allocator,
      descriptor_set_allocator: initialized.descriptor_set_allocator,
      command_buffer_allocator: initialized.command_buffer_allocator,
      uniform_buffer_allocator: initialized.uniform_buffer_allocator,
      instance_buffer_allocator: initialized.instance_buffer_allocator,
      assets: initialized.assets,
      rcx: None,
      scene,
      frame_timer: FrameTimer::new(Instant::now()),
      held_keys: 0,
      cursor_captured: false,
      config,
    })
  }

  fn create_render_context(&self, event_loop: &ActiveEventLoop) -> Result<RenderContext> {
    let window_attrs = Window::default_attributes()
      .with_title(self.config.window.title.clone())
      .with_inner_size(LogicalSize::new(self.config.window.width, self.config.window.height));
    let window = Arc::new(event_loop.create_window(window_attrs)?);

    let surface = Surface::from_window(self.instance.clone(), window.clone())?;
    let window_size = window.inner_size();
    let physical_device = self.device.physical_device();

    let (swapchain, images) = {
      let surface_capabilities = physical_device.surface_capabilities(&surface, Default::default())?;

      let present_modes = physical_device.surface_present_modes(&surface, Default::default())?;
      let present_mode = if present_modes.contains(&PresentMode::Immediate) {
        PresentMode::Immediate
      } else if present_modes.contains(&PresentMode::Mailbox) {
        PresentMode::Mailbox
      } else {
        PresentMode::Fifo
      };
      log::info!("present mode: {present_mode:?}");

      // sRGB targets so sRGB textures come out unchanged
      let formats = physical_device.surface_formats(&surface, Default::default())?;
      let (image_format, _) = formats
        .iter()
        .copied()
        .find(|(format, _)| matches!(format, Format::B8G8R8A8_SRGB | Format::R8G8B8A8_SRGB))
        .or_else(|| formats.first().copied())
        .ok_or_else(|| anyhow!("surface reports no formats"))?;
      log::info!("swapchain format: {image_format:?}");

      Swapchain::new(self.device.clone(), surface, SwapchainCreateInfo {
        min_image_count: surface_capabilities.min_image_count.max(2),
        image_format,
        image_extent: window_size.into(),
        image_usage: ImageUsage::COLOR_ATTACHMENT,
        composite_alpha: CompositeAlpha::Opaque,
        pre_transform: surface_capabilities.current_transform,
        clipped: true,
        present_mode,
        ..Default::default()
      })
      .context("failed to create swapchain")?
    };

    let render_pass = create_render_pass(&self.device, swapchain.image_format())?;
    let shaders = ShaderSet::load(&self.device)?;

    let (framebuffers, pipelines) = window_size_dependent_setup(WindowSizeSetupConfig {
      window_size,
      images: &images,
      render_pass: &render_pass,
      memory_allocator: &self.memory_allocator,
      shaders: &shaders,
    })?;

    Ok(RenderContext {
      window,
      swapchain,
      render_pass,
      framebuffers,
      shaders,
      pipelines,
      recreate_swapchain: false,
      previous_frame_end: Some(sync::now(self.device.clone()).boxed()),
    })
  }

  fn capture_cursor(&mut self) {
    let Some(rcx) = self.rcx.as_ref() else {
      return;
    };
    let grabbed = rcx
      .window
      .set_cursor_grab(CursorGrabMode::Locked)
      .or_else(|_| rcx.window.set_cursor_grab(CursorGrabMode::Confined));
    match grabbed {
      Ok(()) => {
        rcx.window.set_cursor_visible(false);
        self.cursor_captured = true;
      }
      Err(e) => log::warn!("failed to capture cursor: {e}"),
    }
  }

  fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
    let PhysicalKey::Code(code) = event.physical_key else {
      return;
    };
    let pressed = event.state == ElementState::Pressed;

    if code == KeyCode::Escape && pressed {
      event_loop.exit();
    } else if let Some(bit) = walk_key_bit(code) {
      if pressed {
        self.held_keys |= bit;
      } else {
        self.held_keys &= !bit;
      }
    }
  }

  fn redraw(&mut self) -> Result<()> {
    if let Some(fps) = self.frame_timer.tick(Instant::now()) {
      if let Some(rcx) = &self.rcx {
        rcx.window.set_title(&format!("Running at {fps} fps."));
      }
    }

    let distance = self.config.camera.walk_speed * self.frame_timer.rate();
    self.scene.walk_camera(self.held_keys, distance);
    self.scene.update();

    let Some(rcx) = self.rcx.as_mut() else {
      return Ok(());
    };
    let window_size = rcx.window.inner_size();
    if window_size.width == 0 || window_size.height == 0 {
      return Ok(());
    }

    if let Some(previous_frame_end) = rcx.previous_frame_end.as_mut() {
      previous_frame_end.cleanup_finished();
    }

    if rcx.recreate_swapchain {
      let (new_swapchain, new_images) = rcx
        .swapchain
        .recreate(SwapchainCreateInfo {
          image_extent: window_size.into(),
          ..rcx.swapchain.create_info()
        })
        .context("failed to recreate swapchain")?;

      rcx.swapchain = new_swapchain;
      (rcx.framebuffers, rcx.pipelines) = window_size_dependent_setup(WindowSizeSetupConfig {
        window_size,
        images: &new_images,
        render_pass: &rcx.render_pass,
        memory_allocator: &self.memory_allocator,
        shaders: &rcx.shaders,
      })?;
      rcx.recreate_swapchain = false;
    }

    let pipelines = rcx.pipelines.clone();
    let aspect_ratio = rcx.aspect_ratio();
    let (sky, batches) = self.frame_draws(&pipelines, aspect_ratio)?;

    let Some(rcx) = self.rcx.as_mut() else {
      return Ok(());
    };

    let (image_index, suboptimal, acquire_future) =
      match acquire_next_image(rcx.swapchain.clone(), None).map_err(Validated::unwrap) {
        Ok(r) => r,
        Err(VulkanError::OutOfDate) => {
          rcx.recreate_swapchain = true;
          return Ok(());
        }
        Err(e) => return Err(e).context("failed to acquire next image"),
      };

    if suboptimal {
      rcx.recreate_swapchain = true;
    }

    let mut builder = AutoCommandBufferBuilder::primary(
      self.command_buffer_allocator.clone(),
      self.queue.queue_family_index(),
      CommandBufferUsage::OneTimeSubmit,
    )?;
    builder.build_frame_render_pass(rcx, image_index, &sky, &batches)?;
    let command_buffer = builder.build()?;

    let previous_frame_end = rcx
      .previous_frame_end
      .take()
      .unwrap_or_else(|| sync::now(self.device.clone()).boxed());

    let future = previous_frame_end
      .join(acquire_future)
      .then_execute(self.queue.clone(), command_buffer)?
      .then_swapchain_present(
        self.queue.clone(),
        SwapchainPresentInfo::swapchain_image_index(rcx.swapchain.clone(), image_index),
      )
      .then_signal_fence_and_flush();

    match future.map_err(Validated::unwrap) {
      Ok(future) => {
        rcx.previous_frame_end = Some(future.boxed());
      }
      Err(VulkanError::OutOfDate) => {
        rcx.recreate_swapchain = true;
        rcx.previous_frame_end = Some(sync::now(self.device.clone()).boxed());
      }
      Err(e) => {
        log::warn!("failed to flush frame: {e}");
        rcx.previous_frame_end = Some(sync::now(self.device.clone()).boxed());
      }
    }

    Ok(())
  }

  /// Streams this frame's uniforms and instance matrices and writes the
  /// descriptor sets that reference them.
  fn frame_draws(&self, pipelines: &Pipelines, aspect_ratio: f32) -> Result<(SkyDraw, Vec<BatchDraw>)> {
    let camera = &self.scene.camera;

    let frame_data = self.uniform_buffer_allocator.allocate_sized()?;
    *frame_data.write()? = vs::FrameData {
      view:       camera.view_matrix().as_mat4().to_cols_array_2d(),
      projection: camera.projection_matrix(aspect_ratio).to_cols_array_2d(),
      viewerPos:  camera.position.as_vec3().to_array(),
    };

    let [forwards, right, up] = camera.sky_basis(aspect_ratio);
    let sky = SkyDraw {
      descriptor_set: DescriptorSet::new(
        self.descriptor_set_allocator.clone(),
        set_layout(&pipelines.sky, 0)?,
        [WriteDescriptorSet::image_view_sampler(
          SKY_PASS_TEXTURE_BINDING,
          self.assets.sky_texture.clone(),
          self.assets.sky_sampler.clone(),
        )],
        [],
      )?,
      camera:         sky_vs::SkyCamera {
        camera_forwards: forwards.extend(0.0).to_array(),
        camera_right:    right.extend(0.0).to_array(),
        camera_up:       up.extend(0.0).to_array(),
      },
      quad:           self.assets.sky_quad.clone(),
    };

    let scene_layout = set_layout(&pipelines.scene, SCENE_SET)?;
    let mut batches = Vec::new();
    for batch in self.scene.render_batches() {
      let drawable = self.assets.drawable(batch.kind);

      let instances = self
        .instance_buffer_allocator
        .allocate_slice::<InstanceData>(batch.transforms.len() as u64)?;
      for (slot, transform) in instances.write()?.iter_mut().zip(&batch.transforms) {
        *slot = InstanceData::from(*transform);
      }

      // skyTexture is written even though nothing samples it yet
      let descriptor_set = DescriptorSet::new(
        self.descriptor_set_allocator.clone(),
        scene_layout.clone(),
        [
          WriteDescriptorSet::buffer(FRAME_DATA_BINDING, frame_data.clone()),
          WriteDescriptorSet::image_view_sampler(
            SKY_TEXTURE_BINDING,
            self.assets.sky_texture.clone(),
            self.assets.sky_sampler.clone(),
          ),
          WriteDescriptorSet::image_view_sampler(
            IMAGE_TEXTURE_BINDING,
            drawable.texture.clone(),
            self.assets.material_sampler.clone(),
          ),
        ],
        [],
      )?;

      batches.push(BatchDraw {
        descriptor_set,
        vertices: drawable.mesh.vertices.clone(),
        indices: drawable.mesh.indices.clone(),
        instances,
      });
    }

    Ok((sky, batches))
  }
}

fn set_layout(pipeline: &GraphicsPipeline, set: u32) -> Result<Arc<DescriptorSetLayout>> {
  pipeline
    .layout()
    .set_layouts()
    .get(set as usize)
    .cloned()
    .ok_or_else(|| anyhow!("pipeline layout has no descriptor set {set}"))
}

impl ApplicationHandler for App {
  fn resumed(&mut self, event_loop: &ActiveEventLoop) {
    if self.rcx.is_some() {
      return;
    }
    match self.create_render_context(event_loop) {
      Ok(rcx) => self.rcx = Some(rcx),
      Err(e) => {
        log::error!("failed to set up window: {e:#}");
        event_loop.exit();
      }
    }
  }

  fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
    match event {
      WindowEvent::CloseRequested => {
        event_loop.exit();
      }
      WindowEvent::Resized(_) => {
        if let Some(rcx) = self.rcx.as_mut() {
          rcx.recreate_swapchain = true;
        }
      }
      WindowEvent::MouseInput {
        state: ElementState::Pressed,
        button: MouseButton::Left,
        ..
      } => {
        self.capture_cursor();
      }
      WindowEvent::KeyboardInput { event, .. } => {
        self.handle_key(event_loop, &event);
      }
      WindowEvent::RedrawRequested => {
        if let Err(e) = self.redraw() {
          log::error!("frame failed: {e:#}");
          event_loop.exit();
        }
      }
      _ => {}
    }
  }

  fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
    if let DeviceEvent::MouseMotion { delta: (delta_x, delta_y) } = event {
      if self.cursor_captured {
        let sensitivity = self.config.camera.mouse_sensitivity;
        self.scene.camera.spin(-delta_x * sensitivity, -delta_y * sensitivity);
      }
    }
  }

  fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
    if let Some(rcx) = self.rcx.as_ref() {
      rcx.window.request_redraw();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::camera::walk_offset;

  #[test]
  fn movement_keys_map_to_walk_mask() {
    let mask = [KeyCode::KeyW, KeyCode::KeyA]
      .into_iter()
      .filter_map(walk_key_bit)
      .fold(0, |mask, bit| mask | bit);
    assert_eq!(walk_offset(mask), Some(45.0));
    assert_eq!(walk_key_bit(KeyCode::Space), None);
  }
}
