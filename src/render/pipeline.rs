//! Vulkan pipelines and window size dependent resources.
//!
//! One render pass with one subpass draws two pipelines in order:
//! * Sky: a full-screen quad sampling the cubemap, with no depth test or write
//! * Scene: instanced textured meshes, depth tested against a cleared buffer
//!
//! Both render into a 4x multisampled color attachment that is resolved into
//! the swapchain image at the end of the subpass.
//!
//! # Usage
//! [`window_size_dependent_setup`] is called once the window exists and again
//! whenever the swapchain is recreated, since viewports are baked into the
//! pipelines.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use vulkano::{
  descriptor_set::layout::{DescriptorSetLayoutBinding, DescriptorType},
  device::{Device, DeviceOwned},
  format::Format,
  image::{Image, ImageCreateInfo, ImageType, ImageUsage, SampleCount, view::ImageView},
  memory::allocator::{AllocationCreateInfo, StandardMemoryAllocator},
  pipeline::{
    GraphicsPipeline,
    PipelineLayout,
    PipelineShaderStageCreateInfo,
    graphics::{
      GraphicsPipelineCreateInfo,
      color_blend::{
        AttachmentBlend,
        BlendFactor,
        BlendOp,
        ColorBlendAttachmentState,
        ColorBlendState,
        ColorComponents,
      },
      depth_stencil::{DepthState, DepthStencilState},
      input_assembly::InputAssemblyState,
      multisample::MultisampleState,
      rasterization::{CullMode, RasterizationState},
      vertex_input::{Vertex, VertexDefinition, VertexInputState},
      viewport::{Viewport, ViewportState},
    },
    layout::PipelineDescriptorSetLayoutCreateInfo,
  },
  render_pass::{Framebuffer, FramebufferCreateInfo, RenderPass, Subpass},
  shader::{EntryPoint, ShaderStages},
  swapchain::Swapchain,
  sync::GpuFuture,
};
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
  interface::{SCENE_SET, SKY_TEXTURE_BINDING},
  vertex::{InstanceData, MeshVertex, SkyVertex},
};

const SAMPLES: SampleCount = SampleCount::Sample4;
const DEPTH_FORMAT: Format = Format::D32_SFLOAT;

/// Everything tied to the window and its swapchain.
///
/// * `window`: the window being presented to
/// * `swapchain`: frame presentation and image acquisition
/// * `render_pass`: msaa color, resolved color, depth
/// * `framebuffers`: one per swapchain image
/// * `pipelines`: rebuilt together with `framebuffers`
pub struct RenderContext {
  pub window:             Arc<Window>,
  pub swapchain:          Arc<Swapchain>,
  pub render_pass:        Arc<RenderPass>,
  pub framebuffers:       Vec<Arc<Framebuffer>>,
  pub shaders:            ShaderSet,
  pub pipelines:          Pipelines,
  /// Set when the swapchain no longer matches the window
  pub recreate_swapchain: bool,
  /// Completion of the previously submitted frame
  pub previous_frame_end: Option<Box<dyn GpuFuture>>,
}

impl RenderContext {
  pub fn aspect_ratio(&self) -> f32 {
    let [width, height] = self.swapchain.image_extent();
    width as f32 / height.max(1) as f32
  }
}

/// Entry points of the four compiled shaders.
#[derive(Clone)]
pub struct ShaderSet {
  pub vs:     EntryPoint,
  pub fs:     EntryPoint,
  pub sky_vs: EntryPoint,
  pub sky_fs: EntryPoint,
}

impl ShaderSet {
  pub fn load(device: &Arc<Device>) -> Result<Self> {
    let entry = |module: Option<EntryPoint>, name: &str| {
      module.ok_or_else(|| anyhow!("{name} has no `main` entry point"))
    };

    Ok(Self {
      vs:     entry(crate::vs::load(device.clone())?.entry_point("main"), "vertex.glsl")?,
      fs:     entry(crate::fs::load(device.clone())?.entry_point("main"), "fragment.glsl")?,
      sky_vs: entry(crate::sky_vs::load(device.clone())?.entry_point("main"), "sky_vertex.glsl")?,
      sky_fs: entry(crate::sky_fs::load(device.clone())?.entry_point("main"), "sky_fragment.glsl")?,
    })
  }
}

#[derive(Clone)]
pub struct Pipelines {
  pub sky:   Arc<GraphicsPipeline>,
  pub scene: Arc<GraphicsPipeline>,
}

/// Resources needed to rebuild framebuffers and pipelines after a resize.
#[derive(Clone)]
pub struct WindowSizeSetupConfig<'a> {
  pub window_size:      PhysicalSize<u32>,
  pub images:           &'a [Arc<Image>],
  pub render_pass:      &'a Arc<RenderPass>,
  pub memory_allocator: &'a Arc<StandardMemoryAllocator>,
  pub shaders:          &'a ShaderSet,
}

/// Single subpass with a multisampled color target resolved into the
/// swapchain image.
pub fn create_render_pass(device: &Arc<Device>, swapchain_format: Format) -> Result<Arc<RenderPass>> {
  vulkano::ordered_passes_renderpass!(
    device.clone(),
    attachments: {
      msaa_color: {
        format: swapchain_format,
        samples: 4,
        load_op: Clear,
        store_op: DontCare,
      },
      final_color: {
        format: swapchain_format,
        samples: 1,
        load_op: DontCare,
        store_op: Store,
      },
      depth: {
        format: DEPTH_FORMAT,
        samples: 4,
        load_op: Clear,
        store_op: DontCare,
      },
    },
    passes: [
      {
        color: [msaa_color],
        color_resolve: [final_color],
        depth_stencil: {depth},
        input: [],
      },
    ],
  )
  .context("failed to create render pass")
}

/// Creates framebuffers for every swapchain image and builds both pipelines
/// for the current window size.
pub fn window_size_dependent_setup(config: WindowSizeSetupConfig) -> Result<(Vec<Arc<Framebuffer>>, Pipelines)> {
  let device = config.memory_allocator.device();

  let depth_buffer = ImageView::new_default(
    Image::new(
      config.memory_allocator.clone(),
      ImageCreateInfo {
        image_type: ImageType::Dim2d,
        format: DEPTH_FORMAT,
        extent: config.images[0].extent(),
        usage: ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::TRANSIENT_ATTACHMENT,
        samples: SAMPLES,
        ..Default::default()
      },
      AllocationCreateInfo::default(),
    )
    .context("failed to create depth buffer")?,
  )?;

  let framebuffers = config
    .images
    .iter()
    .map(|image| -> Result<Arc<Framebuffer>> {
      let view = ImageView::new_default(image.clone())?;
      let msaa_color = ImageView::new_default(
        Image::new(
          config.memory_allocator.clone(),
          ImageCreateInfo {
            image_type: ImageType::Dim2d,
            format: image.format(),
            extent: image.extent(),
            usage: ImageUsage::COLOR_ATTACHMENT | ImageUsage::TRANSIENT_ATTACHMENT,
            samples: SAMPLES,
            ..Default::default()
          },
          AllocationCreateInfo::default(),
        )
        .context("failed to create msaa color buffer")?,
      )?;

      Ok(Framebuffer::new(
        config.render_pass.clone(),
        FramebufferCreateInfo {
          attachments: vec![msaa_color, view, depth_buffer.clone()],
          ..Default::default()
        },
      )?)
    })
    .collect::<Result<Vec<_>>>()?;

  let subpass = Subpass::from(config.render_pass.clone(), 0).ok_or_else(|| anyhow!("render pass has no subpass 0"))?;

  let sky = {
    let vertex_input_state = SkyVertex::per_vertex().definition(&config.shaders.sky_vs)?;
    let stages = [
      PipelineShaderStageCreateInfo::new(config.shaders.sky_vs.clone()),
      PipelineShaderStageCreateInfo::new(config.shaders.sky_fs.clone()),
    ];
    let layout_info = PipelineDescriptorSetLayoutCreateInfo::from_stages(&stages);

    build_pipeline(
      device,
      &config,
      &subpass,
      PipelineParts {
        stages,
        layout_info,
        vertex_input_state,
        depth: None,
        blend: None,
      },
    )
    .context("failed to create sky pipeline")?
  };

  let scene = {
    let vertex_input_state =
      [MeshVertex::per_vertex(), InstanceData::per_instance()].definition(&config.shaders.vs)?;
    let stages = [
      PipelineShaderStageCreateInfo::new(config.shaders.vs.clone()),
      PipelineShaderStageCreateInfo::new(config.shaders.fs.clone()),
    ];
    let mut layout_info = PipelineDescriptorSetLayoutCreateInfo::from_stages(&stages);
    reserve_sky_texture(&mut layout_info);

    build_pipeline(
      device,
      &config,
      &subpass,
      PipelineParts {
        stages,
        layout_info,
        vertex_input_state,
        depth: Some(DepthState::simple()),
        blend: Some(AttachmentBlend {
          src_color_blend_factor: BlendFactor::SrcAlpha,
          dst_color_blend_factor: BlendFactor::OneMinusSrcAlpha,
          color_blend_op: BlendOp::Add,
          src_alpha_blend_factor: BlendFactor::One,
          dst_alpha_blend_factor: BlendFactor::Zero,
          alpha_blend_op: BlendOp::Add,
        }),
      },
    )
    .context("failed to create scene pipeline")?
  };

  Ok((framebuffers, Pipelines { sky, scene }))
}

/// Keeps `skyTexture` in the scene layout.
///
/// The fragment shader declares it without reading it, and the compiler is
/// free to strip unused resources from the SPIR-V, in which case reflection
/// would leave the binding out and writing it would fail.
pub fn reserve_sky_texture(layout_info: &mut PipelineDescriptorSetLayoutCreateInfo) {
  if let Some(set) = layout_info.set_layouts.get_mut(SCENE_SET as usize) {
    set.bindings.entry(SKY_TEXTURE_BINDING).or_insert_with(|| DescriptorSetLayoutBinding {
      stages: ShaderStages::FRAGMENT,
      ..DescriptorSetLayoutBinding::descriptor_type(DescriptorType::CombinedImageSampler)
    });
  }
}

struct PipelineParts {
  stages:             [PipelineShaderStageCreateInfo; 2],
  layout_info:        PipelineDescriptorSetLayoutCreateInfo,
  vertex_input_state: VertexInputState,
  depth:              Option<DepthState>,
  blend:              Option<AttachmentBlend>,
}

fn build_pipeline(
  device: &Arc<Device>,
  config: &WindowSizeSetupConfig,
  subpass: &Subpass,
  parts: PipelineParts,
) -> Result<Arc<GraphicsPipeline>> {
  let layout = PipelineLayout::new(
    device.clone(),
    parts
      .layout_info
      .into_pipeline_layout_create_info(device.clone())
      .map_err(|err| anyhow!("invalid descriptor set layout: {err:?}"))?,
  )?;

  Ok(GraphicsPipeline::new(
    device.clone(),
    None,
    GraphicsPipelineCreateInfo {
      stages: parts.stages.into_iter().collect(),
      vertex_input_state: Some(parts.vertex_input_state),
      input_assembly_state: Some(InputAssemblyState::default()),
      viewport_state: Some(ViewportState {
        viewports: [Viewport {
          offset:      [0.0, 0.0],
          extent:      config.window_size.into(),
          depth_range: 0.0..=1.0,
        }]
        .into_iter()
        .collect(),
        ..Default::default()
      }),
      rasterization_state: Some(RasterizationState {
        cull_mode: CullMode::None,
        ..Default::default()
      }),
      depth_stencil_state: Some(DepthStencilState {
        depth: parts.depth,
        ..Default::default()
      }),
      multisample_state: Some(MultisampleState {
        rasterization_samples: SAMPLES,
        ..Default::default()
      }),
      color_blend_state: Some(ColorBlendState::with_attachment_states(
        subpass.num_color_attachments(),
        ColorBlendAttachmentState {
          blend: parts.blend,
          color_write_mask: ColorComponents::all(),
          ..Default::default()
        },
      )),
      subpass: Some(subpass.clone().into()),
      ..GraphicsPipelineCreateInfo::layout(layout)
    },
  )?)
}
