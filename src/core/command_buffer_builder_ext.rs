use std::sync::Arc;

use anyhow::Result;
use vulkano::{
  buffer::Subbuffer,
  command_buffer::{AutoCommandBufferBuilder, RenderPassBeginInfo, SubpassBeginInfo, SubpassContents, SubpassEndInfo},
  descriptor_set::DescriptorSet,
  pipeline::{Pipeline, PipelineBindPoint},
};

use crate::{
  render::RenderContext,
  shaders::sky_vs,
  vertex::{InstanceData, MeshVertex, SkyVertex},
};

/// Sky state for one frame.
pub struct SkyDraw {
  pub descriptor_set: Arc<DescriptorSet>,
  pub camera:         sky_vs::SkyCamera,
  pub quad:           Subbuffer<[SkyVertex]>,
}

/// One instanced draw of a mesh with its material.
pub struct BatchDraw {
  /// `FrameData`, `skyTexture` and this batch's `imageTexture`
  pub descriptor_set: Arc<DescriptorSet>,
  pub vertices:       Subbuffer<[MeshVertex]>,
  pub indices:        Subbuffer<[u32]>,
  pub instances:      Subbuffer<[InstanceData]>,
}

pub(crate) trait AutoCommandBufferBuilderExt<L> {
  fn build_frame_render_pass(
    &mut self,
    rcx: &RenderContext,
    image_index: u32,
    sky: &SkyDraw,
    batches: &[BatchDraw],
  ) -> Result<()>;
}

impl<L> AutoCommandBufferBuilderExt<L> for AutoCommandBufferBuilder<L> {
  fn build_frame_render_pass(
    &mut self,
    rcx: &RenderContext,
    image_index: u32,
    sky: &SkyDraw,
    batches: &[BatchDraw],
  ) -> Result<()> {
    self.begin_render_pass(
      RenderPassBeginInfo {
        clear_values: vec![
          Some([0.0, 0.0, 0.0, 1.0].into()), // msaa_color
          None,                              // final_color (DontCare)
          Some(1.0.into()),                  // depth
        ],
        ..RenderPassBeginInfo::framebuffer(rcx.framebuffers[image_index as usize].clone())
      },
      SubpassBeginInfo {
        contents: SubpassContents::Inline,
        ..Default::default()
      },
    )?;

    // sky first, it neither tests nor writes depth
    let sky_pipeline = &rcx.pipelines.sky;
    self
      .bind_pipeline_graphics(sky_pipeline.clone())?
      .bind_descriptor_sets(
        PipelineBindPoint::Graphics,
        sky_pipeline.layout().clone(),
        0,
        sky.descriptor_set.clone(),
      )?
      .push_constants(sky_pipeline.layout().clone(), 0, sky.camera)?
      .bind_vertex_buffers(0, sky.quad.clone())?;
    unsafe { self.draw(sky.quad.len() as u32, 1, 0, 0) }?;

    let scene_pipeline = &rcx.pipelines.scene;
    self.bind_pipeline_graphics(scene_pipeline.clone())?;
    for batch in batches {
      self
        .bind_descriptor_sets(
          PipelineBindPoint::Graphics,
          scene_pipeline.layout().clone(),
          0,
          batch.descriptor_set.clone(),
        )?
        .bind_vertex_buffers(0, (batch.vertices.clone(), batch.instances.clone()))?
        .bind_index_buffer(batch.indices.clone())?;

      unsafe {
        self.draw_indexed(
          batch.indices.len() as u32,
          batch.instances.len() as u32,
          0,
          0,
          0,
        )
      }?;
    }

    self.end_render_pass(SubpassEndInfo::default())?;
    Ok(())
  }
}
