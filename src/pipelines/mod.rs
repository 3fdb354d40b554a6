//! Render pipelines: the lit main pass and the depth-only shadow pass.

pub mod basic;
pub mod light;
pub mod shadow;

#[derive(Debug)]
pub struct Pipelines {
    pub basic: wgpu::RenderPipeline,
    pub shadow: wgpu::RenderPipeline,
}
