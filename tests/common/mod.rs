#![allow(dead_code)]

use helipad_scene::{
    SceneConfig,
    scene::{AssetManifest, TrackedObject},
};

pub const EPS: f32 = 1e-4;

/// The car as the manifest places it, before it starts moving.
pub fn parked_car() -> TrackedObject {
    AssetManifest::builtin()
        .expect("builtin manifest")
        .car()
        .expect("the manifest has a car")
        .tracked_object()
}

pub fn surface_config(width: u32, height: u32) -> wgpu::SurfaceConfiguration {
    wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: wgpu::TextureFormat::Bgra8UnormSrgb,
        width,
        height,
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode: wgpu::CompositeAlphaMode::Auto,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    }
}

pub fn config() -> SceneConfig {
    SceneConfig::default()
}
