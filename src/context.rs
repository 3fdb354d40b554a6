//! The GPU context: device, surface, camera, light and pipelines.

use std::sync::Arc;

use anyhow::Context as _;
use cgmath::Deg;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraResources, CameraUniform, OrbitController, Projection, Viewport},
    config::SceneConfig,
    data_structures::texture::Texture,
    pipelines::{Pipelines, basic::mk_basic_pipeline, light::LightResources, shadow::mk_shadow_pipeline},
};

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: Texture,
    /// Multisampled colour target, absent when rendering single sampled.
    pub(crate) msaa_target: Option<Texture>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub sample_count: u32,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub pipelines: Pipelines,
    pub clear_colour: wgpu::Color,
}

/// The handles a flow constructor needs to upload resources before the
/// first frame. Device and queue are internally reference counted.
#[derive(Clone, Debug)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
        }
    }
}

/// Applies a new viewport to the surface configuration and the projection.
///
/// Returns `false` and leaves both untouched for an empty viewport.
pub fn apply_viewport(
    config: &mut wgpu::SurfaceConfiguration,
    projection: &mut Projection,
    viewport: Viewport,
) -> bool {
    if viewport.is_empty() {
        return false;
    }
    config.width = viewport.width;
    config.height = viewport.height;
    projection.resize(viewport.width, viewport.height);
    true
}

/// Picks the requested MSAA level if the format supports it, else 1.
fn supported_sample_count(adapter: &wgpu::Adapter, format: wgpu::TextureFormat, requested: u32) -> u32 {
    let flags = adapter.get_texture_format_features(format).flags;
    if requested > 1 && flags.sample_count_supported(requested) {
        requested
    } else {
        if requested > 1 {
            log::warn!("{}x MSAA is not supported for {:?}, rendering without it", requested, format);
        }
        1
    }
}

impl Context {
    pub async fn new(window: Arc<Window>, scene: &SceneConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("creating the render surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable GPU adapter")?;
        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                ..Default::default()
            })
            .await
            .context("requesting the GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Tone mapping writes linear colour, the sRGB surface encodes it.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface reports no texture formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        let sample_count =
            supported_sample_count(&adapter, surface_format, scene.renderer.sample_count);
        log::info!(
            "surface {:?} at {}x{}, {}x MSAA",
            surface_format,
            config.width,
            config.height,
            sample_count
        );

        let mut camera = Camera::new(scene.camera.default_position);
        camera.look_at(scene.camera.orbit_target);
        let projection = Projection::new(
            config.width,
            config.height,
            Deg(scene.camera.fovy),
            scene.camera.znear,
            scene.camera.zfar,
        );
        let controller = OrbitController::new(&scene.camera);

        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(&camera, &projection);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("camera_bind_group_layout"),
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let light = LightResources::new(&device, &scene.lighting, &scene.renderer);

        let pipelines = Pipelines {
            basic: mk_basic_pipeline(
                &device,
                config.format,
                sample_count,
                &camera_bind_group_layout,
                &light.bind_group_layout,
            ),
            shadow: mk_shadow_pipeline(&device, &light.shadow_bind_group_layout),
        };

        let camera = CameraResources {
            camera,
            controller,
            uniform: camera_uniform,
            buffer: camera_buffer,
            bind_group: camera_bind_group,
            bind_group_layout: camera_bind_group_layout,
        };

        let depth_texture = Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            sample_count,
            "depth_texture",
        );
        let msaa_target =
            (sample_count > 1).then(|| Texture::create_msaa_target(&device, &config, sample_count));

        Ok(Self {
            window,
            depth_texture,
            msaa_target,
            surface,
            device,
            queue,
            config,
            sample_count,
            camera,
            projection,
            light,
            pipelines,
            clear_colour: scene.renderer.clear_colour,
        })
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.config.width, self.config.height)
    }

    /// Resizes the surface and its attachments. Empty viewports are ignored.
    pub fn resize(&mut self, viewport: Viewport) -> bool {
        if !apply_viewport(&mut self.config, &mut self.projection, viewport) {
            return false;
        }
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = Texture::create_depth_texture(
            &self.device,
            [self.config.width, self.config.height],
            self.sample_count,
            "depth_texture",
        );
        if self.sample_count > 1 {
            self.msaa_target = Some(Texture::create_msaa_target(
                &self.device,
                &self.config,
                self.sample_count,
            ));
        }
        true
    }

    /// Recomputes the view-projection and uploads it.
    pub fn write_camera_uniform(&mut self) {
        self.camera
            .uniform
            .update_view_proj(&self.camera.camera, &self.projection);
        self.queue.write_buffer(
            &self.camera.buffer,
            0,
            bytemuck::cast_slice(&[self.camera.uniform]),
        );
    }
}
