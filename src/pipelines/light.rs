use cgmath::{InnerSpace, Matrix4, Vector3, ortho};
use wgpu::util::DeviceExt;

use crate::{
    camera::OPENGL_TO_WGPU_MATRIX,
    config::{LightingConfig, RendererConfig},
    data_structures::texture::Texture,
};

/// The directional light, the ambient term and the shadow map it renders into.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub shadow_map: Texture,
    /// Main pass: uniform, shadow map and comparison sampler.
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
    /// Shadow pass: uniform only.
    pub shadow_bind_group: wgpu::BindGroup,
    pub shadow_bind_group_layout: wgpu::BindGroupLayout,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    view_proj: [[f32; 4]; 4],
    /// Unit vector towards the light, w holds the directional intensity.
    direction: [f32; 4],
    /// Directional colour, w holds the ambient intensity.
    colour: [f32; 4],
    /// Ambient colour, w holds the tone mapping exposure.
    ambient: [f32; 4],
}

impl LightUniform {
    pub fn new(config: &LightingConfig, exposure: f32) -> Self {
        let towards_light = config.directional_position - config.directional_target;
        let direction = if towards_light.magnitude2() > f32::EPSILON {
            towards_light.normalize()
        } else {
            Vector3::unit_y()
        };
        let [r, g, b] = config.directional_colour;
        let [ar, ag, ab] = config.ambient_colour;
        Self {
            view_proj: shadow_view_proj(config).into(),
            direction: direction.extend(config.directional_intensity).into(),
            colour: [r, g, b, config.ambient_intensity],
            ambient: [ar, ag, ab, exposure],
        }
    }

    pub fn direction(&self) -> Vector3<f32> {
        Vector3::new(self.direction[0], self.direction[1], self.direction[2])
    }
}

/// World to light clip space for the orthographic shadow camera.
pub fn shadow_view_proj(config: &LightingConfig) -> Matrix4<f32> {
    let up = if (config.directional_position - config.directional_target)
        .normalize()
        .cross(Vector3::unit_y())
        .magnitude2()
        < f32::EPSILON
    {
        Vector3::unit_z()
    } else {
        Vector3::unit_y()
    };
    let view = Matrix4::look_at_rh(config.directional_position, config.directional_target, up);
    let frustum = &config.shadow_camera;
    let proj = ortho(
        frustum.left,
        frustum.right,
        frustum.bottom,
        frustum.top,
        frustum.near,
        frustum.far,
    );
    OPENGL_TO_WGPU_MATRIX * proj * view
}

impl LightResources {
    pub fn new(device: &wgpu::Device, lighting: &LightingConfig, renderer: &RendererConfig) -> Self {
        let uniform = LightUniform::new(lighting, renderer.exposure);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let shadow_map = Texture::create_shadow_map(device, renderer.shadow_map_size);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Depth,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
            label: Some("light_bind_group_layout"),
        });
        let shadow_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("shadow_bind_group_layout"),
            });

        let shadow_sampler;
        let sampler = match &shadow_map.sampler {
            Some(sampler) => sampler,
            None => {
                shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                    compare: Some(wgpu::CompareFunction::LessEqual),
                    ..Default::default()
                });
                &shadow_sampler
            }
        };
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: Some("light_bind_group"),
        });
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &shadow_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("shadow_bind_group"),
        });

        Self {
            uniform,
            buffer,
            shadow_map,
            bind_group,
            bind_group_layout,
            shadow_bind_group,
            shadow_bind_group_layout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Point3, Vector4};

    const EPS: f32 = 1e-4;

    fn to_clip(m: Matrix4<f32>, p: Point3<f32>) -> Vector4<f32> {
        m * p.to_homogeneous()
    }

    #[test]
    fn direction_points_from_target_to_light() {
        let config = LightingConfig::default();
        let uniform = LightUniform::new(&config, 1.0);
        let expected = (config.directional_position - config.directional_target).normalize();
        assert!((uniform.direction() - expected).magnitude() < EPS);
        assert_eq!(uniform.direction[3], 7.0);
        assert_eq!(uniform.colour[3], 1.3);
    }

    #[test]
    fn shadow_depth_spans_near_to_far() {
        let config = LightingConfig::default();
        let m = shadow_view_proj(&config);
        let towards_target = (config.directional_target - config.directional_position).normalize();

        let near = to_clip(m, config.directional_position + towards_target * config.shadow_camera.near);
        let far = to_clip(m, config.directional_position + towards_target * config.shadow_camera.far);
        assert!(near.z.abs() < EPS);
        assert!((far.z - 1.0).abs() < EPS);
    }

    #[test]
    fn light_target_is_inside_the_shadow_depth_range() {
        let config = LightingConfig::default();
        let clip = to_clip(shadow_view_proj(&config), config.directional_target);
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }
}
