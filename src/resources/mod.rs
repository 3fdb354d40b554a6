/**
 * This module contains all logic for loading mesh/textures/etc. from external files.
 */
use anyhow::Context as _;

use crate::{
    data_structures::{
        model,
        scene_graph::{ContainerNode, SceneNode, to_scene_node},
        texture::Texture,
    },
    resources::texture::{diffuse_normal_layout, load_binary, load_texture, resolve_relative},
};

pub mod texture;

/// Decodes the image behind a glTF texture reference.
async fn load_gltf_image(
    file_name: &str,
    source: gltf::image::Source<'_>,
    buffer_data: &[Vec<u8>],
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Texture> {
    match source {
        gltf::image::Source::View { view, mime_type } => {
            let buffer = buffer_data
                .get(view.buffer().index())
                .with_context(|| format!("{file_name}: missing buffer {}", view.buffer().index()))?;
            let bytes = buffer
                .get(view.offset()..view.offset() + view.length())
                .with_context(|| format!("{file_name}: image view out of bounds"))?;
            Texture::from_bytes(
                device,
                queue,
                bytes,
                file_name,
                mime_type.split('/').next_back(),
                is_normal_map,
            )
        }
        gltf::image::Source::Uri { uri, mime_type } => {
            load_texture(
                &resolve_relative(file_name, uri),
                is_normal_map,
                device,
                queue,
                mime_type.and_then(|mt| mt.split('/').next_back()),
            )
            .await
        }
    }
}

pub async fn load_model_gltf(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Box<dyn SceneNode>> {
    let gltf_bytes = load_binary(file_name).await?;
    let gltf = gltf::Gltf::from_slice(&gltf_bytes)
        .with_context(|| format!("parsing {file_name}"))?;

    // Load buffers
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .with_context(|| format!("{file_name}: binary chunk missing"))?;
                buffer_data.push(blob.to_vec());
            }
            gltf::buffer::Source::Uri(uri) => {
                let bin = load_binary(&resolve_relative(file_name, uri)).await?;
                buffer_data.push(bin);
            }
        }
    }

    // Load materials
    let layout = diffuse_normal_layout(device);
    let mut materials = Vec::new();
    for material in gltf.materials() {
        let pbr = material.pbr_metallic_roughness();
        let diffuse_texture = match pbr.base_color_texture() {
            Some(info) => {
                load_gltf_image(
                    file_name,
                    info.texture().source().source(),
                    &buffer_data,
                    false,
                    device,
                    queue,
                )
                .await?
            }
            None => {
                let rgba = pbr.base_color_factor().map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
                Texture::from_colour(device, queue, rgba, "base colour", false)
            }
        };
        let normal_texture = match material.normal_texture() {
            Some(normal) => {
                load_gltf_image(
                    file_name,
                    normal.texture().source().source(),
                    &buffer_data,
                    true,
                    device,
                    queue,
                )
                .await?
            }
            None => Texture::create_default_normal_map(device, queue),
        };
        let name = material.name().unwrap_or(file_name);
        materials.push(model::Material::new(
            device,
            name,
            diffuse_texture,
            normal_texture,
            &layout,
        ));
    }
    // Fallback for primitives that reference no material.
    materials.push(model::Material::new(
        device,
        "default material",
        Texture::from_colour(device, queue, [255, 255, 255, 255], "default material", false),
        Texture::create_default_normal_map(device, queue),
        &layout,
    ));

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .with_context(|| format!("{file_name} contains no scene"))?;
    let mut models: Vec<_> = scene
        .nodes()
        .map(|node| to_scene_node(node, &buffer_data, device, &materials))
        .collect();

    let root_node = match models.len() {
        1 => models.remove(0),
        _ => {
            let mut root_node = ContainerNode::new(1);
            root_node.children = models;
            Box::new(root_node)
        }
    };
    log::debug!("loaded {} with {} material(s)", file_name, materials.len());

    Ok(root_node)
}
