//! Scene graph and hierarchical scene organization.
//!
//! Provides the [`SceneNode`] trait and its two implementations: a
//! [`ContainerNode`] that only carries a transform, and a [`ModelNode`]
//! that owns GPU geometry. A glTF node hierarchy maps one-to-one onto
//! these.

use std::ops::Range;

use log::warn;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        instance::{Instance, InstanceRaw},
        model,
    },
    flow::MaybeSend,
    render::{Instanced, Render},
};

/// Per-mesh participation in the shadow pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShadowFlags {
    /// Rendered into the shadow map.
    pub cast: bool,
    /// Darkened where the shadow map is occluded.
    pub receive: bool,
}

pub fn to_scene_node(
    node: gltf::scene::Node,
    buf: &[Vec<u8>],
    device: &wgpu::Device,
    mats: &[model::Material],
) -> Box<dyn SceneNode> {
    let mut scene_node: Box<dyn SceneNode> = match node.mesh() {
        Some(mesh) => {
            let mut meshes = Vec::new();

            for primitive in mesh.primitives() {
                let reader = primitive.reader(|buffer| buf.get(buffer.index()).map(Vec::as_slice));

                let mut vertices = Vec::new();
                if let Some(vertex_attribute) = reader.read_positions() {
                    vertex_attribute.for_each(|vertex| {
                        vertices.push(model::ModelVertex {
                            position: vertex,
                            ..Default::default()
                        })
                    });
                }
                if vertices.is_empty() {
                    warn!("Skipping primitive of mesh {:?} without positions.", mesh.name());
                    continue;
                }
                if let Some(normal_attribute) = reader.read_normals() {
                    vertices
                        .iter_mut()
                        .zip(normal_attribute)
                        .for_each(|(vertex, normal)| vertex.normal = normal);
                }
                if let Some(tex_coord_attribute) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
                    vertices
                        .iter_mut()
                        .zip(tex_coord_attribute)
                        .for_each(|(vertex, tex_coord)| vertex.tex_coords = tex_coord);
                }
                if let Some(tangent_attribute) = reader.read_tangents() {
                    vertices
                        .iter_mut()
                        .zip(tangent_attribute)
                        .for_each(|(vertex, tangent)| {
                            // GLTF represents tangents as vec4 where the 4th elem can be used to calculate the bitangent
                            let tangent: cgmath::Vector4<f32> = tangent.into();
                            vertex.tangent = tangent.truncate().into();
                            let normal: cgmath::Vector3<f32> = vertex.normal.into();
                            vertex.bitangent = (normal.cross(tangent.truncate()) * tangent[3]).into();
                        });
                };

                let indices: Vec<u32> = match reader.read_indices() {
                    Some(indices_raw) => indices_raw.into_u32().collect(),
                    None => (0..vertices.len() as u32).collect(),
                };
                let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{:?} Vertex Buffer", mesh.name())),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });

                let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{:?} Index Buffer", mesh.name())),
                    contents: bytemuck::cast_slice(&indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
                // The loader appends a fallback material as the last entry for
                // primitives without one.
                let material = primitive
                    .material()
                    .index()
                    .filter(|idx| *idx < mats.len())
                    .unwrap_or(mats.len().saturating_sub(1));

                meshes.push(model::Mesh {
                    name: mesh.name().unwrap_or("unknown_mesh").to_string(),
                    vertex_buffer,
                    index_buffer,
                    num_elements: indices.len() as u32,
                    material,
                });
            }
            Box::new(ModelNode::new(device, meshes, mats.to_vec()))
        }
        None => Box::new(ContainerNode::new(1)),
    };
    let decomp_pos = node.transform().decomposed();
    let instance = Instance {
        position: decomp_pos.0.into(),
        rotation: decomp_pos.1.into(),
        scale: decomp_pos.2.into(),
    };
    scene_node.set_local_transform(0, instance);
    for child in node.children() {
        let child_node = to_scene_node(child, buf, device, mats);
        scene_node.add_child(child_node);
    }

    scene_node
}

/// Nodes travel from the loader tasks to the event loop, hence [`MaybeSend`].
pub trait SceneNode: MaybeSend {
    fn get_world_transforms(&self) -> Vec<Instance>;

    fn get_local_transform(&self, idx: usize) -> Option<Instance>;

    fn set_local_transform(&mut self, idx: usize, instance: Instance);

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>>;

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>>;

    fn add_child(&mut self, child: Box<dyn SceneNode>);

    /// Applies `flags` to this node and every node below it.
    fn set_shadow_flags(&mut self, flags: ShadowFlags);

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device);

    /**
     * Multiple instances of a parent can be passed down to multiple instances of multiple children.
     * The argument `parents_world_transform` with a matching `range` size provides control over which instances are transformed.
     */
    fn update_world_transforms(&mut self, range: Range<usize>, parents_world_transform: &[Instance]);

    fn update_world_transform_all(&mut self);

    fn get_render(&self) -> Vec<Instanced<'_>>;
}

impl<'a> From<&'a dyn SceneNode> for Render<'a> {
    fn from(sn: &'a dyn SceneNode) -> Self {
        Render::Defaults(sn.get_render())
    }
}

/// Shared by both node kinds: combine each local transform with its parent
/// and recurse with the results.
fn propagate(
    instances: &mut [(Instance, Instance)],
    children: &mut [Box<dyn SceneNode>],
    range: Range<usize>,
    parents_world_transform: &[Instance],
) {
    if parents_world_transform.len() > instances.len() {
        warn!(
            "You tried to transform with len {}, but there are only {} instances to transform.",
            parents_world_transform.len(),
            instances.len()
        );
        return;
    }
    let Some(targets) = instances.get_mut(range.clone()) else {
        warn!(
            "You tried to transform range {}..{}, which is out of bounds for parent len {}.",
            range.start,
            range.end,
            instances.len(),
        );
        return;
    };
    let world_transforms = targets
        .iter_mut()
        .zip(parents_world_transform.iter())
        .map(|((local, world), parent)| {
            *world = parent * &*local;
            world.clone()
        })
        .collect::<Vec<_>>();
    for child in children.iter_mut() {
        child.update_world_transforms(range.clone(), &world_transforms);
    }
}

fn identity_parents(len: usize) -> Vec<Instance> {
    (0..len).map(|_| Instance::default()).collect()
}

pub struct ContainerNode {
    pub children: Vec<Box<dyn SceneNode>>,
    pub instances: Vec<(Instance, Instance)>,
}

impl ContainerNode {
    pub fn new(amount: usize) -> Self {
        let instances = (0..amount)
            .map(|_| (Instance::default(), Instance::default()))
            .collect();
        Self {
            instances,
            children: vec![],
        }
    }
}

impl SceneNode for ContainerNode {
    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn set_local_transform(&mut self, idx: usize, instance: Instance) {
        if let Some((local, _)) = self.instances.get_mut(idx) {
            *local = instance;
        }
    }

    fn get_world_transforms(&self) -> Vec<Instance> {
        self.instances
            .iter()
            .map(|(_, world)| world)
            .cloned()
            .collect()
    }

    fn update_world_transforms(&mut self, range: Range<usize>, parents_world_transform: &[Instance]) {
        propagate(&mut self.instances, &mut self.children, range, parents_world_transform);
    }

    fn update_world_transform_all(&mut self) {
        let len = self.instances.len();
        self.update_world_transforms(0..len, &identity_parents(len));
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn get_local_transform(&self, idx: usize) -> Option<Instance> {
        self.instances.get(idx).map(|(local, _)| local).cloned()
    }

    fn set_shadow_flags(&mut self, flags: ShadowFlags) {
        self.children
            .iter_mut()
            .for_each(|child| child.set_shadow_flags(flags));
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device) {
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue, device));
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .collect()
    }
}

pub struct ModelNode {
    children: Vec<Box<dyn SceneNode>>,
    instance_buffer: wgpu::Buffer,
    instances: Vec<(Instance, Instance)>,
    shadow: ShadowFlags,
    model: model::Model,
}

impl ModelNode {
    /// Wraps already uploaded meshes with a single identity instance.
    pub fn new(
        device: &wgpu::Device,
        meshes: Vec<model::Mesh>,
        materials: Vec<model::Material>,
    ) -> Self {
        let instances = vec![(Instance::default(), Instance::default())];
        let shadow = ShadowFlags::default();

        let instance_data = instances
            .iter()
            .map(|(_, world)| world.to_raw(shadow.receive))
            .collect::<Vec<_>>();

        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Instance Buffer"),
            contents: bytemuck::cast_slice(&instance_data),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            children: vec![],
            instance_buffer,
            instances,
            shadow,
            model: model::Model { meshes, materials },
        }
    }
}

impl SceneNode for ModelNode {
    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn set_local_transform(&mut self, idx: usize, instance: Instance) {
        if let Some((local, _)) = self.instances.get_mut(idx) {
            *local = instance;
        }
    }

    fn get_world_transforms(&self) -> Vec<Instance> {
        self.instances
            .iter()
            .map(|(_, world)| world)
            .cloned()
            .collect()
    }

    fn update_world_transforms(&mut self, range: Range<usize>, parents_world_transform: &[Instance]) {
        propagate(&mut self.instances, &mut self.children, range, parents_world_transform);
    }

    fn update_world_transform_all(&mut self) {
        let len = self.instances.len();
        self.update_world_transforms(0..len, &identity_parents(len));
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn get_local_transform(&self, idx: usize) -> Option<Instance> {
        self.instances.get(idx).map(|(local, _)| local).cloned()
    }

    fn set_shadow_flags(&mut self, flags: ShadowFlags) {
        self.shadow = flags;
        self.children
            .iter_mut()
            .for_each(|child| child.set_shadow_flags(flags));
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device) {
        let raw_instances: Vec<InstanceRaw> = self
            .instances
            .iter()
            .map(|(_, world)| world.to_raw(self.shadow.receive))
            .collect();
        queue.write_buffer(
            &self.instance_buffer,
            0,
            bytemuck::cast_slice(&raw_instances),
        );
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue, device));
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .chain([Instanced {
                instance: &self.instance_buffer,
                model: &self.model,
                amount: self.instances.len(),
                casts_shadow: self.shadow.cast,
            }])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector3};

    fn translated(x: f32, y: f32, z: f32) -> Instance {
        Instance {
            position: Vector3::new(x, y, z),
            ..Default::default()
        }
    }

    #[test]
    fn world_transforms_compose_down_the_tree() {
        let mut root = ContainerNode::new(1);
        let mut middle = ContainerNode::new(1);
        middle.set_local_transform(
            0,
            Instance {
                scale: Vector3::new(0.5, 0.5, 0.5),
                ..translated(10.0, 0.0, 0.0)
            },
        );
        let mut leaf = ContainerNode::new(1);
        leaf.set_local_transform(0, translated(0.0, 4.0, 0.0));
        middle.add_child(Box::new(leaf));
        root.add_child(Box::new(middle));

        root.update_world_transform_all();

        let leaf_world = &root.get_children()[0].get_children()[0].get_world_transforms()[0];
        assert!((leaf_world.position - Vector3::new(10.0, 2.0, 0.0)).magnitude() < 1e-5);
        assert_eq!(leaf_world.scale, Vector3::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn moving_a_parent_moves_its_subtree() {
        let mut root = ContainerNode::new(1);
        let mut wrapper = ContainerNode::new(1);
        wrapper.add_child(Box::new(ContainerNode::new(1)));
        root.add_child(Box::new(wrapper));

        root.get_children_mut()[0].set_local_transform(0, translated(1.0, 2.0, 3.0));
        root.update_world_transform_all();

        let inner = &root.get_children()[0].get_children()[0].get_world_transforms()[0];
        assert_eq!(inner.position, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn out_of_range_transform_is_ignored() {
        let mut node = ContainerNode::new(1);
        node.update_world_transforms(2..3, &[Instance::default()]);
        assert_eq!(node.get_world_transforms(), vec![Instance::default()]);
    }

    #[test]
    fn containers_render_nothing_on_their_own() {
        let mut root = ContainerNode::new(1);
        root.add_child(Box::new(ContainerNode::new(1)));
        root.set_shadow_flags(ShadowFlags {
            cast: true,
            receive: true,
        });
        assert!(root.get_render().is_empty());
    }
}
