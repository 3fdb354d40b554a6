//! The scene as a [`GraphicsFlow`]: asset loading, per-frame update and the
//! debug panel wiring.

use instant::Duration;
use log::{debug, error, info};
use winit::event::WindowEvent;

use crate::{
    camera::Viewport,
    context::{Context, InitContext},
    data_structures::scene_graph::{ContainerNode, SceneNode},
    flow::{EventFuture, FlowConstructor, GraphicsFlow, Out},
    render::Render,
    resources::load_model_gltf,
    scene::{
        controller::{SceneController, TrackedObject, apply_camera_directive},
        debug_panel::DebugPanel,
        manifest::{AssetEntry, AssetManifest, AssetRole},
        stats::FrameStats,
    },
};

/// Results of the asynchronous model loads.
pub enum SceneEvent {
    Loaded {
        entry: AssetEntry,
        node: Box<dyn SceneNode>,
    },
    LoadFailed {
        path: String,
        error: anyhow::Error,
    },
}

/// Where the car sits under the scene root and its current pose.
#[derive(Debug, Clone, Copy)]
struct CarHandle {
    index: usize,
    object: TrackedObject,
}

/// Loads one manifest entry and wraps it in a node carrying the entry's
/// placement and shadow flags.
pub async fn load_asset(entry: AssetEntry, device: wgpu::Device, queue: wgpu::Queue) -> SceneEvent {
    match load_model_gltf(&entry.path, &device, &queue).await {
        Ok(model) => {
            let mut node = ContainerNode::new(1);
            node.set_local_transform(0, entry.transform());
            node.add_child(model);
            node.set_shadow_flags(entry.shadow());
            SceneEvent::Loaded {
                entry,
                node: Box::new(node),
            }
        }
        Err(error) => SceneEvent::LoadFailed {
            path: entry.path,
            error,
        },
    }
}

/// The scene graph root and the handle to the one animated child.
///
/// Children are appended in arrival order, so the car's index is only known
/// once its load resolves.
pub struct SceneRoot {
    root: ContainerNode,
    car: Option<CarHandle>,
}

impl SceneRoot {
    pub fn new() -> Self {
        Self {
            root: ContainerNode::new(1),
            car: None,
        }
    }

    pub fn attach(&mut self, entry: AssetEntry, node: Box<dyn SceneNode>) {
        let index = self.root.get_children().len();
        self.root.add_child(node);
        if entry.role == AssetRole::Car {
            self.car = Some(CarHandle {
                index,
                object: entry.tracked_object(),
            });
        }
        info!("attached {} as {:?}", entry.path, entry.role);
    }

    /// The car's pose, once it has been attached.
    pub fn car_mut(&mut self) -> Option<&mut TrackedObject> {
        self.car.as_mut().map(|car| &mut car.object)
    }

    /// Writes the car's pose into its node.
    pub fn sync_car(&mut self) {
        if let Some(car) = &self.car
            && let Some(node) = self.root.get_children_mut().get_mut(car.index)
        {
            node.set_local_transform(0, car.object.to_instance());
        }
    }

    pub fn node(&self) -> &ContainerNode {
        &self.root
    }

    pub fn node_mut(&mut self) -> &mut ContainerNode {
        &mut self.root
    }
}

impl Default for SceneRoot {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SceneFlow {
    init: InitContext,
    manifest: AssetManifest,
    scene: SceneRoot,
    panel: DebugPanel,
    stats: FrameStats,
}

impl SceneFlow {
    pub fn new(init: InitContext, manifest: AssetManifest) -> Self {
        Self {
            init,
            manifest,
            scene: SceneRoot::new(),
            panel: DebugPanel::default(),
            stats: FrameStats::new(),
        }
    }
}

impl GraphicsFlow<SceneController, SceneEvent> for SceneFlow {
    fn on_init(&mut self, ctx: &mut Context, state: &mut SceneController) -> Out<SceneEvent> {
        state.on_resize(ctx.viewport());
        self.panel = DebugPanel::new(state.camera_mode());

        let loads = self
            .manifest
            .assets
            .iter()
            .map(|entry| {
                Box::new(load_asset(
                    entry.clone(),
                    self.init.device.clone(),
                    self.init.queue.clone(),
                )) as EventFuture<SceneEvent>
            })
            .collect();
        Out::FutEvent(loads)
    }

    fn on_update(
        &mut self,
        ctx: &mut Context,
        state: &mut SceneController,
        dt: Duration,
    ) -> Out<SceneEvent> {
        if self.stats.record(dt) {
            debug!("{:.1} fps", self.stats.fps());
        }

        let directive = state.tick(self.scene.car_mut());
        self.scene.sync_car();
        let camera = &mut ctx.camera;
        apply_camera_directive(directive, &mut camera.camera, &mut camera.controller);

        let root = self.scene.node_mut();
        root.update_world_transform_all();
        root.write_to_buffers(&ctx.queue, &ctx.device);
        Out::Empty
    }

    fn on_window_events(
        &mut self,
        _ctx: &Context,
        state: &mut SceneController,
        event: &WindowEvent,
    ) -> Out<SceneEvent> {
        match event {
            WindowEvent::Resized(size) => {
                state.on_resize(Viewport::new(size.width, size.height));
            }
            WindowEvent::CursorMoved { position, .. } => state.on_pointer_move(*position),
            _ => (),
        }
        if self.panel.handle_window_event(event).is_some() {
            let mode = self.panel.mode();
            if state.set_camera_mode(mode) {
                info!(
                    "use_car_camera = {}, camera mode is now {}",
                    self.panel.use_car_camera(),
                    mode
                );
            }
        }
        Out::Empty
    }

    fn on_custom_events(
        &mut self,
        _ctx: &Context,
        _state: &mut SceneController,
        event: SceneEvent,
    ) -> Option<SceneEvent> {
        match event {
            SceneEvent::Loaded { entry, node } => self.scene.attach(entry, node),
            SceneEvent::LoadFailed { path, error } => {
                error!("failed to load {}: {:#}", path, error);
            }
        }
        None
    }

    fn on_render(&self) -> Render<'_> {
        (self.scene.node() as &dyn SceneNode).into()
    }
}

/// Builds the scene flow once the GPU context exists.
pub fn constructor(manifest: AssetManifest) -> FlowConstructor<SceneController, SceneEvent> {
    Box::new(move |init: InitContext| {
        Box::pin(async move {
            Box::new(SceneFlow::new(init, manifest))
                as Box<dyn GraphicsFlow<SceneController, SceneEvent>>
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector3;

    use crate::data_structures::instance::Instance;

    fn entries() -> Vec<AssetEntry> {
        AssetManifest::builtin().unwrap().assets
    }

    fn entry(role: AssetRole) -> AssetEntry {
        entries().into_iter().find(|entry| entry.role == role).unwrap()
    }

    #[test]
    fn car_is_tracked_wherever_it_lands() {
        let mut scene = SceneRoot::new();
        scene.attach(entry(AssetRole::Sky), Box::new(ContainerNode::new(1)));
        scene.attach(entry(AssetRole::Prop), Box::new(ContainerNode::new(1)));
        assert!(scene.car_mut().is_none());

        scene.attach(entry(AssetRole::Car), Box::new(ContainerNode::new(1)));
        scene.attach(entry(AssetRole::Prop), Box::new(ContainerNode::new(1)));

        let car = scene.car_mut().unwrap();
        assert_eq!(*car, entry(AssetRole::Car).tracked_object());
        car.position = Vector3::new(-4.0, -2.0, 4.0);
        let expected = car.to_instance();

        scene.sync_car();

        let children = scene.node().get_children();
        assert_eq!(children.len(), 4);
        assert_eq!(children[2].get_local_transform(0), Some(expected));
        for idx in [0, 1, 3] {
            assert_eq!(children[idx].get_local_transform(0), Some(Instance::default()));
        }
    }

    #[test]
    fn sync_without_car_leaves_children_alone() {
        let mut scene = SceneRoot::new();
        scene.attach(entry(AssetRole::Sky), Box::new(ContainerNode::new(1)));
        scene.sync_car();
        assert_eq!(
            scene.node().get_children()[0].get_local_transform(0),
            Some(Instance::default())
        );
    }
}
