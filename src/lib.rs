//! helipad-scene
//!
//! A small 3D scene that runs natively and in the browser: a panoramic sky
//! dome, a car driving in circles, two soldiers, a directional light with
//! soft shadows, and a debug toggle between an orbit camera and a chase
//! camera bound to the car.
//!
//! High-level modules
//! - `camera`: camera pose, projection, orbit controls and uniforms
//! - `config`: compile-time scene configuration
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: engine data models (meshes, instances, textures, scene graph)
//! - `flow`: the event loop and the `GraphicsFlow` abstraction
//! - `pipelines`: the lit main pass and the shadow pass
//! - `resources`: glTF and texture loading
//! - `render`: render composition
//! - `scene`: the scene itself, built on all of the above
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;

pub use config::SceneConfig;
pub use scene::{CameraMode, SceneController};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Builds the scene from the embedded manifest and runs it until the window
/// closes.
pub fn run() -> anyhow::Result<()> {
    let config = SceneConfig::default();
    let manifest = scene::AssetManifest::builtin()?;
    flow::run(config, vec![scene::flow::constructor(manifest)])
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), wasm_bindgen::JsValue> {
    run().map_err(|e| wasm_bindgen::JsValue::from_str(&format!("{:#}", e)))
}
