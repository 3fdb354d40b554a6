//! The helipad scene: a sky dome, a car circling a path, two soldiers and a
//! camera that can either orbit freely or chase the car.
//!
//! - `controller` owns the per-frame update contract and the camera mode
//! - `motion` describes the car's circular path
//! - `manifest` lists the models to load and where to put them
//! - `flow` wires all of it into the engine's event loop

pub mod camera_mode;
pub mod clock;
pub mod controller;
pub mod debug_panel;
pub mod flow;
pub mod manifest;
pub mod motion;
pub mod stats;

pub use camera_mode::CameraMode;
pub use controller::{CameraDirective, SceneController, TrackedObject};
pub use manifest::{AssetEntry, AssetManifest, AssetRole};
