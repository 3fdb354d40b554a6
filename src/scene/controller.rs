//! The per-frame update contract of the scene.
//!
//! [`SceneController`] holds everything the update step needs that is not a
//! GPU resource: the clock, the camera mode, the pointer and the viewport.
//! Each frame the flow hands it the car (if it has arrived yet) and gets back
//! a [`CameraDirective`] describing what to do with the camera.

use cgmath::{Euler, Point3, Rad, Vector2, Vector3};
use winit::dpi::PhysicalPosition;

use crate::{
    camera::{Camera, OrbitController, Viewport},
    config::{CameraConfig, SceneConfig},
    data_structures::instance::{Instance, rotation_from_euler},
    scene::{camera_mode::CameraMode, clock::SceneClock, motion::CarPath},
};

/// Pointer position before the first move, well outside `[-1, 1]`.
pub const POINTER_OFF_SCREEN: Vector2<f32> = Vector2 {
    x: -1000.0,
    y: -1000.0,
};

/// Pose of an animated object, kept as Euler angles so single axes can be
/// read and written the way the scene needs them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedObject {
    pub position: Vector3<f32>,
    pub rotation: Euler<Rad<f32>>,
    pub scale: f32,
}

impl TrackedObject {
    pub fn new(position: Vector3<f32>, yaw: Rad<f32>, scale: f32) -> Self {
        Self {
            position,
            rotation: Euler::new(Rad(0.0), yaw, Rad(0.0)),
            scale,
        }
    }

    pub fn to_instance(&self) -> Instance {
        Instance {
            position: self.position,
            rotation: rotation_from_euler(self.rotation),
            scale: Vector3::new(self.scale, self.scale, self.scale),
        }
    }
}

/// What the camera should do this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraDirective {
    /// Leave the pose as it is.
    Hold,
    /// Let the orbit controls move the camera.
    Orbit,
    /// Jump to `position` and resynchronize the orbit controls.
    Reset { position: Point3<f32> },
    /// Chase camera pose derived from the car.
    Chase {
        position: Point3<f32>,
        rotation: Euler<Rad<f32>>,
    },
}

/// Applies a directive to the camera and its orbit controls.
pub fn apply_camera_directive(
    directive: CameraDirective,
    camera: &mut Camera,
    orbit: &mut OrbitController,
) {
    match directive {
        CameraDirective::Hold => (),
        CameraDirective::Orbit => orbit.update(camera),
        CameraDirective::Reset { position } => {
            camera.position = position;
            orbit.sync(camera);
            orbit.update(camera);
        }
        CameraDirective::Chase { position, rotation } => {
            camera.position = position;
            camera.set_euler(rotation);
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneController {
    clock: SceneClock,
    path: CarPath,
    camera: CameraConfig,
    mode: CameraMode,
    pending_reset: bool,
    pointer: Vector2<f32>,
    viewport: Viewport,
}

impl SceneController {
    pub fn new(config: &SceneConfig) -> Self {
        Self {
            clock: SceneClock::start(),
            path: CarPath::new(&config.car_path),
            camera: config.camera.clone(),
            mode: CameraMode::default(),
            pending_reset: false,
            pointer: POINTER_OFF_SCREEN,
            viewport: Viewport::new(0, 0),
        }
    }

    pub fn camera_mode(&self) -> CameraMode {
        self.mode
    }

    /// Switches the camera mode. Returns whether anything changed.
    ///
    /// Entering [`CameraMode::Free`] schedules a reset to the default pose for
    /// the next tick.
    pub fn set_camera_mode(&mut self, mode: CameraMode) -> bool {
        if mode == self.mode {
            return false;
        }
        self.mode = mode;
        self.pending_reset = mode == CameraMode::Free;
        true
    }

    pub fn toggle_camera_mode(&mut self) -> CameraMode {
        self.set_camera_mode(self.mode.toggled());
        self.mode
    }

    /// Records the new viewport size. Empty viewports are ignored.
    pub fn on_resize(&mut self, viewport: Viewport) -> bool {
        if viewport.is_empty() {
            return false;
        }
        self.viewport = viewport;
        true
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn on_pointer_move(&mut self, position: PhysicalPosition<f64>) {
        if !self.viewport.is_empty() {
            self.pointer = self.viewport.to_ndc(position);
        }
    }

    /// Pointer in normalized device coordinates, [`POINTER_OFF_SCREEN`] until
    /// the first move.
    pub fn pointer(&self) -> Vector2<f32> {
        self.pointer
    }

    pub fn elapsed(&self) -> f32 {
        self.clock.elapsed_secs()
    }

    /// One frame at the current scene time.
    pub fn tick(&mut self, car: Option<&mut TrackedObject>) -> CameraDirective {
        let t = self.elapsed();
        self.tick_at(t, car)
    }

    /// One frame at scene time `t` seconds.
    pub fn tick_at(&mut self, t: f32, car: Option<&mut TrackedObject>) -> CameraDirective {
        let car = car.map(|car| {
            self.path.apply(t, car);
            *car
        });
        match (self.mode, car) {
            (CameraMode::Free, _) if self.pending_reset => {
                self.pending_reset = false;
                CameraDirective::Reset {
                    position: self.camera.default_position,
                }
            }
            (CameraMode::Free, _) => CameraDirective::Orbit,
            (CameraMode::Follow, Some(car)) => CameraDirective::Chase {
                position: Point3::new(car.position.x, car.position.y, car.position.z)
                    + self.camera.follow_offset,
                rotation: Euler::new(car.rotation.x, car.rotation.z, Rad(0.0)),
            },
            (CameraMode::Follow, None) => CameraDirective::Hold,
        }
    }
}

impl Default for SceneController {
    fn default() -> Self {
        Self::new(&SceneConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn car() -> TrackedObject {
        TrackedObject::new(Vector3::new(-9.0, -2.0, 2.0), Rad(0.0), 0.01)
    }

    #[test]
    fn starts_free_with_pointer_off_screen() {
        let controller = SceneController::default();
        assert_eq!(controller.camera_mode(), CameraMode::Free);
        assert_eq!(controller.pointer(), POINTER_OFF_SCREEN);
    }

    #[test]
    fn free_mode_orbits_until_a_reset_is_pending() {
        let mut controller = SceneController::default();
        assert_eq!(controller.tick_at(0.0, None), CameraDirective::Orbit);

        controller.set_camera_mode(CameraMode::Follow);
        controller.set_camera_mode(CameraMode::Free);
        assert_eq!(
            controller.tick_at(1.0, None),
            CameraDirective::Reset {
                position: Point3::new(5.0, 3.0, 0.0)
            }
        );
        // The reset is an entry action, it only fires once.
        assert_eq!(controller.tick_at(1.1, None), CameraDirective::Orbit);
    }

    #[test]
    fn reentering_the_current_mode_is_a_no_op() {
        let mut controller = SceneController::default();
        assert!(!controller.set_camera_mode(CameraMode::Free));
        assert_eq!(controller.tick_at(0.0, None), CameraDirective::Orbit);

        assert!(controller.set_camera_mode(CameraMode::Follow));
        assert!(!controller.set_camera_mode(CameraMode::Follow));
        assert_eq!(controller.camera_mode(), CameraMode::Follow);
    }

    #[test]
    fn follow_mode_chases_the_car() {
        let mut controller = SceneController::default();
        controller.toggle_camera_mode();
        let mut car = car();

        let directive = controller.tick_at(PI / 2.0, Some(&mut car));
        let CameraDirective::Chase { position, rotation } = directive else {
            panic!("expected a chase directive, got {:?}", directive);
        };
        assert!((position.x - (car.position.x)).abs() < 1e-5);
        assert!((position.y - (car.position.y + 2.0)).abs() < 1e-5);
        assert!((position.z - (car.position.z + 4.0)).abs() < 1e-5);
        assert_eq!(rotation, Euler::new(car.rotation.x, car.rotation.z, Rad(0.0)));
    }

    #[test]
    fn follow_without_car_holds_the_camera() {
        let mut controller = SceneController::default();
        controller.set_camera_mode(CameraMode::Follow);
        assert_eq!(controller.tick_at(3.0, None), CameraDirective::Hold);
    }

    #[test]
    fn pointer_maps_to_ndc_with_y_up() {
        let mut controller = SceneController::default();
        assert!(controller.on_resize(Viewport::new(800, 600)));
        controller.on_pointer_move(PhysicalPosition::new(0.0, 0.0));
        assert_eq!(controller.pointer(), Vector2::new(-1.0, 1.0));
        controller.on_pointer_move(PhysicalPosition::new(800.0, 600.0));
        assert_eq!(controller.pointer(), Vector2::new(1.0, -1.0));
    }

    #[test]
    fn empty_resize_keeps_previous_viewport() {
        let mut controller = SceneController::default();
        controller.on_resize(Viewport::new(1024, 768));
        assert!(!controller.on_resize(Viewport::new(0, 768)));
        assert_eq!(controller.viewport(), Viewport::new(1024, 768));
    }

    #[test]
    fn reset_directive_puts_camera_exactly_on_default() {
        let config = CameraConfig::default();
        let mut orbit = OrbitController::new(&config);
        let mut camera = Camera::new((12.0, -4.0, 7.5));
        orbit.handle_mouse(40.0, 10.0);

        apply_camera_directive(
            CameraDirective::Reset {
                position: config.default_position,
            },
            &mut camera,
            &mut orbit,
        );
        assert_eq!(camera.position, config.default_position);
    }
}
