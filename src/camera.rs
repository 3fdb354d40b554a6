//! Camera pose, projection, orbit controls and the GPU uniform.
//!
//! The camera follows the usual scene-graph convention: it looks down its
//! local -Z axis with +Y up. Its pose is a position plus a rotation, so it can
//! be driven either by the [`OrbitController`] (free mode) or by writing an
//! Euler orientation directly (follow mode).

use std::f32::consts::PI;

use cgmath::{
    EuclideanSpace, Euler, InnerSpace, Matrix3, Matrix4, One, Point3, Quaternion, Rad,
    SquareMatrix, Vector2, Vector3, perspective,
};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

use crate::{config::CameraConfig, data_structures::instance::rotation_from_euler};

/// cgmath produces OpenGL clip space (z in -1..1), wgpu expects 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Keeps the orbit away from the poles where `look_at` degenerates.
const POLAR_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub rotation: Quaternion<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P) -> Self {
        Self {
            position: position.into(),
            rotation: Quaternion::one(),
        }
    }

    /// Sets the orientation from XYZ-ordered Euler angles.
    pub fn set_euler(&mut self, euler: Euler<Rad<f32>>) {
        self.rotation = rotation_from_euler(euler);
    }

    /// Turns the camera so its -Z axis points at `target`.
    pub fn look_at(&mut self, target: Point3<f32>) {
        let forward = target - self.position;
        if forward.magnitude2() < f32::EPSILON {
            return;
        }
        let forward = forward.normalize();
        let right = forward.cross(Vector3::unit_y());
        if right.magnitude2() < f32::EPSILON {
            return;
        }
        let right = right.normalize();
        let up = right.cross(forward);
        self.rotation = Matrix3::from_cols(right, up, -forward).into();
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.rotation * -Vector3::unit_z()
    }

    /// World-to-view matrix, the inverse of the camera's world transform.
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::from(self.rotation.conjugate())
            * Matrix4::from_translation(-self.position.to_vec())
    }
}

/// Pixel size of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Maps a pixel position to normalized device coordinates in `[-1, 1]`,
    /// with Y pointing up.
    pub fn to_ndc(&self, position: PhysicalPosition<f64>) -> Vector2<f32> {
        let width = self.width.max(1) as f64;
        let height = self.height.max(1) as f64;
        Vector2::new(
            ((position.x / width) * 2.0 - 1.0) as f32,
            (-(position.y / height) * 2.0 + 1.0) as f32,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: Viewport::new(width, height).aspect(),
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Orbit controls for free mode.
///
/// Input is only accumulated while events arrive; [`OrbitController::update`]
/// applies it. Without pending input the camera position is left untouched
/// and only re-aimed at the target.
#[derive(Debug, Clone)]
pub struct OrbitController {
    target: Point3<f32>,
    radius: f32,
    /// Angle around +Y, measured from +Z towards +X.
    azimuth: Rad<f32>,
    /// Angle down from +Y.
    polar: Rad<f32>,
    rotate_speed: f32,
    zoom_speed: f32,
    min_distance: f32,
    max_distance: f32,
    dragging: bool,
    last_cursor: Option<PhysicalPosition<f64>>,
    pending_rotate: Vector2<f32>,
    pending_zoom: f32,
}

impl OrbitController {
    pub fn new(config: &CameraConfig) -> Self {
        let mut controller = Self {
            target: config.orbit_target,
            radius: 1.0,
            azimuth: Rad(0.0),
            polar: Rad(PI / 2.0),
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            dragging: false,
            last_cursor: None,
            pending_rotate: Vector2::new(0.0, 0.0),
            pending_zoom: 0.0,
        };
        controller.sync(&Camera::new(config.default_position));
        controller
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Re-derives the orbit from wherever the camera currently is and drops
    /// any input gathered in the meantime.
    pub fn sync(&mut self, camera: &Camera) {
        let offset = camera.position - self.target;
        self.radius = offset.magnitude().max(f32::EPSILON);
        self.azimuth = Rad(offset.x.atan2(offset.z));
        self.polar = Rad((offset.y / self.radius).clamp(-1.0, 1.0).acos());
        self.pending_rotate = Vector2::new(0.0, 0.0);
        self.pending_zoom = 0.0;
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = *state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let (true, Some(last)) = (self.dragging, self.last_cursor) {
                    self.handle_mouse(position.x - last.x, position.y - last.y);
                }
                self.last_cursor = Some(*position);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => (pos.y / 50.0) as f32,
                };
                self.handle_scroll(lines);
            }
            _ => (),
        }
    }

    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        self.pending_rotate += Vector2::new(dx as f32, dy as f32);
    }

    /// Positive values dolly towards the target.
    pub fn handle_scroll(&mut self, lines: f32) {
        self.pending_zoom += lines;
    }

    pub fn update(&mut self, camera: &mut Camera) {
        let has_input = self.pending_rotate != Vector2::new(0.0, 0.0) || self.pending_zoom != 0.0;
        if has_input {
            self.azimuth -= Rad(self.pending_rotate.x * self.rotate_speed);
            self.polar = Rad((self.polar.0 - self.pending_rotate.y * self.rotate_speed)
                .clamp(POLAR_EPSILON, PI - POLAR_EPSILON));
            self.radius = (self.radius * (1.0 - self.pending_zoom * self.zoom_speed))
                .clamp(self.min_distance, self.max_distance);
            self.pending_rotate = Vector2::new(0.0, 0.0);
            self.pending_zoom = 0.0;

            let (sin_polar, cos_polar) = (self.polar.0.sin(), self.polar.0.cos());
            let offset = Vector3::new(
                self.radius * sin_polar * self.azimuth.0.sin(),
                self.radius * cos_polar,
                self.radius * sin_polar * self.azimuth.0.cos(),
            );
            camera.position = self.target + offset;
        }
        camera.look_at(self.target);
    }
}

/// Camera state plus its GPU-side uniform buffer and bind group.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Vector4};

    const EPS: f32 = 1e-4;

    #[test]
    fn resize_sets_aspect_from_viewport() {
        let mut projection = Projection::new(800, 600, Deg(70.0), 0.1, 100.0);
        projection.resize(1920, 1080);
        assert!((projection.aspect() - 1920.0 / 1080.0).abs() < EPS);
        // Minimized windows keep the last usable aspect.
        projection.resize(1920, 0);
        assert!((projection.aspect() - 1920.0 / 1080.0).abs() < EPS);
    }

    #[test]
    fn viewport_corners_map_to_ndc_corners() {
        let viewport = Viewport::new(1280, 720);
        assert_eq!(viewport.to_ndc(PhysicalPosition::new(0.0, 0.0)), Vector2::new(-1.0, 1.0));
        assert_eq!(viewport.to_ndc(PhysicalPosition::new(1280.0, 720.0)), Vector2::new(1.0, -1.0));
        assert_eq!(viewport.to_ndc(PhysicalPosition::new(640.0, 360.0)), Vector2::new(0.0, 0.0));
    }

    #[test]
    fn look_at_points_forward_axis_at_target() {
        let mut camera = Camera::new((5.0, 3.0, 0.0));
        camera.look_at(Point3::new(0.0, 0.0, 0.0));
        let expected = (Point3::new(0.0, 0.0, 0.0) - camera.position).normalize();
        assert!((camera.forward() - expected).magnitude() < EPS);
    }

    #[test]
    fn view_matrix_moves_camera_to_origin() {
        let mut camera = Camera::new((1.0, 2.0, 3.0));
        camera.set_euler(Euler::new(Rad(0.3), Rad(-1.1), Rad(0.0)));
        let eye = camera.calc_matrix() * camera.position.to_homogeneous();
        assert!((eye - Vector4::new(0.0, 0.0, 0.0, 1.0)).magnitude() < EPS);
    }

    #[test]
    fn orbit_without_input_keeps_position() {
        let config = CameraConfig::default();
        let mut controller = OrbitController::new(&config);
        let mut camera = Camera::new(config.default_position);
        controller.update(&mut camera);
        assert_eq!(camera.position, config.default_position);
        let expected = (config.orbit_target - config.default_position).normalize();
        assert!((camera.forward() - expected).magnitude() < EPS);
    }

    #[test]
    fn orbit_drag_keeps_distance_to_target() {
        let config = CameraConfig::default();
        let mut controller = OrbitController::new(&config);
        let mut camera = Camera::new(config.default_position);
        let distance = (camera.position - config.orbit_target).magnitude();

        controller.handle_mouse(120.0, -40.0);
        controller.update(&mut camera);

        assert_ne!(camera.position, config.default_position);
        let moved = (camera.position - config.orbit_target).magnitude();
        assert!((moved - distance).abs() < EPS);
    }

    #[test]
    fn sync_discards_pending_input() {
        let config = CameraConfig::default();
        let mut controller = OrbitController::new(&config);
        controller.handle_mouse(500.0, 500.0);
        controller.handle_scroll(3.0);

        let mut camera = Camera::new(config.default_position);
        controller.sync(&camera);
        controller.update(&mut camera);
        assert_eq!(camera.position, config.default_position);
    }
}
