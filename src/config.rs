//! Compile-time scene configuration.
//!
//! Every tunable of the scene lives here with the values the scene ships
//! with. Nothing is read from the environment or from disk at runtime; the
//! asset list is the only other input (see [`crate::scene::manifest`]).

use cgmath::{Point3, Vector3};

/// Top-level bundle handed to the engine and the scene flow.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneConfig {
    pub camera: CameraConfig,
    pub car_path: CarPathConfig,
    pub lighting: LightingConfig,
    pub renderer: RendererConfig,
}

/// Perspective camera and orbit controls used in free mode.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    /// Pose the camera starts in and returns to when leaving follow mode.
    pub default_position: Point3<f32>,
    /// Point the orbit controls circle around.
    pub orbit_target: Point3<f32>,
    /// Radians per dragged pixel.
    pub rotate_speed: f32,
    /// Fractional dolly per scroll line.
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Offset from the tracked object to the chase camera.
    pub follow_offset: Vector3<f32>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fovy: 70.0,
            znear: 0.1,
            zfar: 100.0,
            default_position: Point3::new(5.0, 3.0, 0.0),
            orbit_target: Point3::new(0.0, 0.0, 0.0),
            rotate_speed: 0.005,
            zoom_speed: 0.05,
            min_distance: 0.5,
            max_distance: 60.0,
            follow_offset: Vector3::new(0.0, 2.0, 4.0),
        }
    }
}

/// Circular path of the car in the horizontal plane.
#[derive(Debug, Clone, PartialEq)]
pub struct CarPathConfig {
    pub radius: f32,
    /// Circle center as `[x, z]`.
    pub center: [f32; 2],
    /// Radians per second along the circle.
    pub angular_speed: f32,
    /// Radians per second of yaw, wrapped to one turn.
    pub yaw_rate: f32,
}

impl Default for CarPathConfig {
    fn default() -> Self {
        Self {
            radius: 6.0,
            center: [-10.0, 4.0],
            angular_speed: 1.0,
            yaw_rate: 0.2,
        }
    }
}

/// Orthographic frustum of the directional light's shadow camera.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowCameraConfig {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ShadowCameraConfig {
    fn default() -> Self {
        Self {
            left: 0.0,
            right: 20.0,
            top: 15.0,
            bottom: -18.0,
            near: 0.5,
            far: 35.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightingConfig {
    pub ambient_colour: [f32; 3],
    pub ambient_intensity: f32,
    pub directional_colour: [f32; 3],
    pub directional_intensity: f32,
    /// The directional light shines from here towards `directional_target`.
    pub directional_position: Point3<f32>,
    pub directional_target: Point3<f32>,
    pub shadow_camera: ShadowCameraConfig,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_colour: [1.0, 1.0, 1.0],
            ambient_intensity: 1.3,
            directional_colour: [1.0, 1.0, 1.0],
            directional_intensity: 7.0,
            directional_position: Point3::new(2.8, 3.0, -13.0),
            directional_target: Point3::new(0.0, 0.0, 0.0),
            shadow_camera: ShadowCameraConfig::default(),
        }
    }
}

/// Fixed renderer options. Shadows are always PCF-filtered and the
/// output is always ACES filmic tone mapped; only the numbers vary.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Requested MSAA sample count; falls back to 1 if the surface
    /// format does not support it.
    pub sample_count: u32,
    pub shadow_map_size: u32,
    pub exposure: f32,
    pub clear_colour: wgpu::Color,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            sample_count: 4,
            shadow_map_size: 2048,
            exposure: 1.0,
            clear_colour: wgpu::Color::BLACK,
        }
    }
}
