//! Circular motion of the car.

use std::f32::consts::TAU;

use cgmath::{Rad, Vector3};

use crate::{config::CarPathConfig, scene::controller::TrackedObject};

/// Uniform circular motion in the horizontal plane.
#[derive(Debug, Clone, PartialEq)]
pub struct CarPath {
    radius: f32,
    center: [f32; 2],
    angular_speed: f32,
    yaw_rate: f32,
}

impl CarPath {
    pub fn new(config: &CarPathConfig) -> Self {
        Self {
            radius: config.radius,
            center: config.center,
            angular_speed: config.angular_speed,
            yaw_rate: config.yaw_rate,
        }
    }

    /// Position on the circle at time `t`, keeping the given height.
    pub fn position_at(&self, t: f32, height: f32) -> Vector3<f32> {
        let phase = t * self.angular_speed;
        Vector3::new(
            self.radius * phase.sin() + self.center[0],
            height,
            self.radius * phase.cos() + self.center[1],
        )
    }

    /// Yaw at time `t`, wrapped into `[0, 2π)`.
    pub fn yaw_at(&self, t: f32) -> Rad<f32> {
        let yaw = (t * self.yaw_rate).rem_euclid(TAU);
        // rem_euclid can round up to the modulus itself.
        Rad(if yaw >= TAU { 0.0 } else { yaw })
    }

    /// Moves `object` to where it is at time `t`. Height and the other two
    /// rotation axes are left alone.
    pub fn apply(&self, t: f32, object: &mut TrackedObject) {
        object.position = self.position_at(t, object.position.y);
        object.rotation.y = self.yaw_at(t);
    }
}

impl Default for CarPath {
    fn default() -> Self {
        Self::new(&CarPathConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn starts_at_the_top_of_the_circle() {
        let path = CarPath::default();
        let start = path.position_at(0.0, -2.0);
        assert!((start.x + 10.0).abs() < 1e-5);
        assert!((start.z - 10.0).abs() < 1e-5);
        assert_eq!(start.y, -2.0);
    }

    #[test]
    fn half_turn_after_pi_seconds() {
        let path = CarPath::default();
        let p = path.position_at(PI, 1.5);
        assert!((p.x + 10.0).abs() < 1e-4);
        assert!((p.z + 2.0).abs() < 1e-4);
        assert!((path.yaw_at(PI).0 - 0.2 * PI).abs() < 1e-5);
    }

    #[test]
    fn yaw_wraps_after_a_full_turn() {
        let path = CarPath::default();
        // 0.2 rad/s needs 10π seconds for one turn.
        let t = 10.0 * PI + 1.0;
        let yaw = path.yaw_at(t).0;
        assert!((0.0..TAU).contains(&yaw));
        assert!((yaw - 0.2).abs() < 1e-3);
    }

    #[test]
    fn apply_keeps_height_and_other_axes() {
        let path = CarPath::default();
        let mut car = TrackedObject::new(Vector3::new(-9.0, -2.0, 2.0), Rad(0.0), 0.01);
        car.rotation.x = Rad(0.25);
        path.apply(2.0, &mut car);
        assert_eq!(car.position.y, -2.0);
        assert_eq!(car.rotation.x, Rad(0.25));
        assert_eq!(car.rotation.z, Rad(0.0));
        assert!((car.rotation.y.0 - 0.4).abs() < 1e-6);
    }
}
