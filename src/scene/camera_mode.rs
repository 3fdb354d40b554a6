use std::fmt;

/// Who drives the camera pose.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CameraMode {
    /// User controlled orbit around the scene origin.
    #[default]
    Free,
    /// Pose derived from the car every frame.
    Follow,
}

impl CameraMode {
    pub fn toggled(self) -> Self {
        match self {
            CameraMode::Free => CameraMode::Follow,
            CameraMode::Follow => CameraMode::Free,
        }
    }

    pub fn is_follow(self) -> bool {
        matches!(self, CameraMode::Follow)
    }
}

impl From<bool> for CameraMode {
    /// Maps the debug panel's `use_car_camera` checkbox to a mode.
    fn from(use_car_camera: bool) -> Self {
        if use_car_camera {
            CameraMode::Follow
        } else {
            CameraMode::Free
        }
    }
}

impl fmt::Display for CameraMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraMode::Free => f.write_str("free"),
            CameraMode::Follow => f.write_str("follow"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_twice_is_identity() {
        for mode in [CameraMode::Free, CameraMode::Follow] {
            assert_ne!(mode.toggled(), mode);
            assert_eq!(mode.toggled().toggled(), mode);
        }
    }

    #[test]
    fn checkbox_maps_to_mode() {
        assert_eq!(CameraMode::from(true), CameraMode::Follow);
        assert_eq!(CameraMode::from(false), CameraMode::Free);
        assert!(!CameraMode::default().is_follow());
    }
}
