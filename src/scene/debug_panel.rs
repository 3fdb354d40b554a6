//! A one-control debug panel bound to the keyboard.

use winit::{
    event::{ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::scene::camera_mode::CameraMode;

/// Exposes `use_car_camera`, toggled with `C`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugPanel {
    use_car_camera: bool,
    toggle_key: KeyCode,
}

impl DebugPanel {
    pub fn new(mode: CameraMode) -> Self {
        Self {
            use_car_camera: mode.is_follow(),
            toggle_key: KeyCode::KeyC,
        }
    }

    pub fn use_car_camera(&self) -> bool {
        self.use_car_camera
    }

    pub fn mode(&self) -> CameraMode {
        self.use_car_camera.into()
    }

    /// Flips the control if `key` is bound to it and returns the new value.
    pub fn press(&mut self, key: KeyCode) -> Option<bool> {
        if key != self.toggle_key {
            return None;
        }
        self.use_car_camera = !self.use_car_camera;
        Some(self.use_car_camera)
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) -> Option<bool> {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.press(*code),
            _ => None,
        }
    }
}

impl Default for DebugPanel {
    fn default() -> Self {
        Self::new(CameraMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_toggles_the_car_camera() {
        let mut panel = DebugPanel::default();
        assert!(!panel.use_car_camera());
        assert_eq!(panel.press(KeyCode::KeyC), Some(true));
        assert_eq!(panel.mode(), CameraMode::Follow);
        assert_eq!(panel.press(KeyCode::KeyC), Some(false));
        assert_eq!(panel.mode(), CameraMode::Free);
    }

    #[test]
    fn other_keys_are_ignored() {
        let mut panel = DebugPanel::new(CameraMode::Follow);
        assert_eq!(panel.press(KeyCode::KeyX), None);
        assert!(panel.use_car_camera());
    }
}
