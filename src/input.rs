use std::collections::HashSet;

use log::warn;
use nalgebra::Vector2;
use winit::event::{DeviceEvent, ElementState, KeyboardInput, MouseButton, VirtualKeyCode, WindowEvent};
use winit::window::{CursorGrabMode, Window};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CursorMode {
    #[default]
    Normal,
    Hidden,
    Locked,
}

/// 카메라가 읽어가는 입력 상태. 질의 함수들은 상태를 바꾸지 않음.
pub trait Input {
    fn is_key_down(&self, key: VirtualKeyCode) -> bool;
    fn is_mouse_button_down(&self, button: MouseButton) -> bool;
    fn mouse_position(&self) -> Vector2<f32>;
    fn set_cursor_mode(&mut self, mode: CursorMode);
}

// winit 이벤트를 모아서 Input으로 제공
#[derive(Debug)]
pub struct WinitInput {
    keys: HashSet<VirtualKeyCode>,
    buttons: HashSet<MouseButton>,
    mouse: Vector2<f32>,
    cursor_mode: CursorMode,
    applied_mode: CursorMode,
}

impl WinitInput {
    pub fn new() -> Self {
        Self {
            keys: HashSet::new(),
            buttons: HashSet::new(),
            mouse: Vector2::zeros(),
            cursor_mode: CursorMode::Normal,
            applied_mode: CursorMode::Normal,
        }
    }

    pub fn cursor_mode(&self) -> CursorMode {
        self.cursor_mode
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state,
                        virtual_keycode: Some(key),
                        ..
                    },
                ..
            } => {
                match state {
                    ElementState::Pressed => self.keys.insert(*key),
                    ElementState::Released => self.keys.remove(key),
                };
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                match state {
                    ElementState::Pressed => self.buttons.insert(*button),
                    ElementState::Released => self.buttons.remove(button),
                };
                true
            }
            // 잠긴 커서는 움직이지 않으니 그땐 DeviceEvent로 받음
            WindowEvent::CursorMoved { position, .. } if self.applied_mode != CursorMode::Locked => {
                self.mouse = Vector2::new(position.x as f32, position.y as f32);
                true
            }
            WindowEvent::Focused(false) => {
                self.keys.clear();
                self.buttons.clear();
                false
            }
            _ => false,
        }
    }

    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if self.applied_mode == CursorMode::Locked {
                self.mouse += Vector2::new(*dx as f32, *dy as f32);
            }
        }
    }

    pub fn apply_cursor_mode(&mut self, window: &Window) {
        if self.cursor_mode == self.applied_mode {
            return;
        }

        let grab = match self.cursor_mode {
            CursorMode::Normal | CursorMode::Hidden => window.set_cursor_grab(CursorGrabMode::None),
            // 플랫폼마다 지원하는 모드가 달라서 Locked가 안되면 Confined로
            CursorMode::Locked => window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined)),
        };
        if let Err(error) = grab {
            warn!("failed to change cursor grab mode to {:?}: {error}", self.cursor_mode);
        }

        window.set_cursor_visible(self.cursor_mode == CursorMode::Normal);
        self.applied_mode = self.cursor_mode;
    }
}

impl Default for WinitInput {
    fn default() -> Self {
        Self::new()
    }
}

impl Input for WinitInput {
    fn is_key_down(&self, key: VirtualKeyCode) -> bool {
        self.keys.contains(&key)
    }

    fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    fn mouse_position(&self) -> Vector2<f32> {
        self.mouse
    }

    fn set_cursor_mode(&mut self, mode: CursorMode) {
        self.cursor_mode = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_motion_only_counts_while_locked() {
        let mut input = WinitInput::new();
        input.handle_device_event(&DeviceEvent::MouseMotion { delta: (3.0, 4.0) });
        assert_eq!(input.mouse_position(), Vector2::zeros());

        // apply_cursor_mode는 창이 필요해서 상태를 직접 맞춤
        input.set_cursor_mode(CursorMode::Locked);
        input.applied_mode = CursorMode::Locked;
        input.handle_device_event(&DeviceEvent::MouseMotion { delta: (3.0, 4.0) });
        input.handle_device_event(&DeviceEvent::MouseMotion { delta: (1.0, -2.0) });
        assert_eq!(input.mouse_position(), Vector2::new(4.0, 2.0));
    }

    #[test]
    fn test_focus_loss_releases_everything() {
        let mut input = WinitInput::new();
        input.keys.insert(VirtualKeyCode::W);
        input.buttons.insert(MouseButton::Right);

        input.handle_window_event(&WindowEvent::Focused(false));
        assert!(!input.is_key_down(VirtualKeyCode::W));
        assert!(!input.is_mouse_button_down(MouseButton::Right));
    }
}
