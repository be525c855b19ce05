// src/engine_lib/controller.rs

use glam::{Quat, Vec3};
use winit::{
    event::{DeviceEvent, ElementState, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window},
};

use crate::engine_lib::camera::Camera;
use crate::engine_lib::transform::Pose;

/// Portal settings changes asked for from the keyboard since the last frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PortalRequests {
    pub toggle_enabled: bool,
    pub depth_delta: i32,
}

/// First-person look/move input. Produces a new camera pose each frame and nothing else.
pub struct CameraController {
    pub camera_pos_delta: Vec3,
    pub camera_yaw_delta_keyboard: f32,
    pub camera_pitch_delta_keyboard: f32,

    pub mouse_dx_accum: f32,
    pub mouse_dy_accum: f32,

    current_yaw: f32,
    current_pitch: f32,

    pub move_speed: f32,
    pub mouse_sensitivity: f32,
    pub cursor_grabbed: bool,

    portal_requests: PortalRequests,
}

impl CameraController {
    pub fn new(initial_yaw_rad: f32, initial_pitch_rad: f32, initial_grab: bool, sensitivity: f32) -> Self {
        Self {
            camera_pos_delta: Vec3::ZERO,
            camera_yaw_delta_keyboard: 0.0,
            camera_pitch_delta_keyboard: 0.0,
            mouse_dx_accum: 0.0,
            mouse_dy_accum: 0.0,
            current_yaw: initial_yaw_rad,
            current_pitch: initial_pitch_rad,
            move_speed: 3.0,
            mouse_sensitivity: sensitivity,
            cursor_grabbed: initial_grab,
            portal_requests: PortalRequests::default(),
        }
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent, window: &Window) -> bool {
        match event {
            WindowEvent::KeyboardInput { event: key_event, .. } => {
                let pressed = key_event.state == ElementState::Pressed;
                if pressed && !key_event.repeat {
                    match key_event.physical_key {
                        PhysicalKey::Code(KeyCode::Escape) => {
                            self.toggle_cursor_grab(window);
                            return true;
                        }
                        PhysicalKey::Code(KeyCode::KeyP) => {
                            self.portal_requests.toggle_enabled = !self.portal_requests.toggle_enabled;
                            return true;
                        }
                        PhysicalKey::Code(KeyCode::BracketLeft) => {
                            self.portal_requests.depth_delta -= 1;
                            return true;
                        }
                        PhysicalKey::Code(KeyCode::BracketRight) => {
                            self.portal_requests.depth_delta += 1;
                            return true;
                        }
                        _ => {}
                    }
                }
                self.handle_key(key_event.physical_key, pressed)
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if !self.cursor_grabbed && *state == ElementState::Pressed && *button == winit::event::MouseButton::Left {
                    self.grab_cursor(window, true);
                    return true;
                }
                false
            }
            WindowEvent::Focused(focused) => {
                if !*focused && self.cursor_grabbed {
                    self.grab_cursor(window, false);
                }
                false
            }
            _ => false,
        }
    }

    fn handle_key(&mut self, key: PhysicalKey, pressed: bool) -> bool {
        let amount = if pressed { 1.0 } else { 0.0 };
        match key {
            PhysicalKey::Code(KeyCode::KeyW) => { self.camera_pos_delta.z = -amount; true }
            PhysicalKey::Code(KeyCode::KeyS) => { self.camera_pos_delta.z = amount; true }
            PhysicalKey::Code(KeyCode::KeyA) => { self.camera_pos_delta.x = -amount; true }
            PhysicalKey::Code(KeyCode::KeyD) => { self.camera_pos_delta.x = amount; true }
            PhysicalKey::Code(KeyCode::Space) => { self.camera_pos_delta.y = amount; true }
            PhysicalKey::Code(KeyCode::ShiftLeft) | PhysicalKey::Code(KeyCode::ControlLeft) => {
                self.camera_pos_delta.y = -amount; true
            }
            PhysicalKey::Code(KeyCode::ArrowLeft) => { self.camera_yaw_delta_keyboard = amount; true }
            PhysicalKey::Code(KeyCode::ArrowRight) => { self.camera_yaw_delta_keyboard = -amount; true }
            PhysicalKey::Code(KeyCode::ArrowUp) => { self.camera_pitch_delta_keyboard = amount; true }
            PhysicalKey::Code(KeyCode::ArrowDown) => { self.camera_pitch_delta_keyboard = -amount; true }
            _ => false,
        }
    }

    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if !self.cursor_grabbed {
            self.mouse_dx_accum = 0.0;
            self.mouse_dy_accum = 0.0;
            return;
        }
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.mouse_dx_accum += *dx as f32;
            self.mouse_dy_accum += *dy as f32;
        }
    }

    pub fn toggle_cursor_grab(&mut self, window: &Window) {
        self.grab_cursor(window, !self.cursor_grabbed);
    }

    fn grab_cursor(&mut self, window: &Window, grab: bool) {
        if grab == self.cursor_grabbed {
            return;
        }
        if grab {
            if window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_e| window.set_cursor_grab(CursorGrabMode::Locked))
                .is_ok()
            {
                window.set_cursor_visible(false);
                self.cursor_grabbed = true;
            } else {
                log::warn!("Could not grab cursor");
            }
        } else if window.set_cursor_grab(CursorGrabMode::None).is_ok() {
            window.set_cursor_visible(true);
            self.cursor_grabbed = false;
            self.mouse_dx_accum = 0.0;
            self.mouse_dy_accum = 0.0;
        } else {
            log::warn!("Could not release cursor");
        }
    }

    /// Returns and clears the portal requests gathered since the last call.
    pub fn take_portal_requests(&mut self) -> PortalRequests {
        std::mem::take(&mut self.portal_requests)
    }

    /// Integrates the accumulated input over `dt` seconds into a new pose for `current`.
    pub fn next_pose(&mut self, current: &Pose, dt: f32) -> Pose {
        let move_speed = self.move_speed * dt;
        let rot_speed_keyboard = 1.5 * dt;

        self.current_yaw -= self.mouse_dx_accum * self.mouse_sensitivity;
        self.current_yaw += self.camera_yaw_delta_keyboard * rot_speed_keyboard;

        self.current_pitch -= self.mouse_dy_accum * self.mouse_sensitivity;
        self.current_pitch += self.camera_pitch_delta_keyboard * rot_speed_keyboard;

        self.mouse_dx_accum = 0.0;
        self.mouse_dy_accum = 0.0;

        let pitch_limit = std::f32::consts::FRAC_PI_2 - 0.01;
        self.current_pitch = self.current_pitch.clamp(-pitch_limit, pitch_limit);

        let orientation = Quat::from_rotation_y(self.current_yaw) * Quat::from_rotation_x(self.current_pitch);
        // Horizontal movement follows yaw only so looking down doesn't slow walking.
        let heading = Quat::from_rotation_y(self.current_yaw);
        let planar = heading * Vec3::new(self.camera_pos_delta.x, 0.0, self.camera_pos_delta.z);
        let vertical = Vec3::new(0.0, self.camera_pos_delta.y, 0.0);

        Pose::new(current.position + (planar + vertical) * move_speed, orientation)
    }

    pub fn apply_to_camera(&mut self, camera: &mut Camera, dt: f32) {
        let pose = self.next_pose(&camera.pose(), dt);
        camera.set_pose(pose);
    }
}
