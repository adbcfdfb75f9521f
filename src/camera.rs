use std::time::Duration;

use log::debug;
use nalgebra::{
    Isometry3, Matrix4, Perspective3, Point3, Unit, UnitQuaternion, Vector2, Vector3, Vector4,
};
use rayon::prelude::*;
use winit::dpi::PhysicalSize;
use winit::event::{MouseButton, VirtualKeyCode};

use crate::input::{CursorMode, Input};

// 이 버튼을 누르고 있어야 카메라가 움직임
pub const LOOK_BUTTON: MouseButton = MouseButton::Right;

const MOUSE_SENSITIVITY: f32 = 0.002;

#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    /// 수직 화각. 단위는 도(degree).
    pub vertical_fov: f32,
    pub near_clip: f32,
    pub far_clip: f32,
    pub movement_speed: f32,
    pub rotation_speed: f32,
    pub position: Point3<f32>,
    pub forward: Vector3<f32>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            vertical_fov: 45.0,
            near_clip: 0.1,
            far_clip: 100.0,
            movement_speed: 5.0,
            rotation_speed: 0.3,
            position: Point3::new(0.0, 0.0, 6.0),
            forward: Vector3::new(0.0, 0.0, -1.0),
        }
    }
}

pub struct Camera {
    projection: Matrix4<f32>,
    view: Matrix4<f32>,
    inverse_projection: Matrix4<f32>,
    inverse_view: Matrix4<f32>,

    config: CameraConfig,

    position: Point3<f32>,
    forward: Unit<Vector3<f32>>,

    ray_directions: Vec<Vector3<f32>>,
    last_mouse: Vector2<f32>,

    viewport_size: PhysicalSize<u32>,
}

impl Camera {
    pub fn new(config: CameraConfig) -> Self {
        let position = config.position;
        let forward = Unit::try_new(config.forward, f32::EPSILON)
            .unwrap_or_else(|| Unit::new_normalize(Vector3::new(0.0, 0.0, -1.0)));

        let mut camera = Self {
            projection: Matrix4::identity(),
            view: Matrix4::identity(),
            inverse_projection: Matrix4::identity(),
            inverse_view: Matrix4::identity(),
            config,
            position,
            forward,
            ray_directions: vec![],
            last_mouse: Vector2::zeros(),
            viewport_size: PhysicalSize::new(0, 0),
        };

        // 투영 행렬은 첫 resize 때 만들어짐
        camera.recalculate_view();
        camera
    }

    pub fn update<I: Input>(&mut self, time_delta: Duration, input: &mut I) -> bool {
        let mouse = input.mouse_position();
        let delta = (mouse - self.last_mouse) * MOUSE_SENSITIVITY;
        self.last_mouse = mouse;

        if !input.is_mouse_button_down(LOOK_BUTTON) {
            input.set_cursor_mode(CursorMode::Normal);
            return false;
        }

        input.set_cursor_mode(CursorMode::Locked);

        let up: Unit<Vector3<f32>> = Vector3::y_axis();
        // 정확히 위나 아래를 보고 있으면 오른쪽 방향을 정할 수 없음
        let right = Unit::try_new(self.forward.cross(&up), f32::EPSILON);

        let step = self.config.movement_speed * time_delta.as_secs_f32();
        let mut moved = false;

        if input.is_key_down(VirtualKeyCode::W) {
            self.position += self.forward.into_inner() * step;
            moved = true;
        } else if input.is_key_down(VirtualKeyCode::S) {
            self.position -= self.forward.into_inner() * step;
            moved = true;
        }

        if let Some(right) = right {
            if input.is_key_down(VirtualKeyCode::A) {
                self.position -= right.into_inner() * step;
                moved = true;
            } else if input.is_key_down(VirtualKeyCode::D) {
                self.position += right.into_inner() * step;
                moved = true;
            }
        }

        if input.is_key_down(VirtualKeyCode::Q) {
            self.position -= up.into_inner() * step;
            moved = true;
        } else if input.is_key_down(VirtualKeyCode::E) {
            self.position += up.into_inner() * step;
            moved = true;
        }

        if let (Some(right), true) = (right, delta.x != 0.0 || delta.y != 0.0) {
            let pitch_delta = delta.y * self.config.rotation_speed;
            let yaw_delta = delta.x * self.config.rotation_speed;

            let pitch = UnitQuaternion::from_axis_angle(&right, -pitch_delta);
            let yaw = UnitQuaternion::from_axis_angle(&up, -yaw_delta);
            // 오차가 쌓이지 않도록 곱한 뒤 다시 정규화
            let rotation = UnitQuaternion::new_normalize(pitch.into_inner() * yaw.into_inner());

            self.forward = Unit::new_normalize(rotation * self.forward.into_inner());
            moved = true;
        }

        if moved {
            self.recalculate_view();
            self.recalculate_ray_directions();
        }

        moved
    }

    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if self.viewport_size.width == width && self.viewport_size.height == height {
            return false;
        }

        debug!("camera viewport {}x{} -> {width}x{height}", self.viewport_size.width, self.viewport_size.height);
        self.viewport_size = PhysicalSize::new(width, height);

        if width == 0 || height == 0 {
            self.ray_directions.clear();
            return true;
        }

        self.recalculate_projection();
        self.recalculate_ray_directions();
        true
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn direction(&self) -> Unit<Vector3<f32>> {
        self.forward
    }

    pub fn ray_directions(&self) -> &[Vector3<f32>] {
        &self.ray_directions
    }

    pub fn projection(&self) -> &Matrix4<f32> {
        &self.projection
    }

    pub fn inverse_projection(&self) -> &Matrix4<f32> {
        &self.inverse_projection
    }

    pub fn view(&self) -> &Matrix4<f32> {
        &self.view
    }

    pub fn inverse_view(&self) -> &Matrix4<f32> {
        &self.inverse_view
    }

    pub fn viewport_size(&self) -> PhysicalSize<u32> {
        self.viewport_size
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    fn recalculate_projection(&mut self) {
        let aspect = self.viewport_size.width as f32 / self.viewport_size.height as f32;
        let perspective = Perspective3::new(
            aspect,
            self.config.vertical_fov.to_radians(),
            self.config.near_clip,
            self.config.far_clip,
        );

        self.projection = perspective.to_homogeneous();
        self.inverse_projection = perspective.inverse();
    }

    fn recalculate_view(&mut self) {
        let target = self.position + self.forward.into_inner();
        let view = Isometry3::look_at_rh(&self.position, &target, &Vector3::y_axis());

        self.view = view.to_homogeneous();
        self.inverse_view = view.inverse().to_homogeneous();
    }

    fn recalculate_ray_directions(&mut self) {
        let width = self.viewport_size.width as usize;
        let height = self.viewport_size.height as usize;
        if width == 0 || height == 0 {
            self.ray_directions.clear();
            return;
        }

        let inverse_projection = self.inverse_projection;
        let inverse_view = self.inverse_view;

        // y가 바깥, x가 안쪽인 행 우선 순서
        (0..width * height)
            .into_par_iter()
            .map(|index| {
                let x = index % width;
                let y = index / width;

                let coord = Vector2::new(x as f32 / width as f32, y as f32 / height as f32) * 2.0
                    - Vector2::repeat(1.0);

                let target = inverse_projection * Vector4::new(coord.x, coord.y, 1.0, 1.0);
                let direction = (target.xyz() / target.w).normalize();

                (inverse_view * Vector4::new(direction.x, direction.y, direction.z, 0.0)).xyz()
            })
            .collect_into_vec(&mut self.ray_directions);
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}
