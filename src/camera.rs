//! Orbit camera, its input controller and the GPU uniform.
//!
//! The camera circles a target point. Left drag orbits, right drag pans,
//! the wheel dollies and `R` returns to the starting pose.

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use wgpu::util::DeviceExt;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::config::CameraConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const SAFE_FRAC_PI_2: f32 = std::f32::consts::FRAC_PI_2 - 0.0001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitBounds {
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitBounds {
    fn default() -> Self {
        Self {
            min_distance: 1.0,
            max_distance: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pose {
    target: Point3<f32>,
    distance: f32,
    yaw: f32,
    pitch: f32,
}

/// A camera on a sphere around `target`.
///
/// `yaw` turns around the y axis, measured from +z towards +x. `pitch` lifts
/// the eye above the xz plane and never quite reaches the poles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub target: Point3<f32>,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub bounds: OrbitBounds,
    initial: Pose,
}

impl OrbitCamera {
    pub fn from_eye_target<P: Into<Point3<f32>>>(eye: P, target: P, bounds: OrbitBounds) -> Self {
        let eye = eye.into();
        let target = target.into();
        let offset = eye - target;
        let distance = offset.magnitude();
        let (yaw, pitch) = if distance > f32::EPSILON {
            (
                offset.x.atan2(offset.z),
                (offset.y / distance).asin().clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2),
            )
        } else {
            (0.0, 0.0)
        };
        let pose = Pose {
            target,
            distance: distance.clamp(bounds.min_distance, bounds.max_distance),
            yaw,
            pitch,
        };
        let mut camera = Self {
            target,
            distance: 0.0,
            yaw: 0.0,
            pitch: 0.0,
            bounds,
            initial: pose,
        };
        camera.apply(pose);
        camera
    }

    fn apply(&mut self, pose: Pose) {
        self.target = pose.target;
        self.distance = pose.distance;
        self.yaw = pose.yaw;
        self.pitch = pose.pitch;
    }

    pub fn eye(&self) -> Point3<f32> {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.target
            + Vector3::new(sin_yaw * cos_pitch, sin_pitch, cos_yaw * cos_pitch) * self.distance
    }

    /// Orbits by the given angles in radians.
    pub fn rotate(&mut self, d_yaw: f32, d_pitch: f32) {
        self.yaw -= d_yaw;
        self.pitch = (self.pitch + d_pitch).clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2);
    }

    /// Moves target and eye together in the view plane. Deltas are in world
    /// units at the target's distance.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let forward = (self.target - self.eye()).normalize();
        let right = forward.cross(Vector3::unit_y()).normalize();
        let up = right.cross(forward);
        self.target += up * dy - right * dx;
    }

    /// Dollies towards the target for positive `scroll`.
    pub fn zoom(&mut self, scroll: f32) {
        self.distance = (self.distance * 0.95f32.powf(scroll))
            .clamp(self.bounds.min_distance, self.bounds.max_distance);
    }

    pub fn reset(&mut self) {
        self.apply(self.initial);
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye(), self.target, Vector3::unit_y())
    }
}

impl From<&CameraConfig> for OrbitCamera {
    fn from(config: &CameraConfig) -> Self {
        OrbitCamera::from_eye_target(config.position, config.target, OrbitBounds::default())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum Drag {
    #[default]
    None,
    Rotate,
    Pan,
}

/// Turns window input into camera motion.
///
/// Input is accumulated between frames and applied in [`OrbitController::update`].
#[derive(Debug)]
pub struct OrbitController {
    rotate_speed: f32,
    pan_speed: f32,
    zoom_speed: f32,
    drag: Drag,
    cursor: Option<PhysicalPosition<f64>>,
    rotate_delta: (f32, f32),
    pan_delta: (f32, f32),
    scroll: f32,
    reset: bool,
}

impl OrbitController {
    pub fn new(rotate_speed: f32, pan_speed: f32, zoom_speed: f32) -> Self {
        Self {
            rotate_speed,
            pan_speed,
            zoom_speed,
            drag: Drag::None,
            cursor: None,
            rotate_delta: (0.0, 0.0),
            pan_delta: (0.0, 0.0),
            scroll: 0.0,
            reset: false,
        }
    }

    /// Returns whether the event moved or will move the camera.
    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.press(*button, state.is_pressed());
                true
            }
            WindowEvent::CursorMoved { position, .. } => self.cursor_moved(*position),
            WindowEvent::CursorLeft { .. } => {
                self.drag = Drag::None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.scroll(match delta {
                    MouseScrollDelta::LineDelta(_, lines) => *lines,
                    // roughly one line per 50 pixels
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => *y as f32 / 50.0,
                });
                true
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::KeyR),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                self.reset = true;
                true
            }
            _ => false,
        }
    }

    fn press(&mut self, button: MouseButton, pressed: bool) {
        self.drag = match (button, pressed) {
            (MouseButton::Left, true) => Drag::Rotate,
            (MouseButton::Right, true) | (MouseButton::Middle, true) => Drag::Pan,
            (_, false) => Drag::None,
            _ => self.drag,
        };
    }

    fn cursor_moved(&mut self, position: PhysicalPosition<f64>) -> bool {
        let previous = self.cursor.replace(position);
        let Some(previous) = previous else {
            return false;
        };
        let dx = (position.x - previous.x) as f32;
        let dy = (position.y - previous.y) as f32;
        match self.drag {
            Drag::Rotate => {
                self.rotate_delta.0 += dx;
                self.rotate_delta.1 += dy;
                true
            }
            Drag::Pan => {
                self.pan_delta.0 += dx;
                self.pan_delta.1 += dy;
                true
            }
            Drag::None => false,
        }
    }

    fn scroll(&mut self, lines: f32) {
        self.scroll += lines;
    }

    pub fn update(&mut self, camera: &mut OrbitCamera) {
        if std::mem::take(&mut self.reset) {
            camera.reset();
        }
        let (rx, ry) = std::mem::take(&mut self.rotate_delta);
        camera.rotate(rx * self.rotate_speed, ry * self.rotate_speed);

        let (px, py) = std::mem::take(&mut self.pan_delta);
        let pan_scale = camera.distance * self.pan_speed;
        camera.pan(px * pan_scale, py * pan_scale);

        let scroll = std::mem::take(&mut self.scroll);
        camera.zoom(scroll * self.zoom_speed);
    }
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new(0.005, 0.001, 1.0)
    }
}

#[derive(Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
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
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &OrbitCamera, projection: &Projection) {
        self.view_position = camera.eye().to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct CameraResources {
    pub camera: OrbitCamera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, camera: OrbitCamera, projection: &Projection) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            controller: OrbitController::default(),
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Applies pending input and uploads the new view.
    pub fn update(&mut self, queue: &wgpu::Queue, projection: &Projection) {
        self.controller.update(&mut self.camera);
        self.uniform.update_view_proj(&self.camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}
