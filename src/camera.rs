// camera.rs — free-look camera and the per-frame navigation context
//
// The event loop owns one `NavigationContext`, feeds it input events, advances it once
// per frame and hands it to the renderer by reference.

use glam::{Mat4, Vec3};
use std::time::Instant;

pub const DEFAULT_YAW: f32 = -90.0;
pub const DEFAULT_PITCH: f32 = 0.0;
pub const DEFAULT_SPEED: f32 = 2.5;
pub const DEFAULT_SENSITIVITY: f32 = 0.1;
pub const DEFAULT_ZOOM: f32 = 45.0;

const PITCH_LIMIT: f32 = 89.0;
const ZOOM_MIN: f32 = 1.0;
const ZOOM_MAX: f32 = 45.0;
// Frames slower than this are treated as a hitch, not as a long keypress.
const MAX_FRAME_DT: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractMode {
    /// Fly around freely.
    #[default]
    FreeView,
    /// Move around the origin while always looking at it.
    GodView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Forward,
    Backward,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Color,
    Depth,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub front: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    world_up: Vec3,
    /// Degrees, -90 looks down -Z.
    pub yaw: f32,
    /// Degrees, clamped to ±89.
    pub pitch: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    /// Vertical field of view in degrees.
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            movement_speed: DEFAULT_SPEED,
            mouse_sensitivity: DEFAULT_SENSITIVITY,
            zoom: DEFAULT_ZOOM,
        };
        camera.update_vectors();
        camera
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::perspective_rh(self.zoom.to_radians(), aspect, near, far)
    }

    pub fn process_keyboard(&mut self, direction: Movement, dt: f32) {
        let velocity = self.movement_speed * dt;
        match direction {
            Movement::Forward => self.position += self.front * velocity,
            Movement::Backward => self.position -= self.front * velocity,
            Movement::Left => self.position -= self.right * velocity,
            Movement::Right => self.position += self.right * velocity,
        }
    }

    /// Same keys as free view, but the camera re-aims at the origin afterwards, so
    /// strafing becomes orbiting.
    pub fn process_keyboard_god_view(&mut self, direction: Movement, dt: f32) {
        let radius = self.position.length();
        self.process_keyboard(direction, dt);
        if matches!(direction, Movement::Left | Movement::Right) && radius > f32::EPSILON {
            self.position = self.position.normalize_or_zero() * radius;
        }
        self.observe_center();
    }

    /// `x_offset`, `y_offset` in pixels; positive y looks up.
    pub fn process_mouse_movement(&mut self, x_offset: f32, y_offset: f32) {
        self.yaw += x_offset * self.mouse_sensitivity;
        self.pitch = (self.pitch + y_offset * self.mouse_sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
    }

    pub fn process_mouse_scroll(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(ZOOM_MIN, ZOOM_MAX);
    }

    /// Point the camera at the origin. No-op when standing on it.
    pub fn observe_center(&mut self) {
        let to_center = -self.position;
        if to_center.length_squared() <= f32::EPSILON {
            return;
        }
        let dir = to_center.normalize();
        self.pitch = dir.y.asin().to_degrees().clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.yaw = dir.z.atan2(dir.x).to_degrees();
        self.update_vectors();
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct HeldKeys {
    forward: bool,
    backward: bool,
    left: bool,
    right: bool,
}

/// Camera plus the input state that drives it.
#[derive(Debug, Clone)]
pub struct NavigationContext {
    pub camera: Camera,
    pub mode: InteractMode,
    pub display: DisplayMode,
    home: Camera,
    held: HeldKeys,
    dragging: bool,
    last_cursor: Option<(f64, f64)>,
    last_frame: Option<Instant>,
    delta_time: f32,
}

impl NavigationContext {
    pub fn new(camera: Camera) -> Self {
        Self {
            home: camera.clone(),
            camera,
            mode: InteractMode::default(),
            display: DisplayMode::default(),
            held: HeldKeys::default(),
            dragging: false,
            last_cursor: None,
            last_frame: None,
            delta_time: 0.0,
        }
    }

    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    pub fn set_held(&mut self, movement: Movement, pressed: bool) {
        match movement {
            Movement::Forward => self.held.forward = pressed,
            Movement::Backward => self.held.backward = pressed,
            Movement::Left => self.held.left = pressed,
            Movement::Right => self.held.right = pressed,
        }
    }

    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
        if !dragging {
            self.last_cursor = None;
        }
    }

    pub fn cursor_moved(&mut self, x: f64, y: f64) {
        if !self.dragging {
            return;
        }
        if let Some((lx, ly)) = self.last_cursor {
            let dx = (x - lx) as f32;
            // window y grows downwards
            let dy = (ly - y) as f32;
            self.camera.process_mouse_movement(dx, dy);
            if self.mode == InteractMode::GodView {
                self.camera.observe_center();
            }
        }
        self.last_cursor = Some((x, y));
    }

    pub fn scroll(&mut self, y_offset: f32) {
        self.camera.process_mouse_scroll(y_offset);
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            InteractMode::FreeView => InteractMode::GodView,
            InteractMode::GodView => InteractMode::FreeView,
        };
        if self.mode == InteractMode::GodView {
            self.camera.observe_center();
        }
    }

    pub fn toggle_display(&mut self) {
        self.display = match self.display {
            DisplayMode::Color => DisplayMode::Depth,
            DisplayMode::Depth => DisplayMode::Color,
        };
    }

    pub fn reset(&mut self) {
        self.camera = self.home.clone();
        self.mode = InteractMode::FreeView;
    }

    /// Once per frame: measure the frame time and apply held movement keys.
    pub fn advance(&mut self, now: Instant) {
        self.delta_time = match self.last_frame {
            Some(prev) => now.saturating_duration_since(prev).as_secs_f32().min(MAX_FRAME_DT),
            None => 0.0,
        };
        self.last_frame = Some(now);

        let held = self.held;
        let moves = [
            (held.forward, Movement::Forward),
            (held.backward, Movement::Backward),
            (held.left, Movement::Left),
            (held.right, Movement::Right),
        ];
        for (pressed, movement) in moves {
            if !pressed {
                continue;
            }
            match self.mode {
                InteractMode::FreeView => self.camera.process_keyboard(movement, self.delta_time),
                InteractMode::GodView => self
                    .camera
                    .process_keyboard_god_view(movement, self.delta_time),
            }
        }
    }

    pub fn view_projection(&self, aspect: f32, near: f32, far: f32) -> Mat4 {
        self.camera.projection_matrix(aspect, near, far) * self.camera.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn near(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn default_camera_looks_down_negative_z() {
        let c = Camera::default();
        assert!(near(c.front, Vec3::NEG_Z));
        assert!(near(c.right, Vec3::X));
        assert!(near(c.up, Vec3::Y));
    }

    #[test]
    fn pitch_is_clamped() {
        let mut c = Camera::default();
        c.process_mouse_movement(0.0, 10_000.0);
        assert_eq!(c.pitch, 89.0);
        c.process_mouse_movement(0.0, -100_000.0);
        assert_eq!(c.pitch, -89.0);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut c = Camera::default();
        c.process_mouse_scroll(100.0);
        assert_eq!(c.zoom, 1.0);
        c.process_mouse_scroll(-100.0);
        assert_eq!(c.zoom, 45.0);
    }

    #[test]
    fn keyboard_moves_by_speed_times_dt() {
        let mut c = Camera::default();
        c.process_keyboard(Movement::Forward, 2.0);
        assert!(near(c.position, Vec3::new(0.0, 0.0, -5.0)));
        c.process_keyboard(Movement::Right, 1.0);
        assert!(near(c.position, Vec3::new(2.5, 0.0, -5.0)));
    }

    #[test]
    fn observe_center_aims_at_origin() {
        let mut c = Camera::new(Vec3::new(3.0, 4.0, 0.0));
        c.observe_center();
        assert!(near(c.front, Vec3::new(-0.6, -0.8, 0.0)));

        let mut at_origin = Camera::default();
        at_origin.observe_center();
        assert!(near(at_origin.front, Vec3::NEG_Z));
    }

    #[test]
    fn god_view_strafe_keeps_radius() {
        let mut c = Camera::new(Vec3::new(0.0, 0.0, 5.0));
        c.observe_center();
        c.process_keyboard_god_view(Movement::Right, 0.5);
        assert!((c.position.length() - 5.0).abs() < 1e-4);
        assert!(near(c.front, -c.position.normalize()));
    }

    #[test]
    fn drag_only_rotates_while_pressed() {
        let mut nav = NavigationContext::new(Camera::default());
        nav.cursor_moved(0.0, 0.0);
        nav.cursor_moved(100.0, 0.0);
        assert_eq!(nav.camera.yaw, DEFAULT_YAW);

        nav.set_dragging(true);
        nav.cursor_moved(0.0, 0.0);
        nav.cursor_moved(100.0, 50.0);
        assert!((nav.camera.yaw - (DEFAULT_YAW + 10.0)).abs() < 1e-4);
        assert!((nav.camera.pitch + 5.0).abs() < 1e-4);
    }

    #[test]
    fn advance_applies_held_keys_once_per_frame() {
        let mut nav = NavigationContext::new(Camera::default());
        let t0 = Instant::now();
        nav.advance(t0);
        assert_eq!(nav.delta_time(), 0.0);

        nav.set_held(Movement::Forward, true);
        nav.advance(t0 + Duration::from_millis(100));
        assert!((nav.delta_time() - 0.1).abs() < 1e-4);
        assert!(near(nav.camera.position, Vec3::new(0.0, 0.0, -0.25)));

        nav.set_held(Movement::Forward, false);
        nav.advance(t0 + Duration::from_millis(200));
        assert!(near(nav.camera.position, Vec3::new(0.0, 0.0, -0.25)));
    }

    #[test]
    fn long_frames_are_capped() {
        let mut nav = NavigationContext::new(Camera::default());
        let t0 = Instant::now();
        nav.advance(t0);
        nav.advance(t0 + Duration::from_secs(5));
        assert_eq!(nav.delta_time(), MAX_FRAME_DT);
    }

    #[test]
    fn reset_restores_home_camera() {
        let mut nav = NavigationContext::new(Camera::new(Vec3::new(0.0, 1.0, 0.0)));
        nav.camera.process_keyboard(Movement::Left, 3.0);
        nav.toggle_mode();
        nav.reset();
        assert!(near(nav.camera.position, Vec3::new(0.0, 1.0, 0.0)));
        assert_eq!(nav.mode, InteractMode::FreeView);
    }

    #[test]
    fn toggles_flip_state() {
        let mut nav = NavigationContext::new(Camera::default());
        nav.toggle_display();
        assert_eq!(nav.display, DisplayMode::Depth);
        nav.toggle_display();
        assert_eq!(nav.display, DisplayMode::Color);
    }

    #[test]
    fn view_projection_maps_forward_point_to_screen_center() {
        let nav = NavigationContext::new(Camera::default());
        let clip = nav.view_projection(1.0, 0.1, 100.0) * glam::Vec4::new(0.0, 0.0, -10.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
