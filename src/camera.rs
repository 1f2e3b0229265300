use crate::config::{CameraConfig, ControlsConfig};
use crate::utils::Size;
use glam::{Mat4, Vec3};
use std::f32::consts::{PI, TAU};

#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    pub fov_y_deg: f32,
    aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl PerspectiveCamera {
    pub fn new(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            fov_y_deg: config.fov_deg,
            aspect: if aspect > 0.0 { aspect } else { 1.0 },
            near: config.near,
            far: config.far,
            position: Vec3::from(config.position),
            target: Vec3::ZERO,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Follows the surface size. A zero dimension is ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if let Some(aspect) = Size::new(width as f32, height as f32).aspect() {
            self.aspect = aspect;
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    /// Projection with wgpu's 0..1 depth range.
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_deg.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

/// Offset from the orbit target in spherical coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    /// Polar angle from +Y.
    phi: f32,
    /// Azimuth around +Y, measured from +Z.
    theta: f32,
}

impl Spherical {
    const EPS: f32 = 1e-6;

    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius == 0.0 {
            return Self {
                radius: 0.0,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            theta: offset.x.atan2(offset.z),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi = self.phi.sin();
        Vec3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        )
    }

    fn make_safe(&mut self) {
        self.phi = self.phi.clamp(Self::EPS, PI - Self::EPS);
    }
}

/// Orbit-style camera controls with damping and an idle auto-rotation.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub damping: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub auto_rotate: bool,
    pub auto_rotate_speed: f32,
    pub idle_delay: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    idle_time: f32,
}

impl OrbitControls {
    pub fn new(config: &ControlsConfig) -> Self {
        Self {
            target: Vec3::from(config.target),
            damping: config.damping.clamp(0.0, 1.0),
            min_distance: config.min_distance,
            max_distance: config.max_distance.max(config.min_distance),
            auto_rotate: config.auto_rotate,
            auto_rotate_speed: config.auto_rotate_speed,
            idle_delay: config.idle_delay,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            // start idle so the preview orbits from the first frame
            idle_time: config.idle_delay,
        }
    }

    /// Rotation from a pointer drag, in pixels, relative to a viewport of
    /// `viewport_height` pixels.
    pub fn drag(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        self.mark_active();
        self.rotate_left(TAU * dx / viewport_height * self.rotate_speed);
        self.rotate_up(TAU * dy / viewport_height * self.rotate_speed);
    }

    /// Wheel input; positive `steps` moves closer.
    pub fn zoom(&mut self, steps: f32) {
        self.mark_active();
        let factor = 0.95f32.powf(self.zoom_speed * steps.abs());
        if steps > 0.0 {
            self.scale *= factor;
        } else if steps < 0.0 {
            self.scale /= factor;
        }
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.delta_theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.delta_phi -= angle;
    }

    pub fn is_idle(&self) -> bool {
        self.idle_time >= self.idle_delay
    }

    fn mark_active(&mut self) {
        self.idle_time = 0.0;
    }

    /// Advances the controls by `dt` seconds and moves the camera.
    pub fn update(&mut self, camera: &mut PerspectiveCamera, dt: f32) {
        self.idle_time += dt.max(0.0);
        if self.auto_rotate && self.is_idle() {
            self.rotate_left(TAU / 60.0 * self.auto_rotate_speed * dt);
        }

        let mut spherical = Spherical::from_offset(camera.position - self.target);
        if self.damping > 0.0 {
            spherical.theta += self.delta_theta * self.damping;
            spherical.phi += self.delta_phi * self.damping;
        } else {
            spherical.theta += self.delta_theta;
            spherical.phi += self.delta_phi;
        }
        spherical.make_safe();
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        camera.position = self.target + spherical.to_offset();
        camera.target = self.target;

        if self.damping > 0.0 {
            self.delta_theta *= 1.0 - self.damping;
            self.delta_phi *= 1.0 - self.damping;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.scale = 1.0;
    }
}
