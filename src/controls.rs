//! Orbit camera controls with damped motion
//!
//! Input accumulates into pending spherical and pan deltas. `update` applies
//! a share of them to the camera every frame; with damping enabled the
//! remainder decays geometrically, so `update` has to keep running after
//! input stops or the motion freezes mid-glide.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::scene::PerspectiveCamera;

const EPS: f32 = 1e-6;

/// Spherical coordinates around the Y axis: `phi` from +Y, `theta` from +Z
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Spherical {
    radius: f32,
    phi: f32,
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
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
}

#[derive(Debug, Clone)]
pub struct OrbitControls {
    /// Point the camera orbits around and looks at
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    enabled: bool,
    spherical_delta: Spherical,
    pan_offset: Vec3,
    scale: f32,
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            enable_damping: false,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            enabled: true,
            spherical_delta: Spherical::default(),
            pan_offset: Vec3::ZERO,
            scale: 1.0,
        }
    }

    pub fn with_damping(mut self, enabled: bool) -> Self {
        self.enable_damping = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Orbit by a pointer drag of `(dx, dy)` pixels on a surface `client_height` tall
    pub fn rotate(&mut self, dx: f32, dy: f32, client_height: f32) {
        if !self.enabled || client_height <= 0.0 {
            return;
        }
        self.spherical_delta.theta -= 2.0 * PI * dx / client_height * self.rotate_speed;
        self.spherical_delta.phi -= 2.0 * PI * dy / client_height * self.rotate_speed;
    }

    /// Slide the target and camera in the screen plane
    pub fn pan(&mut self, dx: f32, dy: f32, client_height: f32, camera: &PerspectiveCamera) {
        if !self.enabled || client_height <= 0.0 {
            return;
        }
        let target_distance =
            (camera.position - self.target).length() * (camera.fov.to_radians() / 2.0).tan();
        let (right, up) = camera.right_and_up();
        let left = -right * (2.0 * dx * target_distance / client_height) * self.pan_speed;
        let raise = up * (2.0 * dy * target_distance / client_height) * self.pan_speed;
        self.pan_offset += left + raise;
    }

    /// Scroll-wheel zoom; negative deltas (wheel away from the user) move closer
    pub fn wheel(&mut self, delta_y: f32) {
        if !self.enabled || delta_y == 0.0 {
            return;
        }
        let zoom_scale = 0.95_f32.powf(self.zoom_speed * (delta_y * 0.01).abs());
        if delta_y < 0.0 {
            self.scale *= zoom_scale;
        } else {
            self.scale /= zoom_scale;
        }
    }

    /// Pinch zoom; factors above 1 move closer
    pub fn pinch(&mut self, factor: f32) {
        if !self.enabled || factor <= 0.0 {
            return;
        }
        self.scale /= factor;
    }

    /// Apply pending motion to `camera`. Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let previous_position = camera.position;
        let previous_target = camera.look_target();

        let offset = camera.position - self.target;
        let mut spherical = Spherical::from_offset(offset);

        let share = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        spherical.theta += self.spherical_delta.theta * share;
        spherical.phi += self.spherical_delta.phi * share;
        spherical.phi = spherical
            .phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(EPS, PI - EPS);

        self.target += self.pan_offset * share;

        spherical.radius =
            (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        camera.position = self.target + spherical.to_offset();
        camera.look_at(self.target);

        if self.enable_damping {
            let keep = 1.0 - self.damping_factor;
            self.spherical_delta.theta *= keep;
            self.spherical_delta.phi *= keep;
            self.pan_offset *= keep;
        } else {
            self.spherical_delta = Spherical::default();
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        camera.position.distance_squared(previous_position) > EPS
            || camera.look_target().distance_squared(previous_target) > EPS
    }

    /// Detach from input; later input calls are ignored
    pub fn dispose(&mut self) {
        self.enabled = false;
        self.spherical_delta = Spherical::default();
        self.pan_offset = Vec3::ZERO;
        self.scale = 1.0;
    }
}

/// Pointer input gathered over one UI frame, in logical pixels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrbitInput {
    pub rotate: Vec2,
    pub pan: Vec2,
    /// Wheel delta with page-scroll sign: negative means wheel away from the user
    pub wheel: f32,
    /// Multiplicative pinch zoom, 1.0 when idle
    pub pinch: f32,
}

impl OrbitInput {
    pub fn is_idle(&self) -> bool {
        self.rotate == Vec2::ZERO
            && self.pan == Vec2::ZERO
            && self.wheel == 0.0
            && (self.pinch == 1.0 || self.pinch == 0.0)
    }

    /// Feed this input into `controls` for a surface `client_height` tall
    pub fn apply(&self, controls: &mut OrbitControls, camera: &PerspectiveCamera, client_height: f32) {
        if self.rotate != Vec2::ZERO {
            controls.rotate(self.rotate.x, self.rotate.y, client_height);
        }
        if self.pan != Vec2::ZERO {
            controls.pan(self.pan.x, self.pan.y, client_height, camera);
        }
        controls.wheel(self.wheel);
        if self.pinch != 1.0 {
            controls.pinch(self.pinch);
        }
    }
}
