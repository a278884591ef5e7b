//! Pointer-driven orbit around a fixed target.
//!
//! The controller owns only the orbit pose. It never touches the camera;
//! the camera rig applies each published pose.

use std::cell::Cell;
use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec3;
use pulse_stream::{Stream, Subject};

/// Keeps the camera off the poles, where the up vector degenerates.
const POLAR_MARGIN: f32 = 1e-3;

/// Spherical camera placement around `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitPose {
    /// Rotation about +Y in radians. 0 puts the camera on +Z.
    pub azimuth: f32,
    /// Angle from +Y in radians.
    pub polar: f32,
    pub distance: f32,
    pub target: Vec3,
}

impl OrbitPose {
    /// Camera position for this pose.
    pub fn eye(&self) -> Vec3 {
        let (sin_polar, cos_polar) = self.polar.sin_cos();
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        self.target + self.distance * Vec3::new(sin_polar * sin_az, cos_polar, sin_polar * cos_az)
    }
}

/// Drag and zoom limits.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitSettings {
    /// Radians per pixel of drag.
    pub rotate_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub invert_y: bool,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            rotate_speed: 0.005,
            min_distance: 1.2,
            max_distance: 20.0,
            invert_y: false,
        }
    }
}

/// Turns drag and zoom input into orbit poses and announces each change.
pub struct OrbitController {
    settings: OrbitSettings,
    pose: Cell<OrbitPose>,
    changed: Subject<OrbitPose>,
}

impl OrbitController {
    /// Start on the equator at longitude 0 of the camera frame, looking at
    /// the origin from `distance`.
    pub fn new(settings: OrbitSettings, distance: f32) -> Self {
        let pose = OrbitPose {
            azimuth: 0.0,
            polar: FRAC_PI_2,
            distance: distance.clamp(settings.min_distance, settings.max_distance),
            target: Vec3::ZERO,
        };
        Self {
            settings,
            pose: Cell::new(pose),
            changed: Subject::new(),
        }
    }

    pub fn pose(&self) -> OrbitPose {
        self.pose.get()
    }

    /// Rotate by a pointer drag of `(dx, dy)` pixels. Dragging right spins
    /// the globe right, i.e. moves the camera left.
    pub fn drag(&self, dx: f32, dy: f32) {
        let mut pose = self.pose.get();
        let dy = if self.settings.invert_y { -dy } else { dy };
        pose.azimuth = (pose.azimuth - dx * self.settings.rotate_speed).rem_euclid(2.0 * PI);
        pose.polar = (pose.polar - dy * self.settings.rotate_speed)
            .clamp(POLAR_MARGIN, PI - POLAR_MARGIN);
        self.publish(pose);
    }

    /// Scale the orbit distance by `factor` (< 1 zooms in).
    pub fn zoom(&self, factor: f32) {
        if !(factor.is_finite() && factor > 0.0) {
            tracing::warn!(factor, "Ignoring invalid zoom factor");
            return;
        }
        let mut pose = self.pose.get();
        pose.distance =
            (pose.distance * factor).clamp(self.settings.min_distance, self.settings.max_distance);
        self.publish(pose);
    }

    /// Poses published after subscription. There is no replay; the current
    /// pose is available from [`pose`](Self::pose).
    pub fn changes(&self) -> Stream<OrbitPose> {
        self.changed.stream()
    }

    fn publish(&self, pose: OrbitPose) {
        if pose == self.pose.get() {
            return;
        }
        self.pose.set(pose);
        tracing::trace!(?pose, "Orbit changed");
        self.changed.next(pose);
    }
}
