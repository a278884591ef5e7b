//! The one place the camera is mutated.

use glam::Vec3;
use pulse_scene::{Camera, Dimensions};
use pulse_stream::{Owned, Stream};

use crate::orbit::OrbitPose;

/// Everything that may change the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraUpdate {
    /// The viewport changed size; adopt its aspect ratio.
    Resize(Dimensions),
    /// The orbit controller moved; adopt its pose.
    Orbit(OrbitPose),
}

/// Owns the camera and applies [`CameraUpdate`]s to it.
///
/// The camera is mutated in place, so every emission of
/// [`stream`](Self::stream) carries the same handle.
pub struct CameraRig {
    camera: Owned<Camera>,
}

impl CameraRig {
    pub fn new(camera: Camera, initial_pose: OrbitPose) -> Self {
        let mut camera = camera;
        apply(&mut camera, CameraUpdate::Orbit(initial_pose));
        Self {
            camera: Owned::new(camera),
        }
    }

    /// Read-only handle for inspection.
    pub fn camera(&self) -> Owned<Camera> {
        self.camera.clone()
    }

    /// Camera stream driven by viewport sizes and orbit poses.
    pub fn stream(
        &self,
        viewport: &Stream<Dimensions>,
        orbit: &Stream<OrbitPose>,
    ) -> Stream<Owned<Camera>> {
        viewport
            .map(CameraUpdate::Resize)
            .merge(&orbit.map(CameraUpdate::Orbit))
            .scan_in_place(self.camera.clone(), apply)
    }
}

/// Apply a single update.
pub fn apply(camera: &mut Camera, update: CameraUpdate) {
    match update {
        CameraUpdate::Resize(size) => {
            camera.set_aspect_ratio(size.width as f32, size.height as f32);
        }
        CameraUpdate::Orbit(pose) => {
            camera.position = pose.eye();
            camera.look_at(pose.target, Vec3::Y);
        }
    }
}
