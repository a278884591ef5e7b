//! Perspective camera for view and projection matrix generation.

use glam::{Mat3, Mat4, Quat, Vec3};

/// A perspective camera.
///
/// The globe dataflow mutates one camera in place (aspect on resize, pose on
/// orbit) and republishes it by reference, so consumers can rely on identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// World-space position.
    pub position: Vec3,
    /// Orientation as a unit quaternion. Identity looks down -Z with +Y up.
    pub rotation: Quat,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width / height.
    pub aspect_ratio: f32,
    /// Near clip plane distance (always positive).
    pub near: f32,
    /// Far clip plane distance (always positive, > near).
    pub far: f32,
}

impl Camera {
    /// Camera with the given vertical field of view (degrees) and clip planes.
    pub fn perspective(fov_y_degrees: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y: fov_y_degrees.to_radians(),
            near,
            far,
            ..Self::default()
        }
    }

    /// Compute the view matrix (inverse of camera transform).
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// The forward direction vector (-Z in camera space).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// The up direction vector (+Y in camera space).
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// The right direction vector (+X in camera space).
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Update the aspect ratio from surface dimensions. Ignored for a
    /// zero-height surface.
    pub fn set_aspect_ratio(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.aspect_ratio = width / height;
        }
    }

    /// Orient the camera toward `target`.
    ///
    /// Falls back to +Z as the reference up vector when `up` is parallel to
    /// the view direction. Does nothing if `target` coincides with the camera.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let forward = (target - self.position).normalize_or_zero();
        if forward == Vec3::ZERO {
            return;
        }
        let mut right = forward.cross(up).normalize_or_zero();
        if right == Vec3::ZERO {
            right = forward.cross(Vec3::Z).normalize_or_zero();
        }
        let true_up = right.cross(forward);
        self.rotation = Quat::from_mat3(&Mat3::from_cols(right, true_up, -forward)).normalize();
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            fov_y: std::f32::consts::FRAC_PI_4,
            aspect_ratio: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}
