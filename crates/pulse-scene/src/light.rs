//! Light sources.

use glam::Vec3;

/// A light attached to a scene node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    /// Infinitely distant light shining from the node's position toward the
    /// scene origin.
    Directional {
        /// Linear RGB color of the light (not premultiplied by intensity).
        color: Vec3,
        /// Scalar intensity multiplier.
        intensity: f32,
    },
    /// Uniform light from every direction.
    Ambient { color: Vec3, intensity: f32 },
}

impl Light {
    pub fn intensity(&self) -> f32 {
        match self {
            Light::Directional { intensity, .. } | Light::Ambient { intensity, .. } => *intensity,
        }
    }

    pub fn color(&self) -> Vec3 {
        match self {
            Light::Directional { color, .. } | Light::Ambient { color, .. } => *color,
        }
    }
}
