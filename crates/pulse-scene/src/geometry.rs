//! Indexed triangle geometry.

use glam::{Quat, Vec3};

/// Indexed triangle list with per-vertex normals and UVs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Axis-aligned box centered at the origin, `height` along +Y.
    ///
    /// Each face has its own four vertices so normals stay flat.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let h = Vec3::new(width, height, depth) * 0.5;
        // (normal, u axis, v axis) per face
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut geometry = Geometry::default();
        for (normal, u, v) in faces {
            let base = geometry.positions.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let corner = normal + u * su + v * sv;
                geometry.positions.push(corner * h);
                geometry.normals.push(normal);
                geometry.uvs.push([(su + 1.0) * 0.5, (1.0 - sv) * 0.5]);
            }
            geometry
                .indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        geometry
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Rotate positions and normals in place.
    pub fn rotate(&mut self, rotation: Quat) {
        for p in &mut self.positions {
            *p = rotation * *p;
        }
        for n in &mut self.normals {
            *n = rotation * *n;
        }
    }

    /// Scale positions uniformly in place.
    pub fn scale(&mut self, factor: f32) {
        for p in &mut self.positions {
            *p *= factor;
        }
    }

    /// Axis-aligned bounds as `(min, max)`, or `None` when empty.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p))),
        )
    }
}
