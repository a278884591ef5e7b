//! The textured globe mesh.

use std::collections::HashMap;
use std::f32::consts::{PI, TAU};
use std::rc::Rc;

use glam::{Quat, Vec3};
use pulse_scene::{Geometry, Material, SceneNode, Texture, TextureFilter};
use pulse_stream::{Stream, combine_latest3};

use crate::{GLOBE_FALLBACK_NODE, GLOBE_NODE};

/// Globe mesh and material parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobeStyle {
    pub radius: f32,
    /// Icosphere subdivision level. 5 gives a little over 20k triangles.
    pub subdivisions: u32,
    pub bump_scale: f32,
    pub specular: Vec3,
    pub shininess: f32,
}

impl Default for GlobeStyle {
    fn default() -> Self {
        Self {
            radius: 1.0,
            subdivisions: 5,
            bump_scale: 0.005,
            specular: Vec3::splat(0.2),
            shininess: 10.0,
        }
    }
}

/// The three images the globe material needs.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobeTextures {
    pub color: Texture,
    pub bump: Texture,
    pub specular: Texture,
}

/// Unit icosphere with equirectangular UVs, in texture orientation.
///
/// `u` grows eastward from the antimeridian of the texture and `v` from the
/// north pole. Triangles crossing the texture seam get duplicated vertices
/// with `u` shifted past 1 so a repeating sampler interpolates across it.
pub fn globe_geometry(subdivisions: u32) -> Geometry {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let mut positions: Vec<Vec3> = [
        (-1.0, t, 0.0),
        (1.0, t, 0.0),
        (-1.0, -t, 0.0),
        (1.0, -t, 0.0),
        (0.0, -1.0, t),
        (0.0, 1.0, t),
        (0.0, -1.0, -t),
        (0.0, 1.0, -t),
        (t, 0.0, -1.0),
        (t, 0.0, 1.0),
        (-t, 0.0, -1.0),
        (-t, 0.0, 1.0),
    ]
    .into_iter()
    .map(|(x, y, z)| Vec3::new(x, y, z).normalize())
    .collect();

    let mut indices: Vec<u32> = vec![
        0, 11, 5, 0, 5, 1, 0, 1, 7, 0, 7, 10, 0, 10, 11, 1, 5, 9, 5, 11, 4, 11, 10, 2, 10, 7, 6, 7,
        1, 8, 3, 9, 4, 3, 4, 2, 3, 2, 6, 3, 6, 8, 3, 8, 9, 4, 9, 5, 2, 4, 11, 6, 2, 10, 8, 6, 7, 9,
        8, 1,
    ];

    for _ in 0..subdivisions {
        indices = subdivide(&mut positions, &indices);
    }

    let uvs = positions.iter().map(|p| equirectangular_uv(*p)).collect();
    let mut geometry = Geometry {
        normals: positions.clone(),
        positions,
        uvs,
        indices,
    };
    split_uv_seam(&mut geometry);
    geometry
}

/// Texture coordinates of a unit-sphere point before the globe's half turn.
fn equirectangular_uv(p: Vec3) -> [f32; 2] {
    let u = (-p.z).atan2(p.x).rem_euclid(TAU) / TAU;
    let v = 0.5 - p.y.clamp(-1.0, 1.0).asin() / PI;
    [u, v]
}

/// Split every triangle into four at its edge midpoints, pushed back onto
/// the sphere.
fn subdivide(positions: &mut Vec<Vec3>, indices: &[u32]) -> Vec<u32> {
    let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
    let mut midpoint = |a: u32, b: u32| -> u32 {
        let key = (a.min(b), a.max(b));
        *midpoints.entry(key).or_insert_with(|| {
            let mid = (positions[a as usize] + positions[b as usize]).normalize();
            positions.push(mid);
            positions.len() as u32 - 1
        })
    };

    let mut next = Vec::with_capacity(indices.len() * 4);
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0], tri[1], tri[2]);
        let ab = midpoint(a, b);
        let bc = midpoint(b, c);
        let ca = midpoint(c, a);
        next.extend_from_slice(&[a, ab, ca, b, bc, ab, c, ca, bc, ab, bc, ca]);
    }
    next
}

fn split_uv_seam(geometry: &mut Geometry) {
    let mut wrapped: HashMap<u32, u32> = HashMap::new();
    for corner in (0..geometry.indices.len()).step_by(3) {
        let tri = [0, 1, 2].map(|k| geometry.indices[corner + k]);
        let us = tri.map(|i| geometry.uvs[i as usize][0]);
        let max_u = us.into_iter().fold(f32::MIN, f32::max);

        for k in 0..3 {
            if max_u - us[k] <= 0.5 {
                continue;
            }
            let original = tri[k] as usize;
            let copy = *wrapped.entry(tri[k]).or_insert_with(|| {
                let (position, normal, [u, v]) = (
                    geometry.positions[original],
                    geometry.normals[original],
                    geometry.uvs[original],
                );
                geometry.positions.push(position);
                geometry.normals.push(normal);
                geometry.uvs.push([u + 1.0, v]);
                geometry.positions.len() as u32 - 1
            });
            geometry.indices[corner + k] = copy;
        }
    }
}

/// Build the globe mesh node.
///
/// The geometry is turned half a revolution about +Y so that the texture's
/// prime meridian lines up with where markers project longitude 0.
pub fn build_globe(textures: &GlobeTextures, style: &GlobeStyle) -> SceneNode {
    let mut geometry = globe_geometry(style.subdivisions);
    geometry.scale(style.radius);
    geometry.rotate(Quat::from_rotation_y(PI));

    let linear = |texture: &Texture| {
        let mut texture = texture.clone();
        texture.filter = TextureFilter::Linear;
        texture
    };
    let material = Material {
        map: Some(linear(&textures.color)),
        bump_map: Some(linear(&textures.bump)),
        bump_scale: style.bump_scale,
        specular_map: Some(linear(&textures.specular)),
        specular: style.specular,
        shininess: style.shininess,
        ..Material::default()
    };

    tracing::debug!(
        vertices = geometry.vertex_count(),
        triangles = geometry.triangle_count(),
        "Built globe mesh"
    );
    SceneNode::mesh(GLOBE_NODE, Rc::new(geometry), material)
}

/// Globe subtree, available once all three textures have loaded.
///
/// If any texture fails, the globe is replaced by an empty group so the rest
/// of the scene still renders.
pub fn globe_layer(
    color: &Stream<Texture>,
    bump: &Stream<Texture>,
    specular: &Stream<Texture>,
    style: GlobeStyle,
) -> Stream<SceneNode> {
    combine_latest3(color, bump, specular)
        .map(move |(color, bump, specular)| {
            build_globe(
                &GlobeTextures {
                    color,
                    bump,
                    specular,
                },
                &style,
            )
        })
        .catch_error(|err| {
            tracing::warn!(error = %err, "Globe textures unavailable, rendering without globe");
            Stream::of(SceneNode::group(GLOBE_FALLBACK_NODE))
        })
}
