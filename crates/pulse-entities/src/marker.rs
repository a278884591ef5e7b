//! Feature markers and the threshold-driven opacity policy.
//!
//! One marker is built per feature record when the dataset arrives. After
//! that only marker opacity changes; geometry, placement and count are fixed.

use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};
use pulse_scene::{Geometry, Material, SceneNode, Transform};
use pulse_stream::{Owned, Stream};

use crate::MARKERS_NODE;
use crate::color::stress_color;
use crate::dataset::{Dataset, FeatureRecord};
use crate::projection::surface_normal;

/// Lower end of the stress threshold range. Shows every marker fully.
pub const THRESHOLD_MIN: f64 = 0.0;
/// Upper end of the stress threshold range. Shows every marker fully.
pub const THRESHOLD_MAX: f64 = 5.0;
/// Markers never fade below this opacity.
pub const MIN_OPACITY: f64 = 0.1;
/// Markers are never shorter than this.
pub const MIN_MARKER_HEIGHT: f64 = 0.01;

/// Marker height for a total call time: `max(log2(t / 10) / 200, 0.01)`.
///
/// Durations at or below ten seconds, negative durations and NaN all land on
/// the floor.
pub fn marker_height(total_call_time_in_seconds: f64) -> f64 {
    ((total_call_time_in_seconds / 10.0).log2() / 200.0).max(MIN_MARKER_HEIGHT)
}

/// Opacity of a marker with the given intensity at `threshold`.
///
/// Both ends of the threshold range mean "show everything". In between, the
/// marker is fully opaque when its intensity matches the threshold and fades
/// quadratically with distance, down to [`MIN_OPACITY`].
pub fn marker_opacity(avg_stress_intensity: f64, threshold: f64) -> f64 {
    if threshold == THRESHOLD_MIN || threshold == THRESHOLD_MAX {
        return 1.0;
    }
    let distance = avg_stress_intensity - threshold;
    // max/min rather than clamp: a NaN intensity must still land in range.
    (1.0 - distance * distance).max(MIN_OPACITY).min(1.0)
}

/// Marker sizing relative to the globe.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyle {
    /// Radius of the sphere markers stand on.
    pub globe_radius: f64,
    /// Edge length of the square marker footprint.
    pub footprint: f32,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            globe_radius: 1.0,
            footprint: 0.005,
        }
    }
}

/// GPU instance record for one marker.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MarkerInstance {
    /// Column-major model matrix.
    pub model: [[f32; 4]; 4],
    /// Linear RGB plus opacity.
    pub color: [f32; 4],
}

/// A built marker and the record it came from.
#[derive(Debug, Clone)]
pub struct Marker {
    pub record: FeatureRecord,
    pub node: SceneNode,
}

impl Marker {
    fn build(index: usize, record: FeatureRecord, unit_box: &Rc<Geometry>, style: &MarkerStyle) -> Self {
        let height = marker_height(record.total_call_time_in_seconds) as f32;
        let normal = surface_normal(record.lon(), record.lat());
        let center = normal * (style.globe_radius as f32 + height / 2.0);

        let material = Material {
            transparent: true,
            ..Material::colored(stress_color(record.avg_stress_intensity))
        };
        let node = SceneNode::mesh(format!("marker-{index}"), Rc::clone(unit_box), material);
        node.update(|data| {
            data.transform = Transform {
                translation: center,
                rotation: Quat::from_rotation_arc(Vec3::Y, normal),
                scale: Vec3::new(style.footprint, height, style.footprint),
            };
        });
        Self { record, node }
    }

    pub fn opacity(&self) -> f32 {
        self.node.read().material().map_or(1.0, |m| m.opacity)
    }

    fn set_opacity(&self, opacity: f32) {
        self.node.update(|data| {
            if let Some(material) = data.material_mut() {
                material.opacity = opacity;
            }
        });
    }
}

/// Every marker of a dataset under one group node.
#[derive(Debug)]
pub struct MarkerSet {
    group: SceneNode,
    markers: Vec<Marker>,
}

impl MarkerSet {
    /// Build one marker per record. All markers share a single unit box
    /// scaled per marker.
    pub fn build(dataset: &Dataset, style: &MarkerStyle) -> Self {
        let unit_box = Rc::new(Geometry::cuboid(1.0, 1.0, 1.0));
        let markers: Vec<Marker> = dataset
            .iter()
            .enumerate()
            .map(|(index, record)| Marker::build(index, *record, &unit_box, style))
            .collect();

        let group = SceneNode::group(MARKERS_NODE);
        group.replace_children(markers.iter().map(|m| m.node.clone()).collect());
        tracing::debug!(markers = markers.len(), "Built feature markers");
        Self { group, markers }
    }

    pub fn group(&self) -> SceneNode {
        self.group.clone()
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Re-evaluate every marker's opacity for `threshold`.
    pub fn apply_threshold(&self, threshold: f64) {
        for marker in &self.markers {
            let opacity = marker_opacity(marker.record.avg_stress_intensity, threshold);
            marker.set_opacity(opacity as f32);
        }
        tracing::trace!(threshold, markers = self.markers.len(), "Applied stress threshold");
    }

    pub fn opacities(&self) -> Vec<f32> {
        self.markers.iter().map(Marker::opacity).collect()
    }

    /// Per-marker instance data for backends that draw the set in one call.
    pub fn instances(&self) -> Vec<MarkerInstance> {
        marker_instances(&self.group)
    }
}

/// Instance records for the mesh children of a marker group, in child order.
///
/// Children that are not meshes are skipped.
pub fn marker_instances(group: &SceneNode) -> Vec<MarkerInstance> {
    group
        .children()
        .iter()
        .filter_map(|marker| {
            let data = marker.read();
            let material = data.material()?;
            Some(MarkerInstance {
                model: data.transform.matrix().to_cols_array_2d(),
                color: material.color.extend(material.opacity).to_array(),
            })
        })
        .collect()
}

/// Raw bytes of `instances`, laid out for an instance buffer upload.
pub fn instance_bytes(instances: &[MarkerInstance]) -> &[u8] {
    bytemuck::cast_slice(instances)
}

/// Marker subtree for the latest dataset, with opacity following `threshold`.
///
/// Markers are rebuilt only when a new dataset arrives; threshold changes
/// mutate the existing set and re-emit the same group node.
pub fn marker_layer(
    dataset: Stream<Rc<Dataset>>,
    threshold: Stream<f64>,
    style: MarkerStyle,
) -> Stream<SceneNode> {
    dataset.flat_map_latest(move |dataset| {
        let markers = Owned::new(MarkerSet::build(&dataset, &style));
        threshold
            .scan_in_place(markers, |markers, threshold| markers.apply_threshold(threshold))
            .map(|markers| markers.read().group())
    })
}
