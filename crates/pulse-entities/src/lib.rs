//! Scene entities for the stress globe: the feature dataset, markers and
//! their opacity policy, the textured globe, and the sun.
//!
//! Builders here are pure with respect to shared state: each takes a state
//! snapshot (dataset, threshold, textures, time) and produces or updates only
//! the nodes it owns.

pub mod color;
pub mod dataset;
pub mod globe;
pub mod marker;
pub mod projection;
pub mod sun;

pub use color::{hsl_to_rgb, stress_color};
pub use dataset::{Dataset, DatasetError, FeatureRecord};
pub use globe::{GlobeStyle, GlobeTextures, build_globe, globe_geometry, globe_layer};
pub use marker::{
    MIN_MARKER_HEIGHT, MIN_OPACITY, Marker, MarkerInstance, MarkerSet, MarkerStyle, THRESHOLD_MAX,
    THRESHOLD_MIN, instance_bytes, marker_height, marker_instances, marker_layer, marker_opacity,
};
pub use projection::{lon_lat_to_sphere, surface_normal};
pub use sun::{SunStyle, ambient_light, sun_angle, sun_layer, sun_position};

/// Name of the globe mesh node.
pub const GLOBE_NODE: &str = "globe";
/// Name of the empty group standing in for a globe whose textures failed.
pub const GLOBE_FALLBACK_NODE: &str = "globe-unavailable";
/// Name of the group holding every feature marker.
pub const MARKERS_NODE: &str = "markers";
pub const SUN_NODE: &str = "sun";
pub const AMBIENT_NODE: &str = "ambient";
