//! Geographic coordinates to globe-space positions.

use glam::{DVec3, Vec3};

/// Project `(lon, lat)` in degrees onto a sphere of `radius` centred at the
/// origin.
///
/// Longitude 0 at the equator lands on +X, longitude 90°E on -Z, and the
/// north pole on +Y. The globe mesh is oriented to match.
pub fn lon_lat_to_sphere(lon: f64, lat: f64, radius: f64) -> Vec3 {
    let phi = (90.0 - lat).to_radians();
    let theta = (lon + 180.0).to_radians();
    DVec3::new(
        -radius * phi.sin() * theta.cos(),
        radius * phi.cos(),
        radius * phi.sin() * theta.sin(),
    )
    .as_vec3()
}

/// Outward unit normal at `(lon, lat)`.
pub fn surface_normal(lon: f64, lat: f64) -> Vec3 {
    lon_lat_to_sphere(lon, lat, 1.0).normalize()
}
