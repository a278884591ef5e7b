//! Stress hue ramp.

use glam::Vec3;

use crate::marker::THRESHOLD_MAX;

/// Hue of a calm feature (green), in degrees.
pub const CALM_HUE: f64 = 120.0;

/// Convert HSL (hue in degrees, saturation and lightness in `[0, 1]`) to RGB.
pub fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> Vec3 {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let sector = hue.rem_euclid(360.0) / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    Vec3::new((r + m) as f32, (g + m) as f32, (b + m) as f32)
}

/// Marker colour for an average stress intensity: green at 0, yellow at the
/// midpoint, red at the top of the threshold range and beyond.
///
/// NaN intensities are treated as calm.
pub fn stress_color(avg_stress_intensity: f64) -> Vec3 {
    let t = (avg_stress_intensity / THRESHOLD_MAX).max(0.0).min(1.0);
    hsl_to_rgb((1.0 - t) * CALM_HUE, 1.0, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_primary_hues() {
        assert!(close(hsl_to_rgb(0.0, 1.0, 0.5), Vec3::new(1.0, 0.0, 0.0)));
        assert!(close(hsl_to_rgb(120.0, 1.0, 0.5), Vec3::new(0.0, 1.0, 0.0)));
        assert!(close(hsl_to_rgb(240.0, 1.0, 0.5), Vec3::new(0.0, 0.0, 1.0)));
        assert!(close(hsl_to_rgb(360.0, 1.0, 0.5), Vec3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_greyscale_without_saturation() {
        assert!(close(hsl_to_rgb(200.0, 0.0, 0.25), Vec3::splat(0.25)));
    }

    #[test]
    fn test_stress_ramp_endpoints() {
        assert!(close(stress_color(0.0), Vec3::new(0.0, 1.0, 0.0)));
        assert!(close(stress_color(2.5), Vec3::new(1.0, 1.0, 0.0)));
        assert!(close(stress_color(5.0), Vec3::new(1.0, 0.0, 0.0)));
        assert!(close(stress_color(9.0), stress_color(5.0)));
        assert!(close(stress_color(-1.0), stress_color(0.0)));
    }

    #[test]
    fn test_nan_intensity_is_calm() {
        assert!(close(stress_color(f64::NAN), stress_color(0.0)));
    }
}
