//! Sun and ambient lighting driven by wall-clock time.

use std::f64::consts::TAU;

use chrono::{DateTime, Timelike, Utc};
use glam::{DVec3, Vec3};
use pulse_scene::{Light, SceneNode, Transform};
use pulse_stream::Stream;

use crate::{AMBIENT_NODE, SUN_NODE};

/// Sun placement and light parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SunStyle {
    /// Distance of the sun from the globe centre.
    pub orbit_radius: f64,
    /// Hours added to UTC so that solar noon faces the reference meridian.
    pub hour_offset: f64,
    pub color: Vec3,
    pub intensity: f32,
    pub ambient_intensity: f32,
}

impl Default for SunStyle {
    fn default() -> Self {
        Self {
            orbit_radius: 10.0,
            hour_offset: 6.0,
            color: Vec3::ONE,
            intensity: 1.0,
            ambient_intensity: 0.25,
        }
    }
}

/// Sun azimuth in radians: `((hours + offset + minutes / 60) / 24) * 2π`.
///
/// Seconds are ignored.
pub fn sun_angle(time: DateTime<Utc>, hour_offset: f64) -> f64 {
    let hours = f64::from(time.hour()) + hour_offset + f64::from(time.minute()) / 60.0;
    hours / 24.0 * TAU
}

/// Sun position on its orbit in the XZ plane.
pub fn sun_position(time: DateTime<Utc>, style: &SunStyle) -> Vec3 {
    let angle = sun_angle(time, style.hour_offset);
    DVec3::new(
        style.orbit_radius * angle.sin(),
        0.0,
        style.orbit_radius * angle.cos(),
    )
    .as_vec3()
}

/// Sun light node that follows `clock`.
///
/// Every subscription moves the same directional light node and re-emits it.
pub fn sun_layer(clock: &Stream<DateTime<Utc>>, style: SunStyle) -> Stream<SceneNode> {
    let light = SceneNode::light(
        SUN_NODE,
        Light::Directional {
            color: style.color,
            intensity: style.intensity,
        },
    );
    clock.scan(light, move |light, time| {
        let position = sun_position(time, &style);
        light.update(|data| data.transform = Transform::from_translation(position));
        tracing::trace!(%time, ?position, "Moved sun");
        light
    })
}

/// Constant fill light so the night side is not pitch black.
pub fn ambient_light(style: &SunStyle) -> SceneNode {
    SceneNode::light(
        AMBIENT_NODE,
        Light::Ambient {
            color: style.color,
            intensity: style.ambient_intensity,
        },
    )
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::f64::consts::PI;
    use std::rc::Rc;

    use chrono::TimeZone;
    use pulse_stream::ReplaySubject;

    use super::*;

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, hour, minute, second).unwrap()
    }

    #[test]
    fn test_six_utc_is_half_turn() {
        assert!((sun_angle(at(6, 0, 0), 6.0) - PI).abs() < 1e-12);
        let position = sun_position(at(6, 0, 0), &SunStyle::default());
        assert!((position - Vec3::new(0.0, 0.0, -10.0)).length() < 1e-5);
    }

    #[test]
    fn test_minutes_count_seconds_do_not() {
        let quarter = sun_angle(at(0, 30, 0), 0.0);
        assert!((quarter - TAU / 48.0).abs() < 1e-12);
        assert_eq!(sun_angle(at(0, 30, 59), 0.0), quarter);
    }

    #[test]
    fn test_position_stays_on_orbit() {
        let style = SunStyle::default();
        for hour in 0..24 {
            let p = sun_position(at(hour, 17, 0), &style);
            assert!((p.length() - 10.0).abs() < 1e-4);
            assert_eq!(p.y, 0.0);
        }
    }

    #[test]
    fn test_layer_moves_one_light() {
        let clock = ReplaySubject::seeded(at(6, 0, 0));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = sun_layer(&clock.stream(), SunStyle::default())
            .subscribe_next(move |node: SceneNode| sink.borrow_mut().push(node));
        clock.next(at(18, 0, 0));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].ptr_eq(&seen[1]));
        let position = seen[1].read().transform.translation;
        assert!((position - Vec3::new(0.0, 0.0, 10.0)).length() < 1e-5);
        assert_eq!(seen[1].name(), SUN_NODE);
    }

    #[test]
    fn test_ambient_light() {
        let ambient = ambient_light(&SunStyle::default());
        assert_eq!(ambient.name(), AMBIENT_NODE);
        assert!(matches!(
            ambient.read().light(),
            Some(Light::Ambient { intensity, .. }) if (*intensity - 0.25).abs() < 1e-6
        ));
    }
}
