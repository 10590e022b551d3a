// projection.rs — equirectangular angles <-> unit directions

use glam::Vec3;
use std::f32::consts::PI;

/// Unit direction for longitude `u` ∈ [-π, π] and colatitude `v` ∈ [0, π],
/// colatitude measured from the up pole (`v = 0` gives Y = -1 in this convention).
///
/// `v` is not range checked.
pub fn back_project(u: f32, v: f32) -> Vec3 {
    let sinv = v.sin();
    Vec3::new(sinv * u.sin(), -v.cos(), sinv * u.cos())
}

/// (u, v) for a continuous texel-space coordinate of a `width × height` panorama.
pub fn equirect_angles(x: f32, y: f32, width: f32, height: f32) -> (f32, f32) {
    let u = x / width * PI * 2.0 - PI;
    let v = y / height * PI;
    (u, v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_are_unit_length() {
        for i in 1..64 {
            let v = PI * i as f32 / 64.0;
            for j in 0..=64 {
                let u = -PI + 2.0 * PI * j as f32 / 64.0;
                let len = back_project(u, v).length();
                assert!((len - 1.0).abs() < 1e-5, "u={u} v={v} len={len}");
            }
        }
    }

    #[test]
    fn poles_and_center() {
        let top = back_project(0.0, 0.0);
        assert!((top - Vec3::new(0.0, -1.0, 0.0)).length() < 1e-6);

        let bottom = back_project(1.3, PI);
        assert!((bottom - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-5);

        // image center looks down +Z
        let (u, v) = equirect_angles(50.0, 25.0, 100.0, 50.0);
        assert!((back_project(u, v) - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn angles_span_full_range() {
        assert_eq!(equirect_angles(0.0, 0.0, 640.0, 320.0), (-PI, 0.0));
        let (u, v) = equirect_angles(640.0, 320.0, 640.0, 320.0);
        assert!((u - PI).abs() < 1e-6);
        assert!((v - PI).abs() < 1e-6);
    }
}
