//! Altitude-Distance Inverter
//!
//! Given the altitude at which a body is seen from a target landmark, find
//! how far from the target an observer must stand so that the landmark's top
//! appears at that same altitude.
//!
//! The Earth center, the observer and the target form a triangle with sides
//! `r1 = Reff + h_obs` and `r2 = Reff + h_target`. Refraction is folded into
//! an effective radius `Reff = R / (1 - k)`. The angle at the observer between
//! the local vertical and the line of sight is `90° + altitude`; the law of
//! sines gives the angle at the target, and what is left of 180° is the angle
//! at the Earth center. The ground distance uses the true radius.

use serde::Serialize;

use crate::geo::MEAN_EARTH_RADIUS;

/// Default upper bound of the plausibility window (350 km)
pub const DEFAULT_MAX_DISTANCE_M: f64 = 350_000.0;

/// Accepted range `(0, max_m]` for inverted distances.
///
/// Beyond a few hundred kilometres neither the terrain nor the single
/// refraction coefficient model the line of sight well.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlausibilityWindow {
    pub max_m: f64,
}

impl Default for PlausibilityWindow {
    fn default() -> Self {
        Self { max_m: DEFAULT_MAX_DISTANCE_M }
    }
}

impl PlausibilityWindow {
    pub fn new(max_m: f64) -> Self {
        Self { max_m }
    }

    pub fn contains(&self, distance_m: f64) -> bool {
        distance_m > 0.0 && distance_m <= self.max_m
    }
}

/// Horizontal surface distance (meters) at which a target appears at `altitude_deg`.
///
/// # Arguments
/// * `altitude_deg` - Altitude of the body as seen from the target
/// * `h_obs` - Observer elevation in meters
/// * `h_target` - Target elevation in meters
/// * `k` - Refraction coefficient, `0 <= k < 1`
/// * `window` - Plausibility window applied to the result
///
/// # Returns
/// The distance, or `None` when the geometry has no solution or the result
/// falls outside `window`
pub fn distance_for_altitude(
    altitude_deg: f64,
    h_obs: f64,
    h_target: f64,
    k: f64,
    window: PlausibilityWindow,
) -> Option<f64> {
    let gamma = center_angle_rad(altitude_deg, h_obs, h_target, k)?;
    let distance = MEAN_EARTH_RADIUS * gamma;
    window.contains(distance).then_some(distance)
}

/// Earth-center angle of the observer/target triangle in radians.
fn center_angle_rad(altitude_deg: f64, h_obs: f64, h_target: f64, k: f64) -> Option<f64> {
    if !(altitude_deg.is_finite() && h_obs.is_finite() && h_target.is_finite() && k.is_finite()) {
        return None;
    }
    if !(0.0..1.0).contains(&k) {
        return None;
    }

    let r_eff = MEAN_EARTH_RADIUS / (1.0 - k);
    let r1 = r_eff + h_obs;
    let r2 = r_eff + h_target;
    if r1 <= 0.0 || r2 <= 0.0 {
        return None;
    }

    let theta_obs = (90.0 + altitude_deg).to_radians();
    let sin_target = r1 * theta_obs.sin() / r2;
    if sin_target.abs() > 1.0 {
        return None;
    }
    let theta_target = sin_target.asin();

    let gamma = std::f64::consts::PI - theta_obs - theta_target;
    if gamma < 0.0 { None } else { Some(gamma) }
}

// ===================== TESTS =====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{DipModel, horizon_dip_deg};
    use approx::assert_relative_eq;

    const FUJI: f64 = 3776.0;

    #[test]
    fn test_same_level_horizon_has_no_solution() {
        let d = distance_for_altitude(0.0, 0.0, 0.0, 0.0, PlausibilityWindow::default());
        assert!(d.is_none(), "expected no solution, got {d:?}");
    }

    #[test]
    fn test_peak_on_horizon_is_within_window() {
        let d = distance_for_altitude(0.0, 0.0, FUJI, 0.0, PlausibilityWindow::default())
            .expect("peak should be reachable");
        assert!(d > 0.0 && d < DEFAULT_MAX_DISTANCE_M, "distance {d}");

        // At altitude 0 from sea level the center angle equals the geometric dip of the peak.
        let expected = MEAN_EARTH_RADIUS * horizon_dip_deg(FUJI, DipModel::Geometric).to_radians();
        assert_relative_eq!(d, expected, max_relative = 1e-9);
    }

    #[test]
    fn test_distance_shrinks_with_altitude() {
        let w = PlausibilityWindow::default();
        let d0 = distance_for_altitude(0.0, 150.0, FUJI, 0.13, w).unwrap();
        let d1 = distance_for_altitude(0.5, 150.0, FUJI, 0.13, w).unwrap();
        let d2 = distance_for_altitude(2.0, 150.0, FUJI, 0.13, w).unwrap();
        assert!(d0 > d1 && d1 > d2, "{d0} {d1} {d2}");
    }

    #[test]
    fn test_refraction_coefficient_shifts_distance() {
        let wide = PlausibilityWindow::new(1.0e6);
        let plain = distance_for_altitude(0.0, 0.0, FUJI, 0.0, wide).unwrap();
        let refr = distance_for_altitude(0.0, 0.0, FUJI, 0.13, wide).unwrap();
        // Center angle shrinks on the flatter effective sphere; ground distance uses true R.
        assert!((plain - refr) > 1_000.0, "{plain} vs {refr}");
    }

    #[test]
    fn test_low_peak_and_high_observer() {
        // A body at 10° cannot line up with a peak only 100 m above the observer
        // anywhere outside a few hundred meters.
        let w = PlausibilityWindow::default();
        let d = distance_for_altitude(10.0, 0.0, 100.0, 0.0, w).unwrap();
        assert!(d < 600.0, "distance {d}");
        // Observer higher than the target and body above the horizon: unreachable.
        assert!(distance_for_altitude(1.0, 500.0, 100.0, 0.0, w).is_none());
    }

    #[test]
    fn test_observer_above_target_at_horizon_unreachable() {
        // At altitude 0 the target-side sine is r1/r2, above 1 when the
        // observer stands higher than the target: no triangle at all.
        assert!(center_angle_rad(0.0, 500.0, 100.0, 0.0).is_none());
        assert!(distance_for_altitude(0.0, 500.0, 100.0, 0.0, PlausibilityWindow::new(1.0e9)).is_none());
        // Swapping the heights gives a real solution at the same altitude
        assert!(center_angle_rad(0.0, 100.0, 500.0, 0.0).is_some());
    }

    #[test]
    fn test_window_rejects_far_solutions() {
        let d = distance_for_altitude(-1.5, 0.0, FUJI, 0.0, PlausibilityWindow::new(1.0e7));
        let d = d.expect("unbounded window should accept");
        assert!(d > DEFAULT_MAX_DISTANCE_M);
        assert!(
            distance_for_altitude(-1.5, 0.0, FUJI, 0.0, PlausibilityWindow::default()).is_none()
        );
    }

    #[test]
    fn test_invalid_inputs() {
        let w = PlausibilityWindow::default();
        assert!(distance_for_altitude(f64::NAN, 0.0, FUJI, 0.0, w).is_none());
        assert!(distance_for_altitude(0.0, 0.0, FUJI, 1.0, w).is_none());
        assert!(distance_for_altitude(0.0, 0.0, FUJI, -0.1, w).is_none());
    }
}
