//! Daily Locus Sampler
//!
//! Walks one reference day minute by minute and records, for every instant
//! the body clears the visibility limit, how far from the target landmark
//! (and in which direction) an observer has to stand to see the body sitting
//! on the landmark.
//!
//! The astronomical query runs at the *target*: the locus is the set of
//! places the user could move to, so the landmark is the fixed end.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use log::trace;
use serde::Serialize;

use crate::ephemeris::{Body, Ephemeris, RefractionMode};
use crate::geo::{AngularMargin, DipModel, GeoPoint, ObserverConfig, is_visible, visibility_limit_deg};
use crate::inverter::{PlausibilityWindow, distance_for_altitude};

/// Number of one-minute steps in a reference day
pub const MINUTES_PER_DAY: i64 = 1440;

/// One point of the alignment locus, before projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorizonSample {
    /// Ground distance from the target in meters
    pub distance_m: f64,
    /// Azimuth of the body seen from the target, degrees [0, 360)
    pub azimuth_deg: f64,
    pub time: DateTime<Tz>,
}

/// Knobs shared by every sampling pass of one computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocusParams {
    pub dip_model: DipModel,
    pub safety_margin_deg: f64,
    pub window: PlausibilityWindow,
    pub refraction: RefractionMode,
}

impl Default for LocusParams {
    fn default() -> Self {
        Self {
            dip_model: DipModel::default(),
            safety_margin_deg: crate::geo::DEFAULT_SAFETY_MARGIN_DEG,
            window: PlausibilityWindow::default(),
            refraction: RefractionMode::default(),
        }
    }
}

/// Sample the alignment locus of `body` over the day starting at `day_start`.
///
/// # Arguments
/// * `ephemeris` - Position source
/// * `body` - Body to follow
/// * `target` - Landmark the body should line up with
/// * `observer` - Configured vantage; its elevation sets the visibility limit
/// * `day_start` - Local midnight of the reference day
/// * `params` - Dip model, margins, plausibility window and refraction mode
///
/// # Returns
/// Time-ordered samples; instants with no solution or a failed lookup are absent
pub fn sample_locus<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    body: &Body,
    target: &GeoPoint,
    observer: &ObserverConfig,
    day_start: &DateTime<Tz>,
    params: &LocusParams,
) -> Vec<HorizonSample> {
    let margin = AngularMargin::new(body.apparent_radius_deg, params.safety_margin_deg);
    let limit = visibility_limit_deg(observer.position.elevation_m, params.dip_model, margin);

    let mut samples = Vec::new();
    for minute in 0..MINUTES_PER_DAY {
        let time = *day_start + Duration::minutes(minute);
        let pos = match ephemeris.horizontal_position(body, &time, target, params.refraction) {
            Ok(pos) => pos,
            Err(e) => {
                trace!("{}: skipping {}: {}", body.id, time.format("%H:%M"), e);
                continue;
            }
        };
        if !is_visible(pos.altitude_deg, limit) {
            continue;
        }
        if let Some(distance_m) = distance_for_altitude(
            pos.altitude_deg,
            observer.position.elevation_m,
            target.elevation_m,
            observer.refraction_k,
            params.window,
        ) {
            samples.push(HorizonSample { distance_m, azimuth_deg: pos.azimuth_deg, time });
        }
    }
    samples
}

// ===================== TESTS =====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::testing::scripted;
    use crate::ephemeris::{EphemerisError, Horizontal};
    use chrono::{TimeZone, Timelike};
    use chrono_tz::Asia::Tokyo;

    fn fuji() -> GeoPoint {
        GeoPoint::new(35.3606, 138.7274, 3776.0)
    }

    fn observer() -> ObserverConfig {
        ObserverConfig::new(GeoPoint::new(35.6812, 139.7671, 150.0), 0.0)
    }

    fn midnight() -> DateTime<Tz> {
        Tokyo.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_steady_body_fills_whole_day() {
        let eph = scripted(|_| Ok(Horizontal { azimuth_deg: 120.0, altitude_deg: 10.0 }));
        let samples =
            sample_locus(&eph, &Body::sun(), &fuji(), &observer(), &midnight(), &LocusParams::default());
        assert_eq!(samples.len(), MINUTES_PER_DAY as usize);
        assert!(samples.windows(2).all(|w| w[0].time < w[1].time));
        // A 3626 m height difference at 10° is about 20 km
        assert!(samples[0].distance_m > 19_000.0 && samples[0].distance_m < 22_000.0);
    }

    #[test]
    fn test_below_limit_and_failures_are_dropped() {
        let eph = scripted(|t: &DateTime<Tz>| {
            let minute = t.hour() * 60 + t.minute();
            if minute % 2 == 0 {
                Err(EphemerisError::Backend("flaky".into()))
            } else if minute < 720 {
                Ok(Horizontal { azimuth_deg: 90.0, altitude_deg: -5.0 })
            } else {
                Ok(Horizontal { azimuth_deg: 270.0, altitude_deg: 2.0 })
            }
        });
        let samples =
            sample_locus(&eph, &Body::sun(), &fuji(), &observer(), &midnight(), &LocusParams::default());
        assert_eq!(samples.len(), 360);
        assert!(samples.iter().all(|s| s.time.hour() >= 12 && s.azimuth_deg == 270.0));
    }

    #[test]
    fn test_plausibility_window_drops_far_points() {
        let eph = scripted(|_| Ok(Horizontal { azimuth_deg: 200.0, altitude_deg: 0.5 }));
        let tight = LocusParams { window: PlausibilityWindow::new(10_000.0), ..LocusParams::default() };
        assert!(sample_locus(&eph, &Body::moon(), &fuji(), &observer(), &midnight(), &tight).is_empty());
    }
}
