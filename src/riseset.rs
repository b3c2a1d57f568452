//! Rise/Set Event Finder
//!
//! Root finding on a minute-resolution altitude curve, with an optional fast
//! path through the ephemeris' own rise/set search.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use log::debug;
use serde::Serialize;

use crate::ephemeris::{Body, BodyLookup, Ephemeris, RefractionMode, RiseSetDirection};
use crate::geo::GeoPoint;
use crate::sampler::MINUTES_PER_DAY;

/// Label shown for both events of a circumpolar body
pub const ALL_DAY_LABEL: &str = "00:00";

/// Label shown for an absent event
pub const NO_EVENT_LABEL: &str = "--:--";

/// Rise and set of one body over one reference day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RiseSetResult {
    Regular { rise: Option<DateTime<Tz>>, set: Option<DateTime<Tz>> },
    /// Above the horizon all day
    Circumpolar,
    /// Below the horizon all day
    NeverRises,
}

impl RiseSetResult {
    pub fn rise_label(&self) -> String {
        match self {
            RiseSetResult::Regular { rise, .. } => label(rise),
            RiseSetResult::Circumpolar => ALL_DAY_LABEL.to_string(),
            RiseSetResult::NeverRises => NO_EVENT_LABEL.to_string(),
        }
    }

    pub fn set_label(&self) -> String {
        match self {
            RiseSetResult::Regular { set, .. } => label(set),
            RiseSetResult::Circumpolar => ALL_DAY_LABEL.to_string(),
            RiseSetResult::NeverRises => NO_EVENT_LABEL.to_string(),
        }
    }
}

fn label(event: &Option<DateTime<Tz>>) -> String {
    event.as_ref().map_or_else(|| NO_EVENT_LABEL.to_string(), |t| t.format("%H:%M").to_string())
}

/// Linear zero crossing between two altitude samples, millisecond precision.
///
/// # Arguments
/// * `t1`, `alt1` - Earlier sample
/// * `t2`, `alt2` - Later sample, with `alt2` on the other side of zero
///
/// # Returns
/// `t1 + (t2 - t1) * (0 - alt1) / (alt2 - alt1)`, or `t1` for equal altitudes
pub fn interpolate_crossing(t1: DateTime<Tz>, alt1: f64, t2: DateTime<Tz>, alt2: f64) -> DateTime<Tz> {
    let span = alt2 - alt1;
    if span == 0.0 || !span.is_finite() {
        return t1;
    }
    let frac = (0.0 - alt1) / span;
    let dt_ms = (t2 - t1).num_milliseconds() as f64;
    t1 + Duration::milliseconds((dt_ms * frac).round() as i64)
}

/// Find rise and set by sampling the altitude every minute of the day.
///
/// Samples run from `day_start` through 24:00 inclusive. Failed lookups are
/// skipped and crossings are found between consecutive successful samples.
/// Only the first rise and the first set are kept.
pub fn find_rise_set_sampled<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    body: &Body,
    observer: &GeoPoint,
    day_start: &DateTime<Tz>,
    refraction: RefractionMode,
) -> RiseSetResult {
    let mut rise = None;
    let mut set = None;
    let mut first_alt = None;
    let mut prev: Option<(DateTime<Tz>, f64)> = None;

    for minute in 0..=MINUTES_PER_DAY {
        let t = *day_start + Duration::minutes(minute);
        let Ok(pos) = ephemeris.horizontal_position(body, &t, observer, refraction) else {
            continue;
        };
        let alt = pos.altitude_deg;
        first_alt.get_or_insert(alt);

        if let Some((t1, alt1)) = prev {
            if rise.is_none() && alt1 < 0.0 && alt >= 0.0 {
                rise = Some(interpolate_crossing(t1, alt1, t, alt));
            } else if set.is_none() && alt1 >= 0.0 && alt < 0.0 {
                set = Some(interpolate_crossing(t1, alt1, t, alt));
            }
        }
        prev = Some((t, alt));
    }

    if rise.is_some() || set.is_some() {
        return RiseSetResult::Regular { rise, set };
    }
    match first_alt {
        Some(alt) if alt >= 0.0 => RiseSetResult::Circumpolar,
        Some(_) => RiseSetResult::NeverRises,
        None => RiseSetResult::Regular { rise: None, set: None },
    }
}

/// Rise and set for one body, preferring the ephemeris' native search.
///
/// Fixed-catalog bodies always sample. For ephemeris bodies any search error
/// falls back to sampling; a search that finds nothing is classified by the
/// altitude at `day_start`.
pub fn find_rise_set<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    body: &Body,
    observer: &GeoPoint,
    day_start: &DateTime<Tz>,
    refraction: RefractionMode,
) -> RiseSetResult {
    let BodyLookup::Ephemeris { key } = &body.lookup else {
        return find_rise_set_sampled(ephemeris, body, observer, day_start, refraction);
    };

    let search = |direction: RiseSetDirection| {
        ephemeris.search_rise_set(key, observer, direction, day_start, 1.0, refraction)
    };
    match (search(RiseSetDirection::Rise), search(RiseSetDirection::Set)) {
        (Ok(None), Ok(None)) => {
            match ephemeris.horizontal_position(body, day_start, observer, refraction) {
                Ok(pos) if pos.altitude_deg >= 0.0 => RiseSetResult::Circumpolar,
                Ok(_) => RiseSetResult::NeverRises,
                Err(_) => find_rise_set_sampled(ephemeris, body, observer, day_start, refraction),
            }
        }
        (Ok(rise), Ok(set)) => RiseSetResult::Regular { rise, set },
        (Err(e), _) | (_, Err(e)) => {
            debug!("{}: native rise/set unavailable ({}), sampling", body.id, e);
            find_rise_set_sampled(ephemeris, body, observer, day_start, refraction)
        }
    }
}

/// Minute of the reference day (0..=1439) at which `time` falls.
pub fn minute_of_day(time: &DateTime<Tz>, day_start: &DateTime<Tz>) -> u32 {
    (*time - *day_start).num_minutes().clamp(0, MINUTES_PER_DAY - 1) as u32
}

// ===================== TESTS =====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::almanac::Almanac;
    use crate::ephemeris::testing::scripted;
    use crate::ephemeris::{EphemerisError, Equatorial, Horizontal, Result};
    use chrono::{TimeZone, Timelike};
    use chrono_tz::{Asia::Tokyo, UTC};

    fn midnight() -> DateTime<Tz> {
        UTC.with_ymd_and_hms(2026, 3, 20, 0, 0, 0).unwrap()
    }

    fn here() -> GeoPoint {
        GeoPoint::new(35.0, 139.0, 0.0)
    }

    /// Altitude follows a sine that rises at 06:00 and sets at 18:00.
    fn sine_day(t: &DateTime<Tz>) -> Result<Horizontal> {
        let minutes = (*t - midnight()).num_seconds() as f64 / 60.0;
        let phase = (minutes - 360.0) / 1440.0 * std::f64::consts::TAU;
        Ok(Horizontal { azimuth_deg: 180.0, altitude_deg: 20.0 * phase.sin() })
    }

    #[test]
    fn test_interpolation_midpoint() {
        let t1 = midnight();
        let t2 = t1 + Duration::minutes(10);
        assert_eq!(interpolate_crossing(t1, -2.0, t2, 2.0), t1 + Duration::minutes(5));
        assert_eq!(interpolate_crossing(t2, 2.0, t1, 2.0), t2);
    }

    #[test]
    fn test_sampled_regular_day() {
        let eph = scripted(sine_day);
        let res = find_rise_set_sampled(&eph, &Body::sun(), &here(), &midnight(), RefractionMode::Normal);
        let RiseSetResult::Regular { rise: Some(rise), set: Some(set) } = res else {
            panic!("expected regular day, got {res:?}");
        };
        assert!((rise - (midnight() + Duration::hours(6))).num_seconds().abs() <= 1);
        assert!((set - (midnight() + Duration::hours(18))).num_seconds().abs() <= 1);
        assert_eq!(res.rise_label(), "06:00");
        assert!((1079..=1080).contains(&minute_of_day(&set, &midnight())));
    }

    #[test]
    fn test_circumpolar_reports_all_day() {
        let eph = scripted(|_| Ok(Horizontal { azimuth_deg: 0.0, altitude_deg: 5.0 }));
        let res = find_rise_set_sampled(&eph, &Body::polaris(), &here(), &midnight(), RefractionMode::Off);
        assert_eq!(res, RiseSetResult::Circumpolar);
        assert_eq!(res.rise_label(), ALL_DAY_LABEL);
        assert_eq!(res.set_label(), ALL_DAY_LABEL);
    }

    #[test]
    fn test_never_rises_reports_blank() {
        let eph = scripted(|_| Ok(Horizontal { azimuth_deg: 0.0, altitude_deg: -5.0 }));
        let res = find_rise_set_sampled(&eph, &Body::moon(), &here(), &midnight(), RefractionMode::Off);
        assert_eq!(res, RiseSetResult::NeverRises);
        assert_eq!(res.set_label(), NO_EVENT_LABEL);
    }

    #[test]
    fn test_all_lookups_failing() {
        let eph = scripted(|_| Err(EphemerisError::UnsupportedBody("Pluto".into())));
        let res = find_rise_set_sampled(&eph, &Body::moon(), &here(), &midnight(), RefractionMode::Off);
        assert_eq!(res, RiseSetResult::Regular { rise: None, set: None });
    }

    #[test]
    fn test_unsupported_native_search_falls_back_to_sampling() {
        let eph = scripted(sine_day);
        let res = find_rise_set(&eph, &Body::sun(), &here(), &midnight(), RefractionMode::Normal);
        assert!(matches!(res, RiseSetResult::Regular { rise: Some(_), set: Some(_) }));
    }

    struct NativeNothing;

    impl Ephemeris for NativeNothing {
        fn equatorial_position(&self, _: &str, _: &DateTime<Tz>, _: &GeoPoint) -> Result<Equatorial> {
            Ok(Equatorial { ra_hours: 0.0, dec_deg: 0.0 })
        }

        fn horizontal_position(
            &self,
            _: &Body,
            _: &DateTime<Tz>,
            _: &GeoPoint,
            _: RefractionMode,
        ) -> Result<Horizontal> {
            Ok(Horizontal { azimuth_deg: 0.0, altitude_deg: 12.0 })
        }

        fn search_rise_set(
            &self,
            _: &str,
            _: &GeoPoint,
            _: RiseSetDirection,
            _: &DateTime<Tz>,
            _: f64,
            _: RefractionMode,
        ) -> Result<Option<DateTime<Tz>>> {
            Ok(None)
        }

        fn lunar_phase_angle(&self, _: &DateTime<Tz>) -> Result<f64> {
            Ok(0.0)
        }
    }

    #[test]
    fn test_native_search_without_events_classifies_by_altitude() {
        let res = find_rise_set(&NativeNothing, &Body::sun(), &here(), &midnight(), RefractionMode::Normal);
        assert_eq!(res, RiseSetResult::Circumpolar);
    }

    #[test]
    fn test_geometric_sun_uses_the_sampled_horizon() {
        let start = Tokyo.with_ymd_and_hms(2026, 3, 20, 0, 0, 0).unwrap();
        let tokyo = GeoPoint::new(35.681236, 139.767125, 0.0);

        let events = |res: RiseSetResult| match res {
            RiseSetResult::Regular { rise: Some(rise), set: Some(set) } => (rise, set),
            other => panic!("expected regular day, got {other:?}"),
        };
        let (rise, set) = events(find_rise_set(&Almanac, &Body::sun(), &tokyo, &start, RefractionMode::Off));
        let (sampled_rise, sampled_set) =
            events(find_rise_set_sampled(&Almanac, &Body::sun(), &tokyo, &start, RefractionMode::Off));
        assert!((rise - sampled_rise).num_seconds().abs() <= 60, "{rise} vs {sampled_rise}");
        assert!((set - sampled_set).num_seconds().abs() <= 60, "{set} vs {sampled_set}");

        // Refraction lifts the Sun by about half a degree: earlier rise, later set
        let (refracted_rise, refracted_set) =
            events(find_rise_set(&Almanac, &Body::sun(), &tokyo, &start, RefractionMode::Normal));
        assert!((rise - refracted_rise).num_seconds() > 120, "{rise} vs {refracted_rise}");
        assert!((refracted_set - set).num_seconds() > 120, "{set} vs {refracted_set}");
    }

    #[test]
    fn test_minute_of_day_clamps() {
        let start = midnight();
        assert_eq!(minute_of_day(&(start - Duration::minutes(3)), &start), 0);
        assert_eq!(minute_of_day(&(start + Duration::minutes(90)), &start), 90);
        assert_eq!(minute_of_day(&(start + Duration::hours(30)), &start), 1439);
        assert_eq!((start + Duration::minutes(90)).hour(), 1);
    }
}
