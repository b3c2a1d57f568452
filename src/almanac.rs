//! Built-in Ephemeris Backend
//!
//! Sun positions come from the NREL SPA (Solar Position Algorithm) through
//! `solar_positioning`, which also provides the native sunrise/sunset search.
//! The Moon uses the low-precision series of the Astronomical Almanac
//! (about 0.3° in longitude), corrected for topocentric parallax. Planets are
//! not modeled and report [`EphemerisError::UnsupportedBody`].

use chrono::{DateTime, Datelike, Duration};
use chrono_tz::Tz;
use solar_positioning::{
    Horizon, spa,
    time::DeltaT,
    types::{RefractionCorrection, SunriseResult},
};

use crate::ephemeris::{
    Body, BodyLookup, Ephemeris, EphemerisError, Equatorial, Horizontal, RefractionMode, Result,
    RiseSetDirection, julian_day, refraction_deg, to_horizontal,
};
use crate::geo::GeoPoint;

// ===================== LOW-PRECISION THEORY =====================

fn sin_deg(x: f64) -> f64 {
    x.to_radians().sin()
}

fn cos_deg(x: f64) -> f64 {
    x.to_radians().cos()
}

fn centuries(jd: f64) -> f64 {
    (jd - crate::ephemeris::J2000_JD) / 36_525.0
}

fn obliquity_deg(t: f64) -> f64 {
    23.439_291 - 0.013_004_2 * t
}

/// Ecliptic (longitude, latitude) to equatorial place.
fn ecliptic_to_equatorial(lon_deg: f64, lat_deg: f64, obliquity: f64) -> Equatorial {
    let (sin_l, cos_l) = lon_deg.to_radians().sin_cos();
    let (sin_b, cos_b) = lat_deg.to_radians().sin_cos();
    let (sin_e, cos_e) = obliquity.to_radians().sin_cos();
    let ra = (sin_l * cos_e - sin_b / cos_b * sin_e).atan2(cos_l);
    let dec = (sin_b * cos_e + cos_b * sin_e * sin_l).clamp(-1.0, 1.0).asin();
    Equatorial { ra_hours: ra.to_degrees().rem_euclid(360.0) / 15.0, dec_deg: dec.to_degrees() }
}

/// Apparent solar ecliptic longitude in degrees (about 0.01° accuracy).
fn solar_longitude_deg(jd: f64) -> f64 {
    let n = jd - crate::ephemeris::J2000_JD;
    let mean_lon = 280.460 + 0.985_647_4 * n;
    let anomaly = 357.528 + 0.985_600_3 * n;
    (mean_lon + 1.915 * sin_deg(anomaly) + 0.020 * sin_deg(2.0 * anomaly)).rem_euclid(360.0)
}

/// Geocentric lunar (longitude, latitude, horizontal parallax) in degrees.
fn lunar_ecliptic(jd: f64) -> (f64, f64, f64) {
    let t = centuries(jd);
    let lon = 218.32 + 481_267.881 * t + 6.29 * sin_deg(135.0 + 477_198.87 * t)
        - 1.27 * sin_deg(259.3 - 413_335.36 * t)
        + 0.66 * sin_deg(235.7 + 890_534.22 * t)
        + 0.21 * sin_deg(269.9 + 954_397.74 * t)
        - 0.19 * sin_deg(357.5 + 35_999.05 * t)
        - 0.11 * sin_deg(186.5 + 966_404.03 * t);
    let lat = 5.13 * sin_deg(93.3 + 483_202.02 * t) + 0.28 * sin_deg(228.2 + 960_400.89 * t)
        - 0.28 * sin_deg(318.3 + 6_003.15 * t)
        - 0.17 * sin_deg(217.6 - 407_332.21 * t);
    let parallax = 0.9508
        + 0.0518 * cos_deg(134.9 + 477_198.85 * t)
        + 0.0095 * cos_deg(259.2 - 413_335.38 * t)
        + 0.0078 * cos_deg(235.7 + 890_534.23 * t)
        + 0.0028 * cos_deg(269.9 + 954_397.70 * t);
    (lon.rem_euclid(360.0), lat, parallax)
}

fn solar_equatorial(jd: f64) -> Equatorial {
    ecliptic_to_equatorial(solar_longitude_deg(jd), 0.0, obliquity_deg(centuries(jd)))
}

fn lunar_equatorial(jd: f64) -> Equatorial {
    let (lon, lat, _) = lunar_ecliptic(jd);
    ecliptic_to_equatorial(lon, lat, obliquity_deg(centuries(jd)))
}

// ===================== BACKEND =====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Known {
    Sun,
    Moon,
}

fn known(key: &str) -> Option<Known> {
    if key.eq_ignore_ascii_case("sun") {
        Some(Known::Sun)
    } else if key.eq_ignore_ascii_case("moon") {
        Some(Known::Moon)
    } else {
        None
    }
}

/// Sun (SPA) and Moon (Almanac series) ephemeris.
#[derive(Debug, Clone, Copy, Default)]
pub struct Almanac;

impl Almanac {
    pub fn new() -> Self {
        Self
    }

    fn delta_t(time: &DateTime<Tz>) -> Result<f64> {
        DeltaT::estimate_from_date(time.year(), time.month())
            .map_err(|e| EphemerisError::Backend(e.to_string()))
    }

    /// Solar azimuth and altitude from SPA.
    fn sun_horizontal(
        &self,
        time: &DateTime<Tz>,
        observer: &GeoPoint,
        refraction: RefractionMode,
    ) -> Result<Horizontal> {
        let refr = match refraction {
            RefractionMode::Normal => Some(RefractionCorrection::standard()),
            RefractionMode::Off => None,
        };
        let pos = spa::solar_position(
            *time,
            observer.lat_deg,
            observer.lon_deg,
            observer.elevation_m,
            Self::delta_t(time)?,
            refr,
        )
        .map_err(|e| EphemerisError::Backend(e.to_string()))?;
        Ok(Horizontal { azimuth_deg: pos.azimuth().rem_euclid(360.0), altitude_deg: pos.elevation_angle() })
    }

    /// Topocentric lunar position: parallax lowers the Moon by up to a degree.
    fn moon_horizontal(
        &self,
        time: &DateTime<Tz>,
        observer: &GeoPoint,
        refraction: RefractionMode,
    ) -> Horizontal {
        let jd = julian_day(time);
        let (_, _, parallax) = lunar_ecliptic(jd);
        let geocentric = to_horizontal(time, observer, lunar_equatorial(jd), RefractionMode::Off);
        let mut altitude =
            geocentric.altitude_deg - parallax * geocentric.altitude_deg.to_radians().cos();
        if refraction == RefractionMode::Normal {
            altitude += refraction_deg(altitude);
        }
        Horizontal { azimuth_deg: geocentric.azimuth_deg, altitude_deg: altitude }
    }
}

impl Ephemeris for Almanac {
    fn equatorial_position(
        &self,
        key: &str,
        time: &DateTime<Tz>,
        _observer: &GeoPoint,
    ) -> Result<Equatorial> {
        let jd = julian_day(time);
        match known(key) {
            Some(Known::Sun) => Ok(solar_equatorial(jd)),
            Some(Known::Moon) => Ok(lunar_equatorial(jd)),
            None => Err(EphemerisError::UnsupportedBody(key.to_string())),
        }
    }

    fn horizontal_position(
        &self,
        body: &Body,
        time: &DateTime<Tz>,
        observer: &GeoPoint,
        refraction: RefractionMode,
    ) -> Result<Horizontal> {
        match &body.lookup {
            BodyLookup::Fixed { position } => self.horizontal(time, observer, *position, refraction),
            BodyLookup::Ephemeris { key } => match known(key) {
                Some(Known::Sun) => self.sun_horizontal(time, observer, refraction),
                Some(Known::Moon) => Ok(self.moon_horizontal(time, observer, refraction)),
                None => Err(EphemerisError::UnsupportedBody(key.clone())),
            },
        }
    }

    /// SPA sunrise/sunset for the Sun; other bodies fall back to sampling.
    ///
    /// SPA's sunrise horizon is the refracted one (-0.833° for the centre), so
    /// a geometric pass is left to the sampled finder.
    fn search_rise_set(
        &self,
        key: &str,
        observer: &GeoPoint,
        direction: RiseSetDirection,
        start: &DateTime<Tz>,
        limit_days: f64,
        refraction: RefractionMode,
    ) -> Result<Option<DateTime<Tz>>> {
        if known(key) != Some(Known::Sun) {
            return Err(EphemerisError::Unsupported("rise/set search for bodies other than the Sun"));
        }
        if refraction == RefractionMode::Off {
            return Err(EphemerisError::Unsupported("native rise/set without refraction"));
        }

        let res = spa::sunrise_sunset_for_horizon(
            *start,
            observer.lat_deg,
            observer.lon_deg,
            Self::delta_t(start)?,
            Horizon::SunriseSunset,
        )
        .map_err(|e| EphemerisError::Backend(e.to_string()))?;

        let event = match res {
            SunriseResult::RegularDay { sunrise, sunset, .. } => match direction {
                RiseSetDirection::Rise => sunrise,
                RiseSetDirection::Set => sunset,
            },
            SunriseResult::AllDay { .. } | SunriseResult::AllNight { .. } => return Ok(None),
        };

        let end = *start + Duration::seconds((limit_days * 86_400.0) as i64);
        Ok((event >= *start && event < end).then_some(event))
    }

    fn lunar_phase_angle(&self, time: &DateTime<Tz>) -> Result<f64> {
        let jd = julian_day(time);
        let (moon_lon, _, _) = lunar_ecliptic(jd);
        Ok((moon_lon - solar_longitude_deg(jd)).rem_euclid(360.0))
    }
}

// ===================== TESTS =====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::moon_age_days;
    use approx::assert_abs_diff_eq;
    use chrono::{TimeZone, Timelike};
    use chrono_tz::{Asia::Tokyo, UTC};

    fn tokyo() -> GeoPoint {
        GeoPoint::new(35.681236, 139.767125, 0.0)
    }

    #[test]
    fn test_solstice_declination() {
        let t = UTC.with_ymd_and_hms(2025, 6, 21, 3, 0, 0).unwrap();
        let eq = Almanac.equatorial_position("Sun", &t, &tokyo()).unwrap();
        assert_abs_diff_eq!(eq.dec_deg, 23.44, epsilon = 0.05);
        assert_abs_diff_eq!(eq.ra_hours, 6.0, epsilon = 0.05);
    }

    #[test]
    fn test_sun_high_at_tokyo_summer_noon() {
        let t = Tokyo.with_ymd_and_hms(2025, 6, 21, 11, 45, 0).unwrap();
        let h = Almanac.horizontal_position(&Body::sun(), &t, &tokyo(), RefractionMode::Normal).unwrap();
        assert!(h.altitude_deg > 75.0 && h.altitude_deg < 78.5, "alt {}", h.altitude_deg);
        assert!(h.azimuth_deg > 150.0 && h.azimuth_deg < 210.0, "az {}", h.azimuth_deg);
    }

    #[test]
    fn test_spa_and_sidereal_route_agree_for_sun() {
        // The low-precision theory through the default conversion path lands
        // within a few hundredths of a degree of SPA.
        let t = Tokyo.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).unwrap();
        let spa = Almanac.horizontal_position(&Body::sun(), &t, &tokyo(), RefractionMode::Off).unwrap();
        let eq = Almanac.equatorial_position("Sun", &t, &tokyo()).unwrap();
        let via = Almanac.horizontal(&t, &tokyo(), eq, RefractionMode::Off).unwrap();
        assert_abs_diff_eq!(spa.altitude_deg, via.altitude_deg, epsilon = 0.1);
        assert_abs_diff_eq!(spa.azimuth_deg, via.azimuth_deg, epsilon = 0.1);
    }

    #[test]
    fn test_native_sunrise_sunset_tokyo_solstice() {
        let start = Tokyo.with_ymd_and_hms(2025, 6, 21, 0, 0, 0).unwrap();
        let rise = Almanac
            .search_rise_set("Sun", &tokyo(), RiseSetDirection::Rise, &start, 1.0, RefractionMode::Normal)
            .unwrap()
            .unwrap();
        let set = Almanac
            .search_rise_set("Sun", &tokyo(), RiseSetDirection::Set, &start, 1.0, RefractionMode::Normal)
            .unwrap()
            .unwrap();
        let rise_min = rise.hour() * 60 + rise.minute();
        let set_min = set.hour() * 60 + set.minute();
        assert!((4 * 60 + 15..=4 * 60 + 35).contains(&rise_min), "sunrise {rise}");
        assert!((18 * 60 + 50..=19 * 60 + 10).contains(&set_min), "sunset {set}");
    }

    #[test]
    fn test_moon_rise_set_search_unsupported() {
        let start = Tokyo.with_ymd_and_hms(2025, 6, 21, 0, 0, 0).unwrap();
        assert!(matches!(
            Almanac.search_rise_set("Moon", &tokyo(), RiseSetDirection::Rise, &start, 1.0, RefractionMode::Normal),
            Err(EphemerisError::Unsupported(_))
        ));
    }

    #[test]
    fn test_geometric_sun_rise_set_search_unsupported() {
        let start = Tokyo.with_ymd_and_hms(2026, 3, 20, 0, 0, 0).unwrap();
        for direction in [RiseSetDirection::Rise, RiseSetDirection::Set] {
            assert!(matches!(
                Almanac.search_rise_set("Sun", &tokyo(), direction, &start, 1.0, RefractionMode::Off),
                Err(EphemerisError::Unsupported(_))
            ));
        }
    }

    #[test]
    fn test_lunar_phase_full_and_new() {
        // Total lunar eclipse, 2025-09-07 18:12 UTC
        let full = UTC.with_ymd_and_hms(2025, 9, 7, 18, 12, 0).unwrap();
        let phase = Almanac.lunar_phase_angle(&full).unwrap();
        assert_abs_diff_eq!(phase, 180.0, epsilon = 3.0);
        assert_abs_diff_eq!(moon_age_days(phase), 14.765, epsilon = 0.3);

        // New moon, 2025-09-21 19:54 UTC
        let new = UTC.with_ymd_and_hms(2025, 9, 21, 19, 54, 0).unwrap();
        let phase = Almanac.lunar_phase_angle(&new).unwrap();
        assert!(phase < 3.0 || phase > 357.0, "phase {phase}");
    }

    #[test]
    fn test_moon_parallax_lowers_altitude() {
        let t = Tokyo.with_ymd_and_hms(2025, 9, 7, 23, 0, 0).unwrap();
        let topo = Almanac.moon_horizontal(&t, &tokyo(), RefractionMode::Off);
        let eq = lunar_equatorial(julian_day(&t));
        let geo = to_horizontal(&t, &tokyo(), eq, RefractionMode::Off);
        let drop = geo.altitude_deg - topo.altitude_deg;
        assert!(drop > 0.0 && drop < 1.03, "parallax drop {drop}");
    }

    #[test]
    fn test_planets_unsupported() {
        let t = Tokyo.with_ymd_and_hms(2025, 6, 21, 12, 0, 0).unwrap();
        let mars = Body::from_catalog("Mars").unwrap();
        assert_eq!(
            Almanac.horizontal_position(&mars, &t, &tokyo(), RefractionMode::Normal),
            Err(EphemerisError::UnsupportedBody("Mars".into()))
        );
    }
}
