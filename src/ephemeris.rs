//! Ephemeris Collaborator Contract
//!
//! The engine never computes planetary theory itself. It asks an [`Ephemeris`]
//! for positions and, where the backend can, for native rise/set instants.
//! This module also holds the body catalog and the sidereal-time conversion
//! from equatorial to horizontal coordinates, used for fixed-catalog bodies.

use std::f64::consts::TAU;

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;

use crate::geo::{GeoPoint, LUNAR_RADIUS_DEG, SOLAR_RADIUS_DEG};

// ===================== CONSTANTS =====================

/// Julian Date of the Unix epoch
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// Julian Date of J2000.0
pub const J2000_JD: f64 = 2_451_545.0;

/// Arcseconds to radians
const ARCSEC_TO_RAD: f64 = std::f64::consts::PI / (180.0 * 3600.0);

/// Mean synodic month in days
pub const SYNODIC_MONTH_DAYS: f64 = 29.53;

/// Polaris (alpha UMi) right ascension in hours
pub const POLARIS_RA_HOURS: f64 = 2.5303;

/// Polaris (alpha UMi) declination in degrees
pub const POLARIS_DEC_DEG: f64 = 89.2641;

// ===================== ERRORS =====================

/// Failure of a single ephemeris call. Never fatal to a computation pass.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EphemerisError {
    #[error("body not supported by this ephemeris: {0}")]
    UnsupportedBody(String),
    #[error("operation not supported by this ephemeris: {0}")]
    Unsupported(&'static str),
    #[error("ephemeris backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, EphemerisError>;

// ===================== COORDINATES =====================

/// Apparent place on the celestial sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Equatorial {
    /// Right ascension in hours [0, 24)
    pub ra_hours: f64,
    /// Declination in degrees
    pub dec_deg: f64,
}

/// Local horizontal position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Horizontal {
    /// Azimuth clockwise from true north, degrees [0, 360)
    pub azimuth_deg: f64,
    /// Altitude above the horizontal plane, degrees
    pub altitude_deg: f64,
}

/// Whether atmospheric refraction is applied to altitudes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefractionMode {
    /// Standard-atmosphere refraction
    #[default]
    Normal,
    /// Geometric altitude
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiseSetDirection {
    Rise,
    Set,
}

// ===================== BODIES =====================

/// How a body's position is obtained.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BodyLookup {
    /// Ask the ephemeris by key (e.g. "Sun", "Moon")
    Ephemeris { key: String },
    /// Fixed catalog place, bypassing the ephemeris
    Fixed { position: Equatorial },
}

/// Identity and lookup key of a body. Presentation lives in the output layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Body {
    pub id: String,
    pub name: String,
    pub lookup: BodyLookup,
    /// Apparent semi-diameter in degrees, folded into the visibility margin
    pub apparent_radius_deg: f64,
}

impl Body {
    /// A body looked up by key in the ephemeris.
    pub fn ephemeris(id: &str, apparent_radius_deg: f64) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            lookup: BodyLookup::Ephemeris { key: id.to_string() },
            apparent_radius_deg,
        }
    }

    /// A fixed catalog body at the given right ascension and declination.
    pub fn fixed(name: &str, ra_hours: f64, dec_deg: f64) -> Self {
        Self {
            id: name.to_string(),
            name: name.to_string(),
            lookup: BodyLookup::Fixed { position: Equatorial { ra_hours, dec_deg } },
            apparent_radius_deg: 0.0,
        }
    }

    pub fn sun() -> Self {
        Self::ephemeris("Sun", SOLAR_RADIUS_DEG)
    }

    pub fn moon() -> Self {
        Self::ephemeris("Moon", LUNAR_RADIUS_DEG)
    }

    pub fn polaris() -> Self {
        Self::fixed("Polaris", POLARIS_RA_HOURS, POLARIS_DEC_DEG)
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self.lookup, BodyLookup::Fixed { .. })
    }

    /// Look a body up in the default catalog by case-insensitive id.
    pub fn from_catalog(id: &str) -> Option<Self> {
        default_catalog().into_iter().find(|b| b.id.eq_ignore_ascii_case(id))
    }
}

/// Sun, Moon, the planets and Pluto, plus Polaris as a fixed star.
pub fn default_catalog() -> Vec<Body> {
    let mut bodies = vec![Body::sun(), Body::moon()];
    for id in ["Mercury", "Venus", "Mars", "Jupiter", "Saturn", "Uranus", "Neptune", "Pluto"] {
        bodies.push(Body::ephemeris(id, 0.0));
    }
    bodies.push(Body::polaris());
    bodies
}

// ===================== CONTRACT =====================

/// Positions of celestial bodies as seen from a point on the Earth.
///
/// Implementations only need [`Ephemeris::equatorial_position`] and
/// [`Ephemeris::lunar_phase_angle`]; the rest have working defaults.
pub trait Ephemeris {
    /// Apparent right ascension and declination of an ephemeris body.
    fn equatorial_position(
        &self,
        key: &str,
        time: &DateTime<Tz>,
        observer: &GeoPoint,
    ) -> Result<Equatorial>;

    /// Convert an equatorial place into local azimuth and altitude.
    fn horizontal(
        &self,
        time: &DateTime<Tz>,
        observer: &GeoPoint,
        position: Equatorial,
        refraction: RefractionMode,
    ) -> Result<Horizontal> {
        Ok(to_horizontal(time, observer, position, refraction))
    }

    /// Horizontal position of any body. Fixed-catalog bodies skip
    /// [`Ephemeris::equatorial_position`].
    fn horizontal_position(
        &self,
        body: &Body,
        time: &DateTime<Tz>,
        observer: &GeoPoint,
        refraction: RefractionMode,
    ) -> Result<Horizontal> {
        let position = match &body.lookup {
            BodyLookup::Fixed { position } => *position,
            BodyLookup::Ephemeris { key } => self.equatorial_position(key, time, observer)?,
        };
        self.horizontal(time, observer, position, refraction)
    }

    /// Native rise or set search within `limit_days` after `start`.
    ///
    /// The event must use the same horizon as a sampled search under
    /// `refraction`. `Ok(None)` means the backend searched and found no event.
    fn search_rise_set(
        &self,
        _key: &str,
        _observer: &GeoPoint,
        _direction: RiseSetDirection,
        _start: &DateTime<Tz>,
        _limit_days: f64,
        _refraction: RefractionMode,
    ) -> Result<Option<DateTime<Tz>>> {
        Err(EphemerisError::Unsupported("rise/set search"))
    }

    /// Moon-Sun elongation in ecliptic longitude, degrees [0, 360); 180 is full.
    fn lunar_phase_angle(&self, time: &DateTime<Tz>) -> Result<f64>;
}

/// Age of the Moon in days from its phase angle.
pub fn moon_age_days(phase_deg: f64) -> f64 {
    phase_deg / 360.0 * SYNODIC_MONTH_DAYS
}

// ===================== SIDEREAL CONVERSION =====================

/// Julian Date (UTC, used as UT1) of an instant.
pub fn julian_day(time: &DateTime<Tz>) -> f64 {
    let seconds = time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) * 1e-9;
    seconds / 86_400.0 + UNIX_EPOCH_JD
}

/// Greenwich Mean Sidereal Time in radians [0, 2π).
///
/// Earth Rotation Angle (IERS 2010) plus the Capitaine et al. (2003)
/// precession polynomial.
pub fn gmst_rad(jd_ut1: f64) -> f64 {
    let du = jd_ut1 - J2000_JD;
    let era = TAU * (0.779_057_273_264_0 + 1.002_737_811_911_354_6 * du);
    let t = du / 36_525.0;
    let poly_arcsec = 0.014506 + 4612.156534 * t + 1.3915817 * t * t - 0.00000044 * t.powi(3)
        - 0.000029956 * t.powi(4)
        - 0.0000000368 * t.powi(5);
    (era + poly_arcsec * ARCSEC_TO_RAD).rem_euclid(TAU)
}

/// Atmospheric refraction for a true altitude (Saemundsson), in degrees.
///
/// Altitudes below -1° reuse the -1° value; no refraction below -2°.
pub fn refraction_deg(true_altitude_deg: f64) -> f64 {
    if true_altitude_deg < -2.0 || true_altitude_deg > 90.0 {
        return 0.0;
    }
    let h = true_altitude_deg.max(-1.0);
    let arcmin = 1.02 / (h + 10.3 / (h + 5.11)).to_radians().tan();
    arcmin.max(0.0) / 60.0
}

/// Equatorial place to local horizontal coordinates via local sidereal time.
pub fn to_horizontal(
    time: &DateTime<Tz>,
    observer: &GeoPoint,
    position: Equatorial,
    refraction: RefractionMode,
) -> Horizontal {
    let lst = gmst_rad(julian_day(time)) + observer.lon_deg.to_radians();
    let hour_angle = lst - (position.ra_hours * 15.0).to_radians();
    let (sin_h, cos_h) = hour_angle.sin_cos();
    let (sin_d, cos_d) = position.dec_deg.to_radians().sin_cos();
    let (sin_p, cos_p) = observer.lat_deg.to_radians().sin_cos();

    let altitude = (sin_p * sin_d + cos_p * cos_d * cos_h).clamp(-1.0, 1.0).asin().to_degrees();
    let azimuth = (-cos_d * sin_h).atan2(sin_d * cos_p - cos_d * cos_h * sin_p).to_degrees();

    let altitude = match refraction {
        RefractionMode::Normal => altitude + refraction_deg(altitude),
        RefractionMode::Off => altitude,
    };
    Horizontal { azimuth_deg: azimuth.rem_euclid(360.0), altitude_deg: altitude }
}

// ===================== TEST DOUBLES =====================


// ===================== TESTS =====================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;
    use chrono_tz::{Asia::Tokyo, UTC};

    struct FixedOnly;

    impl Ephemeris for FixedOnly {
        fn equatorial_position(&self, key: &str, _: &DateTime<Tz>, _: &GeoPoint) -> Result<Equatorial> {
            Err(EphemerisError::UnsupportedBody(key.to_string()))
        }

        fn lunar_phase_angle(&self, _: &DateTime<Tz>) -> Result<f64> {
            Err(EphemerisError::Unsupported("phase"))
        }
    }

    #[test]
    fn test_julian_day_epochs() {
        let j2000 = UTC.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert_abs_diff_eq!(julian_day(&j2000), J2000_JD, epsilon = 1e-9);
        let unix = UTC.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert_abs_diff_eq!(julian_day(&unix), UNIX_EPOCH_JD, epsilon = 1e-9);
    }

    #[test]
    fn test_gmst_j2000_midnight() {
        // 2000-01-01 0h UT: GMST 6h 39m 52.27s = 99.968°
        let gmst = gmst_rad(2_451_544.5).to_degrees();
        assert_abs_diff_eq!(gmst, 99.967_9, epsilon = 0.01);
    }

    #[test]
    fn test_polaris_altitude_tracks_latitude() {
        let observer = GeoPoint::new(35.681236, 139.767125, 0.0);
        let eph = FixedOnly;
        for hour in [0, 6, 12, 18] {
            let t = Tokyo.with_ymd_and_hms(2026, 1, 15, hour, 0, 0).unwrap();
            let h = eph
                .horizontal_position(&Body::polaris(), &t, &observer, RefractionMode::Off)
                .unwrap();
            assert!((h.altitude_deg - observer.lat_deg).abs() < 1.0, "alt {}", h.altitude_deg);
            assert!(h.azimuth_deg < 2.0 || h.azimuth_deg > 358.0, "az {}", h.azimuth_deg);
        }
    }

    #[test]
    fn test_unsupported_body_is_an_error_not_a_panic() {
        let observer = GeoPoint::new(35.0, 139.0, 0.0);
        let t = Tokyo.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let err = FixedOnly
            .horizontal_position(&Body::sun(), &t, &observer, RefractionMode::Normal)
            .unwrap_err();
        assert_eq!(err, EphemerisError::UnsupportedBody("Sun".into()));
        let search = FixedOnly.search_rise_set("Sun", &observer, RiseSetDirection::Rise, &t, 1.0, RefractionMode::Normal);
        assert!(search.is_err());
    }

    #[test]
    fn test_refraction_at_horizon() {
        // About 29 arcminutes at a true altitude of zero
        assert_abs_diff_eq!(refraction_deg(0.0), 0.4836, epsilon = 0.01);
        assert!(refraction_deg(45.0) < 0.02);
        assert_eq!(refraction_deg(-3.0), 0.0);
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 11);
        assert!(Body::from_catalog("polaris").unwrap().is_fixed());
        assert_eq!(Body::from_catalog("SUN").unwrap().apparent_radius_deg, SOLAR_RADIUS_DEG);
        assert!(Body::from_catalog("Vulcan").is_none());
    }
}
