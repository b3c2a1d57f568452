//! Geographic and Horizon-Limit Module
//!
//! Provides the geodetic point type, WGS84 Earth radius, and the horizon dip
//! model that turns an observer elevation into the lowest altitude at which a
//! body can still be seen.

use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

// ===================== CONSTANTS =====================

/// WGS84 semi-major axis (equatorial radius) in meters
pub const A_EQUATOR: f64 = 6_378_137.0;

/// WGS84 semi-minor axis (polar radius) in meters
pub const B_POLAR: f64 = 6_356_752.314245;

/// IUGG mean Earth radius in meters
pub const MEAN_EARTH_RADIUS: f64 = 6_371_008.8;

/// Solar apparent radius in degrees (angular semi-diameter)
pub const SOLAR_RADIUS_DEG: f64 = 0.266;

/// Lunar apparent radius in degrees at mean distance
pub const LUNAR_RADIUS_DEG: f64 = 0.259;

/// Extra angular allowance below the dipped horizon, independent of the body
pub const DEFAULT_SAFETY_MARGIN_DEG: f64 = 0.1;

// ===================== ERRORS =====================

/// Rejected engine configuration. Raised at the boundary, before any math runs.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("latitude must be between -90 and 90, got {0}")]
    InvalidLatitude(f64),
    #[error("{0} is not a finite number")]
    NonFinite(&'static str),
    #[error("refraction coefficient must be in [0, 1), got {0}")]
    InvalidRefraction(f64),
    #[error("negative {0} not allowed: {1}")]
    Negative(&'static str, f64),
    #[error("plausibility window must satisfy 0 < max, got {0} m")]
    InvalidWindow(f64),
    #[error("label interval must be 1..=1440 minutes, got {0}")]
    InvalidInterval(u32),
    #[error("unknown dip model: {0}")]
    UnknownDipModel(String),
    #[error("invalid fixed body: {0}")]
    InvalidBody(String),
}

// ===================== GEOPOINT =====================

/// A position on (or above) the reference ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    /// Geodetic latitude in degrees, [-90, 90]
    pub lat_deg: f64,
    /// Longitude in degrees, east positive; not wrapped
    pub lon_deg: f64,
    /// Height above the ellipsoid in meters
    pub elevation_m: f64,
}

impl GeoPoint {
    pub fn new(lat_deg: f64, lon_deg: f64, elevation_m: f64) -> Self {
        Self { lat_deg, lon_deg, elevation_m }
    }

    /// Check that the point can be fed into the numerical core.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.lat_deg.is_finite() {
            return Err(ConfigError::NonFinite("latitude"));
        }
        if !self.lon_deg.is_finite() {
            return Err(ConfigError::NonFinite("longitude"));
        }
        if !self.elevation_m.is_finite() {
            return Err(ConfigError::NonFinite("elevation"));
        }
        if !(-90.0..=90.0).contains(&self.lat_deg) {
            return Err(ConfigError::InvalidLatitude(self.lat_deg));
        }
        Ok(())
    }

    /// Same point with longitude wrapped into [-180, 180).
    pub fn normalized(&self) -> Self {
        Self { lon_deg: normalize_lon(self.lon_deg), ..*self }
    }
}

/// Where the user stands and how strongly the air bends the line of sight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObserverConfig {
    pub position: GeoPoint,
    /// Terrestrial refraction coefficient `k`, `0 <= k < 1`
    pub refraction_k: f64,
}

impl ObserverConfig {
    pub fn new(position: GeoPoint, refraction_k: f64) -> Self {
        Self { position, refraction_k }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.position.validate()?;
        if !self.refraction_k.is_finite() {
            return Err(ConfigError::NonFinite("refraction coefficient"));
        }
        if !(0.0..1.0).contains(&self.refraction_k) {
            return Err(ConfigError::InvalidRefraction(self.refraction_k));
        }
        Ok(())
    }
}

/// Wrap a longitude into [-180, 180). Display use only.
pub fn normalize_lon(lon_deg: f64) -> f64 {
    (lon_deg + 180.0).rem_euclid(360.0) - 180.0
}

// ===================== GEOMETRY FUNCTIONS =====================

/// Calculate Earth radius at a given latitude using WGS84 ellipsoid model.
///
/// # Arguments
/// * `lat_deg` - Latitude in degrees (-90 to 90)
///
/// # Returns
/// Geocentric Earth radius in meters at the specified latitude
pub fn earth_radius_wgs84(lat_deg: f64) -> f64 {
    let phi = lat_deg.to_radians();
    let (sin, cos) = phi.sin_cos();
    let a2 = A_EQUATOR * A_EQUATOR;
    let b2 = B_POLAR * B_POLAR;
    let numerator = a2 * a2 * cos * cos + b2 * b2 * sin * sin;
    let denominator = (A_EQUATOR * cos).powi(2) + (B_POLAR * sin).powi(2);
    (numerator / denominator).sqrt()
}

// ===================== HORIZON LIMIT =====================

/// Formula used for the dip of the visible horizon.
///
/// Pick one per computation pass; mixing them shifts the visibility limit by
/// a few arcminutes at mountain elevations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DipModel {
    /// `1.776' * sqrt(h)`, the navigator's rule including standard refraction
    Empirical,
    /// `acos(R / (R + h))` on the mean sphere
    #[default]
    Geometric,
}

impl FromStr for DipModel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "empirical" => Ok(DipModel::Empirical),
            "geometric" => Ok(DipModel::Geometric),
            other => Err(ConfigError::UnknownDipModel(other.to_string())),
        }
    }
}

/// Calculate horizon dip angle due to observer elevation.
///
/// The dip angle represents how far below the geometric horizon the apparent
/// horizon appears. Elevations at or below zero have no dip.
///
/// # Arguments
/// * `elevation_m` - Observer elevation in meters
/// * `model` - Dip formula
///
/// # Returns
/// Horizon dip angle in degrees, never negative
pub fn horizon_dip_deg(elevation_m: f64, model: DipModel) -> f64 {
    if elevation_m.is_nan() || elevation_m <= 0.0 {
        return 0.0;
    }
    match model {
        DipModel::Empirical => 1.776 * elevation_m.sqrt() / 60.0,
        DipModel::Geometric => {
            let ratio = MEAN_EARTH_RADIUS / (MEAN_EARTH_RADIUS + elevation_m);
            ratio.clamp(-1.0, 1.0).acos().to_degrees()
        }
    }
}

/// Angular allowance added below the dipped horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AngularMargin {
    /// Apparent semi-diameter of the body (0 for point sources)
    pub body_radius_deg: f64,
    /// Body-independent tolerance
    pub safety_deg: f64,
}

impl AngularMargin {
    pub fn new(body_radius_deg: f64, safety_deg: f64) -> Self {
        Self { body_radius_deg, safety_deg }
    }

    pub fn total(&self) -> f64 {
        self.body_radius_deg + self.safety_deg
    }
}

impl Default for AngularMargin {
    fn default() -> Self {
        Self { body_radius_deg: 0.0, safety_deg: DEFAULT_SAFETY_MARGIN_DEG }
    }
}

/// Lowest true altitude (degrees) at which a body still counts as visible.
pub fn visibility_limit_deg(elevation_m: f64, model: DipModel, margin: AngularMargin) -> f64 {
    -(horizon_dip_deg(elevation_m, model) + margin.total())
}

/// The one comparison used for visibility everywhere in the engine.
#[inline]
pub fn is_visible(altitude_deg: f64, limit_deg: f64) -> bool {
    altitude_deg > limit_deg
}

// ===================== TESTS =====================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_earth_radius_wgs84_reasonable() {
        let r_equator = earth_radius_wgs84(0.0);
        let r_pole = earth_radius_wgs84(90.0);

        assert_abs_diff_eq!(r_equator, A_EQUATOR, epsilon = 1e-6);
        assert_abs_diff_eq!(r_pole, B_POLAR, epsilon = 1e-6);
        assert!(r_equator > earth_radius_wgs84(45.0));
        assert!(earth_radius_wgs84(45.0) > r_pole);
    }

    #[test]
    fn test_dip_zero_at_or_below_ground() {
        for model in [DipModel::Empirical, DipModel::Geometric] {
            assert_eq!(horizon_dip_deg(0.0, model), 0.0);
            assert_eq!(horizon_dip_deg(-450.0, model), 0.0);
            assert_eq!(horizon_dip_deg(f64::NAN, model), 0.0);
        }
    }

    #[test]
    fn test_dip_strictly_increasing() {
        for model in [DipModel::Empirical, DipModel::Geometric] {
            let mut prev = 0.0;
            for h in [1.0, 10.0, 150.0, 1000.0, 3776.0, 8848.0] {
                let dip = horizon_dip_deg(h, model);
                assert!(dip > prev, "{model:?}: dip({h}) = {dip} not above {prev}");
                prev = dip;
            }
            assert!(horizon_dip_deg(150.0, model) < horizon_dip_deg(3776.0, model));
        }
    }

    #[test]
    fn test_dip_models_agree_roughly() {
        // The empirical rule folds in refraction, so it sits a little below geometry.
        let geo = horizon_dip_deg(3776.0, DipModel::Geometric);
        let emp = horizon_dip_deg(3776.0, DipModel::Empirical);
        assert!(geo > 1.9 && geo < 2.0, "geometric dip {geo}");
        assert!(emp > 1.7 && emp < geo, "empirical dip {emp}");
    }

    #[test]
    fn test_visibility_limit() {
        let margin = AngularMargin::new(SOLAR_RADIUS_DEG, 0.1);
        let limit = visibility_limit_deg(0.0, DipModel::Geometric, margin);
        assert_abs_diff_eq!(limit, -0.366, epsilon = 1e-12);
        assert!(is_visible(-0.3, limit));
        assert!(!is_visible(limit, limit));
    }

    #[test]
    fn test_validate_rejects_bad_points() {
        assert!(GeoPoint::new(35.36, 138.73, 3776.0).validate().is_ok());
        assert_eq!(
            GeoPoint::new(91.0, 0.0, 0.0).validate(),
            Err(ConfigError::InvalidLatitude(91.0))
        );
        assert_eq!(
            GeoPoint::new(f64::NAN, 0.0, 0.0).validate(),
            Err(ConfigError::NonFinite("latitude"))
        );
        // Longitude is not range-checked, only finiteness.
        assert!(GeoPoint::new(0.0, 540.0, 0.0).validate().is_ok());
    }

    #[test]
    fn test_observer_refraction_range() {
        let p = GeoPoint::new(35.0, 139.0, 150.0);
        assert!(ObserverConfig::new(p, 0.0).validate().is_ok());
        assert!(ObserverConfig::new(p, 0.13).validate().is_ok());
        assert_eq!(ObserverConfig::new(p, 1.0).validate(), Err(ConfigError::InvalidRefraction(1.0)));
        assert_eq!(
            ObserverConfig::new(p, -0.2).validate(),
            Err(ConfigError::InvalidRefraction(-0.2))
        );
    }

    #[test]
    fn test_normalize_lon() {
        assert_abs_diff_eq!(normalize_lon(190.0), -170.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_lon(-190.0), 170.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_lon(139.7), 139.7, epsilon = 1e-12);
    }

    #[test]
    fn test_dip_model_from_str() {
        assert_eq!("Geometric".parse::<DipModel>(), Ok(DipModel::Geometric));
        assert_eq!("empirical".parse::<DipModel>(), Ok(DipModel::Empirical));
        assert!("flat".parse::<DipModel>().is_err());
    }
}
