//! Command-Line Interface Module
//!
//! Handles argument parsing and validation for horizon-align.

use clap::Parser;

use crate::ephemeris::{Body, RefractionMode};
use crate::geo::{DipModel, GeoPoint, ObserverConfig};

// ===================== CLI =====================

#[derive(Parser, Debug)]
#[command(author, version, about = "Where to stand to see the Sun or Moon sit on a landmark")]
pub struct Args {
    /// Target landmark latitude in decimal degrees (-90 to 90)
    #[arg(long, allow_hyphen_values = true, value_parser = parse_latitude, env = "HORIZON_ALIGN_TARGET_LATITUDE")]
    pub target_latitude: f64,
    /// Target landmark longitude in decimal degrees (-180 to 180)
    #[arg(long, allow_hyphen_values = true, value_parser = parse_longitude, env = "HORIZON_ALIGN_TARGET_LONGITUDE")]
    pub target_longitude: f64,
    /// Target landmark elevation (meters)
    #[arg(long, allow_hyphen_values = true, value_parser = parse_elevation, env = "HORIZON_ALIGN_TARGET_ELEVATION")]
    pub target_elevation: f64,

    /// Observer latitude in decimal degrees (-90 to 90)
    #[arg(long, allow_hyphen_values = true, value_parser = parse_latitude, env = "HORIZON_ALIGN_LATITUDE")]
    pub latitude: f64,
    /// Observer longitude in decimal degrees (-180 to 180)
    #[arg(long, allow_hyphen_values = true, value_parser = parse_longitude, env = "HORIZON_ALIGN_LONGITUDE")]
    pub longitude: f64,
    /// Observer elevation above mean sea level (meters, may be negative)
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true, value_parser = parse_elevation, env = "HORIZON_ALIGN_ELEVATION")]
    pub elevation: f64,

    /// Terrestrial refraction coefficient k (0 = no refraction, 0.13 = standard)
    #[arg(long, default_value_t = 0.13, value_parser = parse_refraction, env = "HORIZON_ALIGN_REFRACTION")]
    pub refraction: f64,
    /// Report geometric altitudes (no atmospheric refraction on body positions)
    #[arg(long)]
    pub no_refraction: bool,

    /// Bodies to compute, comma separated catalog ids
    #[arg(long, value_delimiter = ',', default_value = "Sun,Moon", env = "HORIZON_ALIGN_BODIES")]
    pub bodies: Vec<String>,
    /// Extra fixed body as NAME:RA_HOURS:DEC_DEG (repeatable)
    #[arg(long = "fixed", value_parser = parse_fixed_body)]
    pub fixed: Vec<Body>,

    /// Date for calculations (e.g., "2024-12-25" or "today"); defaults to today
    #[arg(long)]
    pub date: Option<String>,
    /// Time of day (HH:MM[:SS[.fffffffff]] or "now"); defaults to now
    #[arg(long)]
    pub at: Option<String>,
    /// Time zone to use ("system", "location", or IANA time zone name)
    #[arg(long, default_value = "location", env = "HORIZON_ALIGN_TIMEZONE")]
    pub timezone: String,

    /// Horizon dip formula
    #[arg(long, default_value = "geometric", value_parser = ["geometric", "empirical"], env = "HORIZON_ALIGN_DIP_MODEL")]
    pub dip_model: String,
    /// Safety margin below the dipped horizon in degrees
    #[arg(long, default_value_t = crate::geo::DEFAULT_SAFETY_MARGIN_DEG, value_parser = parse_margin, env = "HORIZON_ALIGN_SAFETY_MARGIN")]
    pub safety_margin: f64,
    /// Farthest accepted observer distance from the target (km)
    #[arg(long, default_value_t = 350.0, value_parser = parse_positive_f64, env = "HORIZON_ALIGN_MAX_DISTANCE_KM")]
    pub max_distance_km: f64,
    /// Minutes between time labels on today's locus
    #[arg(long, default_value_t = 10, value_parser = parse_label_interval, env = "HORIZON_ALIGN_LABEL_EVERY")]
    pub label_every: u32,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
    /// List every projected point of today's locus
    #[arg(long)]
    pub points: bool,
}

impl Args {
    pub fn observer(&self) -> ObserverConfig {
        ObserverConfig::new(GeoPoint::new(self.latitude, self.longitude, self.elevation), self.refraction)
    }

    pub fn target(&self) -> GeoPoint {
        GeoPoint::new(self.target_latitude, self.target_longitude, self.target_elevation)
    }

    pub fn refraction_mode(&self) -> RefractionMode {
        if self.no_refraction { RefractionMode::Off } else { RefractionMode::Normal }
    }

    pub fn dip_model(&self) -> Result<DipModel, crate::geo::ConfigError> {
        self.dip_model.parse()
    }

    /// Catalog bodies named by `--bodies`, then every `--fixed` body.
    pub fn body_list(&self) -> Result<Vec<Body>, String> {
        let mut bodies = Vec::with_capacity(self.bodies.len() + self.fixed.len());
        for id in self.bodies.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            bodies.push(Body::from_catalog(id).ok_or_else(|| format!("Unknown body: {}", id))?);
        }
        bodies.extend(self.fixed.iter().cloned());
        Ok(bodies)
    }
}

// ===================== CLI VALUE PARSERS =====================

fn parse_latitude(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("Invalid number: {}", s))?;
    if !(-90.0..=90.0).contains(&v) {
        return Err(format!("Latitude must be between -90 and 90, got {}", v));
    }
    Ok(v)
}

fn parse_longitude(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("Invalid number: {}", s))?;
    if !(-180.0..=180.0).contains(&v) {
        return Err(format!("Longitude must be between -180 and 180, got {}", v));
    }
    Ok(v)
}

fn parse_elevation(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("Invalid number: {}", s))?;
    if !(-500.0..=9000.0).contains(&v) {
        return Err(format!("Elevation must be between -500 and 9000 meters, got {}", v));
    }
    Ok(v)
}

fn parse_refraction(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("Invalid number: {}", s))?;
    if !(0.0..1.0).contains(&v) {
        return Err(format!("Refraction coefficient must be in [0, 1), got {}", v));
    }
    Ok(v)
}

fn parse_margin(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("Invalid number: {}", s))?;
    if !(0.0..=5.0).contains(&v) {
        return Err(format!("Safety margin must be between 0 and 5 degrees, got {}", v));
    }
    Ok(v)
}

fn parse_positive_f64(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("Invalid number: {}", s))?;
    if !v.is_finite() || v <= 0.0 {
        return Err(format!("Value must be positive, got {}", v));
    }
    Ok(v)
}

fn parse_label_interval(s: &str) -> Result<u32, String> {
    let v: u32 = s.parse().map_err(|_| format!("Invalid integer: {}", s))?;
    if !(1..=1440).contains(&v) {
        return Err(format!("Label interval must be between 1 and 1440 minutes, got {}", v));
    }
    Ok(v)
}

fn parse_fixed_body(s: &str) -> Result<Body, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 || parts[0].trim().is_empty() {
        return Err(format!("Fixed body must be NAME:RA_HOURS:DEC_DEG (e.g., 'Vega:18.6156:38.7837'), got '{}'", s));
    }
    let ra: f64 = parts[1].parse().map_err(|_| format!("Invalid right ascension: {}", parts[1]))?;
    let dec: f64 = parts[2].parse().map_err(|_| format!("Invalid declination: {}", parts[2]))?;
    if !(0.0..24.0).contains(&ra) {
        return Err(format!("Right ascension must be in [0, 24) hours, got {}", ra));
    }
    if !(-90.0..=90.0).contains(&dec) {
        return Err(format!("Declination must be between -90 and 90, got {}", dec));
    }
    Ok(Body::fixed(parts[0].trim(), ra, dec))
}

// ===================== TESTS =====================
