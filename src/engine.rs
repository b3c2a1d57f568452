//! Alignment Engine
//!
//! One pure computation pass: everything the caller needs to draw the
//! alignment map for a given [`EngineInput`]. Nothing is kept between calls.

use chrono::DateTime;
use chrono_tz::Tz;
use log::{debug, warn};
use serde::Serialize;

use crate::ephemeris::{Body, Ephemeris, Horizontal, RefractionMode, moon_age_days};
use crate::geo::{ConfigError, DipModel, GeoPoint, ObserverConfig, earth_radius_wgs84};
use crate::geodesic::{self, DEFAULT_GREAT_CIRCLE_SPACING_M};
use crate::inverter::PlausibilityWindow;
use crate::riseset::{RiseSetResult, find_rise_set};
use crate::sampler::{LocusParams, sample_locus};
use crate::segment::{DEFAULT_SPLIT_THRESHOLD_DEG, DayRole, PathSegment, project_segments, split_by_azimuth};
use crate::time::start_of_day;

/// Length of the current-direction ray in meters
pub const DIRECTION_RAY_LENGTH_M: f64 = 5_000_000.0;

/// Default spacing of time labels along the current-day locus
pub const DEFAULT_LABEL_EVERY_MIN: u32 = 10;

// ===================== INPUT =====================

/// Everything one computation pass depends on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineInput {
    pub observer: ObserverConfig,
    pub target: GeoPoint,
    pub bodies: Vec<Body>,
    /// Instant of interest; its timezone defines the reference days
    pub instant: DateTime<Tz>,
    pub dip_model: DipModel,
    pub safety_margin_deg: f64,
    pub window: PlausibilityWindow,
    pub split_threshold_deg: f64,
    pub label_every_min: u32,
    pub refraction: RefractionMode,
}

impl EngineInput {
    /// Input with the Sun and Moon and default tuning.
    pub fn new(observer: ObserverConfig, target: GeoPoint, instant: DateTime<Tz>) -> Self {
        Self {
            observer,
            target,
            bodies: vec![Body::sun(), Body::moon()],
            instant,
            dip_model: DipModel::default(),
            safety_margin_deg: crate::geo::DEFAULT_SAFETY_MARGIN_DEG,
            window: PlausibilityWindow::default(),
            split_threshold_deg: DEFAULT_SPLIT_THRESHOLD_DEG,
            label_every_min: DEFAULT_LABEL_EVERY_MIN,
            refraction: RefractionMode::default(),
        }
    }

    pub fn with_bodies(mut self, bodies: Vec<Body>) -> Self {
        self.bodies = bodies;
        self
    }

    pub fn with_dip_model(mut self, dip_model: DipModel) -> Self {
        self.dip_model = dip_model;
        self
    }

    pub fn with_window(mut self, window: PlausibilityWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_label_every(mut self, minutes: u32) -> Self {
        self.label_every_min = minutes;
        self
    }

    /// Reject anything that would feed NaN or nonsense into the numerical core.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.observer.validate()?;
        self.target.validate()?;
        if !self.safety_margin_deg.is_finite() {
            return Err(ConfigError::NonFinite("safety margin"));
        }
        if self.safety_margin_deg < 0.0 {
            return Err(ConfigError::Negative("safety margin", self.safety_margin_deg));
        }
        if !self.window.max_m.is_finite() || self.window.max_m <= 0.0 {
            return Err(ConfigError::InvalidWindow(self.window.max_m));
        }
        if !self.split_threshold_deg.is_finite() {
            return Err(ConfigError::NonFinite("split threshold"));
        }
        if self.split_threshold_deg < 0.0 {
            return Err(ConfigError::Negative("split threshold", self.split_threshold_deg));
        }
        if !(1..=1440).contains(&self.label_every_min) {
            return Err(ConfigError::InvalidInterval(self.label_every_min));
        }
        for body in &self.bodies {
            if let crate::ephemeris::BodyLookup::Fixed { position } = &body.lookup
                && !(position.ra_hours.is_finite() && (-90.0..=90.0).contains(&position.dec_deg))
            {
                return Err(ConfigError::InvalidBody(body.id.clone()));
            }
        }
        Ok(())
    }

    fn locus_params(&self) -> LocusParams {
        LocusParams {
            dip_model: self.dip_model,
            safety_margin_deg: self.safety_margin_deg,
            window: self.window,
            refraction: self.refraction,
        }
    }
}

// ===================== OUTPUT =====================

/// Ray from the observer toward the body's current azimuth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionRay {
    pub from: GeoPoint,
    pub to: GeoPoint,
    pub azimuth_deg: f64,
    pub below_horizon: bool,
}

/// Informational great-circle overlay between observer and target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortestPath {
    pub points: Vec<GeoPoint>,
    /// Ellipsoidal length; absent if the inverse solver did not converge
    pub distance_m: Option<f64>,
    pub initial_bearing_deg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyReport {
    pub body: Body,
    /// Position at the observer at the input instant
    pub current: Option<Horizontal>,
    pub rise_set: RiseSetResult,
    pub direction_ray: Option<DirectionRay>,
    /// Locus arcs for the previous, current and next reference days
    pub segments: Vec<PathSegment>,
}

impl BodyReport {
    pub fn segments_for(&self, role: DayRole) -> impl Iterator<Item = &PathSegment> {
        self.segments.iter().filter(move |s| s.style.role == role)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineOutput {
    pub instant: DateTime<Tz>,
    /// Local midnight of the current reference day
    pub day_start: DateTime<Tz>,
    pub lunar_phase_deg: Option<f64>,
    pub moon_age_days: Option<f64>,
    pub bodies: Vec<BodyReport>,
    pub shortest_path: ShortestPath,
}

// ===================== COMPUTATION =====================

/// Run one full computation pass.
///
/// # Arguments
/// * `ephemeris` - Position source
/// * `input` - Observer, target, bodies, instant and tuning
///
/// # Returns
/// Geometry and events per body, or the configuration error that stopped the
/// pass before any math ran
pub fn compute<E: Ephemeris + ?Sized>(ephemeris: &E, input: &EngineInput) -> Result<EngineOutput, ConfigError> {
    input.validate()?;

    let tz = input.instant.timezone();
    let date = input.instant.date_naive();
    let day_start = start_of_day(date, &tz);
    let days: Vec<(DayRole, DateTime<Tz>)> = [
        (DayRole::Previous, date.pred_opt()),
        (DayRole::Current, Some(date)),
        (DayRole::Next, date.succ_opt()),
    ]
    .into_iter()
    .filter_map(|(role, d)| d.map(|d| (role, start_of_day(d, &tz))))
    .collect();

    debug!(
        "pass for {} ({} bodies), local earth radius at target {:.0} m",
        input.instant,
        input.bodies.len(),
        earth_radius_wgs84(input.target.lat_deg)
    );

    let params = input.locus_params();
    let observer = &input.observer.position;
    let bodies = input
        .bodies
        .iter()
        .map(|body| {
            let current = match ephemeris.horizontal_position(body, &input.instant, observer, input.refraction) {
                Ok(pos) => Some(pos),
                Err(e) => {
                    warn!("{}: no current position: {}", body.id, e);
                    None
                }
            };
            let rise_set = find_rise_set(ephemeris, body, observer, &day_start, input.refraction);
            let direction_ray = current.and_then(|pos| direction_ray(observer, &pos));

            let mut segments = Vec::new();
            for (role, start) in &days {
                let samples = sample_locus(ephemeris, body, &input.target, &input.observer, start, &params);
                let groups = split_by_azimuth(&samples, input.split_threshold_deg);
                let projected = project_segments(&groups, &input.target, *role, input.label_every_min);
                debug!(
                    "{} {:?}: {} samples, {} segments",
                    body.id,
                    role,
                    samples.len(),
                    projected.len()
                );
                segments.extend(projected);
            }

            BodyReport { body: body.clone(), current, rise_set, direction_ray, segments }
        })
        .collect();

    let lunar_phase_deg = match ephemeris.lunar_phase_angle(&input.instant) {
        Ok(phase) => Some(phase),
        Err(e) => {
            warn!("lunar phase unavailable: {}", e);
            None
        }
    };

    Ok(EngineOutput {
        instant: input.instant,
        day_start,
        lunar_phase_deg,
        moon_age_days: lunar_phase_deg.map(moon_age_days),
        bodies,
        shortest_path: shortest_path(observer, &input.target),
    })
}

/// Constant-bearing ray from the observer toward the body's azimuth.
pub fn direction_ray(observer: &GeoPoint, position: &Horizontal) -> Option<DirectionRay> {
    let to = geodesic::rhumb_destination(*observer, position.azimuth_deg, DIRECTION_RAY_LENGTH_M)?;
    Some(DirectionRay {
        from: *observer,
        to,
        azimuth_deg: position.azimuth_deg,
        below_horizon: position.altitude_deg < 0.0,
    })
}

/// Great-circle polyline between observer and target, with its ellipsoidal length.
pub fn shortest_path(observer: &GeoPoint, target: &GeoPoint) -> ShortestPath {
    let points = geodesic::great_circle_path(*observer, *target, DEFAULT_GREAT_CIRCLE_SPACING_M);
    let inverse = geodesic::inverse(*observer, *target);
    ShortestPath {
        points,
        distance_m: inverse.as_ref().map(|s| s.distance_m),
        initial_bearing_deg: inverse.as_ref().map(|s| s.initial_bearing_deg),
    }
}

// ===================== TESTS =====================
