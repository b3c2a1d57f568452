//! Ellipsoidal Geodesic Solver
//!
//! Three ways of laying a line on the Earth, each with its own job:
//!
//! - [`direct`]: Vincenty's direct problem on WGS84. Used to project every
//!   alignment sample from the target landmark, where positional accuracy
//!   matters.
//! - [`great_circle_path`]: evenly spaced points along the spherical shortest
//!   path, for the observer-to-target overlay.
//! - [`rhumb_destination`]: constant-bearing ray, for simple direction lines.
//!
//! [`inverse`] solves the reverse problem and is used for the overlay length
//! and to verify projections.

use std::f64::consts::PI;

use log::debug;
use serde::Serialize;

use crate::geo::{A_EQUATOR, GeoPoint, MEAN_EARTH_RADIUS};

// ===================== CONSTANTS =====================

/// WGS84 flattening
pub const FLATTENING: f64 = 1.0 / 298.257_223_563;

/// Convergence threshold on the auxiliary-sphere arc (radians)
const SIGMA_TOLERANCE: f64 = 1e-12;

/// Iteration cap for both Vincenty problems
const MAX_ITERATIONS: usize = 100;

/// Default spacing between great-circle points (meters)
pub const DEFAULT_GREAT_CIRCLE_SPACING_M: f64 = 1_000.0;

fn semi_minor() -> f64 {
    A_EQUATOR * (1.0 - FLATTENING)
}

// ===================== TYPES =====================

/// Result of the direct problem.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DirectSolution {
    /// Destination; the origin itself if the iteration did not converge
    pub point: GeoPoint,
    /// Forward azimuth at the destination, degrees [0, 360)
    pub final_bearing_deg: f64,
    /// `false` when the solver hit its iteration cap
    pub converged: bool,
}

/// Result of the inverse problem.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InverseSolution {
    /// Ellipsoidal distance in meters
    pub distance_m: f64,
    /// Azimuth at the first point, degrees [0, 360)
    pub initial_bearing_deg: f64,
    /// Forward azimuth at the second point, degrees [0, 360)
    pub final_bearing_deg: f64,
}

fn wrap_bearing(rad: f64) -> f64 {
    rad.to_degrees().rem_euclid(360.0)
}

/// Reduced latitude as (sin U, cos U, tan U).
fn reduced_latitude(lat_rad: f64) -> (f64, f64, f64) {
    let tan_u = (1.0 - FLATTENING) * lat_rad.tan();
    let cos_u = 1.0 / (1.0 + tan_u * tan_u).sqrt();
    (tan_u * cos_u, cos_u, tan_u)
}

/// Vincenty series coefficients A and B for a given u².
fn series_ab(u_sq: f64) -> (f64, f64) {
    let a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
    let b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
    (a, b)
}

fn delta_sigma(b: f64, sin_sigma: f64, cos_sigma: f64, cos_2sm: f64) -> f64 {
    let cos_2sm_sq = cos_2sm * cos_2sm;
    b * sin_sigma
        * (cos_2sm
            + b / 4.0
                * (cos_sigma * (-1.0 + 2.0 * cos_2sm_sq)
                    - b / 6.0
                        * cos_2sm
                        * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                        * (-3.0 + 4.0 * cos_2sm_sq)))
}

// ===================== DIRECT PROBLEM =====================

/// Solve the direct geodesic problem on the WGS84 ellipsoid.
///
/// # Arguments
/// * `origin` - Start point; its elevation is carried to the destination
/// * `bearing_deg` - Initial azimuth, clockwise from true north
/// * `distance_m` - Ellipsoidal distance, must be non-negative
///
/// # Returns
/// `None` for invalid input (non-finite values, negative distance, latitude
/// out of range). When the iteration fails to converge the origin is returned
/// with `converged == false`; consumers should read a repeated origin as lost
/// precision rather than a real position.
pub fn direct(origin: GeoPoint, bearing_deg: f64, distance_m: f64) -> Option<DirectSolution> {
    solve_direct(origin, bearing_deg, distance_m, MAX_ITERATIONS)
}

/// [`direct`] with an explicit cap on the σ iteration.
pub(crate) fn solve_direct(
    origin: GeoPoint,
    bearing_deg: f64,
    distance_m: f64,
    max_iterations: usize,
) -> Option<DirectSolution> {
    if origin.validate().is_err() || !bearing_deg.is_finite() || !distance_m.is_finite() {
        return None;
    }
    if distance_m < 0.0 {
        return None;
    }

    let b_axis = semi_minor();
    let alpha1 = bearing_deg.to_radians();
    let (sin_alpha1, cos_alpha1) = alpha1.sin_cos();
    let (sin_u1, cos_u1, tan_u1) = reduced_latitude(origin.lat_deg.to_radians());

    let sigma1 = tan_u1.atan2(cos_alpha1);
    let sin_alpha = cos_u1 * sin_alpha1;
    let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
    let u_sq = cos_sq_alpha * (A_EQUATOR * A_EQUATOR - b_axis * b_axis) / (b_axis * b_axis);
    let (a_coef, b_coef) = series_ab(u_sq);

    let sigma0 = distance_m / (b_axis * a_coef);
    let mut sigma = sigma0;
    let mut converged = false;
    for _ in 0..max_iterations {
        let cos_2sm = (2.0 * sigma1 + sigma).cos();
        let (sin_sigma, cos_sigma) = sigma.sin_cos();
        let next = sigma0 + delta_sigma(b_coef, sin_sigma, cos_sigma, cos_2sm);
        let done = (next - sigma).abs() < SIGMA_TOLERANCE;
        sigma = next;
        if done {
            converged = true;
            break;
        }
    }

    if !converged || !sigma.is_finite() {
        debug!(
            "direct geodesic did not converge from ({:.6}, {:.6}) bearing {:.3} distance {:.1}",
            origin.lat_deg, origin.lon_deg, bearing_deg, distance_m
        );
        return Some(DirectSolution { point: origin, final_bearing_deg: bearing_deg, converged: false });
    }

    let cos_2sm = (2.0 * sigma1 + sigma).cos();
    let (sin_sigma, cos_sigma) = sigma.sin_cos();
    let x = sin_u1 * sin_sigma - cos_u1 * cos_sigma * cos_alpha1;
    let lat2 = (sin_u1 * cos_sigma + cos_u1 * sin_sigma * cos_alpha1)
        .atan2((1.0 - FLATTENING) * (sin_alpha * sin_alpha + x * x).sqrt());
    let lambda = (sin_sigma * sin_alpha1).atan2(cos_u1 * cos_sigma - sin_u1 * sin_sigma * cos_alpha1);
    let c = FLATTENING / 16.0 * cos_sq_alpha * (4.0 + FLATTENING * (4.0 - 3.0 * cos_sq_alpha));
    let l = lambda
        - (1.0 - c)
            * FLATTENING
            * sin_alpha
            * (sigma
                + c * sin_sigma * (cos_2sm + c * cos_sigma * (-1.0 + 2.0 * cos_2sm * cos_2sm)));

    let point = GeoPoint::new(lat2.to_degrees(), origin.lon_deg + l.to_degrees(), origin.elevation_m);
    Some(DirectSolution { point, final_bearing_deg: wrap_bearing(sin_alpha.atan2(-x)), converged: true })
}

// ===================== INVERSE PROBLEM =====================

/// Solve the inverse geodesic problem on the WGS84 ellipsoid.
///
/// # Returns
/// Distance and azimuths between the two points, or `None` for invalid input
/// or nearly antipodal points where the iteration does not converge
pub fn inverse(p1: GeoPoint, p2: GeoPoint) -> Option<InverseSolution> {
    if p1.validate().is_err() || p2.validate().is_err() {
        return None;
    }

    let b_axis = semi_minor();
    let l = ((p2.lon_deg - p1.lon_deg + 540.0).rem_euclid(360.0) - 180.0).to_radians();
    let (sin_u1, cos_u1, _) = reduced_latitude(p1.lat_deg.to_radians());
    let (sin_u2, cos_u2, _) = reduced_latitude(p2.lat_deg.to_radians());

    let mut lambda = l;
    let mut converged = false;
    let (mut sin_sigma, mut cos_sigma, mut sigma) = (0.0, 1.0, 0.0);
    let (mut cos_sq_alpha, mut cos_2sm) = (1.0, 0.0);
    let (mut sin_lambda, mut cos_lambda) = (0.0, 1.0);

    for _ in 0..MAX_ITERATIONS {
        (sin_lambda, cos_lambda) = lambda.sin_cos();
        let t1 = cos_u2 * sin_lambda;
        let t2 = cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda;
        sin_sigma = (t1 * t1 + t2 * t2).sqrt();
        if sin_sigma == 0.0 {
            return Some(InverseSolution {
                distance_m: 0.0,
                initial_bearing_deg: 0.0,
                final_bearing_deg: 0.0,
            });
        }
        cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        // Equatorial line: cos²α = 0
        cos_2sm = if cos_sq_alpha != 0.0 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        } else {
            0.0
        };
        let c = FLATTENING / 16.0 * cos_sq_alpha * (4.0 + FLATTENING * (4.0 - 3.0 * cos_sq_alpha));
        let prev = lambda;
        lambda = l
            + (1.0 - c)
                * FLATTENING
                * sin_alpha
                * (sigma
                    + c * sin_sigma * (cos_2sm + c * cos_sigma * (-1.0 + 2.0 * cos_2sm * cos_2sm)));
        // Nearly antipodal: the longitude iteration runs away
        if lambda.abs() > PI {
            break;
        }
        if (lambda - prev).abs() < SIGMA_TOLERANCE {
            converged = true;
            break;
        }
    }

    if !converged {
        debug!(
            "inverse geodesic did not converge between ({:.6}, {:.6}) and ({:.6}, {:.6})",
            p1.lat_deg, p1.lon_deg, p2.lat_deg, p2.lon_deg
        );
        return None;
    }

    let u_sq = cos_sq_alpha * (A_EQUATOR * A_EQUATOR - b_axis * b_axis) / (b_axis * b_axis);
    let (a_coef, b_coef) = series_ab(u_sq);
    let distance_m = b_axis * a_coef * (sigma - delta_sigma(b_coef, sin_sigma, cos_sigma, cos_2sm));

    let alpha1 = (cos_u2 * sin_lambda).atan2(cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda);
    let alpha2 = (cos_u1 * sin_lambda).atan2(-sin_u1 * cos_u2 + cos_u1 * sin_u2 * cos_lambda);

    Some(InverseSolution {
        distance_m,
        initial_bearing_deg: wrap_bearing(alpha1),
        final_bearing_deg: wrap_bearing(alpha2),
    })
}

// ===================== GREAT CIRCLE =====================

fn unit_vector(p: &GeoPoint) -> [f64; 3] {
    let (sin_lat, cos_lat) = p.lat_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = p.lon_deg.to_radians().sin_cos();
    [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat]
}

/// Central angle between two points by the spherical law of cosines (radians).
pub fn central_angle_rad(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let (phi1, phi2) = (p1.lat_deg.to_radians(), p2.lat_deg.to_radians());
    let dl = (p2.lon_deg - p1.lon_deg).to_radians();
    (phi1.sin() * phi2.sin() + phi1.cos() * phi2.cos() * dl.cos()).clamp(-1.0, 1.0).acos()
}

/// Evenly spaced points along the great circle from `p1` to `p2`.
///
/// Points are spherical-linear interpolations of the endpoint unit vectors,
/// roughly one per `spacing_m` of arc on the mean sphere. Both endpoints are
/// always included; elevation is interpolated linearly. Coincident or
/// antipodal endpoints (undefined great circle) yield just the two endpoints.
pub fn great_circle_path(p1: GeoPoint, p2: GeoPoint, spacing_m: f64) -> Vec<GeoPoint> {
    if p1.validate().is_err() || p2.validate().is_err() || spacing_m.is_nan() || spacing_m <= 0.0 {
        return Vec::new();
    }

    let c = central_angle_rad(&p1, &p2);
    let sin_c = c.sin();
    if c < 1e-12 || sin_c.abs() < 1e-12 {
        return vec![p1, p2];
    }

    let steps = ((MEAN_EARTH_RADIUS * c / spacing_m).ceil() as usize).max(1);
    let v1 = unit_vector(&p1);
    let v2 = unit_vector(&p2);

    (0..=steps)
        .map(|i| {
            if i == 0 {
                return p1;
            }
            if i == steps {
                return p2;
            }
            let t = i as f64 / steps as f64;
            let w1 = ((1.0 - t) * c).sin() / sin_c;
            let w2 = (t * c).sin() / sin_c;
            let v = [w1 * v1[0] + w2 * v2[0], w1 * v1[1] + w2 * v2[1], w1 * v1[2] + w2 * v2[2]];
            let lat = v[2].atan2((v[0] * v[0] + v[1] * v[1]).sqrt());
            let lon = v[1].atan2(v[0]);
            let elevation = p1.elevation_m + t * (p2.elevation_m - p1.elevation_m);
            GeoPoint::new(lat.to_degrees(), lon.to_degrees(), elevation)
        })
        .collect()
}

// ===================== RHUMB LINE =====================

/// Destination along a constant-bearing (loxodrome) line on the mean sphere.
///
/// Latitude advances linearly with distance; longitude advances by the
/// Mercator-stretched amount. For east/west courses the isometric-latitude
/// difference vanishes and `cos(latitude)` is used as the scale factor.
pub fn rhumb_destination(origin: GeoPoint, bearing_deg: f64, distance_m: f64) -> Option<GeoPoint> {
    if origin.validate().is_err() || !bearing_deg.is_finite() || !distance_m.is_finite() {
        return None;
    }
    if distance_m < 0.0 {
        return None;
    }

    let delta = distance_m / MEAN_EARTH_RADIUS;
    let theta = bearing_deg.to_radians();
    let phi1 = origin.lat_deg.to_radians();

    let d_phi = delta * theta.cos();
    let mut phi2 = phi1 + d_phi;
    // Passing over a pole
    if phi2.abs() > PI / 2.0 {
        phi2 = if phi2 > 0.0 { PI - phi2 } else { -PI - phi2 };
    }

    let d_psi = ((phi2 / 2.0 + PI / 4.0).tan() / (phi1 / 2.0 + PI / 4.0).tan()).ln();
    let q = if d_psi.abs() > 1e-12 { d_phi / d_psi } else { phi1.cos() };
    let d_lambda = delta * theta.sin() / q;

    Some(GeoPoint::new(
        phi2.to_degrees(),
        origin.lon_deg + d_lambda.to_degrees(),
        origin.elevation_m,
    ))
}

// ===================== TESTS =====================
