//! Path Segmenter & Projector
//!
//! Splits a day's locus samples into continuous arcs and projects them onto
//! the ellipsoid, anchored at the target landmark.

use chrono::{DateTime, Timelike};
use chrono_tz::Tz;
use serde::Serialize;

use crate::geo::GeoPoint;
use crate::geodesic::{self, DirectSolution};
use crate::sampler::HorizonSample;

/// Azimuth jump between consecutive samples that starts a new segment
pub const DEFAULT_SPLIT_THRESHOLD_DEG: f64 = 5.0;

/// Split ordered samples wherever the azimuth jumps by more than `threshold_deg`.
///
/// The comparison is a plain absolute difference, so a wrap through north
/// (359° to 1°) also splits.
pub fn split_by_azimuth(samples: &[HorizonSample], threshold_deg: f64) -> Vec<&[HorizonSample]> {
    let mut groups = Vec::new();
    let mut start = 0;
    for i in 1..samples.len() {
        if (samples[i].azimuth_deg - samples[i - 1].azimuth_deg).abs() > threshold_deg {
            groups.push(&samples[start..i]);
            start = i;
        }
    }
    if start < samples.len() {
        groups.push(&samples[start..]);
    }
    groups
}

/// Which of the three reference days a segment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayRole {
    Previous,
    Current,
    Next,
}

/// Presentation-neutral hints; the output layer turns these into strokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PathStyle {
    pub role: DayRole,
    /// Adjacent days are drawn thinner and lighter
    pub faint: bool,
    /// Carries time markers
    pub labeled: bool,
}

impl PathStyle {
    pub fn for_role(role: DayRole) -> Self {
        let current = role == DayRole::Current;
        Self { role, faint: !current, labeled: current }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeMarker {
    pub point: GeoPoint,
    /// Local time as `HH:MM`
    pub label: String,
    pub time: DateTime<Tz>,
}

/// One continuous projected arc of the alignment locus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathSegment {
    pub points: Vec<GeoPoint>,
    pub markers: Vec<TimeMarker>,
    pub style: PathStyle,
    /// At least one point fell back to the target because the geodesic did not converge
    pub degraded: bool,
}

/// Project sample groups into map polylines.
///
/// Each sample lands at `direct(target, (azimuth + 180) mod 360, distance)`,
/// i.e. back along the line of sight from the landmark. Only the current day
/// gets markers, one at every sample whose local minute of day is a multiple
/// of `label_every_min`.
pub fn project_segments(
    groups: &[&[HorizonSample]],
    target: &GeoPoint,
    role: DayRole,
    label_every_min: u32,
) -> Vec<PathSegment> {
    project_with(groups, target, role, label_every_min, geodesic::direct)
}

fn project_with<S>(
    groups: &[&[HorizonSample]],
    target: &GeoPoint,
    role: DayRole,
    label_every_min: u32,
    solve: S,
) -> Vec<PathSegment>
where
    S: Fn(GeoPoint, f64, f64) -> Option<DirectSolution>,
{
    let style = PathStyle::for_role(role);
    let every = label_every_min.max(1);

    groups
        .iter()
        .filter(|g| !g.is_empty())
        .map(|group| {
            let mut segment =
                PathSegment { points: Vec::with_capacity(group.len()), markers: Vec::new(), style, degraded: false };
            for sample in group.iter() {
                let bearing = (sample.azimuth_deg + 180.0).rem_euclid(360.0);
                let Some(sol) = solve(*target, bearing, sample.distance_m) else {
                    continue;
                };
                segment.degraded |= !sol.converged;
                segment.points.push(sol.point);

                let minute = sample.time.hour() * 60 + sample.time.minute();
                if style.labeled && minute % every == 0 {
                    segment.markers.push(TimeMarker {
                        point: sol.point,
                        label: sample.time.format("%H:%M").to_string(),
                        time: sample.time,
                    });
                }
            }
            segment
        })
        .filter(|s| !s.points.is_empty())
        .collect()
}

// ===================== TESTS =====================
