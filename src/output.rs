//! Output Formatting Module
//!
//! Turns engine geometry into drawing hints and prints the terminal or JSON
//! report. Body colors and dash patterns live here, not in the engine.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::engine::{BodyReport, EngineInput, EngineOutput};
use crate::ephemeris::Body;
use crate::geo::normalize_lon;
use crate::riseset::{RiseSetResult, minute_of_day};
use crate::segment::{DayRole, PathStyle};
use crate::time::format_hms;

/// Dash pattern for dashed strokes
pub const DASH_ARRAY: &str = "10, 10";

/// Opacity of anything pointing at a body below the horizon
pub const BELOW_HORIZON_OPACITY: f64 = 0.3;

// ===================== STYLES =====================

/// How a body is drawn. Chosen by the user, never read by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BodyStyle {
    /// CSS color, e.g. `#FFA500`
    pub color: String,
    pub dashed: bool,
}

impl BodyStyle {
    pub fn new(color: &str, dashed: bool) -> Self {
        Self { color: color.to_string(), dashed }
    }
}

/// Default style for a catalog id; unknown (custom) bodies are dashed gray.
pub fn default_style(body_id: &str) -> BodyStyle {
    let (color, dashed) = match body_id {
        "Sun" => ("#FFA500", false),
        "Moon" => ("#FFFF00", false),
        "Mercury" => ("#0000FF", true),
        "Venus" => ("#FFFF00", false),
        "Mars" => ("#FF0000", false),
        "Jupiter" => ("#A52A2A", false),
        "Saturn" => ("#ADFF2F", false),
        "Uranus" => ("#0000FF", true),
        "Neptune" => ("#4B0082", true),
        "Pluto" => ("#800080", true),
        "Polaris" => ("#000000", true),
        _ => ("#808080", true),
    };
    BodyStyle::new(color, dashed)
}

/// Everything a renderer needs to draw one polyline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrokeHints {
    pub color: String,
    pub dash_array: Option<&'static str>,
    pub opacity: f64,
    pub weight: f64,
}

/// Stroke for a locus segment. Adjacent days are thinner and lighter.
pub fn stroke_for(body: &BodyStyle, path: &PathStyle) -> StrokeHints {
    let (opacity, weight) = if path.faint { (0.5, 1.5) } else { (1.0, 3.0) };
    StrokeHints {
        color: body.color.clone(),
        dash_array: body.dashed.then_some(DASH_ARRAY),
        opacity,
        weight,
    }
}

/// Stroke for the current-direction ray.
pub fn ray_stroke(body: &BodyStyle, altitude_deg: f64) -> StrokeHints {
    StrokeHints {
        color: body.color.clone(),
        dash_array: body.dashed.then_some(DASH_ARRAY),
        opacity: if altitude_deg < 0.0 { BELOW_HORIZON_OPACITY } else { 1.0 },
        weight: 3.0,
    }
}

// ===================== JSON OUTPUT =====================

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    output: &'a EngineOutput,
    styles: BTreeMap<&'a str, BodyStyle>,
}

/// Engine output plus the default style of every body, as pretty JSON.
pub fn to_json(output: &EngineOutput) -> serde_json::Result<String> {
    let styles = output.bodies.iter().map(|r| (r.body.id.as_str(), default_style(&r.body.id))).collect();
    serde_json::to_string_pretty(&JsonReport { output, styles })
}

// ===================== TERMINAL OUTPUT =====================

/// How long the body stays up, when both events fall on the reference day.
pub fn visible_for(rise_set: &RiseSetResult) -> Option<String> {
    match rise_set {
        RiseSetResult::Regular { rise: Some(rise), set: Some(set) } if set > rise => {
            Some(format_hms((*set - *rise).num_seconds()))
        }
        RiseSetResult::Circumpolar => Some("all day".to_string()),
        _ => None,
    }
}

/// Print the full terminal report.
///
/// # Arguments
/// * `input` - The input the pass was computed from
/// * `output` - Result of the pass
/// * `show_points` - Also list every projected point
pub fn print_report(input: &EngineInput, output: &EngineOutput, show_points: bool) {
    let obs = input.observer.position.normalized();
    let target = input.target.normalized();
    println!(
        "Observer : lat={:.6}, lon={:.6}, elev={:.0} m (k={:.2})",
        obs.lat_deg, obs.lon_deg, obs.elevation_m, input.observer.refraction_k
    );
    println!("Target   : lat={:.6}, lon={:.6}, elev={:.0} m", target.lat_deg, target.lon_deg, target.elevation_m);
    println!("Date     : {}", output.instant.format("%Y-%m-%d %H:%M:%S %Z"));
    if let (Some(d), Some(b)) = (output.shortest_path.distance_m, output.shortest_path.initial_bearing_deg) {
        println!("Distance : {:.1} km, bearing {:.1}°", d / 1000.0, b);
    }
    if let (Some(phase), Some(age)) = (output.lunar_phase_deg, output.moon_age_days) {
        println!("Moon age : {:.1} days (phase {:.1}°)", age, phase);
    }

    for report in &output.bodies {
        println!();
        print_body(report, output, show_points);
    }
}

fn print_body(report: &BodyReport, output: &EngineOutput, show_points: bool) {
    let body: &Body = &report.body;
    println!("{} ({})", body.name, if body.is_fixed() { "fixed" } else { "ephemeris" });

    match &report.current {
        Some(pos) => println!("  Now      : Az {:.2}° Alt {:.2}°", pos.azimuth_deg, pos.altitude_deg),
        None => {
            println!("  Now      : position unavailable");
            return;
        }
    }

    let rise_set = &report.rise_set;
    let event_line = |label: String, event: Option<&chrono::DateTime<chrono_tz::Tz>>| match event {
        Some(t) => format!("{} (minute {})", label, minute_of_day(t, &output.day_start)),
        None => label,
    };
    let (rise, set) = match rise_set {
        RiseSetResult::Regular { rise, set } => (rise.as_ref(), set.as_ref()),
        _ => (None, None),
    };
    println!("  Rise     : {}", event_line(rise_set.rise_label(), rise));
    println!("  Set      : {}", event_line(rise_set.set_label(), set));
    if let Some(span) = visible_for(rise_set) {
        println!("  Visible  : {}", span);
    }

    for role in [DayRole::Previous, DayRole::Current, DayRole::Next] {
        let (segments, points, labels) = report
            .segments_for(role)
            .fold((0, 0, 0), |(s, p, l), seg| (s + 1, p + seg.points.len(), l + seg.markers.len()));
        println!("  Locus {:<8}: {} segments, {} points, {} labels", format!("{role:?}"), segments, points, labels);
    }
    if report.segments.iter().any(|s| s.degraded) {
        println!("  Warning  : some points fell back to the target (geodesic did not converge)");
    }

    if show_points {
        for (i, seg) in report.segments_for(DayRole::Current).enumerate() {
            println!("  Segment {}:", i + 1);
            for m in &seg.markers {
                println!("    {} {:.6}, {:.6}", m.label, m.point.lat_deg, normalize_lon(m.point.lon_deg));
            }
            for p in &seg.points {
                println!("    {:.6}, {:.6}", p.lat_deg, normalize_lon(p.lon_deg));
            }
        }
    }
}

// ===================== TESTS =====================
