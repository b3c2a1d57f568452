use chrono::{DateTime, Timelike, Utc};
use chrono_english::{Dialect, parse_date_string};
use chrono_tz::Tz;
use clap::Parser;
use log::info;

use horizon_align::almanac::Almanac;
use horizon_align::cli::Args;
use horizon_align::engine::{EngineInput, compute};
use horizon_align::inverter::PlausibilityWindow;
use horizon_align::output;
use horizon_align::time::{parse_time_ns, resolve_local, select_timezone};

// ===================== MAIN =====================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    // Local days are those of the target: that is where the alignment happens.
    let tz = select_timezone(&args.timezone, args.target_longitude, args.target_latitude);
    let now = Utc::now().with_timezone(&tz);

    let date = match &args.date {
        Some(s) => parse_date_string(s, now, Dialect::Us)?.with_timezone(&tz),
        None => now,
    };

    let instant: DateTime<Tz> = match args.at.as_deref() {
        None | Some("now") if args.date.is_none() => now,
        None | Some("now") => resolve_local(date.date_naive(), now_hms(&now), &tz)?,
        Some(at) => resolve_local(date.date_naive(), parse_time_ns(at)?, &tz)?,
    };
    info!("computing for {}", instant);

    let mut input = EngineInput::new(args.observer(), args.target(), instant)
        .with_bodies(args.body_list()?)
        .with_dip_model(args.dip_model()?)
        .with_window(PlausibilityWindow::new(args.max_distance_km * 1000.0))
        .with_label_every(args.label_every);
    input.safety_margin_deg = args.safety_margin;
    input.refraction = args.refraction_mode();

    let result = compute(&Almanac::new(), &input)?;

    if args.json {
        println!("{}", output::to_json(&result)?);
    } else {
        output::print_report(&input, &result, args.points);
    }
    Ok(())
}

/// Wall-clock time of `now`, for carrying "now" over to another date.
fn now_hms(now: &DateTime<Tz>) -> (u32, u32, u32, u32) {
    (now.hour(), now.minute(), now.second(), 0)
}
