//! atc-sched - conflict analysis and departure scheduling for a flight event.

use std::path::PathBuf;

use anyhow::{Context, Result};
use atc_sched_cli::{load_config, log_layer, parse_event_end, parse_event_time, render_summary};
use atc_sched_core::{run, EventWindow, FlightPlan};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON array of flight plans
    #[arg(long)]
    routes: PathBuf,

    /// Event start, RFC 3339 or HH:MM
    #[arg(long)]
    start: String,

    /// Event end, RFC 3339 or HH:MM
    #[arg(long)]
    end: String,

    /// Date for HH:MM times (default: today, UTC)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Engine configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Interpolation spacing override (nautical miles)
    #[arg(long)]
    spacing_nm: Option<f64>,

    /// Scheduling window override (minutes from event start)
    #[arg(long)]
    window_min: Option<f64>,

    /// Where to publish the canonical plan
    #[arg(long, default_value = "canonical_plan.json")]
    output: PathBuf,

    /// Optional JSON file for the first-conflict list
    #[arg(long)]
    conflicts: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs)?;

    let mut config = load_config(args.config.as_deref())?;
    if let Some(spacing_nm) = args.spacing_nm {
        config.interpolation.spacing_nm = spacing_nm;
    }
    if let Some(window_min) = args.window_min {
        config.schedule.window_min = window_min;
    }

    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
    let start = parse_event_time(&args.start, date).context("parsing --start")?;
    let end = parse_event_end(&args.end, date, start).context("parsing --end")?;
    let window = EventWindow::new(start, end)?;

    let text = std::fs::read_to_string(&args.routes)
        .with_context(|| format!("reading routes from {}", args.routes.display()))?;
    let plans: Vec<FlightPlan> =
        serde_json::from_str(&text).with_context(|| format!("parsing routes from {}", args.routes.display()))?;
    tracing::info!(flights = plans.len(), "Loaded routes");

    let output = run(&plans, window, &config)?;

    output
        .canonical
        .publish(&args.output)
        .with_context(|| format!("publishing canonical plan to {}", args.output.display()))?;

    if let Some(path) = &args.conflicts {
        let json = serde_json::to_string_pretty(&output.conflicts)?;
        std::fs::write(path, json).with_context(|| format!("writing conflicts to {}", path.display()))?;
    }

    print!("{}", render_summary(&output));

    for (flight_id, entry) in output.canonical.metadata.departure_schedule.flagged() {
        tracing::warn!(
            flight_id = %flight_id,
            departure = %entry.departure,
            conflicts = entry.conflict_count,
            "Departure could not be separated inside the window"
        );
    }

    Ok(())
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("atc_sched_core=info".parse()?)
        .add_directive("atc_sched=info".parse()?);

    tracing_subscriber::registry()
        .with(filter)
        .with(log_layer(json, std::io::stderr))
        .init();
    Ok(())
}
