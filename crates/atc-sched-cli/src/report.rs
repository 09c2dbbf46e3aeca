//! Plain-text run summary for the terminal.

use std::fmt::Write;

use atc_sched_core::{RunOutput, ScheduleStatus};

/// Render conflicts, departures and warnings as text.
pub fn render_summary(output: &RunOutput) -> String {
    let mut text = String::new();
    let metadata = &output.canonical.metadata;

    let _ = writeln!(
        text,
        "Event {} - {}: {} flights, {} first conflicts",
        metadata.event_start.format("%Y-%m-%d %H:%M"),
        metadata.event_end.format("%H:%M"),
        metadata.total_flights,
        metadata.total_first_conflicts
    );

    if !output.conflicts.first_conflicts.is_empty() {
        let _ = writeln!(text, "\nFirst conflicts:");
        for event in &output.conflicts.first_conflicts {
            let _ = writeln!(text, "  {}", event.describe());
        }
    }

    let _ = writeln!(text, "\nDepartures:");
    let mut entries: Vec<_> = metadata.departure_schedule.entries.iter().collect();
    entries.sort_by(|a, b| a.1.departure.cmp(&b.1.departure).then_with(|| a.0.cmp(b.0)));
    for (flight_id, entry) in entries {
        let note = match entry.status {
            ScheduleStatus::Nominal => String::new(),
            ScheduleStatus::Adjusted => format!(" (nominal {})", entry.nominal.format("%H:%M:%S")),
            ScheduleStatus::Infeasible { blocking_rule } => {
                format!(" (outside window, {blocking_rule:?} separation)")
            }
        };
        let _ = writeln!(
            text,
            "  {} {:<10} {} conflict(s){}",
            entry.departure.format("%H:%M:%S"),
            flight_id,
            entry.conflict_count,
            note
        );
    }

    if !output.scheduled_conflicts.first_conflicts.is_empty() {
        let _ = writeln!(
            text,
            "\n{} conflict(s) remain at scheduled departures",
            output.scheduled_conflicts.first_conflicts.len()
        );
    }

    for rejected in &output.rejected {
        let _ = writeln!(text, "warning: {rejected}");
    }

    text
}
