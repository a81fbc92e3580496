//! Keeps labor and equipment quantities in step with a terminal node's schedule.

use crate::node::TerminalDetail;
use crate::resource::ResourceLine;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Duration (days) times shift length, rounded to two decimals.
pub fn crew_hours(duration: f64, hours_per_day: f64) -> f64 {
    round2(duration * hours_per_day)
}

/// Quantity produced per working day. Advisory only; zero when duration is zero.
pub fn daily_output(quantity: f64, duration: f64) -> f64 {
    if duration == 0.0 {
        return 0.0;
    }
    round2(quantity / duration)
}

/// Forces every labor/equipment line to `crew_hours` in unit "hr".
///
/// Lines already at `crew_hours` are left alone, as are material and
/// subcontract lines. A zero crew-hour schedule leaves the lines untouched so a
/// half-entered schedule does not wipe out existing quantities. Returns the
/// number of rewritten lines.
pub fn sync_resources(resources: &mut [ResourceLine], crew_hours: f64) -> usize {
    if crew_hours <= 0.0 {
        return 0;
    }
    let mut changed = 0;
    for line in resources
        .iter_mut()
        .filter(|line| line.category.follows_crew_hours())
    {
        if line.quantity != crew_hours {
            line.quantity = crew_hours;
            line.unit = "hr".to_string();
            line.recalculate_total();
            changed += 1;
        }
    }
    changed
}

/// Syncs a terminal node's resources from its own duration and shift length.
/// Nothing happens until both schedule fields are set.
pub fn sync_terminal(detail: &mut TerminalDetail) -> usize {
    match (detail.duration, detail.hours_per_day) {
        (Some(duration), Some(hours)) => {
            sync_resources(&mut detail.resources, crew_hours(duration, hours))
        }
        _ => 0,
    }
}
