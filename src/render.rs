//! User-facing message text
//!
//! Everything the coordinator posts back to the scope is rendered here as
//! plain text, keeping the gateway platform-agnostic. Wording follows the
//! original operator-facing phrasing: short confirmations, explicit rejection
//! reasons, and a compact status block.

use crate::lanes::LaneRegistry;
use crate::types::{EndReason, LaneOccupancy, RestorationReport, StatusReport};
use crate::utils::format_clock;
use chrono::Duration;

const MAX_STATUS_NAMES: usize = 5;
const MAX_SUMMARY_NAMES: usize = 10;

/// The announcement body participants react to
pub fn announcement(lanes: &LaneRegistry, duration: Duration, started_by: &str) -> String {
    let mut out = String::from("\u{1F3AF} Lane Assignments Started!\n");
    out.push_str("React with your preferred lane. You'll be moved automatically!\n\n");
    out.push_str(&format!("Match Duration: {}\n", format_clock(duration)));
    for lane in lanes.lanes() {
        out.push_str(&format!("{} {}\n", lane.selector, lane.name));
    }
    out.push_str("\u{26A0} You must be in a voice room to be moved!\n");
    out.push_str(&format!("Started by {started_by}"));
    out
}

/// Confirmation reply after a successful start
pub fn start_confirmation(artifact: u64, duration: Duration) -> String {
    format!(
        "\u{2705} Lane assignment started! Match ref: {artifact} (duration {})",
        format_clock(duration)
    )
}

/// A rejected operation, with its reason
pub fn rejection(reason: impl std::fmt::Display) -> String {
    format!("\u{274C} {reason}")
}

/// A successful state change
pub fn confirmation(message: impl std::fmt::Display) -> String {
    format!("\u{2705} {message}")
}

pub fn assignment_confirmation(display_name: &str, lane: &str) -> String {
    format!("\u{2705} {display_name} assigned to {lane}!")
}

pub fn pause_confirmation(requester: &str) -> String {
    format!("\u{23F8} Match paused by {requester}")
}

pub fn resume_confirmation(requester: &str) -> String {
    format!("\u{25B6} Match resumed by {requester}")
}

/// The status block for a status request
pub fn status(report: &StatusReport) -> String {
    let (symbol, label) = if report.paused {
        ("\u{23F8}", "PAUSED")
    } else {
        ("\u{25B6}", "RUNNING")
    };

    let mut out = format!("{symbol} Lane Assignment Status: {label}\n");
    out.push_str(&format!("Match ref: {}\n", report.artifact_ref));
    out.push_str(&format!(
        "Time remaining: {}\n",
        format_clock(report.remaining)
    ));
    out.push_str(&format!("Participants: {}\n", report.participant_count));

    for lane in &report.lanes {
        match &lane.occupancy {
            LaneOccupancy::Missing => {
                out.push_str(&format!(
                    "{} {} (Room not found)\n",
                    lane.selector, lane.lane
                ));
            }
            LaneOccupancy::Members(members) if members.is_empty() => {
                out.push_str(&format!("{} {} (0)\n", lane.selector, lane.lane));
            }
            LaneOccupancy::Members(members) => {
                let mut shown: Vec<String> =
                    members.iter().take(MAX_STATUS_NAMES).cloned().collect();
                if members.len() > MAX_STATUS_NAMES {
                    shown.push(format!("... and {} more", members.len() - MAX_STATUS_NAMES));
                }
                out.push_str(&format!(
                    "{} {} ({})\n  {}\n",
                    lane.selector,
                    lane.lane,
                    members.len(),
                    shown.join(", ")
                ));
            }
        }
    }

    if report.paused {
        out.push_str("Type `resume match` to continue or `stop match` to end");
    } else {
        out.push_str("Type `pause match` to pause or `stop match` to end");
    }
    out
}

/// The completion summary posted at termination
pub fn completion_summary(reason: EndReason, report: &RestorationReport) -> String {
    let prefix = match reason {
        EndReason::Stopped => "\u{1F6D1}",
        EndReason::TimeExpired => "\u{23F0}",
        EndReason::AdminEnded => "\u{1F6D1}",
    };

    let mut out = format!("\u{1F3C1} Lane Assignment Complete! {prefix} {reason}\n");
    out.push_str("All participants have been moved back to their original voice rooms.");

    if !report.restored.is_empty() {
        let mut shown: Vec<String> = report
            .restored
            .iter()
            .take(MAX_SUMMARY_NAMES)
            .cloned()
            .collect();
        if report.restored.len() > MAX_SUMMARY_NAMES {
            shown.push(format!(
                "... and {} more",
                report.restored.len() - MAX_SUMMARY_NAMES
            ));
        }
        out.push_str(&format!("\nParticipants returned: {}", shown.join(", ")));
    }
    if !report.failed.is_empty() {
        out.push_str(&format!(
            "\nCould not return {} participant(s)",
            report.failed.len()
        ));
    }
    out
}
