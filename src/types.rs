//! Common types used throughout the lane assignment coordinator

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of the group/channel scope that owns a match
pub type ScopeId = u64;

/// Identifier of a voice room
pub type RoomId = u64;

/// Identifier of a participant
pub type ParticipantId = u64;

/// Identifier of the announcement artifact a match watches for selector signals
pub type ArtifactRef = u64;

/// Participant-visible selector symbol mapped to a lane
pub type Selector = String;

/// Name of a team lane (and of its destination voice room)
pub type LaneName = String;

/// Control request classified from free-form text, fed to the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentKind {
    Start { duration_seconds: Option<u64> },
    Stop { target: Option<ArtifactRef> },
    Pause,
    Resume,
    Status,
}

/// A classified control request together with its origin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub scope: ScopeId,
    pub requester: String,
    pub kind: IntentKind,
}

/// Why a match was terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    Stopped,
    TimeExpired,
    AdminEnded,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndReason::Stopped => write!(f, "Match stopped via message control"),
            EndReason::TimeExpired => write!(f, "Time's up!"),
            EndReason::AdminEnded => write!(f, "Match ended manually"),
        }
    }
}

/// Result of applying a selector signal to a match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignOutcome {
    /// Participant assigned (or reassigned); a move to `destination` is due
    Moved {
        lane: LaneName,
        destination: RoomId,
    },
    /// Participant already held this lane; nothing to do
    AlreadyAssigned { lane: LaneName },
}

/// Result of withdrawing a selector signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Participant released; a move back to `origin_room` is due
    Released { origin_room: RoomId },
    /// Withdrawn selector did not match the recorded lane; stale signal
    Stale,
}

/// Outcome of the best-effort restoration batch at termination
#[derive(Debug, Clone, Default)]
pub struct RestorationReport {
    /// Display names of participants moved back to their origin room
    pub restored: Vec<String>,
    /// Participants whose restoration attempt failed
    pub failed: Vec<ParticipantId>,
}

/// Live occupancy of one lane's voice room at status time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaneOccupancy {
    /// The lane's named room does not exist
    Missing,
    /// Current member display names, in platform order
    Members(Vec<String>),
}

/// Per-lane line of a status report
#[derive(Debug, Clone)]
pub struct LaneStatus {
    pub selector: Selector,
    pub lane: LaneName,
    pub occupancy: LaneOccupancy,
}

/// Snapshot of a match rendered for a status request
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub artifact_ref: ArtifactRef,
    pub paused: bool,
    pub remaining: Duration,
    pub participant_count: usize,
    pub lanes: Vec<LaneStatus>,
    pub generated_at: DateTime<Utc>,
}
