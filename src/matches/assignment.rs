//! Lane assignment engine
//!
//! Pure decide-and-mutate rules for applying and withdrawing selector signals
//! against a match record. The engine is the sole authority for "one lane per
//! participant" and for origin-room capture; the controller issues the actual
//! room moves after the record is settled, so a second rapid signal for the
//! same participant always observes consistent prior state.

use crate::error::{MarshalError, Result};
use crate::lanes::Lane;
use crate::matches::record::{LaneEntry, MatchRecord};
use crate::types::{AssignOutcome, ParticipantId, ReleaseOutcome, RoomId};

/// Apply a selector signal: place the participant in `lane`, to be moved into
/// `destination`.
///
/// The origin room is captured at the participant's first selection in this
/// match and never overwritten, so eventual restoration returns them to where
/// they started rather than to an intermediate lane room.
pub fn assign(
    record: &mut MatchRecord,
    participant: ParticipantId,
    lane: &Lane,
    current_room: Option<RoomId>,
    destination: RoomId,
) -> Result<AssignOutcome> {
    let current_room = current_room.ok_or(MarshalError::NotInRoom { participant })?;

    if let Some(entry) = record.participants.get(&participant) {
        if entry.lane == lane.name {
            // Same selector re-applied; no state change, no move
            return Ok(AssignOutcome::AlreadyAssigned {
                lane: lane.name.clone(),
            });
        }
        // Reassignment: replace the lane, keep the original origin
        let origin_room = entry.origin_room;
        record.participants.insert(
            participant,
            LaneEntry {
                lane: lane.name.clone(),
                origin_room,
            },
        );
    } else {
        record.participants.insert(
            participant,
            LaneEntry {
                lane: lane.name.clone(),
                origin_room: current_room,
            },
        );
    }

    Ok(AssignOutcome::Moved {
        lane: lane.name.clone(),
        destination,
    })
}

/// Withdraw a selector signal. Stale withdrawals (the recorded lane does not
/// match the withdrawn selector) are a no-op.
pub fn release(
    record: &mut MatchRecord,
    participant: ParticipantId,
    lane: &Lane,
) -> ReleaseOutcome {
    match record.participants.get(&participant) {
        Some(entry) if entry.lane == lane.name => {
            let origin_room = entry.origin_room;
            record.participants.remove(&participant);
            ReleaseOutcome::Released { origin_room }
        }
        _ => ReleaseOutcome::Stale,
    }
}
