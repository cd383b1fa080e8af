//! Match record and pause/resume time accounting
//!
//! This module contains the data entity for one in-flight match and the pure
//! time arithmetic over it. All accounting functions take `now` as a parameter
//! so tests can drive the clock explicitly.

use crate::error::{MarshalError, Result};
use crate::types::{ArtifactRef, LaneName, ParticipantId, RoomId, ScopeId};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Whether a match is accruing time or frozen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Match is accruing elapsed time
    Running,
    /// Match is frozen since the given instant
    Paused { since: DateTime<Utc> },
}

/// A participant's current lane assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneEntry {
    /// Lane the participant currently holds
    pub lane: LaneName,
    /// Room the participant occupied at their first selection in this match;
    /// the restoration target at termination. Never overwritten by
    /// re-selection.
    pub origin_room: RoomId,
}

/// One in-flight match
#[derive(Debug, Clone)]
pub struct MatchRecord {
    /// Owning scope; primary key in the store
    pub scope_id: ScopeId,
    /// Announcement artifact watched for selector signals; secondary key
    pub artifact_ref: ArtifactRef,
    /// Configured total match length
    pub duration: Duration,
    /// Current lane assignment per participant
    pub participants: HashMap<ParticipantId, LaneEntry>,
    /// Creation timestamp
    pub started_at: DateTime<Utc>,
    /// Running or paused
    pub phase: MatchPhase,
    /// Cumulative paused time across all pause/resume cycles
    pub total_paused: Duration,
    /// Display name of the requester, for the announcement footer
    pub started_by: String,
}

impl MatchRecord {
    pub fn new(
        scope_id: ScopeId,
        artifact_ref: ArtifactRef,
        duration: Duration,
        started_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            scope_id,
            artifact_ref,
            duration,
            participants: HashMap::new(),
            started_at: now,
            phase: MatchPhase::Running,
            total_paused: Duration::zero(),
            started_by: started_by.into(),
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.phase, MatchPhase::Paused { .. })
    }

    /// Freeze the match at `now`
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.phase {
            MatchPhase::Paused { .. } => Err(MarshalError::AlreadyPaused.into()),
            MatchPhase::Running => {
                self.phase = MatchPhase::Paused { since: now };
                Ok(())
            }
        }
    }

    /// Unfreeze the match, charging the pause interval to `total_paused`
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.phase {
            MatchPhase::Running => Err(MarshalError::NotPaused.into()),
            MatchPhase::Paused { since } => {
                self.total_paused = self.total_paused + (now - since).max(Duration::zero());
                self.phase = MatchPhase::Running;
                Ok(())
            }
        }
    }

    /// Active time accrued so far, net of paused intervals. Clamped at zero
    /// against clock skew.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let accrued = match self.phase {
            MatchPhase::Paused { since } => since - self.started_at - self.total_paused,
            MatchPhase::Running => now - self.started_at - self.total_paused,
        };
        accrued.max(Duration::zero())
    }

    /// Time left against the configured duration, floored at zero
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.duration - self.elapsed(now)).max(Duration::zero())
    }

    /// Whether the accounted elapsed time has reached the configured duration
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.elapsed(now) >= self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn t(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + seconds, 0).unwrap()
    }

    fn record(duration_seconds: i64) -> MatchRecord {
        MatchRecord::new(1, 100, Duration::seconds(duration_seconds), "tester", t(0))
    }

    #[test]
    fn test_elapsed_while_running() {
        let record = record(585);
        assert_eq!(record.elapsed(t(60)), Duration::seconds(60));
        assert_eq!(record.remaining(t(60)), Duration::seconds(525));
    }

    #[test]
    fn test_pause_freezes_elapsed() {
        let mut record = record(585);
        record.pause(t(10)).unwrap();

        // No time accrues while paused, no matter how late the query is
        assert_eq!(record.elapsed(t(10)), Duration::seconds(10));
        assert_eq!(record.elapsed(t(500)), Duration::seconds(10));
    }

    #[test]
    fn test_resume_charges_pause_interval() {
        // start t=0, pause t=10, resume t=40 (30s paused), query t=50
        let mut record = record(585);
        record.pause(t(10)).unwrap();
        record.resume(t(40)).unwrap();

        assert_eq!(record.total_paused, Duration::seconds(30));
        assert_eq!(record.elapsed(t(50)), Duration::seconds(20));
    }

    #[test]
    fn test_double_pause_and_double_resume_rejected() {
        let mut record = record(585);
        record.pause(t(10)).unwrap();
        assert!(record.pause(t(11)).is_err());

        record.resume(t(20)).unwrap();
        assert!(record.resume(t(21)).is_err());
    }

    #[test]
    fn test_elapsed_clamped_against_clock_skew() {
        let record = record(585);
        // Query before the recorded start must not go negative
        assert_eq!(record.elapsed(t(-5)), Duration::zero());
    }

    #[test]
    fn test_remaining_floor() {
        let record = record(60);
        assert_eq!(record.remaining(t(90)), Duration::zero());
        assert!(record.is_expired(t(90)));
    }

    #[test]
    fn test_expiry_boundary() {
        let record = record(60);
        assert!(!record.is_expired(t(59)));
        assert!(record.is_expired(t(60)));
    }

    proptest! {
        /// For any schedule of pause/resume cycles, elapsed time equals the
        /// sum of the running stretches and never goes negative.
        #[test]
        fn prop_elapsed_counts_only_running_time(
            cycles in prop::collection::vec((0u32..3_600, 0u32..3_600), 0..20),
            tail in 0u32..3_600,
        ) {
            let mut record = record(1_000_000);
            let mut clock = 0i64;
            let mut running = 0i64;

            for (run, paused) in cycles {
                clock += run as i64;
                running += run as i64;
                record.pause(t(clock)).unwrap();
                clock += paused as i64;
                record.resume(t(clock)).unwrap();
            }
            clock += tail as i64;
            running += tail as i64;

            prop_assert_eq!(record.elapsed(t(clock)), Duration::seconds(running));
            prop_assert!(record.elapsed(t(clock)) >= Duration::zero());
        }

        /// total_paused is monotonically non-decreasing across cycles.
        #[test]
        fn prop_total_paused_monotonic(
            cycles in prop::collection::vec((0u32..3_600, 0u32..3_600), 1..20),
        ) {
            let mut record = record(1_000_000);
            let mut clock = 0i64;
            let mut previous = Duration::zero();

            for (run, paused) in cycles {
                clock += run as i64;
                record.pause(t(clock)).unwrap();
                clock += paused as i64;
                record.resume(t(clock)).unwrap();

                prop_assert!(record.total_paused >= previous);
                previous = record.total_paused;
            }
        }
    }
}
