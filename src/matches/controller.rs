//! Match lifecycle controller
//!
//! Orchestrates start / stop / pause / resume / status, consumes selector
//! signals, and drives the platform gateway for observable side effects. The
//! record is always mutated under the store lock before the corresponding
//! gateway call is issued, and gateway failures never roll back state.

use crate::config::{AppConfig, MatchSettings};
use crate::error::{MarshalError, Result};
use crate::lanes::LaneRegistry;
use crate::matches::assignment;
use crate::matches::record::MatchRecord;
use crate::matches::store::MatchStore;
use crate::platform::gateway::PlatformGateway;
use crate::render;
use crate::types::{
    ArtifactRef, AssignOutcome, EndReason, Intent, IntentKind, LaneName, LaneOccupancy,
    LaneStatus, ParticipantId, ReleaseOutcome, RestorationReport, ScopeId, StatusReport,
};
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// The main match coordinator
#[derive(Clone)]
pub struct MatchController {
    /// Active matches keyed by scope
    store: Arc<MatchStore>,
    /// Platform collaborator for all observable side effects
    gateway: Arc<dyn PlatformGateway>,
    /// Selector-to-lane mapping
    lanes: Arc<LaneRegistry>,
    /// Duration bounds and sweep interval
    rules: MatchSettings,
    /// Category under which lane rooms are provisioned
    lane_category: String,
}

impl MatchController {
    pub fn new(gateway: Arc<dyn PlatformGateway>, lanes: LaneRegistry, config: &AppConfig) -> Self {
        Self {
            store: Arc::new(MatchStore::new()),
            gateway,
            lanes: Arc::new(lanes),
            rules: config.match_rules.clone(),
            lane_category: config.service.lane_category.clone(),
        }
    }

    pub fn store(&self) -> &MatchStore {
        &self.store
    }

    pub fn lanes(&self) -> &LaneRegistry {
        &self.lanes
    }

    /// Start a new match in a scope. Posts the announcement, seeds the
    /// selectors, and creates the record.
    pub async fn start(
        &self,
        scope: ScopeId,
        requester: &str,
        duration_seconds: Option<u64>,
    ) -> Result<ArtifactRef> {
        if self.store.get(scope)?.is_some() {
            return Err(MarshalError::AlreadyActive.into());
        }

        let duration = self.rules.resolve_duration(duration_seconds);
        let content = render::announcement(&self.lanes, duration, requester);
        let artifact = self.gateway.send_announcement(scope, content).await?;
        if let Err(e) = self
            .gateway
            .attach_selectors(artifact, &self.lanes.selectors())
            .await
        {
            // The announcement went out but cannot take selections; discard it
            self.discard_announcement(artifact).await;
            return Err(e);
        }

        let record = MatchRecord::new(scope, artifact, duration, requester, current_timestamp());
        if let Err(e) = self.store.create(record) {
            // Lost a start race after the announcement went out
            self.discard_announcement(artifact).await;
            return Err(e);
        }

        info!(
            "Match started - scope: {}, artifact: {}, duration: {}s, requester: '{}'",
            scope,
            artifact,
            duration.num_seconds(),
            requester
        );
        Ok(artifact)
    }

    /// Stop a match, resolved by explicit target reference or by scope
    pub async fn stop(&self, scope: ScopeId, target: Option<ArtifactRef>) -> Result<()> {
        let resolved = self
            .store
            .resolve(scope, target)?
            .ok_or(MarshalError::NotFound)?;

        if self.end_match(resolved, EndReason::Stopped).await? {
            Ok(())
        } else {
            // A concurrent path terminated it first
            Err(MarshalError::NotFound.into())
        }
    }

    pub async fn pause(&self, scope: ScopeId, now: DateTime<Utc>) -> Result<()> {
        self.store
            .with_record(scope, |record| record.pause(now))?
            .ok_or(MarshalError::NotFound)??;
        info!("Match paused - scope: {}", scope);
        Ok(())
    }

    pub async fn resume(&self, scope: ScopeId, now: DateTime<Utc>) -> Result<()> {
        self.store
            .with_record(scope, |record| record.resume(now))?
            .ok_or(MarshalError::NotFound)??;
        info!("Match resumed - scope: {}", scope);
        Ok(())
    }

    /// Build a status report. Per-lane occupancy is queried fresh from the
    /// platform, not from the participants map, so drift from partially failed
    /// moves stays visible.
    pub async fn status(
        &self,
        scope: ScopeId,
        target: Option<ArtifactRef>,
        now: DateTime<Utc>,
    ) -> Result<StatusReport> {
        let resolved = self
            .store
            .resolve(scope, target)?
            .ok_or(MarshalError::NotFound)?;
        let record = self.store.get(resolved)?.ok_or(MarshalError::NotFound)?;

        let mut lane_statuses = Vec::with_capacity(self.lanes.len());
        for lane in self.lanes.lanes() {
            let occupancy = match self.gateway.find_room(&lane.name).await {
                Ok(Some(room)) => match self.gateway.room_members(room).await {
                    Ok(members) => LaneOccupancy::Members(members),
                    Err(e) => {
                        warn!("Failed to list members of {}: {}", lane.name, e);
                        LaneOccupancy::Members(Vec::new())
                    }
                },
                Ok(None) => LaneOccupancy::Missing,
                Err(e) => {
                    warn!("Failed to look up room {}: {}", lane.name, e);
                    LaneOccupancy::Missing
                }
            };
            lane_statuses.push(LaneStatus {
                selector: lane.selector.clone(),
                lane: lane.name.clone(),
                occupancy,
            });
        }

        Ok(StatusReport {
            artifact_ref: record.artifact_ref,
            paused: record.is_paused(),
            remaining: record.remaining(now),
            participant_count: record.participants.len(),
            lanes: lane_statuses,
            generated_at: now,
        })
    }

    /// Consume a selector-applied signal from the platform
    pub async fn handle_selector_applied(
        &self,
        artifact: ArtifactRef,
        participant: ParticipantId,
        selector: &str,
    ) -> Result<()> {
        let Some(scope) = self.store.scope_for_artifact(artifact)? else {
            return Ok(()); // not a match announcement
        };
        let Some(lane) = self.lanes.lane_for_selector(selector) else {
            return Ok(()); // not a lane selector
        };
        let lane = lane.clone();

        if !self.gateway.has_move_permission(scope).await? {
            self.notify(scope, render::rejection(MarshalError::Forbidden))
                .await;
            return Ok(());
        }

        let current_room = self.gateway.current_room(participant).await?;
        let Some(destination) = self.gateway.find_room(&lane.name).await? else {
            self.notify(
                scope,
                render::rejection(MarshalError::UnknownDestination {
                    lane: lane.name.clone(),
                }),
            )
            .await;
            return Ok(());
        };

        let outcome = match self.store.with_record(scope, |record| {
            assignment::assign(record, participant, &lane, current_room, destination)
        })? {
            Some(outcome) => outcome,
            None => return Ok(()), // match ended before the signal was handled
        };

        match outcome {
            Err(e) => {
                // Not in a voice room; reject and clear the mark
                self.notify(scope, render::rejection(&e)).await;
                self.clear_selector(artifact, participant, selector).await;
            }
            Ok(AssignOutcome::AlreadyAssigned { lane }) => {
                debug!(
                    "Participant {} re-selected {} in scope {}; no-op",
                    participant, lane, scope
                );
            }
            Ok(AssignOutcome::Moved { lane, destination }) => {
                // Keep only one visible selector mark per participant
                for other in self.lanes.lanes() {
                    if other.selector != selector {
                        self.clear_selector(artifact, participant, &other.selector)
                            .await;
                    }
                }

                let name = self.gateway.display_name(participant).await;
                match self.gateway.move_participant(participant, destination).await {
                    Ok(()) => {
                        info!(
                            "Participant {} assigned to {} in scope {}",
                            participant, lane, scope
                        );
                        self.notify(scope, render::assignment_confirmation(&name, &lane))
                            .await;
                    }
                    Err(e) => {
                        warn!(
                            "Failed to move participant {} to {}: {}",
                            participant, lane, e
                        );
                        self.notify(scope, render::rejection(format!("Failed to move {name}: {e}")))
                            .await;
                        self.clear_selector(artifact, participant, selector).await;
                    }
                }
            }
        }

        Ok(())
    }

    /// Consume a selector-withdrawn signal from the platform
    pub async fn handle_selector_withdrawn(
        &self,
        artifact: ArtifactRef,
        participant: ParticipantId,
        selector: &str,
    ) -> Result<()> {
        let Some(scope) = self.store.scope_for_artifact(artifact)? else {
            return Ok(());
        };
        let Some(lane) = self.lanes.lane_for_selector(selector) else {
            return Ok(());
        };
        let lane = lane.clone();

        let outcome = self
            .store
            .with_record(scope, |record| assignment::release(record, participant, &lane))?;

        if let Some(ReleaseOutcome::Released { origin_room }) = outcome {
            info!(
                "Participant {} withdrew from {} in scope {}",
                participant, lane.name, scope
            );
            if let Err(e) = self.gateway.move_participant(participant, origin_room).await {
                warn!(
                    "Failed to return participant {} to origin room {}: {}",
                    participant, origin_room, e
                );
            }
        }

        Ok(())
    }

    /// Shared termination path for stop, admin end, and expiry. Returns false
    /// when the record was already removed by a concurrent path.
    pub async fn end_match(&self, scope: ScopeId, reason: EndReason) -> Result<bool> {
        let Some(record) = self.store.take(scope)? else {
            return Ok(false);
        };

        let mut report = RestorationReport::default();
        for (participant, entry) in &record.participants {
            let in_voice = match self.gateway.current_room(*participant).await {
                Ok(room) => room.is_some(),
                Err(e) => {
                    warn!("Failed to query room of participant {}: {}", participant, e);
                    false
                }
            };
            if !in_voice {
                debug!(
                    "Participant {} left voice before restoration; skipping",
                    participant
                );
                continue;
            }

            match self
                .gateway
                .move_participant(*participant, entry.origin_room)
                .await
            {
                Ok(()) => {
                    let name = self.gateway.display_name(*participant).await;
                    report.restored.push(name);
                }
                Err(e) => {
                    warn!(
                        "Failed to restore participant {} to room {}: {}",
                        participant, entry.origin_room, e
                    );
                    report.failed.push(*participant);
                }
            }
        }

        self.notify(scope, render::completion_summary(reason, &report))
            .await;

        if let Err(e) = self.gateway.delete_artifact(record.artifact_ref).await {
            debug!(
                "Failed to delete announcement {}: {}",
                record.artifact_ref, e
            );
        }

        info!(
            "Match ended - scope: {}, reason: {:?}, restored: {}, failed: {}",
            scope,
            reason,
            report.restored.len(),
            report.failed.len()
        );
        Ok(true)
    }

    /// Terminate every active match whose accounted elapsed time has reached
    /// its duration. Paused matches are skipped. Records removed mid-sweep by
    /// a concurrent path are detected and counted out.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut ended = 0;
        for record in self.store.snapshot()? {
            if record.is_paused() || !record.is_expired(now) {
                continue;
            }
            if self.end_match(record.scope_id, EndReason::TimeExpired).await? {
                ended += 1;
            }
        }
        if ended > 0 {
            info!("Expiry sweep ended {} match(es)", ended);
        }
        Ok(ended)
    }

    /// Spawn the periodic expiry sweep
    pub fn start_sweep_task(self: Arc<Self>) {
        let controller = Arc::clone(&self);
        let interval = self.rules.sweep_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = controller.sweep_expired(current_timestamp()).await {
                    error!("Error during expiry sweep: {}", e);
                }
            }
        });

        info!("Started expiry sweep task (every {:?})", interval);
    }

    /// Idempotently create the lane voice rooms. Returns the names that had
    /// to be created.
    pub async fn provision_lane_rooms(&self) -> Result<Vec<LaneName>> {
        let mut created = Vec::new();
        for lane in self.lanes.lanes() {
            if self.gateway.find_room(&lane.name).await?.is_none() {
                self.gateway
                    .ensure_room(&lane.name, &self.lane_category)
                    .await?;
                created.push(lane.name.clone());
            }
        }
        if !created.is_empty() {
            info!("Created lane rooms: {}", created.join(", "));
        }
        Ok(created)
    }

    /// Dispatch a classified control intent, turning every rejection into a
    /// user-facing notice. Nothing here is allowed to escalate to a fatal
    /// error.
    pub async fn handle_intent(&self, intent: Intent) -> Result<()> {
        let Intent {
            scope,
            requester,
            kind,
        } = intent;
        let now = current_timestamp();

        match kind {
            IntentKind::Start { duration_seconds } => {
                match self.start(scope, &requester, duration_seconds).await {
                    Ok(artifact) => {
                        let duration = self.rules.resolve_duration(duration_seconds);
                        self.notify(scope, render::start_confirmation(artifact, duration))
                            .await;
                    }
                    Err(e) => self.notify(scope, render::rejection(&e)).await,
                }
            }
            IntentKind::Stop { target } => match self.stop(scope, target).await {
                Ok(()) => self.notify(scope, render::confirmation("Match stopped.")).await,
                Err(e) => self.notify(scope, render::rejection(&e)).await,
            },
            IntentKind::Pause => match self.pause(scope, now).await {
                Ok(()) => {
                    self.notify(scope, render::pause_confirmation(&requester))
                        .await
                }
                Err(e) => self.notify(scope, render::rejection(&e)).await,
            },
            IntentKind::Resume => match self.resume(scope, now).await {
                Ok(()) => {
                    self.notify(scope, render::resume_confirmation(&requester))
                        .await
                }
                Err(e) => self.notify(scope, render::rejection(&e)).await,
            },
            IntentKind::Status => match self.status(scope, None, now).await {
                Ok(report) => self.notify(scope, render::status(&report)).await,
                Err(e) => self.notify(scope, render::rejection(&e)).await,
            },
        }

        Ok(())
    }

    /// Best-effort notice; failures are logged, never surfaced
    async fn notify(&self, scope: ScopeId, content: String) {
        if let Err(e) = self.gateway.send_notice(scope, content).await {
            warn!("Failed to send notice to scope {}: {}", scope, e);
        }
    }

    /// Best-effort removal of an announcement that never became a match
    async fn discard_announcement(&self, artifact: ArtifactRef) {
        if let Err(e) = self.gateway.delete_artifact(artifact).await {
            debug!("Failed to delete orphaned announcement {}: {}", artifact, e);
        }
    }

    /// Best-effort selector-mark removal; stale marks are accepted drift
    async fn clear_selector(&self, artifact: ArtifactRef, participant: ParticipantId, selector: &str) {
        if let Err(e) = self
            .gateway
            .remove_selector(artifact, participant, selector)
            .await
        {
            debug!(
                "Failed to remove selector {} of participant {}: {}",
                selector, participant, e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::sim::SimPlatform;
    use chrono::Duration;

    const SCOPE: ScopeId = 1;

    fn create_test_controller() -> (MatchController, Arc<SimPlatform>) {
        let sim = Arc::new(SimPlatform::new());
        let controller =
            MatchController::new(sim.clone(), LaneRegistry::default(), &AppConfig::default());
        (controller, sim)
    }

    #[tokio::test]
    async fn test_start_rejects_second_match_in_scope() {
        let (controller, _sim) = create_test_controller();

        controller.start(SCOPE, "ops", None).await.unwrap();
        let err = controller.start(SCOPE, "ops", None).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MarshalError>(),
            Some(MarshalError::AlreadyActive)
        ));

        // A different scope is unaffected
        controller.start(2, "ops", None).await.unwrap();
        assert_eq!(controller.store().len().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_selector_seeding_discards_announcement() {
        let (controller, sim) = create_test_controller();
        sim.fail_selector_attach(true);

        let err = controller.start(SCOPE, "ops", None).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MarshalError>(),
            Some(MarshalError::Transient { .. })
        ));

        // No record was created and the unusable announcement is gone
        assert!(controller.store().get(SCOPE).unwrap().is_none());
        assert!(sim.latest_artifact().is_none());

        // The scope is free to start again once seeding works
        sim.fail_selector_attach(false);
        controller.start(SCOPE, "ops", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_selector_assigns_and_moves() {
        let (controller, sim) = create_test_controller();
        let lobby = sim.add_room("General");
        let yellow_room = sim.add_room("Lane - Yellow");
        sim.place(42, lobby);
        sim.set_display_name(42, "alice");

        let artifact = controller.start(SCOPE, "ops", None).await.unwrap();
        controller
            .handle_selector_applied(artifact, 42, "\u{1F7E1}")
            .await
            .unwrap();

        assert_eq!(sim.participant_room(42), Some(yellow_room));
        let record = controller.store().get(SCOPE).unwrap().unwrap();
        assert_eq!(record.participants.len(), 1);
        assert_eq!(record.participants[&42].origin_room, lobby);

        let notices = sim.notices();
        assert!(notices
            .iter()
            .any(|(_, n)| n.contains("alice") && n.contains("Lane - Yellow")));
    }

    #[tokio::test]
    async fn test_selector_rejected_when_not_in_voice() {
        let (controller, sim) = create_test_controller();
        sim.add_room("Lane - Yellow");

        let artifact = controller.start(SCOPE, "ops", None).await.unwrap();
        sim.mark_selector(artifact, 42, "\u{1F7E1}");
        controller
            .handle_selector_applied(artifact, 42, "\u{1F7E1}")
            .await
            .unwrap();

        let record = controller.store().get(SCOPE).unwrap().unwrap();
        assert!(record.participants.is_empty());
        // The rejected mark is cleared from the announcement
        assert!(sim.marks(artifact).is_empty());
        assert!(sim
            .notices()
            .iter()
            .any(|(_, n)| n.contains("not in a voice room")));
    }

    #[tokio::test]
    async fn test_selector_rejected_when_lane_room_missing() {
        let (controller, sim) = create_test_controller();
        let lobby = sim.add_room("General");
        sim.place(42, lobby);

        let artifact = controller.start(SCOPE, "ops", None).await.unwrap();
        controller
            .handle_selector_applied(artifact, 42, "\u{1F7E1}")
            .await
            .unwrap();

        assert_eq!(sim.participant_room(42), Some(lobby));
        assert!(sim
            .notices()
            .iter()
            .any(|(_, n)| n.contains("voice room not found")));
    }

    #[tokio::test]
    async fn test_selector_rejected_without_move_permission() {
        let (controller, sim) = create_test_controller();
        let lobby = sim.add_room("General");
        sim.add_room("Lane - Yellow");
        sim.place(42, lobby);
        sim.set_move_permission(false);

        let artifact = controller.start(SCOPE, "ops", None).await.unwrap();
        controller
            .handle_selector_applied(artifact, 42, "\u{1F7E1}")
            .await
            .unwrap();

        assert_eq!(sim.participant_room(42), Some(lobby));
        assert!(sim
            .notices()
            .iter()
            .any(|(_, n)| n.contains("missing permission")));
    }

    #[tokio::test]
    async fn test_reselection_is_idempotent() {
        let (controller, sim) = create_test_controller();
        let lobby = sim.add_room("General");
        sim.add_room("Lane - Yellow");
        sim.place(42, lobby);

        let artifact = controller.start(SCOPE, "ops", None).await.unwrap();
        controller
            .handle_selector_applied(artifact, 42, "\u{1F7E1}")
            .await
            .unwrap();
        let moves_after_first = sim.move_count();

        controller
            .handle_selector_applied(artifact, 42, "\u{1F7E1}")
            .await
            .unwrap();

        assert_eq!(sim.move_count(), moves_after_first);
        let record = controller.store().get(SCOPE).unwrap().unwrap();
        assert_eq!(record.participants.len(), 1);
    }

    #[tokio::test]
    async fn test_reassignment_clears_previous_mark() {
        let (controller, sim) = create_test_controller();
        let lobby = sim.add_room("General");
        sim.add_room("Lane - Yellow");
        let blue_room = sim.add_room("Lane - Blue");
        sim.place(42, lobby);

        let artifact = controller.start(SCOPE, "ops", None).await.unwrap();
        sim.mark_selector(artifact, 42, "\u{1F7E1}");
        controller
            .handle_selector_applied(artifact, 42, "\u{1F7E1}")
            .await
            .unwrap();

        sim.mark_selector(artifact, 42, "\u{1F535}");
        controller
            .handle_selector_applied(artifact, 42, "\u{1F535}")
            .await
            .unwrap();

        assert_eq!(sim.participant_room(42), Some(blue_room));
        // Only the blue mark remains on the announcement
        assert_eq!(sim.marks(artifact), vec![(42, "\u{1F535}".to_string())]);
        // Origin still points at the lobby, not the yellow lane
        let record = controller.store().get(SCOPE).unwrap().unwrap();
        assert_eq!(record.participants[&42].origin_room, lobby);
    }

    #[tokio::test]
    async fn test_withdrawal_restores_origin() {
        let (controller, sim) = create_test_controller();
        let lobby = sim.add_room("General");
        sim.add_room("Lane - Yellow");
        sim.place(42, lobby);

        let artifact = controller.start(SCOPE, "ops", None).await.unwrap();
        controller
            .handle_selector_applied(artifact, 42, "\u{1F7E1}")
            .await
            .unwrap();
        controller
            .handle_selector_withdrawn(artifact, 42, "\u{1F7E1}")
            .await
            .unwrap();

        assert_eq!(sim.participant_room(42), Some(lobby));
        let record = controller.store().get(SCOPE).unwrap().unwrap();
        assert!(record.participants.is_empty());
    }

    #[tokio::test]
    async fn test_stale_withdrawal_moves_nobody() {
        let (controller, sim) = create_test_controller();
        let lobby = sim.add_room("General");
        let yellow_room = sim.add_room("Lane - Yellow");
        sim.add_room("Lane - Blue");
        sim.place(42, lobby);

        let artifact = controller.start(SCOPE, "ops", None).await.unwrap();
        controller
            .handle_selector_applied(artifact, 42, "\u{1F7E1}")
            .await
            .unwrap();

        // Withdraw a selector the participant does not hold
        controller
            .handle_selector_withdrawn(artifact, 42, "\u{1F535}")
            .await
            .unwrap();

        assert_eq!(sim.participant_room(42), Some(yellow_room));
        let record = controller.store().get(SCOPE).unwrap().unwrap();
        assert_eq!(record.participants.len(), 1);
    }

    #[tokio::test]
    async fn test_end_match_restores_and_cleans_up() {
        let (controller, sim) = create_test_controller();
        let lobby = sim.add_room("General");
        sim.add_room("Lane - Yellow");
        sim.place(42, lobby);
        sim.set_display_name(42, "alice");

        let artifact = controller.start(SCOPE, "ops", None).await.unwrap();
        controller
            .handle_selector_applied(artifact, 42, "\u{1F7E1}")
            .await
            .unwrap();

        let ended = controller.end_match(SCOPE, EndReason::Stopped).await.unwrap();
        assert!(ended);

        assert_eq!(sim.participant_room(42), Some(lobby));
        assert!(!sim.artifact_exists(artifact));
        assert!(controller.store().get(SCOPE).unwrap().is_none());
        assert!(sim
            .notices()
            .iter()
            .any(|(_, n)| n.contains("Lane Assignment Complete") && n.contains("alice")));
    }

    #[tokio::test]
    async fn test_end_match_continues_past_failed_restorations() {
        let (controller, sim) = create_test_controller();
        let lobby = sim.add_room("General");
        sim.add_room("Lane - Yellow");
        sim.place(42, lobby);
        sim.place(43, lobby);
        sim.set_display_name(43, "bob");

        let artifact = controller.start(SCOPE, "ops", None).await.unwrap();
        controller
            .handle_selector_applied(artifact, 42, "\u{1F7E1}")
            .await
            .unwrap();
        controller
            .handle_selector_applied(artifact, 43, "\u{1F7E1}")
            .await
            .unwrap();

        // First participant's restoration will fail; the batch must continue
        sim.fail_moves_for(42);
        let ended = controller.end_match(SCOPE, EndReason::AdminEnded).await.unwrap();
        assert!(ended);

        assert_eq!(sim.participant_room(43), Some(lobby));
        assert!(sim
            .notices()
            .iter()
            .any(|(_, n)| n.contains("bob") && n.contains("Could not return 1")));
    }

    #[tokio::test]
    async fn test_termination_runs_at_most_once() {
        let (controller, sim) = create_test_controller();
        sim.add_room("Lane - Yellow");

        let started = controller.start(SCOPE, "ops", Some(60)).await.unwrap();
        let record = controller.store().get(SCOPE).unwrap().unwrap();
        let after_expiry = record.started_at + Duration::seconds(65);

        // Manual stop and expiry sweep race; exactly one terminates
        let ended = controller.sweep_expired(after_expiry).await.unwrap();
        assert_eq!(ended, 1);
        let err = controller.stop(SCOPE, Some(started)).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MarshalError>(),
            Some(MarshalError::NotFound)
        ));

        let summaries = sim
            .notices()
            .iter()
            .filter(|(_, n)| n.contains("Lane Assignment Complete"))
            .count();
        assert_eq!(summaries, 1);
    }

    #[tokio::test]
    async fn test_sweep_skips_paused_matches() {
        let (controller, _sim) = create_test_controller();

        controller.start(SCOPE, "ops", Some(60)).await.unwrap();
        let record = controller.store().get(SCOPE).unwrap().unwrap();
        controller
            .pause(SCOPE, record.started_at + Duration::seconds(10))
            .await
            .unwrap();

        let long_after = record.started_at + Duration::seconds(600);
        assert_eq!(controller.sweep_expired(long_after).await.unwrap(), 0);
        assert!(controller.store().get(SCOPE).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stop_by_explicit_reference() {
        let (controller, _sim) = create_test_controller();

        let artifact = controller.start(SCOPE, "ops", None).await.unwrap();
        // Resolving from a different scope via the artifact reference
        controller.stop(999, Some(artifact)).await.unwrap();
        assert!(controller.store().get(SCOPE).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pause_resume_noop_reporting() {
        let (controller, sim) = create_test_controller();
        controller.start(SCOPE, "ops", None).await.unwrap();

        controller
            .handle_intent(Intent {
                scope: SCOPE,
                requester: "ops".to_string(),
                kind: IntentKind::Resume,
            })
            .await
            .unwrap();
        assert!(sim
            .notices()
            .iter()
            .any(|(_, n)| n.contains("not paused")));

        controller
            .handle_intent(Intent {
                scope: SCOPE,
                requester: "ops".to_string(),
                kind: IntentKind::Pause,
            })
            .await
            .unwrap();
        controller
            .handle_intent(Intent {
                scope: SCOPE,
                requester: "ops".to_string(),
                kind: IntentKind::Pause,
            })
            .await
            .unwrap();
        assert!(sim
            .notices()
            .iter()
            .any(|(_, n)| n.contains("already paused")));
    }

    #[tokio::test]
    async fn test_status_reports_live_occupancy() {
        let (controller, sim) = create_test_controller();
        let lobby = sim.add_room("General");
        sim.add_room("Lane - Yellow");
        sim.place(42, lobby);
        sim.set_display_name(42, "alice");

        let artifact = controller.start(SCOPE, "ops", None).await.unwrap();
        controller
            .handle_selector_applied(artifact, 42, "\u{1F7E1}")
            .await
            .unwrap();

        let record = controller.store().get(SCOPE).unwrap().unwrap();
        let report = controller
            .status(SCOPE, None, record.started_at + Duration::seconds(10))
            .await
            .unwrap();

        assert!(!report.paused);
        assert_eq!(report.participant_count, 1);
        assert_eq!(report.remaining, Duration::seconds(575));

        let yellow = report
            .lanes
            .iter()
            .find(|l| l.lane == "Lane - Yellow")
            .unwrap();
        assert_eq!(
            yellow.occupancy,
            LaneOccupancy::Members(vec!["alice".to_string()])
        );
        // Blue and green rooms were never created
        let blue = report
            .lanes
            .iter()
            .find(|l| l.lane == "Lane - Blue")
            .unwrap();
        assert_eq!(blue.occupancy, LaneOccupancy::Missing);
    }

    #[tokio::test]
    async fn test_provision_lane_rooms() {
        let (controller, sim) = create_test_controller();
        sim.add_room("Lane - Yellow");

        let created = controller.provision_lane_rooms().await.unwrap();
        assert_eq!(
            created,
            vec!["Lane - Blue".to_string(), "Lane - Green".to_string()]
        );

        // Second call finds everything in place
        assert!(controller.provision_lane_rooms().await.unwrap().is_empty());
    }
}
