//! In-memory platform implementation
//!
//! `SimPlatform` models just enough of a chat/voice platform to exercise the
//! coordinator end to end: named voice rooms with members, announcement
//! artifacts with selector marks, notices, a toggleable move permission, and
//! per-participant move-failure injection. It backs the binary's local session
//! as well as the unit and integration tests.

use crate::error::{MarshalError, Result};
use crate::platform::gateway::PlatformGateway;
use crate::types::{ArtifactRef, ParticipantId, RoomId, ScopeId, Selector};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct SimState {
    next_room_id: RoomId,
    next_artifact_ref: ArtifactRef,
    rooms: HashMap<RoomId, RoomState>,
    artifacts: HashMap<ArtifactRef, ArtifactState>,
    display_names: HashMap<ParticipantId, String>,
    notices: Vec<(ScopeId, String)>,
    move_permission: bool,
    fail_selector_attach: bool,
    failing_moves: HashSet<ParticipantId>,
    move_count: u64,
}

#[derive(Debug)]
struct RoomState {
    name: String,
    category: Option<String>,
    members: Vec<ParticipantId>,
}

#[derive(Debug)]
struct ArtifactState {
    scope: ScopeId,
    content: String,
    marks: Vec<(ParticipantId, Selector)>,
}

/// Scriptable in-memory platform
#[derive(Debug)]
pub struct SimPlatform {
    state: Mutex<SimState>,
}

impl Default for SimPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl SimPlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                next_room_id: 9000,
                next_artifact_ref: 100,
                move_permission: true,
                ..SimState::default()
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SimState>> {
        self.state.lock().map_err(|_| {
            MarshalError::Internal {
                message: "Failed to acquire sim state lock".to_string(),
            }
            .into()
        })
    }

    /// Create a room directly (test/scenario setup)
    pub fn add_room(&self, name: &str) -> RoomId {
        let mut state = self.state.lock().expect("sim state lock");
        let id = state.next_room_id;
        state.next_room_id += 1;
        state.rooms.insert(
            id,
            RoomState {
                name: name.to_string(),
                category: None,
                members: Vec::new(),
            },
        );
        id
    }

    /// Put a participant into a room, leaving any previous one
    pub fn place(&self, participant: ParticipantId, room: RoomId) {
        let mut state = self.state.lock().expect("sim state lock");
        for r in state.rooms.values_mut() {
            r.members.retain(|m| *m != participant);
        }
        if let Some(r) = state.rooms.get_mut(&room) {
            r.members.push(participant);
        }
    }

    /// Disconnect a participant from voice entirely
    pub fn disconnect(&self, participant: ParticipantId) {
        let mut state = self.state.lock().expect("sim state lock");
        for r in state.rooms.values_mut() {
            r.members.retain(|m| *m != participant);
        }
    }

    pub fn set_display_name(&self, participant: ParticipantId, name: &str) {
        let mut state = self.state.lock().expect("sim state lock");
        state.display_names.insert(participant, name.to_string());
    }

    pub fn set_move_permission(&self, allowed: bool) {
        let mut state = self.state.lock().expect("sim state lock");
        state.move_permission = allowed;
    }

    /// Make selector seeding on announcements fail with a transient error
    pub fn fail_selector_attach(&self, fail: bool) {
        let mut state = self.state.lock().expect("sim state lock");
        state.fail_selector_attach = fail;
    }

    /// Make every move for this participant fail with a transient error
    pub fn fail_moves_for(&self, participant: ParticipantId) {
        let mut state = self.state.lock().expect("sim state lock");
        state.failing_moves.insert(participant);
    }

    /// The room a participant currently sits in (scenario assertions)
    pub fn participant_room(&self, participant: ParticipantId) -> Option<RoomId> {
        let state = self.state.lock().expect("sim state lock");
        state
            .rooms
            .iter()
            .find(|(_, r)| r.members.contains(&participant))
            .map(|(id, _)| *id)
    }

    /// Category a room was provisioned under, if any
    pub fn room_category(&self, room: RoomId) -> Option<String> {
        let state = self.state.lock().expect("sim state lock");
        state.rooms.get(&room).and_then(|r| r.category.clone())
    }

    pub fn room_id(&self, name: &str) -> Option<RoomId> {
        let state = self.state.lock().expect("sim state lock");
        state
            .rooms
            .iter()
            .find(|(_, r)| r.name == name)
            .map(|(id, _)| *id)
    }

    pub fn notices(&self) -> Vec<(ScopeId, String)> {
        let state = self.state.lock().expect("sim state lock");
        state.notices.clone()
    }

    pub fn artifact_exists(&self, artifact: ArtifactRef) -> bool {
        let state = self.state.lock().expect("sim state lock");
        state.artifacts.contains_key(&artifact)
    }

    /// Selector marks currently on an artifact
    pub fn marks(&self, artifact: ArtifactRef) -> Vec<(ParticipantId, Selector)> {
        let state = self.state.lock().expect("sim state lock");
        state
            .artifacts
            .get(&artifact)
            .map(|a| a.marks.clone())
            .unwrap_or_default()
    }

    /// Total successful move operations issued so far
    pub fn move_count(&self) -> u64 {
        let state = self.state.lock().expect("sim state lock");
        state.move_count
    }

    /// Record a selector mark the way the platform would on a reaction
    pub fn mark_selector(&self, artifact: ArtifactRef, participant: ParticipantId, selector: &str) {
        let mut state = self.state.lock().expect("sim state lock");
        if let Some(a) = state.artifacts.get_mut(&artifact) {
            let mark = (participant, selector.to_string());
            if !a.marks.contains(&mark) {
                a.marks.push(mark);
            }
        }
    }

    /// Drop a selector mark the way the platform would on a reaction removal
    pub fn unmark_selector(
        &self,
        artifact: ArtifactRef,
        participant: ParticipantId,
        selector: &str,
    ) {
        let mut state = self.state.lock().expect("sim state lock");
        if let Some(a) = state.artifacts.get_mut(&artifact) {
            a.marks
                .retain(|(p, s)| !(*p == participant && s == selector));
        }
    }

    /// The most recently posted announcement, if any (scenario assertions)
    pub fn latest_artifact(&self) -> Option<(ArtifactRef, ScopeId, String)> {
        let state = self.state.lock().expect("sim state lock");
        state
            .artifacts
            .iter()
            .max_by_key(|(id, _)| **id)
            .map(|(id, a)| (*id, a.scope, a.content.clone()))
    }
}

#[async_trait]
impl PlatformGateway for SimPlatform {
    async fn send_announcement(&self, scope: ScopeId, content: String) -> Result<ArtifactRef> {
        let mut state = self.lock()?;
        let artifact = state.next_artifact_ref;
        state.next_artifact_ref += 1;
        state.artifacts.insert(
            artifact,
            ArtifactState {
                scope,
                content,
                marks: Vec::new(),
            },
        );
        Ok(artifact)
    }

    async fn send_notice(&self, scope: ScopeId, content: String) -> Result<()> {
        let mut state = self.lock()?;
        state.notices.push((scope, content));
        Ok(())
    }

    async fn attach_selectors(&self, artifact: ArtifactRef, _selectors: &[Selector]) -> Result<()> {
        let state = self.lock()?;
        if state.fail_selector_attach {
            return Err(MarshalError::Transient {
                message: format!("failed to seed selectors on artifact {artifact}"),
            }
            .into());
        }
        if state.artifacts.contains_key(&artifact) {
            Ok(())
        } else {
            Err(MarshalError::Transient {
                message: format!("artifact {artifact} is gone"),
            }
            .into())
        }
    }

    async fn remove_selector(
        &self,
        artifact: ArtifactRef,
        participant: ParticipantId,
        selector: &str,
    ) -> Result<()> {
        self.unmark_selector(artifact, participant, selector);
        Ok(())
    }

    async fn delete_artifact(&self, artifact: ArtifactRef) -> Result<()> {
        let mut state = self.lock()?;
        state.artifacts.remove(&artifact);
        Ok(())
    }

    async fn current_room(&self, participant: ParticipantId) -> Result<Option<RoomId>> {
        Ok(self.participant_room(participant))
    }

    async fn find_room(&self, name: &str) -> Result<Option<RoomId>> {
        Ok(self.room_id(name))
    }

    async fn ensure_room(&self, name: &str, category: &str) -> Result<RoomId> {
        if let Some(id) = self.room_id(name) {
            return Ok(id);
        }
        let mut state = self.lock()?;
        let id = state.next_room_id;
        state.next_room_id += 1;
        state.rooms.insert(
            id,
            RoomState {
                name: name.to_string(),
                category: Some(category.to_string()),
                members: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn move_participant(&self, participant: ParticipantId, target: RoomId) -> Result<()> {
        let mut state = self.lock()?;
        if !state.move_permission {
            return Err(MarshalError::Forbidden.into());
        }
        if state.failing_moves.contains(&participant) {
            return Err(MarshalError::Transient {
                message: format!("move failed for participant {participant}"),
            }
            .into());
        }
        if !state.rooms.contains_key(&target) {
            return Err(MarshalError::Transient {
                message: format!("room {target} is gone"),
            }
            .into());
        }
        for r in state.rooms.values_mut() {
            r.members.retain(|m| *m != participant);
        }
        if let Some(r) = state.rooms.get_mut(&target) {
            r.members.push(participant);
        }
        state.move_count += 1;
        Ok(())
    }

    async fn room_members(&self, room: RoomId) -> Result<Vec<String>> {
        let state = self.lock()?;
        let members = state
            .rooms
            .get(&room)
            .map(|r| r.members.clone())
            .unwrap_or_default();
        Ok(members
            .into_iter()
            .map(|p| {
                state
                    .display_names
                    .get(&p)
                    .cloned()
                    .unwrap_or_else(|| format!("user-{p}"))
            })
            .collect())
    }

    async fn has_move_permission(&self, _scope: ScopeId) -> Result<bool> {
        Ok(self.lock()?.move_permission)
    }

    async fn display_name(&self, participant: ParticipantId) -> String {
        let state = self.state.lock().expect("sim state lock");
        state
            .display_names
            .get(&participant)
            .cloned()
            .unwrap_or_else(|| format!("user-{participant}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rooms_and_moves() {
        let sim = SimPlatform::new();
        let lobby = sim.add_room("General");
        let yellow = sim.add_room("Lane - Yellow");

        sim.place(42, lobby);
        assert_eq!(sim.current_room(42).await.unwrap(), Some(lobby));

        sim.move_participant(42, yellow).await.unwrap();
        assert_eq!(sim.current_room(42).await.unwrap(), Some(yellow));
        assert_eq!(sim.room_members(lobby).await.unwrap().len(), 0);
        assert_eq!(sim.move_count(), 1);
    }

    #[tokio::test]
    async fn test_move_failure_injection() {
        let sim = SimPlatform::new();
        let room = sim.add_room("Lane - Blue");
        sim.fail_moves_for(7);

        assert!(sim.move_participant(7, room).await.is_err());
        assert_eq!(sim.move_count(), 0);
    }

    #[tokio::test]
    async fn test_ensure_room_is_idempotent() {
        let sim = SimPlatform::new();
        let first = sim.ensure_room("Lane - Green", "Lane Assignments").await.unwrap();
        let second = sim.ensure_room("Lane - Green", "Lane Assignments").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(sim.room_category(first), Some("Lane Assignments".to_string()));
    }

    #[tokio::test]
    async fn test_artifacts_and_marks() {
        let sim = SimPlatform::new();
        let artifact = sim.send_announcement(1, "hello".to_string()).await.unwrap();

        sim.mark_selector(artifact, 42, "y");
        sim.mark_selector(artifact, 42, "y"); // duplicate ignored
        assert_eq!(sim.marks(artifact).len(), 1);

        sim.remove_selector(artifact, 42, "y").await.unwrap();
        assert!(sim.marks(artifact).is_empty());

        sim.delete_artifact(artifact).await.unwrap();
        assert!(!sim.artifact_exists(artifact));
    }
}
