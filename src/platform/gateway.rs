//! Abstract capability set of the chat/voice platform
//!
//! The core consumes the platform through this trait only. Every call is a
//! potentially slow, fallible network operation; none of them is invoked while
//! a store lock is held, and best-effort callers swallow failures after one
//! attempt.

use crate::error::Result;
use crate::types::{ArtifactRef, ParticipantId, RoomId, ScopeId, Selector};
use async_trait::async_trait;

/// Outbound operations the coordinator needs from the platform
#[async_trait]
pub trait PlatformGateway: Send + Sync {
    /// Post the match announcement and return a handle to it
    async fn send_announcement(&self, scope: ScopeId, content: String) -> Result<ArtifactRef>;

    /// Post a short notice (confirmation or rejection) to the scope
    async fn send_notice(&self, scope: ScopeId, content: String) -> Result<()>;

    /// Seed the announcement with the selectable lane symbols
    async fn attach_selectors(&self, artifact: ArtifactRef, selectors: &[Selector]) -> Result<()>;

    /// Remove one participant's selector mark from the announcement
    async fn remove_selector(
        &self,
        artifact: ArtifactRef,
        participant: ParticipantId,
        selector: &str,
    ) -> Result<()>;

    /// Delete the announcement artifact (best-effort at termination)
    async fn delete_artifact(&self, artifact: ArtifactRef) -> Result<()>;

    /// The voice room a participant currently occupies, if any
    async fn current_room(&self, participant: ParticipantId) -> Result<Option<RoomId>>;

    /// Look up a voice room by name
    async fn find_room(&self, name: &str) -> Result<Option<RoomId>>;

    /// Idempotently create a voice room under a category
    async fn ensure_room(&self, name: &str, category: &str) -> Result<RoomId>;

    /// Move a participant into a voice room
    async fn move_participant(&self, participant: ParticipantId, target: RoomId) -> Result<()>;

    /// Current member display names of a voice room, in platform order
    async fn room_members(&self, room: RoomId) -> Result<Vec<String>>;

    /// Whether the coordinator holds the move-members permission in this scope
    async fn has_move_permission(&self, scope: ScopeId) -> Result<bool>;

    /// Display name of a participant
    async fn display_name(&self, participant: ParticipantId) -> String;
}
