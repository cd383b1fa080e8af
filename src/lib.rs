//! Lane Marshal - match lifecycle and lane assignment coordinator
//!
//! This crate runs one timed match per scope: participants pick a team lane by
//! applying a selector to the announcement artifact, get moved into that
//! lane's voice room, and are returned to their origin room when the match
//! ends, expires, or they withdraw.

pub mod config;
pub mod error;
pub mod lanes;
pub mod matches;
pub mod platform;
pub mod render;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MarshalError, Result};
pub use types::*;

// Re-export key components
pub use lanes::{Lane, LaneRegistry};
pub use matches::{MatchController, MatchRecord, MatchStore};
pub use platform::{PlatformGateway, SimPlatform};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
