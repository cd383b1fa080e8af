//! Platform adapter layer
//!
//! The coordinator talks to the chat/voice platform through the
//! `PlatformGateway` trait. `SimPlatform` is the in-memory implementation used
//! by the local session binary and the test suite; `intent` classifies
//! free-form control phrases into typed intents.

pub mod gateway;
pub mod intent;
pub mod sim;

pub use gateway::PlatformGateway;
pub use sim::SimPlatform;
