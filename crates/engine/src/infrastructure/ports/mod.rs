//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions between the dialogue engine and the rest
//! of the game. Everything else is concrete types.
//! Ports exist for:
//! - Player and world state (owned by the game, read every turn)
//! - Inventory/quest effects (owned by other subsystems)
//! - Event emission and crash-recovery snapshots
//! - Session lookup for the command adapter
//! - Clock/Random (for testing)

mod error;
mod external;
mod testing;
pub mod types;

// =============================================================================
// Collaborator Ports
// =============================================================================
pub use external::{
    CustomActionHandler, DialogueEventSink, GameEffectsPort, PlayerStatePort, SessionPort,
    SnapshotPort, WorldPort,
};

pub use types::ConversationSnapshot;

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use external::{
    MockCustomActionHandler, MockDialogueEventSink, MockGameEffectsPort, MockPlayerStatePort,
    MockSessionPort, MockSnapshotPort, MockWorldPort,
};

#[cfg(test)]
pub use testing::{MockClockPort, MockRandomPort};

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::{ClockPort, RandomPort};

// =============================================================================
// Error Types
// =============================================================================
pub use error::PortError;
