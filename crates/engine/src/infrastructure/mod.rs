//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod clock;
pub mod dialogue_files;
pub mod effects;
pub mod event_sink;
pub mod in_memory;
pub mod ports;
pub mod settings;
pub mod snapshot;
