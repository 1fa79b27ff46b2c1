//! TaleWeave Engine library.
//!
//! Server-side NPC conversation engine.
//!
//! ## Structure
//!
//! - `stores/` - Dialogue trees, NPC bindings and the conversation table
//! - `use_cases/` - Rules, providers and the dialogue manager
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `api/` - Player command entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod stores;
pub mod use_cases;

/// Test fixtures shared across modules.
#[cfg(test)]
pub mod test_fixtures;

pub use app::App;
