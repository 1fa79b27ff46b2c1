//! Use cases - User story orchestration.

pub mod dialogue;

pub use dialogue::{DialogueError, DialogueManager, DialogueProvider, ScriptedTreeProvider};
