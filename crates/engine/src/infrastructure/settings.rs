//! Dialogue engine settings.
//!
//! Loaded from environment variables (after `.env` via `dotenvy`). Every
//! field has a default; a value that fails to parse falls back to it with a
//! warning rather than aborting startup.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const ENV_CONTENT_PATH: &str = "TALEWEAVE_CONTENT_PATH";
pub const ENV_DEFAULT_PROVIDER: &str = "TALEWEAVE_DEFAULT_PROVIDER";
pub const ENV_MAX_CONVERSATIONS: &str = "TALEWEAVE_MAX_CONVERSATIONS_PER_PLAYER";
pub const ENV_TIMEOUT_MINUTES: &str = "TALEWEAVE_CONVERSATION_TIMEOUT_MINUTES";
pub const ENV_AUTOSAVE_INTERVAL: &str = "TALEWEAVE_AUTOSAVE_INTERVAL_SECS";
pub const ENV_AUTOSAVE_PATH: &str = "TALEWEAVE_AUTOSAVE_PATH";
pub const ENV_SWEEP_INTERVAL: &str = "TALEWEAVE_SWEEP_INTERVAL_SECS";
pub const ENV_NPC_BINDINGS: &str = "TALEWEAVE_NPC_BINDINGS";
pub const ENV_START_ROOM: &str = "TALEWEAVE_START_ROOM";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueSettings {
    /// Content root; trees are read from its `dialogue` folder.
    pub content_path: PathBuf,
    /// Provider used when a caller does not name one.
    pub default_provider: String,
    pub max_conversations_per_player: usize,
    pub timeout_minutes: u64,
    /// Seconds between autosaves; 0 disables.
    pub autosave_interval_secs: u64,
    pub autosave_path: PathBuf,
    /// Seconds between idle sweeps; 0 disables.
    pub sweep_interval_secs: u64,
    /// NPC id -> tree id.
    pub npc_bindings: HashMap<String, String>,
    /// Room the console player starts in.
    pub start_room: String,
}

impl Default for DialogueSettings {
    fn default() -> Self {
        Self {
            content_path: PathBuf::from("./content"),
            default_provider: "canned".to_string(),
            max_conversations_per_player: 3,
            timeout_minutes: 30,
            autosave_interval_secs: 300,
            autosave_path: PathBuf::from("./data/conversations.json"),
            sweep_interval_secs: 0,
            npc_bindings: HashMap::new(),
            start_room: "town_square".to_string(),
        }
    }
}

impl DialogueSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            content_path: text(ENV_CONTENT_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.content_path),
            default_provider: text(ENV_DEFAULT_PROVIDER).unwrap_or(defaults.default_provider),
            max_conversations_per_player: parse_or(
                ENV_MAX_CONVERSATIONS,
                text(ENV_MAX_CONVERSATIONS),
                defaults.max_conversations_per_player,
            ),
            timeout_minutes: parse_or(
                ENV_TIMEOUT_MINUTES,
                text(ENV_TIMEOUT_MINUTES),
                defaults.timeout_minutes,
            ),
            autosave_interval_secs: parse_or(
                ENV_AUTOSAVE_INTERVAL,
                text(ENV_AUTOSAVE_INTERVAL),
                defaults.autosave_interval_secs,
            ),
            autosave_path: text(ENV_AUTOSAVE_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.autosave_path),
            sweep_interval_secs: parse_or(
                ENV_SWEEP_INTERVAL,
                text(ENV_SWEEP_INTERVAL),
                defaults.sweep_interval_secs,
            ),
            npc_bindings: text(ENV_NPC_BINDINGS)
                .map(|raw| parse_bindings(&raw))
                .unwrap_or(defaults.npc_bindings),
            start_room: text(ENV_START_ROOM).unwrap_or(defaults.start_room),
        }
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match raw {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default = %default, "Invalid setting, using default");
            default
        }),
    }
}

/// Parse `npc=tree,npc=tree`. Malformed pairs are skipped.
pub fn parse_bindings(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (npc, tree) = pair.split_once('=')?;
            let (npc, tree) = (npc.trim(), tree.trim());
            if npc.is_empty() || tree.is_empty() {
                tracing::warn!(pair, "Ignoring malformed NPC binding");
                return None;
            }
            Some((npc.to_string(), tree.to_string()))
        })
        .collect()
}
