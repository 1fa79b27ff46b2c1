use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// String-backed identifiers.
///
/// Players, NPCs, rooms and trees are keyed by ids that come from content
/// files and the surrounding world, so they wrap a `String` rather than a UUID.
macro_rules! define_key {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_key!(PlayerId);
define_key!(NpcId);
define_key!(RoomId);
define_key!(TreeId);
define_key!(SessionId);
define_key!(ConversationId);

impl ConversationId {
    /// Build a globally unique conversation id.
    ///
    /// Format: `<provider>_<player>_<npc>_<unix millis>_<suffix>`. The random
    /// suffix keeps two conversations created in the same millisecond apart.
    pub fn generate(
        provider_id: &str,
        player_id: &PlayerId,
        npc_id: &NpcId,
        created_at: DateTime<Utc>,
    ) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}_{}_{}_{}_{}",
            provider_id,
            player_id,
            npc_id,
            created_at.timestamp_millis(),
            &suffix[..8]
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_conversation_ids_embed_their_parts() {
        let now = Utc::now();
        let id = ConversationId::generate(
            "canned",
            &PlayerId::new("alice"),
            &NpcId::new("smith"),
            now,
        );

        let text = id.as_str();
        assert!(text.starts_with("canned_alice_smith_"));
        assert!(text.contains(&now.timestamp_millis().to_string()));
    }

    #[test]
    fn generated_conversation_ids_are_unique_within_the_same_instant() {
        let now = Utc::now();
        let player = PlayerId::new("alice");
        let npc = NpcId::new("smith");

        let a = ConversationId::generate("canned", &player, &npc, now);
        let b = ConversationId::generate("canned", &player, &npc, now);

        assert_ne!(a, b);
    }

    #[test]
    fn keys_serialize_as_plain_strings() {
        let json = serde_json::to_string(&NpcId::new("guard")).expect("serialize");
        assert_eq!(json, "\"guard\"");
    }
}
