//! Player command adapter.
//!
//! Turns console or chat lines into dialogue manager calls and renders the
//! result as plain text. Commands:
//!
//! - `talk <npc>` (alias `converse`)
//! - `respond <text>`
//! - `dialogue start|continue|end|status [target]`
//!
//! NPCs are matched by case-insensitive substring against name or short
//! description among the NPCs in the player's room; the first match wins.
//! `respond` always goes to the player's oldest conversation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use taleweave_domain::{ConversationId, DialogueResponse, NpcId, NpcInfo, PlayerId, SessionId};

use super::error_sanitizer::{dialogue_error_message, messages, sanitize_error};
use crate::infrastructure::ports::{PlayerStatePort, SessionPort, WorldPort};
use crate::use_cases::dialogue::DialogueManager;

/// Appended when a response closes the conversation. Clients match on it.
pub const CONVERSATION_ENDED: &str = "[This conversation has ended]";

const NOT_IN_GAME: &str = "You are not in the game.";
const NOT_TALKING: &str = "You are not talking to anyone.";
const DIALOGUE_USAGE: &str =
    "Usage: dialogue start <npc> | continue [conversation] <text> | end [conversation] | status";

#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// `args` excludes the command word; `raw_line` is the full input.
    async fn handle(&self, session_id: &SessionId, args: &[String], raw_line: &str)
        -> Option<String>;
}

/// Command names and aliases mapped to handlers.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
    names: Vec<String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, aliases: &[&str], handler: Arc<dyn CommandHandler>) {
        for key in std::iter::once(&name).chain(aliases) {
            let key = key.to_lowercase();
            if self.handlers.insert(key.clone(), Arc::clone(&handler)).is_some() {
                tracing::warn!(command = %key, "Command registered twice, later handler wins");
            }
        }
        self.names.push(name.to_lowercase());
    }

    /// Primary command names in registration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Run the command on `raw_line`. `None` when the line is blank or
    /// names no registered command.
    pub async fn dispatch(&self, session_id: &SessionId, raw_line: &str) -> Option<String> {
        let mut words = raw_line.split_whitespace();
        let command = words.next()?.to_lowercase();
        let handler = self.handlers.get(&command)?;
        let args: Vec<String> = words.map(str::to_string).collect();
        tracing::debug!(session_id = %session_id, command = %command, "Dispatching command");
        handler.handle(session_id, &args, raw_line).await
    }
}

/// Everything after the command word, with inner spacing kept.
fn rest_of_line(raw_line: &str) -> &str {
    raw_line
        .trim_start()
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .unwrap_or("")
}

/// Render a response for the player.
pub fn render(npc_name: &str, response: &DialogueResponse) -> String {
    let mut lines = vec![format!("{npc_name} says, \"{}\"", response.message)];
    if let Some(choices) = &response.choices {
        for (index, choice) in choices.iter().enumerate() {
            lines.push(format!("  {}. {}", index + 1, choice.text));
        }
    }
    lines.push(format!("[conversation: {}]", response.conversation_id));
    if response.is_complete {
        lines.push(CONVERSATION_ENDED.to_string());
    }
    lines.join("\n")
}

/// Dialogue commands over the manager.
pub struct DialogueCommands {
    manager: Arc<DialogueManager>,
    sessions: Arc<dyn SessionPort>,
    players: Arc<dyn PlayerStatePort>,
    world: Arc<dyn WorldPort>,
}

impl DialogueCommands {
    pub fn new(
        manager: Arc<DialogueManager>,
        sessions: Arc<dyn SessionPort>,
        players: Arc<dyn PlayerStatePort>,
        world: Arc<dyn WorldPort>,
    ) -> Self {
        Self {
            manager,
            sessions,
            players,
            world,
        }
    }

    /// Register `talk`, `respond` and `dialogue`.
    pub fn register(self: &Arc<Self>, registry: &mut CommandRegistry) {
        registry.register("talk", &["converse"], Arc::new(TalkCommand(Arc::clone(self))));
        registry.register("respond", &[], Arc::new(RespondCommand(Arc::clone(self))));
        registry.register("dialogue", &[], Arc::new(DialogueCommand(Arc::clone(self))));
    }

    async fn player(&self, session_id: &SessionId) -> Result<PlayerId, String> {
        self.sessions
            .player_for_session(session_id)
            .await
            .ok_or_else(|| NOT_IN_GAME.to_string())
    }

    pub async fn talk(&self, session_id: &SessionId, query: &str) -> String {
        let player_id = match self.player(session_id).await {
            Ok(player_id) => player_id,
            Err(message) => return message,
        };
        if query.is_empty() {
            return "Talk to whom?".to_string();
        }

        let npc = match self.find_npc(&player_id, query).await {
            Ok(Some(npc)) => npc,
            Ok(None) => return format!("You don't see '{query}' here."),
            Err(message) => return message,
        };
        if !self.manager.can_handle(&npc.id, None) {
            return format!("{} doesn't seem interested in talking.", npc.name);
        }

        match self.manager.start(&player_id, &npc.id, None).await {
            Ok(response) => render(&npc.name, &response),
            Err(e) => dialogue_error_message(&e, "starting a conversation"),
        }
    }

    pub async fn respond(&self, session_id: &SessionId, input: &str) -> String {
        let player_id = match self.player(session_id).await {
            Ok(player_id) => player_id,
            Err(message) => return message,
        };
        if input.is_empty() {
            return "Respond with what?".to_string();
        }
        match self.manager.first_for_player(&player_id) {
            Some(conversation_id) => self.continue_in(&player_id, &conversation_id, input).await,
            None => NOT_TALKING.to_string(),
        }
    }

    pub async fn dialogue(&self, session_id: &SessionId, args: &[String]) -> String {
        let Some(sub) = args.first() else {
            return DIALOGUE_USAGE.to_string();
        };
        let rest = &args[1..];
        match sub.to_lowercase().as_str() {
            "start" => self.talk(session_id, &rest.join(" ")).await,
            "continue" => {
                let player_id = match self.player(session_id).await {
                    Ok(player_id) => player_id,
                    Err(message) => return message,
                };
                self.continue_targeted(&player_id, rest).await
            }
            "end" => {
                let player_id = match self.player(session_id).await {
                    Ok(player_id) => player_id,
                    Err(message) => return message,
                };
                self.end(&player_id, rest.first().map(String::as_str)).await
            }
            "status" => {
                let player_id = match self.player(session_id).await {
                    Ok(player_id) => player_id,
                    Err(message) => return message,
                };
                self.status(&player_id).await
            }
            _ => DIALOGUE_USAGE.to_string(),
        }
    }

    /// `[conversation-id] <text>`; without a known id the oldest conversation is used.
    async fn continue_targeted(&self, player_id: &PlayerId, args: &[String]) -> String {
        let owned = self.manager.active_for_player(player_id).await;
        let named = args.first().and_then(|first| {
            owned
                .iter()
                .find(|state| state.conversation_id.as_str() == first)
                .map(|state| state.conversation_id.clone())
        });

        let (conversation_id, input) = match named {
            Some(id) => (id, args[1..].join(" ")),
            None => match owned.first() {
                Some(state) => (state.conversation_id.clone(), args.join(" ")),
                None => return NOT_TALKING.to_string(),
            },
        };
        if input.is_empty() {
            return "Continue with what?".to_string();
        }
        self.continue_in(player_id, &conversation_id, &input).await
    }

    async fn continue_in(
        &self,
        player_id: &PlayerId,
        conversation_id: &ConversationId,
        input: &str,
    ) -> String {
        let Some(state) = self.manager.get_state(conversation_id).await else {
            return messages::NO_CONVERSATION.to_string();
        };
        let npc_name = self.npc_name(&state.npc_id).await;

        match self
            .manager
            .continue_conversation(player_id, &state.npc_id, input, conversation_id)
            .await
        {
            Ok(response) => render(&npc_name, &response),
            Err(e) => dialogue_error_message(&e, "continuing a conversation"),
        }
    }

    async fn end(&self, player_id: &PlayerId, target: Option<&str>) -> String {
        let conversation_id = match target {
            Some(id) => ConversationId::new(id),
            None => match self.manager.first_for_player(player_id) {
                Some(id) => id,
                None => return NOT_TALKING.to_string(),
            },
        };
        let Some(state) = self.manager.get_state(&conversation_id).await else {
            return messages::NO_CONVERSATION.to_string();
        };

        match self
            .manager
            .end(player_id, &state.npc_id, &conversation_id)
            .await
        {
            Ok(()) => format!(
                "You end the conversation with {}.\n{CONVERSATION_ENDED}",
                self.npc_name(&state.npc_id).await
            ),
            Err(e) => dialogue_error_message(&e, "ending a conversation"),
        }
    }

    async fn status(&self, player_id: &PlayerId) -> String {
        let states = self.manager.active_for_player(player_id).await;
        if states.is_empty() {
            return "You are not in any conversations.".to_string();
        }

        let mut lines = vec![format!("Active conversations ({}):", states.len())];
        for state in states {
            lines.push(format!(
                "  {} [conversation: {}] turn {}",
                self.npc_name(&state.npc_id).await,
                state.conversation_id,
                state.turn_count
            ));
        }
        lines.join("\n")
    }

    async fn find_npc(&self, player_id: &PlayerId, query: &str) -> Result<Option<NpcInfo>, String> {
        let player = self
            .players
            .load(player_id)
            .await
            .map_err(|e| sanitize_error(&e, "loading the player"))?;
        let Some(room_id) = player.room_id else {
            return Ok(None);
        };
        let npcs = self
            .world
            .npcs_in_room(&room_id)
            .await
            .map_err(|e| sanitize_error(&e, "looking around the room"))?;
        Ok(npcs.into_iter().find(|npc| npc.matches(query)))
    }

    async fn npc_name(&self, npc_id: &NpcId) -> String {
        match self.world.npc(npc_id).await {
            Ok(Some(npc)) => npc.name,
            _ => npc_id.to_string(),
        }
    }
}

struct TalkCommand(Arc<DialogueCommands>);

#[async_trait]
impl CommandHandler for TalkCommand {
    async fn handle(&self, session_id: &SessionId, _args: &[String], raw_line: &str) -> Option<String> {
        Some(self.0.talk(session_id, rest_of_line(raw_line)).await)
    }
}

struct RespondCommand(Arc<DialogueCommands>);

#[async_trait]
impl CommandHandler for RespondCommand {
    async fn handle(&self, session_id: &SessionId, _args: &[String], raw_line: &str) -> Option<String> {
        Some(self.0.respond(session_id, rest_of_line(raw_line)).await)
    }
}

struct DialogueCommand(Arc<DialogueCommands>);

#[async_trait]
impl CommandHandler for DialogueCommand {
    async fn handle(&self, session_id: &SessionId, args: &[String], _raw_line: &str) -> Option<String> {
        Some(self.0.dialogue(session_id, args).await)
    }
}
