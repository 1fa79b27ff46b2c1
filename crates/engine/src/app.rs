//! Application state and composition.

use std::sync::Arc;

use taleweave_domain::{PlayerState, SessionId};

use crate::api::{CommandRegistry, DialogueCommands};
use crate::infrastructure::{
    clock::{SystemClock, SystemRandom},
    effects::LoggingGameEffects,
    event_sink::TracingEventSink,
    in_memory::{InMemoryPlayers, InMemorySessions, InMemoryWorld},
    ports::{ClockPort, DialogueEventSink, RandomPort},
    settings::DialogueSettings,
    snapshot::JsonSnapshotFile,
};
use crate::stores::{DialogueTreeStore, LoadReport, NpcBindingRegistry};
use crate::use_cases::dialogue::{
    ActionExecutor, ConditionEvaluator, ContextBuilder, DialogueManager, DialogueManagerConfig,
    DialogueRuntime, ScriptedTreeProvider, VariableResolver,
};

/// NPC placements file under the content root.
pub const NPCS_FILE: &str = "npcs.yaml";

/// Main application state.
///
/// Owns the stores, the dialogue manager and the command registry. The
/// scripted provider is registered under the configured default provider id.
pub struct App {
    pub settings: DialogueSettings,
    pub players: Arc<InMemoryPlayers>,
    pub world: Arc<InMemoryWorld>,
    pub sessions: Arc<InMemorySessions>,
    pub trees: Arc<DialogueTreeStore>,
    pub bindings: Arc<NpcBindingRegistry>,
    pub manager: Arc<DialogueManager>,
    pub commands: CommandRegistry,
}

impl App {
    pub fn new(settings: DialogueSettings) -> Self {
        Self::with_clock(
            settings,
            Arc::new(SystemClock::new()),
            Arc::new(SystemRandom::new()),
        )
    }

    /// Wire everything up around the given time and randomness sources.
    pub fn with_clock(
        settings: DialogueSettings,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        let players = Arc::new(InMemoryPlayers::new());
        let world = Arc::new(InMemoryWorld::new(clock.clone()));
        let sessions = Arc::new(InMemorySessions::new());
        let events: Arc<dyn DialogueEventSink> = Arc::new(TracingEventSink::new());
        let trees = Arc::new(DialogueTreeStore::new());
        let bindings = Arc::new(NpcBindingRegistry::new(trees.clone()));

        let runtime = Arc::new(DialogueRuntime::new(
            ContextBuilder::new(players.clone(), world.clone(), clock.clone()),
            ConditionEvaluator::new(random, clock.clone()),
            ActionExecutor::new(
                Arc::new(LoggingGameEffects::new()),
                events.clone(),
                clock.clone(),
            ),
            VariableResolver::new(),
            events,
            clock.clone(),
        ));

        let manager = DialogueManager::new(DialogueManagerConfig::from(&settings), clock)
            .with_snapshots(Arc::new(JsonSnapshotFile::new(settings.autosave_path.clone())));
        manager.register_provider(Arc::new(ScriptedTreeProvider::new(
            settings.default_provider.clone(),
            bindings.clone(),
            trees.clone(),
            runtime,
        )));
        let manager = Arc::new(manager);

        let dialogue = Arc::new(DialogueCommands::new(
            manager.clone(),
            sessions.clone(),
            players.clone(),
            world.clone(),
        ));
        let mut commands = CommandRegistry::new();
        dialogue.register(&mut commands);

        Self {
            settings,
            players,
            world,
            sessions,
            trees,
            bindings,
            manager,
            commands,
        }
    }

    /// Load trees, NPC placements and configured bindings.
    pub async fn load_content(&self) -> LoadReport {
        let report = self.trees.load(&self.settings.content_path).await;

        let npcs_path = self.settings.content_path.join(NPCS_FILE);
        if npcs_path.is_file() {
            match self.world.load_npcs(&npcs_path).await {
                Ok(count) => tracing::info!(count, path = %npcs_path.display(), "NPCs placed"),
                Err(e) => {
                    tracing::warn!(error = %e, path = %npcs_path.display(), "Could not load NPCs")
                }
            }
        }

        let bound = self.bindings.bind_all(&self.settings.npc_bindings);
        tracing::info!(bound, "NPC bindings applied");
        report
    }

    /// Restore the last snapshot and start the background tasks.
    pub async fn start(&self) -> usize {
        let restored = self.manager.restore().await;
        self.manager.spawn_background().await;
        restored
    }

    /// Put a player in the world and attach them to a session.
    pub async fn join(&self, session_id: SessionId, player: PlayerState) {
        let player_id = player.id.clone();
        self.players.upsert(player).await;
        self.sessions.bind(session_id, player_id).await;
    }

    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
    }
}
