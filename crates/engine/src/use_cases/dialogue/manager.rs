//! Dialogue manager.
//!
//! Coordinates every conversation in the process:
//! - the provider registry
//! - the single authoritative conversation table
//! - per-player concurrency limits and the idle timeout
//! - autosave, idle sweep and shutdown
//!
//! Turns on one conversation are serialized by that conversation's lock in
//! the table; different conversations proceed in parallel. Starts are
//! serialized per player, so one player's slow start never holds up another.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use taleweave_domain::{
    ConversationId, ConversationState, DialogueResponse, NpcId, PlayerId, ProviderKind,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::DialogueError;
use super::provider::DialogueProvider;
use crate::infrastructure::ports::{ClockPort, ConversationSnapshot, PortError, SnapshotPort};
use crate::infrastructure::settings::DialogueSettings;
use crate::stores::{ConversationEntry, ConversationTable};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueManagerConfig {
    /// Provider used when `start` is not given one.
    pub default_provider: String,
    pub max_conversations_per_player: usize,
    pub timeout_minutes: u64,
    /// 0 disables the autosave task.
    pub autosave_interval_secs: u64,
    /// 0 disables the idle sweep task.
    pub sweep_interval_secs: u64,
}

impl Default for DialogueManagerConfig {
    fn default() -> Self {
        Self::from(&DialogueSettings::default())
    }
}

impl From<&DialogueSettings> for DialogueManagerConfig {
    fn from(settings: &DialogueSettings) -> Self {
        Self {
            default_provider: settings.default_provider.clone(),
            max_conversations_per_player: settings.max_conversations_per_player,
            timeout_minutes: settings.timeout_minutes,
            autosave_interval_secs: settings.autosave_interval_secs,
            sweep_interval_secs: settings.sweep_interval_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
    pub id: String,
    pub kind: ProviderKind,
}

/// Read-only view of the manager.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueStatistics {
    pub provider_count: usize,
    pub active_conversations: usize,
    pub providers: Vec<ProviderSummary>,
    pub config: DialogueManagerConfig,
}

pub struct DialogueManager {
    config: DialogueManagerConfig,
    providers: DashMap<String, Arc<dyn DialogueProvider>>,
    conversations: ConversationTable,
    /// Makes a player's capacity check and insert one step.
    start_locks: DashMap<PlayerId, Arc<Mutex<()>>>,
    clock: Arc<dyn ClockPort>,
    snapshots: Option<Arc<dyn SnapshotPort>>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DialogueManager {
    pub fn new(config: DialogueManagerConfig, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            config,
            providers: DashMap::new(),
            conversations: ConversationTable::new(),
            start_locks: DashMap::new(),
            clock,
            snapshots: None,
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Persist the table through `snapshots` on autosave and shutdown.
    pub fn with_snapshots(mut self, snapshots: Arc<dyn SnapshotPort>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    pub fn config(&self) -> &DialogueManagerConfig {
        &self.config
    }

    // =========================================================================
    // Providers
    // =========================================================================

    pub fn register_provider(&self, provider: Arc<dyn DialogueProvider>) {
        let id = provider.id().to_string();
        let kind = provider.kind();
        if self.providers.insert(id.clone(), provider).is_some() {
            tracing::warn!(provider_id = %id, "Replacing registered dialogue provider");
        }
        tracing::info!(provider_id = %id, kind = %kind, "Dialogue provider registered");
    }

    /// Remove a provider and end every conversation it owns.
    ///
    /// The provider leaves the registry first. A start already inside the
    /// provider notices on its way out and ends its own conversation.
    pub async fn unregister_provider(&self, provider_id: &str) -> bool {
        let Some((_, provider)) = self.providers.remove(provider_id) else {
            return false;
        };

        let mut ended = 0;
        for entry in self.conversations.entries_for_provider(provider_id) {
            let state = entry.state.lock().await;
            if !self.conversations.contains(&entry.conversation_id) {
                continue;
            }
            self.finish(Some(&provider), &entry, &state, "provider_unregistered")
                .await;
            ended += 1;
        }

        tracing::info!(provider_id, ended, "Dialogue provider unregistered");
        true
    }

    /// Whether `provider_id` (or the default provider) can talk as `npc_id`.
    pub fn can_handle(&self, npc_id: &NpcId, provider_id: Option<&str>) -> bool {
        let provider_id = provider_id.unwrap_or(self.config.default_provider.as_str());
        self.provider(provider_id)
            .map(|provider| provider.can_handle(npc_id))
            .unwrap_or(false)
    }

    fn provider(&self, provider_id: &str) -> Result<Arc<dyn DialogueProvider>, DialogueError> {
        self.providers
            .get(provider_id)
            .map(|p| Arc::clone(p.value()))
            .ok_or_else(|| DialogueError::not_found("dialogue provider", provider_id))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start a conversation.
    ///
    /// The per-player limit is checked before any provider is consulted.
    pub async fn start(
        &self,
        player_id: &PlayerId,
        npc_id: &NpcId,
        provider_id: Option<&str>,
    ) -> Result<DialogueResponse, DialogueError> {
        let lock = Arc::clone(
            self.start_locks
                .entry(player_id.clone())
                .or_default()
                .value(),
        );
        let _guard = lock.lock().await;

        let current = self.conversations.count_for_player(player_id);
        let max = self.config.max_conversations_per_player;
        if current >= max {
            tracing::debug!(player_id = %player_id, current, max, "Conversation limit reached");
            return Err(DialogueError::Capacity { current, max });
        }

        let provider_id = provider_id.unwrap_or(self.config.default_provider.as_str());
        let provider = self.provider(provider_id)?;
        if !provider.can_handle(npc_id) {
            return Err(DialogueError::not_found("dialogue for NPC", npc_id));
        }

        let response = provider.start(player_id, npc_id).await?;
        if response.is_complete || !response.state.is_active {
            return Ok(response);
        }
        let entry = self.conversations.insert(response.state.clone());

        if !self.providers.contains_key(provider_id) {
            tracing::warn!(
                conversation_id = %entry.conversation_id,
                provider_id,
                "Provider unregistered while starting, ending the new conversation"
            );
            let state = entry.state.lock().await;
            if self.conversations.contains(&entry.conversation_id) {
                self.finish(Some(&provider), &entry, &state, "provider_unregistered")
                    .await;
            }
            return Err(DialogueError::not_found("dialogue provider", provider_id));
        }
        Ok(response)
    }

    /// Advance a conversation with the player's input.
    pub async fn continue_conversation(
        &self,
        player_id: &PlayerId,
        npc_id: &NpcId,
        input: &str,
        conversation_id: &ConversationId,
    ) -> Result<DialogueResponse, DialogueError> {
        let entry = self.owned_entry(player_id, conversation_id)?;
        let mut state = entry.state.lock().await;
        if !self.conversations.contains(conversation_id) {
            return Err(DialogueError::not_found("conversation", conversation_id));
        }
        if entry.npc_id != *npc_id {
            tracing::debug!(
                conversation_id = %conversation_id,
                npc_id = %npc_id,
                conversation_npc = %entry.npc_id,
                "Continue names a different NPC than the conversation"
            );
        }

        if state.is_stale(self.clock.now(), self.config.timeout_minutes) {
            self.close(&entry, &state, "timeout").await;
            return Err(DialogueError::Timeout {
                conversation_id: conversation_id.clone(),
                idle_minutes: self.config.timeout_minutes,
            });
        }

        let provider = match self.provider(&entry.provider_id) {
            Ok(provider) => provider,
            Err(e) => {
                self.close(&entry, &state, "provider_unregistered").await;
                return Err(e);
            }
        };
        let response = provider
            .continue_conversation(state.clone(), input)
            .await?;

        if response.is_complete || !response.state.is_active {
            self.conversations.remove(conversation_id);
        } else {
            *state = response.state.clone();
        }
        Ok(response)
    }

    /// End a conversation on the player's request.
    pub async fn end(
        &self,
        player_id: &PlayerId,
        npc_id: &NpcId,
        conversation_id: &ConversationId,
    ) -> Result<(), DialogueError> {
        let entry = self.owned_entry(player_id, conversation_id)?;
        tracing::debug!(conversation_id = %conversation_id, npc_id = %npc_id, "Player ended conversation");
        self.end_entry(&entry, "player").await;
        Ok(())
    }

    /// End a conversation from inside the system. Unknown ids are a no-op.
    pub async fn end_internal(&self, conversation_id: &ConversationId, reason: &str) -> bool {
        match self.conversations.get(conversation_id) {
            Some(entry) => self.end_entry(&entry, reason).await,
            None => false,
        }
    }

    fn owned_entry(
        &self,
        player_id: &PlayerId,
        conversation_id: &ConversationId,
    ) -> Result<ConversationEntry, DialogueError> {
        let entry = self
            .conversations
            .get(conversation_id)
            .ok_or_else(|| DialogueError::not_found("conversation", conversation_id))?;
        if entry.player_id != *player_id {
            tracing::warn!(
                conversation_id = %conversation_id,
                player_id = %player_id,
                "Player attempted to use another player's conversation"
            );
            return Err(DialogueError::Ownership {
                conversation_id: conversation_id.clone(),
            });
        }
        Ok(entry)
    }

    async fn end_entry(&self, entry: &ConversationEntry, reason: &str) -> bool {
        let state = entry.state.lock().await;
        if !self.conversations.contains(&entry.conversation_id) {
            return false;
        }
        self.close(entry, &state, reason).await;
        true
    }

    /// Tell the provider and drop the entry. The caller holds the state lock.
    async fn close(&self, entry: &ConversationEntry, state: &ConversationState, reason: &str) {
        let provider = self.provider(&entry.provider_id).ok();
        self.finish(provider.as_ref(), entry, state, reason).await;
    }

    async fn finish(
        &self,
        provider: Option<&Arc<dyn DialogueProvider>>,
        entry: &ConversationEntry,
        state: &ConversationState,
        reason: &str,
    ) {
        match provider {
            Some(provider) => {
                if let Err(e) = provider.end(state.clone(), reason).await {
                    tracing::warn!(
                        conversation_id = %entry.conversation_id,
                        error = %e,
                        "Provider failed to end conversation"
                    );
                }
            }
            None => tracing::warn!(
                conversation_id = %entry.conversation_id,
                provider_id = %entry.provider_id,
                "Ending conversation whose provider is gone"
            ),
        }
        self.conversations.remove(&entry.conversation_id);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get_state(&self, conversation_id: &ConversationId) -> Option<ConversationState> {
        let entry = self.conversations.get(conversation_id)?;
        let state = entry.state.lock().await.clone();
        Some(state)
    }

    /// A player's conversations, oldest first.
    pub async fn active_for_player(&self, player_id: &PlayerId) -> Vec<ConversationState> {
        let mut states = Vec::new();
        for entry in self.conversations.entries_for_player(player_id) {
            states.push(entry.state.lock().await.clone());
        }
        states
    }

    /// The player's oldest conversation.
    pub fn first_for_player(&self, player_id: &PlayerId) -> Option<ConversationId> {
        self.conversations
            .entries_for_player(player_id)
            .into_iter()
            .next()
            .map(|entry| entry.conversation_id)
    }

    pub fn active_count(&self) -> usize {
        self.conversations.len()
    }

    pub fn statistics(&self) -> DialogueStatistics {
        let mut providers: Vec<_> = self
            .providers
            .iter()
            .map(|p| ProviderSummary {
                id: p.key().clone(),
                kind: p.value().kind(),
            })
            .collect();
        providers.sort_by(|a, b| a.id.cmp(&b.id));

        DialogueStatistics {
            provider_count: providers.len(),
            active_conversations: self.conversations.len(),
            providers,
            config: self.config.clone(),
        }
    }

    // =========================================================================
    // Housekeeping
    // =========================================================================

    /// End every conversation idle past the timeout. Separate from the
    /// check `continue_conversation` makes on its own conversation.
    pub async fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut swept = 0;
        for entry in self.conversations.entries() {
            let state = entry.state.lock().await;
            if !self.conversations.contains(&entry.conversation_id)
                || !state.is_stale(now, self.config.timeout_minutes)
            {
                continue;
            }
            self.close(&entry, &state, "expired").await;
            swept += 1;
        }
        if swept > 0 {
            tracing::info!(swept, "Idle conversations swept");
        }
        swept
    }

    /// Write the active table through the snapshot port.
    pub async fn save_snapshot(&self) -> Result<usize, PortError> {
        let Some(snapshots) = &self.snapshots else {
            return Ok(0);
        };
        let snapshot =
            ConversationSnapshot::new(self.clock.now(), self.conversations.snapshot().await);
        snapshots.save(&snapshot).await?;
        Ok(snapshot.len())
    }

    /// [`Self::save_snapshot`] with failures logged.
    pub async fn autosave(&self) {
        match self.save_snapshot().await {
            Ok(saved) => tracing::debug!(saved, "Conversations autosaved"),
            Err(e) => tracing::warn!(error = %e, "Conversation autosave failed"),
        }
    }

    /// Reload conversations from the last snapshot.
    ///
    /// Skips conversations that are inactive, idle past the timeout, already
    /// present, or owned by a provider that is not registered.
    pub async fn restore(&self) -> usize {
        let Some(snapshots) = &self.snapshots else {
            return 0;
        };
        let snapshot = match snapshots.load().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return 0,
            Err(e) => {
                tracing::warn!(error = %e, "Could not load conversation snapshot");
                return 0;
            }
        };

        let now = self.clock.now();
        let mut restored = 0;
        for state in snapshot.conversations {
            let usable = state.is_active
                && !state.is_stale(now, self.config.timeout_minutes)
                && self.providers.contains_key(&state.provider_id)
                && !self.conversations.contains(&state.conversation_id);
            if !usable {
                tracing::debug!(conversation_id = %state.conversation_id, "Skipping snapshot conversation");
                continue;
            }
            self.conversations.insert(state);
            restored += 1;
        }

        tracing::info!(restored, saved_at = %snapshot.saved_at, "Conversations restored");
        restored
    }

    /// Start the autosave and sweep tasks that are enabled in the config.
    pub async fn spawn_background(self: &Arc<Self>) {
        let mut tasks = self.tasks.lock().await;
        if self.config.autosave_interval_secs > 0 {
            let manager = Arc::clone(self);
            let period = Duration::from_secs(self.config.autosave_interval_secs);
            let cancel = self.cancel.clone();
            tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => manager.autosave().await,
                    }
                }
                tracing::debug!("Autosave task stopped");
            }));
        }
        if self.config.sweep_interval_secs > 0 {
            let manager = Arc::clone(self);
            let period = Duration::from_secs(self.config.sweep_interval_secs);
            let cancel = self.cancel.clone();
            tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {
                            manager.sweep_expired().await;
                        }
                    }
                }
                tracing::debug!("Sweep task stopped");
            }));
        }
    }

    /// Stop background tasks, flush a final snapshot, then end everything.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Background dialogue task failed");
            }
        }

        self.autosave().await;

        let mut ended = 0;
        for entry in self.conversations.entries() {
            if self.end_entry(&entry, "shutdown").await {
                ended += 1;
            }
        }
        tracing::info!(ended, "Dialogue manager shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use tokio::sync::Notify;
    use taleweave_domain::DialogueEventKind;

    use crate::infrastructure::ports::MockSnapshotPort;
    use crate::infrastructure::snapshot::JsonSnapshotFile;
    use crate::test_fixtures::{Harness, ALICE, SMITH};

    fn alice() -> PlayerId {
        PlayerId::new(ALICE)
    }

    fn smith() -> NpcId {
        NpcId::new(SMITH)
    }

    fn config(max: usize) -> DialogueManagerConfig {
        DialogueManagerConfig {
            default_provider: "canned".to_string(),
            max_conversations_per_player: max,
            timeout_minutes: 30,
            autosave_interval_secs: 0,
            sweep_interval_secs: 0,
        }
    }

    fn manager(harness: &Harness, config: DialogueManagerConfig) -> DialogueManager {
        let manager = DialogueManager::new(config, harness.clock.clone());
        manager.register_provider(Arc::new(harness.provider("canned")));
        manager
    }

    /// Counts starts; every conversation stays open.
    struct StubProvider {
        starts: AtomicUsize,
        clock: Arc<dyn ClockPort>,
    }

    impl StubProvider {
        fn new(clock: Arc<dyn ClockPort>) -> Self {
            Self {
                starts: AtomicUsize::new(0),
                clock,
            }
        }

        fn respond(state: ConversationState) -> DialogueResponse {
            DialogueResponse {
                conversation_id: state.conversation_id.clone(),
                message: "...".to_string(),
                choices: None,
                is_complete: false,
                variables: Default::default(),
                actions: Vec::new(),
                state,
            }
        }
    }

    #[async_trait]
    impl DialogueProvider for StubProvider {
        fn id(&self) -> &str {
            "stub"
        }

        fn kind(&self) -> ProviderKind {
            ProviderKind::Custom
        }

        fn can_handle(&self, _npc_id: &NpcId) -> bool {
            true
        }

        async fn start(
            &self,
            player_id: &PlayerId,
            npc_id: &NpcId,
        ) -> Result<DialogueResponse, DialogueError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            let now = self.clock.now();
            Ok(Self::respond(ConversationState::new(
                ConversationId::generate("stub", player_id, npc_id, now),
                player_id.clone(),
                npc_id.clone(),
                "stub",
                now,
            )))
        }

        async fn continue_conversation(
            &self,
            mut state: ConversationState,
            _input: &str,
        ) -> Result<DialogueResponse, DialogueError> {
            state.touch(self.clock.now());
            Ok(Self::respond(state))
        }

        async fn end(&self, _state: ConversationState, _reason: &str) -> Result<(), DialogueError> {
            Ok(())
        }
    }

    /// Holds one player's start inside the provider until released.
    struct GatedProvider {
        held: PlayerId,
        entered: Notify,
        release: Notify,
        ended: AtomicUsize,
        clock: Arc<dyn ClockPort>,
    }

    impl GatedProvider {
        fn holding(held: PlayerId, clock: Arc<dyn ClockPort>) -> Self {
            Self {
                held,
                entered: Notify::new(),
                release: Notify::new(),
                ended: AtomicUsize::new(0),
                clock,
            }
        }
    }

    #[async_trait]
    impl DialogueProvider for GatedProvider {
        fn id(&self) -> &str {
            "gated"
        }

        fn kind(&self) -> ProviderKind {
            ProviderKind::Custom
        }

        fn can_handle(&self, _npc_id: &NpcId) -> bool {
            true
        }

        async fn start(
            &self,
            player_id: &PlayerId,
            npc_id: &NpcId,
        ) -> Result<DialogueResponse, DialogueError> {
            if *player_id == self.held {
                self.entered.notify_one();
                self.release.notified().await;
            }
            let now = self.clock.now();
            Ok(StubProvider::respond(ConversationState::new(
                ConversationId::generate("gated", player_id, npc_id, now),
                player_id.clone(),
                npc_id.clone(),
                "gated",
                now,
            )))
        }

        async fn continue_conversation(
            &self,
            state: ConversationState,
            _input: &str,
        ) -> Result<DialogueResponse, DialogueError> {
            Ok(StubProvider::respond(state))
        }

        async fn end(&self, _state: ConversationState, _reason: &str) -> Result<(), DialogueError> {
            self.ended.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn capacity_is_checked_before_the_provider_runs() {
        let harness = Harness::new().await;
        let manager = DialogueManager::new(
            DialogueManagerConfig {
                default_provider: "stub".to_string(),
                ..config(1)
            },
            harness.clock.clone(),
        );
        let stub = Arc::new(StubProvider::new(harness.clock.clone()));
        manager.register_provider(stub.clone());

        manager.start(&alice(), &smith(), None).await.expect("first");
        let err = manager
            .start(&alice(), &smith(), None)
            .await
            .err()
            .expect("second");

        assert!(matches!(err, DialogueError::Capacity { current: 1, max: 1 }));
        assert_eq!(stub.starts.load(Ordering::SeqCst), 1);
        assert_eq!(manager.active_count(), 1);
    }

    #[tokio::test]
    async fn capacity_counts_across_providers() {
        let harness = Harness::new().await;
        let manager = manager(&harness, config(2));
        manager.register_provider(Arc::new(StubProvider::new(harness.clock.clone())));

        manager.start(&alice(), &smith(), None).await.expect("canned");
        manager
            .start(&alice(), &smith(), Some("stub"))
            .await
            .expect("stub");
        let err = manager
            .start(&alice(), &smith(), Some("stub"))
            .await
            .err()
            .expect("third");
        assert!(matches!(err, DialogueError::Capacity { .. }));

        manager
            .start(&PlayerId::new("bob"), &smith(), Some("stub"))
            .await
            .expect("other players are unaffected");
    }

    #[tokio::test]
    async fn concurrent_starts_never_exceed_the_limit() {
        let harness = Harness::new().await;
        let manager = Arc::new(DialogueManager::new(
            DialogueManagerConfig {
                default_provider: "stub".to_string(),
                ..config(3)
            },
            harness.clock.clone(),
        ));
        manager.register_provider(Arc::new(StubProvider::new(harness.clock.clone())));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                manager.start(&alice(), &smith(), None).await.is_ok()
            }));
        }
        let mut started = 0;
        for handle in handles {
            if handle.await.expect("join") {
                started += 1;
            }
        }

        assert_eq!(started, 3);
        assert_eq!(manager.active_count(), 3);
    }

    #[tokio::test]
    async fn a_stalled_start_does_not_block_other_players() {
        let harness = Harness::new().await;
        let manager = Arc::new(manager(&harness, config(3)));
        let gated = Arc::new(GatedProvider::holding(alice(), harness.clock.clone()));
        manager.register_provider(gated.clone());

        let stalled = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.start(&alice(), &smith(), Some("gated")).await })
        };
        gated.entered.notified().await;

        let bob = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            manager.start(&PlayerId::new("bob"), &smith(), Some("gated")),
        )
        .await
        .expect("bob is not queued behind alice");
        assert!(bob.is_ok());

        gated.release.notify_one();
        stalled.await.expect("join").expect("alice starts once released");
        assert_eq!(manager.active_count(), 2);
    }

    #[tokio::test]
    async fn unregistering_during_a_start_leaves_no_orphan() {
        let harness = Harness::new().await;
        let manager = Arc::new(manager(&harness, config(1)));
        let gated = Arc::new(GatedProvider::holding(alice(), harness.clock.clone()));
        manager.register_provider(gated.clone());

        let starting = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.start(&alice(), &smith(), Some("gated")).await })
        };
        gated.entered.notified().await;
        assert!(manager.unregister_provider("gated").await);
        gated.release.notify_one();

        let err = starting.await.expect("join").err().expect("provider is gone");
        assert!(err.is_not_found());
        assert_eq!(manager.active_count(), 0);
        assert_eq!(gated.ended.load(Ordering::SeqCst), 1);
        manager
            .start(&alice(), &smith(), None)
            .await
            .expect("the slot is free again");
    }

    #[tokio::test]
    async fn continuing_without_a_provider_drops_the_conversation() {
        let harness = Harness::new().await;
        let manager = manager(&harness, config(3));
        let entry = manager.conversations.insert(ConversationState::new(
            ConversationId::new("orphan"),
            alice(),
            smith(),
            "retired",
            harness.clock.now(),
        ));

        let err = manager
            .continue_conversation(&alice(), &smith(), "hello", &entry.conversation_id)
            .await
            .err()
            .expect("no provider");

        assert!(err.is_not_found());
        assert_eq!(manager.active_count(), 0);
    }

    #[tokio::test]
    async fn unknown_provider_creates_nothing() {
        let harness = Harness::new().await;
        let manager = manager(&harness, config(3));

        let err = manager
            .start(&alice(), &smith(), Some("oracle"))
            .await
            .err()
            .expect("error");
        assert!(err.is_not_found());
        assert_eq!(manager.active_count(), 0);
    }

    #[tokio::test]
    async fn unbound_npc_is_not_found() {
        let harness = Harness::new().await;
        let manager = manager(&harness, config(3));

        let err = manager
            .start(&alice(), &NpcId::new("guard"), None)
            .await
            .err()
            .expect("error");
        assert!(err.is_not_found());
        assert_eq!(manager.active_count(), 0);
        assert!(!manager.can_handle(&NpcId::new("guard"), None));
        assert!(manager.can_handle(&smith(), None));
        assert!(!manager.can_handle(&smith(), Some("oracle")));
    }

    #[tokio::test]
    async fn turns_overwrite_then_completion_removes_the_entry() {
        let harness = Harness::new().await;
        let manager = manager(&harness, config(3));
        let started = manager.start(&alice(), &smith(), None).await.expect("start");
        let id = started.conversation_id.clone();

        let shop = manager
            .continue_conversation(&alice(), &smith(), "buy", &id)
            .await
            .expect("buy");
        assert!(!shop.is_complete);
        let stored = manager.get_state(&id).await.expect("stored");
        assert_eq!(stored.current_node_id, "shop");
        assert!(stored.is_active);
        assert_eq!(stored.player_id(), &alice());

        let done = manager
            .continue_conversation(&alice(), &smith(), "thanks", &id)
            .await
            .expect("finish");
        assert!(done.is_complete);
        assert_eq!(done.message, "Have a look at my wares.");
        assert!(manager.get_state(&id).await.is_none());
        assert_eq!(manager.active_count(), 0);
    }

    #[tokio::test]
    async fn another_player_cannot_touch_the_conversation() {
        let harness = Harness::new().await;
        let manager = manager(&harness, config(3));
        let id = manager
            .start(&alice(), &smith(), None)
            .await
            .expect("start")
            .conversation_id;
        let bob = PlayerId::new("bob");

        let err = manager
            .continue_conversation(&bob, &smith(), "1", &id)
            .await
            .err()
            .expect("continue");
        assert!(matches!(err, DialogueError::Ownership { .. }));

        let err = manager.end(&bob, &smith(), &id).await.err().expect("end");
        assert!(matches!(err, DialogueError::Ownership { .. }));

        let state = manager.get_state(&id).await.expect("still there");
        assert_eq!(state.player_id(), &alice());
    }

    #[tokio::test]
    async fn idle_conversations_time_out_on_the_next_turn() {
        let harness = Harness::new().await;
        let manager = manager(&harness, config(3));
        let id = manager
            .start(&alice(), &smith(), None)
            .await
            .expect("start")
            .conversation_id;

        harness.clock.advance(ChronoDuration::minutes(30));
        manager
            .continue_conversation(&alice(), &smith(), "hm", &id)
            .await
            .expect("exactly at the limit is still fine");

        harness.clock.advance(ChronoDuration::minutes(31));
        let err = manager
            .continue_conversation(&alice(), &smith(), "1", &id)
            .await
            .err()
            .expect("timeout");

        assert!(matches!(err, DialogueError::Timeout { idle_minutes: 30, .. }));
        assert_eq!(manager.active_count(), 0);
        let ended = harness.events.events().pop().expect("event");
        assert_eq!(ended.kind, DialogueEventKind::ConversationEnded);
        assert_eq!(ended.payload["reason"], "timeout");
    }

    #[tokio::test]
    async fn ending_is_checked_for_players_and_idempotent_internally() {
        let harness = Harness::new().await;
        let manager = manager(&harness, config(3));
        let id = manager
            .start(&alice(), &smith(), None)
            .await
            .expect("start")
            .conversation_id;

        manager.end(&alice(), &smith(), &id).await.expect("end");
        assert_eq!(manager.active_count(), 0);

        let err = manager.end(&alice(), &smith(), &id).await.err().expect("again");
        assert!(err.is_not_found());
        assert!(!manager.end_internal(&id, "cleanup").await);
        assert!(!manager.end_internal(&ConversationId::new("nope"), "cleanup").await);
    }

    #[tokio::test]
    async fn unregistering_a_provider_ends_its_conversations() {
        let harness = Harness::new().await;
        let manager = manager(&harness, config(3));
        manager.register_provider(Arc::new(StubProvider::new(harness.clock.clone())));
        manager.start(&alice(), &smith(), None).await.expect("canned");
        let stub_id = manager
            .start(&alice(), &smith(), Some("stub"))
            .await
            .expect("stub")
            .conversation_id;

        assert!(manager.unregister_provider("canned").await);
        assert_eq!(manager.active_count(), 1);
        assert!(manager.get_state(&stub_id).await.is_some());
        assert!(!manager.unregister_provider("canned").await);
        assert_eq!(manager.statistics().provider_count, 1);
    }

    #[tokio::test]
    async fn sweep_removes_only_stale_conversations() {
        let harness = Harness::new().await;
        let manager = manager(&harness, config(3));
        manager.start(&alice(), &smith(), None).await.expect("old");
        harness.clock.advance(ChronoDuration::minutes(20));
        let fresh = manager
            .start(&alice(), &smith(), None)
            .await
            .expect("fresh")
            .conversation_id;
        harness.clock.advance(ChronoDuration::minutes(15));

        assert_eq!(manager.sweep_expired().await, 1);
        assert_eq!(manager.first_for_player(&alice()), Some(fresh));
    }

    #[tokio::test]
    async fn concurrent_turns_on_one_conversation_are_serialized() {
        let harness = Harness::new().await;
        let manager = Arc::new(manager(&harness, config(3)));
        let id = manager
            .start(&alice(), &smith(), None)
            .await
            .expect("start")
            .conversation_id;

        let mut handles = Vec::new();
        for _ in 0..4 {
            let manager = Arc::clone(&manager);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                manager
                    .continue_conversation(&alice(), &smith(), "hm", &id)
                    .await
                    .is_ok()
            }));
        }
        for handle in handles {
            assert!(handle.await.expect("join"));
        }

        let state = manager.get_state(&id).await.expect("state");
        assert_eq!(state.turn_count, 4);
    }

    #[tokio::test]
    async fn snapshots_survive_a_restart() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data").join("conversations.json");
        let harness = Harness::new().await;

        let first = manager(&harness, config(3)).with_snapshots(Arc::new(JsonSnapshotFile::new(&path)));
        let id = first
            .start(&alice(), &smith(), None)
            .await
            .expect("start")
            .conversation_id;
        first.shutdown().await;
        assert_eq!(first.active_count(), 0);

        let second = manager(&harness, config(3)).with_snapshots(Arc::new(JsonSnapshotFile::new(&path)));
        assert_eq!(second.restore().await, 1);
        let response = second
            .continue_conversation(&alice(), &smith(), "buy", &id)
            .await
            .expect("continue after restore");
        assert_eq!(response.state.current_node_id, "shop");
    }

    #[tokio::test]
    async fn restore_skips_stale_and_unknown_provider_conversations() {
        let harness = Harness::new().await;
        let now = harness.clock.now();
        let fresh = ConversationState::new(ConversationId::new("fresh"), alice(), smith(), "canned", now);
        let stale = ConversationState::new(
            ConversationId::new("stale"),
            alice(),
            smith(),
            "canned",
            now - ChronoDuration::hours(2),
        );
        let orphan = ConversationState::new(ConversationId::new("orphan"), alice(), smith(), "ai", now);
        let snapshot = ConversationSnapshot::new(now, vec![fresh, stale, orphan]);

        let mut port = MockSnapshotPort::new();
        port.expect_load()
            .returning(move || Ok(Some(snapshot.clone())));
        let manager = manager(&harness, config(3)).with_snapshots(Arc::new(port));

        assert_eq!(manager.restore().await, 1);
        assert!(manager.get_state(&ConversationId::new("fresh")).await.is_some());
    }

    #[tokio::test]
    async fn autosave_failures_are_not_raised() {
        let harness = Harness::new().await;
        let mut port = MockSnapshotPort::new();
        port.expect_save()
            .returning(|_| Err(PortError::storage("snapshot.write", "disk full")));
        let manager = manager(&harness, config(3)).with_snapshots(Arc::new(port));
        manager.start(&alice(), &smith(), None).await.expect("start");

        manager.autosave().await;
        assert!(manager.save_snapshot().await.is_err());
        assert_eq!(manager.active_count(), 1);
    }

    #[tokio::test]
    async fn background_tasks_stop_on_shutdown() {
        let harness = Harness::new().await;
        let mut port = MockSnapshotPort::new();
        port.expect_save().returning(|_| Ok(()));
        let manager = Arc::new(
            DialogueManager::new(
                DialogueManagerConfig {
                    autosave_interval_secs: 60,
                    sweep_interval_secs: 60,
                    ..config(3)
                },
                harness.clock.clone(),
            )
            .with_snapshots(Arc::new(port)),
        );
        manager.register_provider(Arc::new(harness.provider("canned")));
        manager.spawn_background().await;
        manager.start(&alice(), &smith(), None).await.expect("start");

        manager.shutdown().await;
        assert_eq!(manager.active_count(), 0);
        assert!(manager.tasks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn statistics_report_providers_and_config() {
        let harness = Harness::new().await;
        let manager = manager(&harness, config(2));
        manager.register_provider(Arc::new(StubProvider::new(harness.clock.clone())));
        manager.start(&alice(), &smith(), None).await.expect("start");

        let stats = manager.statistics();
        assert_eq!(stats.provider_count, 2);
        assert_eq!(stats.active_conversations, 1);
        assert_eq!(
            stats.providers,
            vec![
                ProviderSummary {
                    id: "canned".into(),
                    kind: ProviderKind::Canned
                },
                ProviderSummary {
                    id: "stub".into(),
                    kind: ProviderKind::Custom
                },
            ]
        );
        assert_eq!(stats.config.max_conversations_per_player, 2);
    }
}
