//! Shared test fixtures.
//!
//! Small dialogue trees and a wired-up scripted provider harness so that
//! store, provider and manager tests all exercise the same content.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_fixtures::{shop_tree, Harness};
//!
//! #[tokio::test]
//! async fn buying_goes_to_the_shop() {
//!     let harness = Harness::new().await;
//!     // ... test logic
//! }
//! ```

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use taleweave_domain::{
    ConversationContext, DialogueChoice, DialogueNode, DialogueTree, NpcId, NpcInfo, PlayerState,
    TreeId, TreeMetadata, VariableContext, WorldState,
};

use crate::infrastructure::clock::{FixedRandom, SteppingClock};
use crate::infrastructure::effects::LoggingGameEffects;
use crate::infrastructure::event_sink::RecordingEventSink;
use crate::infrastructure::in_memory::{InMemoryPlayers, InMemoryWorld};
use crate::stores::{DialogueTreeStore, NpcBindingRegistry};
use crate::use_cases::dialogue::{
    ActionExecutor, ConditionEvaluator, ContextBuilder, DialogueRuntime, ScriptedTreeProvider,
    VariableResolver,
};

pub const SHOP_TREE: &str = "smith_shop";
pub const SMITH: &str = "smith";
pub const ALICE: &str = "alice";
pub const FORGE: &str = "forge";

/// 2024-06-01 12:00:00 UTC, the time every harness starts at.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

// =============================================================================
// Trees
// =============================================================================

/// `greet` offers `1 -> shop` and `2 -> (end)`; `shop` has no way onward.
pub fn shop_tree() -> DialogueTree {
    let greet = DialogueNode::new("greet", "Welcome to my forge, {{player.name}}.")
        .with_choice(DialogueChoice::new("1", "I'd like to buy something").to("shop"))
        .with_choice(DialogueChoice::new("2", "Goodbye"));
    let shop = DialogueNode::new("shop", "Have a look at my wares.");

    tree(SHOP_TREE, "The Smith's Shop", "greet", vec![greet, shop])
}

/// Assemble a tree from nodes; the map keys come from the node ids.
pub fn tree(id: &str, name: &str, start: &str, nodes: Vec<DialogueNode>) -> DialogueTree {
    DialogueTree {
        id: TreeId::new(id),
        name: name.to_string(),
        description: None,
        version: "1.0.0".to_string(),
        start_node_id: start.to_string(),
        nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
        variables: Default::default(),
        metadata: TreeMetadata::default(),
    }
}

// =============================================================================
// Players and context
// =============================================================================

pub fn alice() -> PlayerState {
    PlayerState::new(ALICE, "Alice").in_room(FORGE)
}

pub fn smith() -> NpcInfo {
    NpcInfo::new(SMITH, "Brom the Smith")
        .with_description("a broad-shouldered blacksmith")
        .in_room(FORGE)
}

/// A context around `player` with an empty conversation at [`epoch`].
pub fn context_for(player: PlayerState) -> VariableContext {
    VariableContext::new(
        player,
        smith().into(),
        ConversationContext {
            id: "c1".into(),
            variables: Default::default(),
            turn_count: 0,
            started: epoch(),
            last_activity: epoch(),
        },
        WorldState::at(epoch()),
    )
}

pub fn context() -> VariableContext {
    let mut player = alice();
    player.level = 7;
    player.stats.insert("strength".to_string(), 14.0);
    player.inventory = vec!["coin".into(), "coin".into(), "hammer".into()];
    let mut ctx = context_for(player);
    ctx.conversation
        .variables
        .insert("mood".to_string(), json!("cheerful"));
    ctx
}

// =============================================================================
// Harness
// =============================================================================

/// Every collaborator of the scripted provider, in memory.
pub struct Harness {
    pub clock: Arc<SteppingClock>,
    pub players: Arc<InMemoryPlayers>,
    pub world: Arc<InMemoryWorld>,
    pub events: Arc<RecordingEventSink>,
    pub trees: Arc<DialogueTreeStore>,
    pub bindings: Arc<NpcBindingRegistry>,
    pub runtime: Arc<DialogueRuntime>,
}

impl Harness {
    /// Alice and the smith in the forge, with the smith bound to [`shop_tree`].
    pub async fn new() -> Self {
        Self::with_tree(shop_tree()).await
    }

    pub async fn with_tree(tree: DialogueTree) -> Self {
        let clock = Arc::new(SteppingClock::starting_at(epoch()));
        let players = Arc::new(InMemoryPlayers::new());
        let world = Arc::new(InMemoryWorld::new(clock.clone()));
        let events = Arc::new(RecordingEventSink::new());
        let trees = Arc::new(DialogueTreeStore::new());
        let bindings = Arc::new(NpcBindingRegistry::new(trees.clone()));

        players.upsert(alice()).await;
        world.place_npc(smith()).await;
        let tree_id = tree.id.clone();
        trees.upsert(tree).expect("fixture tree is valid");
        bindings
            .bind(NpcId::new(SMITH), tree_id)
            .expect("fixture tree is stored");

        let runtime = Arc::new(DialogueRuntime::new(
            ContextBuilder::new(players.clone(), world.clone(), clock.clone()),
            ConditionEvaluator::new(Arc::new(FixedRandom(0.25)), clock.clone()),
            ActionExecutor::new(Arc::new(LoggingGameEffects::new()), events.clone(), clock.clone()),
            VariableResolver::new(),
            events.clone(),
            clock.clone(),
        ));

        Self {
            clock,
            players,
            world,
            events,
            trees,
            bindings,
            runtime,
        }
    }

    pub fn provider(&self, id: &str) -> ScriptedTreeProvider {
        ScriptedTreeProvider::new(id, self.bindings.clone(), self.trees.clone(), self.runtime.clone())
    }
}
