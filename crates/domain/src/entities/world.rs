//! Global world state visible to dialogue rules.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldState {
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub global_flags: Vec<String>,
    #[serde(default)]
    pub faction_relations: HashMap<String, f64>,
}

impl WorldState {
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            time,
            global_flags: Vec::new(),
            faction_relations: HashMap::new(),
        }
    }
}
