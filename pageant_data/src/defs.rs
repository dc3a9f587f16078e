use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable identifier used across content references.
pub type Id = String;

/// Top-level content file loaded by the engine's script store.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContentDef {
    #[serde(default)]
    pub bundles: Vec<EventBundleDef>,
    #[serde(default)]
    pub dance_roster: Option<DanceRosterDef>,
}

/// One content asset: a table of raw event scripts keyed by entry id.
///
/// Location event assets key their entries by event id; festival assets key
/// them by names such as `set-up` or `mainEvent`, optionally suffixed with a
/// year variant (`mainEvent_y2`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventBundleDef {
    pub asset: Id,
    #[serde(default)]
    pub entries: BTreeMap<Id, String>,
}

/// The fixed villager pairs eligible for the festival dance, in fill order.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DanceRosterDef {
    pub pairs: Vec<DanceRosterPair>,
}

/// A default (leader, follower) villager pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanceRosterPair {
    pub leader: Id,
    pub follower: Id,
}

impl DanceRosterDef {
    /// Leader names in roster order.
    pub fn leaders(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|p| p.leader.as_str())
    }

    /// Follower names in roster order.
    pub fn followers(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|p| p.follower.as_str())
    }
}
