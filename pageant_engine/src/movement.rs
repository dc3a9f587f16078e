//! Actor movement: the `move` barrier and free-running path controllers.
//!
//! `move` records a target per actor in a [`MovementSync`]. Each tick the
//! interpreter calls [`MovementSync::resolve`], which walks every pending
//! actor one step or lands it. The script does not advance until the map is
//! empty, so N actors moved together release the script exactly once.

pub mod path;

pub use path::{PathController, PathStep};

use std::collections::BTreeMap;

use log::{debug, warn};
use pageant_data::{Direction, Rect, TilePoint};
use serde::{Deserialize, Serialize};

use crate::actor::{Actor, tile_origin};
use crate::config::EngineConfig;
use crate::roster::{ActorHandle, Roster};

/// Where a moving actor is headed and which way it faces on arrival.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMove {
    pub target: TilePoint,
    pub facing: Direction,
}

/// The pending-position map.
#[derive(Debug, Clone, Default)]
pub struct MovementSync {
    pending: BTreeMap<ActorHandle, PendingMove>,
}

impl MovementSync {
    pub fn insert(&mut self, handle: ActorHandle, mv: PendingMove) {
        self.pending.insert(handle, mv);
    }

    pub fn remove(&mut self, handle: ActorHandle) -> Option<PendingMove> {
        self.pending.remove(&handle)
    }

    pub fn get(&self, handle: ActorHandle) -> Option<&PendingMove> {
        self.pending.get(&handle)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Land or step every pending actor once.
    ///
    /// Returns true only on the call that empties a previously non-empty map.
    pub fn resolve(&mut self, roster: &mut Roster, config: &EngineConfig) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        let mut landed = Vec::new();
        for (handle, mv) in &self.pending {
            let Some(actor) = roster.get_mut(*handle) else {
                warn!("actor {handle} left the stage mid-move; dropping its target");
                landed.push(*handle);
                continue;
            };
            if has_arrived(actor, mv.target, config) {
                actor.set_tile(mv.target, config.tile_size);
                actor.halt();
                actor.face(mv.facing);
                actor.clear_overrides();
                debug!("{} arrived at {}", actor.name, mv.target);
                landed.push(*handle);
            } else {
                let speed = actor.speed(config);
                actor.step_toward(tile_origin(mv.target, config.tile_size), speed);
            }
        }
        for handle in landed {
            self.pending.remove(&handle);
        }
        self.pending.is_empty()
    }
}

/// Arrival test: the bounding box sits inside the target tile (inflated by
/// the configured slop) and the remaining edge distance on each axis fits in
/// one tick's movement.
pub fn has_arrived(actor: &Actor, target: TilePoint, config: &EngineConfig) -> bool {
    let size = config.tile_size;
    let bbox = actor.bounding_box(size);
    let tile_rect = Rect::new(target.x * size, target.y * size, size, size).inflate(config.arrival_slop, config.arrival_slop);
    if !tile_rect.contains_rect(&bbox) {
        return false;
    }
    let mut ghost = actor.clone();
    ghost.set_tile(target, size);
    let goal = ghost.bounding_box(size);
    let speed = actor.speed(config);

    // same-sized boxes, so the leading-edge gap is the offset between origins
    let horizontal = (goal.left() - bbox.left()).abs();
    let vertical = (goal.top() - bbox.top()).abs();
    (horizontal.max(vertical) as f32) <= speed
}
