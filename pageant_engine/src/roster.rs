//! The set of live actors owned by one running event.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::actor::{Actor, ActorId, ActorRef};

/// Stable handle to an actor for the lifetime of an event.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorHandle(u32);

impl fmt::Display for ActorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Actors keyed by spawn order.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    actors: BTreeMap<ActorHandle, Actor>,
    next: u32,
    local_player: u32,
}

impl Roster {
    pub fn new(local_player: u32) -> Self {
        Self {
            local_player,
            ..Self::default()
        }
    }

    pub fn local_player(&self) -> u32 {
        self.local_player
    }

    /// Add an actor. A named actor that already exists is replaced in place.
    pub fn spawn(&mut self, actor: Actor) -> ActorHandle {
        let existing = match actor.kind {
            crate::actor::ActorKind::PlayerAvatar { number } => self.find(&ActorId::Player(number)),
            _ => self.find(&ActorId::Named(actor.name.clone())),
        };
        if let Some(handle) = existing {
            self.actors.insert(handle, actor);
            return handle;
        }
        let handle = ActorHandle(self.next);
        self.next += 1;
        self.actors.insert(handle, actor);
        handle
    }

    pub fn remove(&mut self, handle: ActorHandle) -> Option<Actor> {
        self.actors.remove(&handle)
    }

    pub fn get(&self, handle: ActorHandle) -> Option<&Actor> {
        self.actors.get(&handle)
    }

    pub fn get_mut(&mut self, handle: ActorHandle) -> Option<&mut Actor> {
        self.actors.get_mut(&handle)
    }

    /// Look an actor up by script identity. Named lookups try an exact match
    /// before a case-insensitive one.
    pub fn find(&self, id: &ActorId) -> Option<ActorHandle> {
        match id {
            ActorId::LocalPlayer => self.find_player(self.local_player),
            ActorId::Player(number) => self.find_player(*number),
            ActorId::Named(name) => self
                .actors
                .iter()
                .find(|(_, a)| !a.is_player() && a.name == *name)
                .or_else(|| {
                    self.actors
                        .iter()
                        .find(|(_, a)| !a.is_player() && a.name.eq_ignore_ascii_case(name))
                })
                .map(|(handle, _)| *handle),
        }
    }

    pub fn resolve(&self, actor: &ActorRef) -> Option<ActorHandle> {
        self.find(&actor.id)
    }

    fn find_player(&self, number: u32) -> Option<ActorHandle> {
        self.actors
            .iter()
            .find(|(_, a)| matches!(a.kind, crate::actor::ActorKind::PlayerAvatar { number: n } if n == number))
            .map(|(handle, _)| *handle)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActorHandle, &Actor)> {
        self.actors.iter().map(|(h, a)| (*h, a))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ActorHandle, &mut Actor)> {
        self.actors.iter_mut().map(|(h, a)| (*h, a))
    }

    pub fn halt_all(&mut self) {
        for actor in self.actors.values_mut() {
            actor.halt();
        }
    }
}
