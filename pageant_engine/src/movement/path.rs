//! Pre-authored paths that run alongside the script.
//!
//! A [`PathController`] walks one actor through a list of [`PathStep`]s,
//! either once or forever. Unlike `move`, it never holds the script back.

use std::fmt;

use pageant_data::{Direction, TilePoint, Vector2};

use crate::actor::Actor;
use crate::config::EngineConfig;
use crate::roster::ActorHandle;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathStep {
    /// Walk by a tile offset (one axis).
    Walk(TilePoint),
    /// Turn and stand still.
    Face { direction: Direction, pause_ms: f32 },
    /// Stand still without turning.
    Wait(f32),
}

impl PathStep {
    /// Decode one `x y` pair of an `advancedMove` path. A pair with both values
    /// set is a facing direction plus a pause in milliseconds.
    pub fn from_pair(x: i32, y: i32) -> Option<PathStep> {
        match (x, y) {
            (0, 0) => None,
            (x, 0) => Some(PathStep::Walk(TilePoint::new(x, 0))),
            (0, y) => Some(PathStep::Walk(TilePoint::new(0, y))),
            (dir, ms) => {
                let direction = Direction::from_token(&dir.to_string())?;
                Some(PathStep::Face {
                    direction,
                    pause_ms: ms as f32,
                })
            },
        }
    }
}

/// Called once when a one-shot path finishes.
pub type PathCallback = Box<dyn FnMut(&mut Actor)>;

/// Drives one actor along a path, independent of the `move` barrier.
pub struct PathController {
    pub actor: ActorHandle,
    steps: Vec<PathStep>,
    looping: bool,
    index: usize,
    target: Option<Vector2>,
    pause_left: f32,
    on_complete: Option<PathCallback>,
}

impl fmt::Debug for PathController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathController")
            .field("actor", &self.actor)
            .field("steps", &self.steps)
            .field("looping", &self.looping)
            .field("index", &self.index)
            .field("has_callback", &self.on_complete.is_some())
            .finish()
    }
}

impl PathController {
    pub fn new(actor: ActorHandle, steps: Vec<PathStep>, looping: bool) -> Self {
        Self {
            actor,
            steps,
            looping,
            index: 0,
            target: None,
            pause_left: 0.0,
            on_complete: None,
        }
    }

    /// A rectangle walked clockwise from the actor's current tile.
    pub fn square(actor: ActorHandle, width: i32, height: i32, pause_ms: f32) -> Self {
        let legs = [
            TilePoint::new(width, 0),
            TilePoint::new(0, height),
            TilePoint::new(-width, 0),
            TilePoint::new(0, -height),
        ];
        let mut steps = Vec::new();
        for leg in legs {
            steps.push(PathStep::Walk(leg));
            if pause_ms > 0.0 {
                steps.push(PathStep::Wait(pause_ms));
            }
        }
        Self::new(actor, steps, true)
    }

    pub fn with_callback(mut self, callback: PathCallback) -> Self {
        self.on_complete = Some(callback);
        self
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Advance the actor along the path. Returns true once a one-shot path is
    /// done; the completion callback has run by then.
    pub fn update(&mut self, actor: &mut Actor, elapsed_ms: f32, config: &EngineConfig) -> bool {
        if self.steps.is_empty() {
            return self.complete(actor);
        }
        let step = self.steps[self.index];
        let step_done = match step {
            PathStep::Walk(offset) => {
                let target = *self.target.get_or_insert_with(|| {
                    Vector2::new(
                        actor.position.x + (offset.x * config.tile_size) as f32,
                        actor.position.y + (offset.y * config.tile_size) as f32,
                    )
                });
                let speed = actor.speed(config);
                actor.step_toward(target, speed)
            },
            PathStep::Face { direction, pause_ms } => {
                actor.halt();
                actor.face(direction);
                self.count_down(pause_ms, elapsed_ms)
            },
            PathStep::Wait(pause_ms) => {
                actor.halt();
                self.count_down(pause_ms, elapsed_ms)
            },
        };
        if !step_done {
            return false;
        }
        self.target = None;
        self.pause_left = 0.0;
        self.index += 1;
        if self.index < self.steps.len() {
            return false;
        }
        if self.looping {
            self.index = 0;
            return false;
        }
        self.complete(actor)
    }

    fn count_down(&mut self, pause_ms: f32, elapsed_ms: f32) -> bool {
        if self.pause_left <= 0.0 {
            self.pause_left = pause_ms;
        }
        self.pause_left -= elapsed_ms;
        self.pause_left <= 0.0
    }

    fn complete(&mut self, actor: &mut Actor) -> bool {
        actor.halt();
        if let Some(mut callback) = self.on_complete.take() {
            callback(actor);
        }
        true
    }
}
