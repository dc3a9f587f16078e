//! Actors: everything a script can name, move, and animate.

use std::fmt;

use pageant_data::{Direction, Rect, TilePoint, Vector2};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;

/// What sort of entity an actor is. Capabilities hang off the kind rather
/// than off separate actor types.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, variantly::Variantly)]
pub enum ActorKind {
    PlayerAvatar { number: u32 },
    NonPlayerCharacter,
    Pet,
    Monster,
    TransientProp,
}

impl ActorKind {
    /// Parse the kind token used by `addActor`.
    pub fn from_token(token: &str) -> Option<ActorKind> {
        match token.to_ascii_lowercase().as_str() {
            "npc" | "villager" => Some(ActorKind::NonPlayerCharacter),
            "pet" => Some(ActorKind::Pet),
            "monster" => Some(ActorKind::Monster),
            "prop" => Some(ActorKind::TransientProp),
            _ => None,
        }
    }

    pub fn can_emote(&self) -> bool {
        !matches!(self, ActorKind::TransientProp)
    }

    pub fn can_speak(&self) -> bool {
        matches!(self, ActorKind::PlayerAvatar { .. } | ActorKind::NonPlayerCharacter)
    }
}

/// An actor reference as written in a script.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorId {
    /// `farmer`
    LocalPlayer,
    /// `farmerN`
    Player(u32),
    /// Anything else.
    Named(String),
}

/// A parsed actor token. A trailing `?` marks the reference optional: failing
/// to resolve it is silent.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ActorRef {
    pub id: ActorId,
    pub optional: bool,
}

impl ActorRef {
    pub fn parse(token: &str) -> ActorRef {
        let (name, optional) = match token.strip_suffix('?') {
            Some(stripped) => (stripped, true),
            None => (token, false),
        };
        let lower = name.to_ascii_lowercase();
        let id = if lower == "farmer" {
            ActorId::LocalPlayer
        } else if let Some(number) = lower.strip_prefix("farmer").and_then(|n| n.parse::<u32>().ok()) {
            ActorId::Player(number)
        } else {
            ActorId::Named(name.to_string())
        };
        ActorRef { id, optional }
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            ActorId::LocalPlayer => write!(f, "farmer")?,
            ActorId::Player(n) => write!(f, "farmer{n}")?,
            ActorId::Named(name) => write!(f, "{name}")?,
        }
        if self.optional {
            write!(f, "?")?;
        }
        Ok(())
    }
}

/// A frame-list animation played on an actor's sprite.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameAnimation {
    pub frames: Vec<u32>,
    pub frame_ms: f32,
    pub looping: bool,
    index: usize,
    elapsed: f32,
}

impl FrameAnimation {
    pub fn new(frames: Vec<u32>, frame_ms: f32, looping: bool) -> Self {
        Self {
            frames,
            frame_ms,
            looping,
            index: 0,
            elapsed: 0.0,
        }
    }

    pub fn current(&self) -> Option<u32> {
        self.frames.get(self.index).copied()
    }

    /// Advance by `elapsed_ms`; returns false once a one-shot animation has
    /// shown its last frame for a full frame duration.
    fn advance(&mut self, elapsed_ms: f32) -> bool {
        if self.frames.is_empty() || self.frame_ms <= 0.0 {
            return false;
        }
        self.elapsed += elapsed_ms;
        while self.elapsed >= self.frame_ms {
            self.elapsed -= self.frame_ms;
            if self.index + 1 < self.frames.len() {
                self.index += 1;
            } else if self.looping {
                self.index = 0;
            } else {
                return false;
            }
        }
        true
    }
}

/// A countdown in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    pub remaining_ms: f32,
    /// Emote id, jump height, or shake strength depending on use.
    pub value: i32,
}

impl Timer {
    pub fn new(remaining_ms: f32, value: i32) -> Self {
        Self { remaining_ms, value }
    }

    fn tick(slot: &mut Option<Timer>, elapsed_ms: f32) {
        if let Some(timer) = slot {
            timer.remaining_ms -= elapsed_ms;
            if timer.remaining_ms <= 0.0 {
                *slot = None;
            }
        }
    }
}

/// One live actor on the stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    pub kind: ActorKind,
    /// Top-left pixel of the sprite's tile cell.
    pub position: Vector2,
    pub facing: Direction,
    pub frame: u32,
    pub flipped: bool,
    pub animation: Option<FrameAnimation>,
    pub emote: Option<Timer>,
    pub jump: Option<Timer>,
    pub shake: Option<Timer>,
    pub speed_override: Option<f32>,
    /// Set while a script (rather than AI or input) drives the actor.
    pub scripted_motion: bool,
    pub walking: bool,
}

impl Actor {
    pub fn new(name: impl Into<String>, kind: ActorKind, tile: TilePoint, facing: Direction, tile_size: i32) -> Self {
        let mut actor = Self {
            name: name.into(),
            kind,
            position: Vector2::ZERO,
            facing,
            frame: 0,
            flipped: false,
            animation: None,
            emote: None,
            jump: None,
            shake: None,
            speed_override: None,
            scripted_motion: false,
            walking: false,
        };
        actor.set_tile(tile, tile_size);
        actor
    }

    pub fn is_player(&self) -> bool {
        self.kind.is_player_avatar()
    }

    /// Collision box: 3/4 tile wide and half a tile tall, bottom-centred in the cell.
    pub fn bounding_box(&self, tile_size: i32) -> Rect {
        Rect::new(
            self.position.x.round() as i32 + tile_size / 8,
            self.position.y.round() as i32 + tile_size / 4,
            tile_size * 3 / 4,
            tile_size / 2,
        )
    }

    /// The tile under the centre of the bounding box.
    pub fn tile(&self, tile_size: i32) -> TilePoint {
        let bbox = self.bounding_box(tile_size);
        let cx = bbox.x + bbox.width / 2;
        let cy = bbox.y + bbox.height / 2;
        TilePoint::new(cx.div_euclid(tile_size), cy.div_euclid(tile_size))
    }

    pub fn set_tile(&mut self, tile: TilePoint, tile_size: i32) {
        self.position = tile_origin(tile, tile_size);
    }

    pub fn face(&mut self, direction: Direction) {
        self.facing = direction;
    }

    /// Stop walking and any sprite animation.
    pub fn halt(&mut self) {
        self.walking = false;
        self.animation = None;
    }

    /// Drop script-imposed motion state.
    pub fn clear_overrides(&mut self) {
        self.speed_override = None;
        self.scripted_motion = false;
    }

    /// Pixels per tick this actor moves when walking under script control.
    pub fn speed(&self, config: &EngineConfig) -> f32 {
        self.speed_override.unwrap_or(if self.is_player() {
            config.farmer_speed
        } else {
            config.npc_speed
        })
    }

    /// Walk one step of at most `speed` pixels toward `target`, horizontal
    /// axis first. Returns true when already there.
    pub fn step_toward(&mut self, target: Vector2, speed: f32) -> bool {
        let dx = target.x - self.position.x;
        let dy = target.y - self.position.y;
        self.walking = true;
        if dx.abs() > f32::EPSILON {
            let step = dx.abs().min(speed);
            self.position.x += step * dx.signum();
            self.facing = if dx > 0.0 { Direction::Right } else { Direction::Left };
            false
        } else if dy.abs() > f32::EPSILON {
            let step = dy.abs().min(speed);
            self.position.y += step * dy.signum();
            self.facing = if dy > 0.0 { Direction::Down } else { Direction::Up };
            false
        } else {
            self.walking = false;
            true
        }
    }

    /// Per-tick sprite and timer upkeep.
    pub fn update(&mut self, elapsed_ms: f32) {
        if let Some(animation) = &mut self.animation {
            if animation.advance(elapsed_ms) {
                if let Some(frame) = animation.current() {
                    self.frame = frame;
                }
            } else {
                if let Some(frame) = animation.frames.last() {
                    self.frame = *frame;
                }
                self.animation = None;
            }
        }
        Timer::tick(&mut self.emote, elapsed_ms);
        Timer::tick(&mut self.jump, elapsed_ms);
        Timer::tick(&mut self.shake, elapsed_ms);
    }
}

/// Top-left pixel of a tile.
pub fn tile_origin(tile: TilePoint, tile_size: i32) -> Vector2 {
    Vector2::new((tile.x * tile_size) as f32, (tile.y * tile_size) as f32)
}
