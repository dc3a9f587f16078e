//! Small geometry and color types shared by the script layer and the engine.
//!
//! Scripts address the stage in whole tiles; the engine moves actors in pixels.
//! Everything here is plain data so that it can travel through RON content files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// Facing direction, numbered the way event scripts number them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Right,
    #[default]
    Down,
    Left,
}

impl Direction {
    /// Parse a direction token: `up|down|left|right` (any case) or `0`-`3`.
    pub fn from_token(token: &str) -> Option<Direction> {
        match token.to_ascii_lowercase().as_str() {
            "0" | "up" => Some(Direction::Up),
            "1" | "right" => Some(Direction::Right),
            "2" | "down" => Some(Direction::Down),
            "3" | "left" => Some(Direction::Left),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Right => write!(f, "right"),
            Direction::Down => write!(f, "down"),
            Direction::Left => write!(f, "left"),
        }
    }
}

/// A whole-tile coordinate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct TilePoint {
    pub x: i32,
    pub y: i32,
}

impl TilePoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for TilePoint {
    type Output = TilePoint;

    fn add(self, rhs: TilePoint) -> TilePoint {
        TilePoint::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl fmt::Display for TilePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A pixel-space vector.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Add for Vector2 {
    type Output = Vector2;

    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// Axis-aligned integer rectangle (pixels or tiles, depending on the caller).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Grow (or shrink, for negative amounts) the rectangle on every side.
    pub fn inflate(&self, horizontal: i32, vertical: i32) -> Rect {
        Rect::new(
            self.x - horizontal,
            self.y - vertical,
            self.width + horizontal * 2,
            self.height + vertical * 2,
        )
    }

    /// True if `other` lies entirely within `self` (edges inclusive).
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left() >= self.left()
            && other.right() <= self.right()
            && other.top() >= self.top()
            && other.bottom() <= self.bottom()
    }
}

/// An RGBA color; scripts refer to colors by name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Look up one of the named colors scripts may use. Case-insensitive.
    pub fn from_name(name: &str) -> Option<Color> {
        let color = match name.to_ascii_lowercase().as_str() {
            "black" => Color::rgb(0, 0, 0),
            "white" => Color::rgb(255, 255, 255),
            "red" => Color::rgb(255, 0, 0),
            "green" => Color::rgb(0, 128, 0),
            "lime" => Color::rgb(0, 255, 0),
            "blue" => Color::rgb(0, 0, 255),
            "yellow" => Color::rgb(255, 255, 0),
            "orange" => Color::rgb(255, 165, 0),
            "purple" => Color::rgb(128, 0, 128),
            "pink" => Color::rgb(255, 192, 203),
            "gray" | "grey" => Color::rgb(128, 128, 128),
            "brown" => Color::rgb(165, 42, 42),
            "cyan" => Color::rgb(0, 255, 255),
            "gold" => Color::rgb(255, 215, 0),
            "transparent" => Color { r: 0, g: 0, b: 0, a: 0 },
            _ => return None,
        };
        Some(color)
    }
}
