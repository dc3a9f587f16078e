use pageant_data::{Color, Direction, Rect, TilePoint, Vector2};
use std::str::FromStr;

/// A failure decoding a positional argument.
///
/// Index 0 is the command name, so the first real argument is index 1.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgError {
    #[error("required index {index} ({name}) not found (list has indexes 0 through {max})")]
    Missing { index: usize, name: String, max: usize },
    #[error("required index {index} ({name}) has value '{value}', which can't be parsed as {expected}")]
    Invalid {
        index: usize,
        name: String,
        value: String,
        expected: &'static str,
    },
}

impl ArgError {
    /// Position of the offending token.
    pub fn index(&self) -> usize {
        match self {
            ArgError::Missing { index, .. } | ArgError::Invalid { index, .. } => *index,
        }
    }
}

/// Position-based reader over a split command.
///
/// Every accessor takes the absolute index and a field name used in error
/// messages. Handlers usually read several fields with `?` and report the
/// first failure as a single error.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    tokens: &'a [String],
}

impl<'a> Args<'a> {
    pub fn new(tokens: &'a [String]) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The command name (index 0), or an empty string for an empty command.
    pub fn name(&self) -> &'a str {
        self.tokens.first().map_or("", String::as_str)
    }

    /// Tokens from `index` onwards (empty when out of range).
    pub fn rest(&self, index: usize) -> &'a [String] {
        self.tokens.get(index..).unwrap_or(&[])
    }

    pub fn opt(&self, index: usize) -> Option<&'a str> {
        self.tokens.get(index).map(String::as_str)
    }

    pub fn get(&self, index: usize, name: &str) -> Result<&'a str, ArgError> {
        self.opt(index).ok_or_else(|| ArgError::Missing {
            index,
            name: name.to_string(),
            max: self.tokens.len().saturating_sub(1),
        })
    }

    pub fn int(&self, index: usize, name: &str) -> Result<i32, ArgError> {
        self.parsed(index, name, "an integer")
    }

    /// An integer that falls back to `default` when absent; a present but
    /// malformed value is still an error.
    pub fn opt_int(&self, index: usize, name: &str, default: i32) -> Result<i32, ArgError> {
        match self.opt(index) {
            None => Ok(default),
            Some(_) => self.int(index, name),
        }
    }

    /// A finite number; `NaN` and infinities are rejected.
    pub fn float(&self, index: usize, name: &str) -> Result<f32, ArgError> {
        let raw = self.get(index, name)?;
        match raw.parse::<f32>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(self.invalid(index, name, raw, "a finite number")),
        }
    }

    pub fn opt_float(&self, index: usize, name: &str, default: f32) -> Result<f32, ArgError> {
        match self.opt(index) {
            None => Ok(default),
            Some(_) => self.float(index, name),
        }
    }

    /// `true` or `false`, case-insensitive.
    pub fn bool(&self, index: usize, name: &str) -> Result<bool, ArgError> {
        let raw = self.get(index, name)?;
        if raw.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(self.invalid(index, name, raw, "a boolean (true/false)"))
        }
    }

    pub fn opt_bool(&self, index: usize, name: &str, default: bool) -> Result<bool, ArgError> {
        match self.opt(index) {
            None => Ok(default),
            Some(_) => self.bool(index, name),
        }
    }

    /// Two integers at `index` and `index + 1`.
    pub fn point(&self, index: usize, name: &str) -> Result<TilePoint, ArgError> {
        let x = self.int(index, &format!("{name} X"))?;
        let y = self.int(index + 1, &format!("{name} Y"))?;
        Ok(TilePoint::new(x, y))
    }

    /// Two numbers at `index` and `index + 1`.
    pub fn vector(&self, index: usize, name: &str) -> Result<Vector2, ArgError> {
        let x = self.float(index, &format!("{name} X"))?;
        let y = self.float(index + 1, &format!("{name} Y"))?;
        Ok(Vector2::new(x, y))
    }

    pub fn direction(&self, index: usize, name: &str) -> Result<Direction, ArgError> {
        let raw = self.get(index, name)?;
        Direction::from_token(raw)
            .ok_or_else(|| self.invalid(index, name, raw, "a direction (up/down/left/right or 0-3)"))
    }

    /// Four integers: x, y, width, height.
    pub fn rect(&self, index: usize, name: &str) -> Result<Rect, ArgError> {
        let x = self.int(index, &format!("{name} X"))?;
        let y = self.int(index + 1, &format!("{name} Y"))?;
        let width = self.int(index + 2, &format!("{name} width"))?;
        let height = self.int(index + 3, &format!("{name} height"))?;
        Ok(Rect::new(x, y, width, height))
    }

    pub fn color(&self, index: usize, name: &str) -> Result<Color, ArgError> {
        let raw = self.get(index, name)?;
        Color::from_name(raw).ok_or_else(|| self.invalid(index, name, raw, "a color name"))
    }

    /// All tokens from `index` onwards joined by single spaces.
    pub fn remainder(&self, index: usize, name: &str) -> Result<String, ArgError> {
        self.get(index, name)?;
        Ok(self.rest(index).join(" "))
    }

    fn parsed<T: FromStr>(&self, index: usize, name: &str, expected: &'static str) -> Result<T, ArgError> {
        let raw = self.get(index, name)?;
        raw.parse::<T>().map_err(|_| self.invalid(index, name, raw, expected))
    }

    fn invalid(&self, index: usize, name: &str, raw: &str, expected: &'static str) -> ArgError {
        ArgError::Invalid {
            index,
            name: name.to_string(),
            value: raw.to_string(),
            expected,
        }
    }
}
