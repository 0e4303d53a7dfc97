use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Inclusive integer interval `[min, max]`.
///
/// On the wire a range travels as the string `"<min>-<max>"`. Negative bounds
/// keep their sign, so `-10` to `-5` is written `"-10--5"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Range {
    pub min: i64,
    pub max: i64,
}

impl Range {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Accepts only ranges a chooser may announce, i.e. `min < max`.
    pub fn announced(min: i64, max: i64) -> Result<Self, GameError> {
        if min >= max {
            return Err(GameError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, value: i64) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn midpoint(&self) -> i64 {
        midpoint(self.min, self.max)
    }
}

/// `floor((min + max) / 2)`, rounding toward negative infinity for negative sums.
pub fn midpoint(min: i64, max: i64) -> i64 {
    // Widened so the sum cannot overflow; the result always fits back into i64.
    (i128::from(min) + i128::from(max)).div_euclid(2) as i64
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl FromStr for Range {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        // The delimiter is the first hyphen that is not a leading sign and
        // leaves two parseable integers on either side.
        text.char_indices()
            .filter(|&(index, ch)| ch == '-' && index > 0)
            .find_map(|(index, _)| {
                let min = text[..index].parse().ok()?;
                let max = text[index + 1..].parse().ok()?;
                Some(Self { min, max })
            })
            .ok_or_else(|| GameError::MalformedRange(s.to_string()))
    }
}

impl From<Range> for String {
    fn from(range: Range) -> Self {
        range.to_string()
    }
}

impl TryFrom<String> for Range {
    type Error = GameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
