use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::tags::TagSet;

/// Score ceiling forced by any negative tag.
pub const LOW_SCORE_CEILING: i32 = 25;
/// Score floor granted to unflagged reports.
pub const MEDIUM_SCORE_FLOOR: i32 = 50;
/// Score floor granted by two or more positive tags.
pub const HIGH_SCORE_FLOOR: i32 = 75;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Low,
    #[default]
    Medium,
    High,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Low => "Low",
            Tier::Medium => "Medium",
            Tier::High => "High",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown tier: {0}")]
pub struct UnknownTier(pub String);

impl FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Low" => Ok(Tier::Low),
            "Medium" => Ok(Tier::Medium),
            "High" => Ok(Tier::High),
            other => Err(UnknownTier(other.to_string())),
        }
    }
}

/// Reduce the final tag set and working score to a tier and adjusted score.
/// The negative check runs first: any red flag forces Low no matter how many
/// positive tags are present. Do not reorder.
pub fn classify_tier(tags: &TagSet, score: i32) -> (Tier, i32) {
    if tags.has_negative() {
        (Tier::Low, score.min(LOW_SCORE_CEILING))
    } else if tags.positive_count() >= 2 {
        (Tier::High, score.max(HIGH_SCORE_FLOOR))
    } else {
        (Tier::Medium, score.max(MEDIUM_SCORE_FLOOR))
    }
}
