//! Difficulty tiers and the normalizer for untyped difficulty input.
//!
//! Difficulty arrives from network payloads in whatever shape the caller
//! sent. [`normalize`] is total: every input maps to a tier and nothing here
//! returns an error, so a malformed hint can never block session creation.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

// ─────────────────────────────────────────────────────────────────
// Difficulty Tier
// ─────────────────────────────────────────────────────────────────

/// The ordered difficulty tiers a session can run at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyTier {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl DifficultyTier {
    pub fn all() -> &'static [DifficultyTier] {
        &[
            DifficultyTier::Beginner,
            DifficultyTier::Intermediate,
            DifficultyTier::Advanced,
        ]
    }

    pub fn key(&self) -> &'static str {
        match self {
            DifficultyTier::Beginner => "beginner",
            DifficultyTier::Intermediate => "intermediate",
            DifficultyTier::Advanced => "advanced",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DifficultyTier::Beginner => "Beginner",
            DifficultyTier::Intermediate => "Intermediate",
            DifficultyTier::Advanced => "Advanced",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DifficultyTier::Beginner => "Basic scenarios for new learners",
            DifficultyTier::Intermediate => "Moderate complexity with some challenges",
            DifficultyTier::Advanced => "Complex scenarios requiring experience",
        }
    }

    /// Sort position, strictly increasing with difficulty.
    pub fn display_order(&self) -> u8 {
        match self {
            DifficultyTier::Beginner => 1,
            DifficultyTier::Intermediate => 2,
            DifficultyTier::Advanced => 3,
        }
    }

    /// Lower-cased spellings accepted for this tier.
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            DifficultyTier::Beginner => &["beginner", "basic", "easy", "novice"],
            DifficultyTier::Intermediate => &["intermediate", "medium", "moderate"],
            DifficultyTier::Advanced => &["advanced", "expert", "hard", "difficult"],
        }
    }

    /// How forthcoming the simulated client is at this tier.
    pub fn disclosure_guidance(&self) -> &'static str {
        match self {
            DifficultyTier::Beginner => {
                "Be friendly, cooperative, and open. Provide information readily when asked. \
                 Share your financial details, family situation, and goals when asked directly."
            }
            DifficultyTier::Intermediate => {
                "Be somewhat reserved about sharing personal details until trust is established. \
                 Do not volunteer detailed financial information unless specifically asked."
            }
            DifficultyTier::Advanced => {
                "Be skeptical and very guarded with your information. Do not volunteer financial \
                 details or specific goals unless significant trust has been established, and \
                 require the advisor to demonstrate expertise before opening up."
            }
        }
    }

    /// Match a trimmed, lower-cased spelling against the synonym sets.
    fn from_synonym(normalized: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|tier| tier.synonyms().contains(&normalized))
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

// ─────────────────────────────────────────────────────────────────
// Five-Level Scale
// ─────────────────────────────────────────────────────────────────

/// Numeric 1-5 difficulty scale used by scenario authoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ScaleLevel(u8);

impl ScaleLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&level).then_some(Self(level))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = ScaleLevel> {
        (Self::MIN..=Self::MAX).map(ScaleLevel)
    }

    pub fn label(&self) -> &'static str {
        match self.0 {
            1 => "Beginner",
            2 => "Intermediate",
            3 => "Advanced",
            4 => "Expert",
            _ => "Master",
        }
    }

    pub fn description(&self) -> &'static str {
        match self.0 {
            1 => "Basic scenarios for new learners",
            2 => "Moderate complexity with some challenges",
            3 => "Complex scenarios requiring experience",
            4 => "Very challenging situations",
            _ => "Maximum difficulty for experts",
        }
    }

    /// Tier a level runs at; the two top levels share the advanced tier.
    pub fn tier(&self) -> DifficultyTier {
        match self.0 {
            1 => DifficultyTier::Beginner,
            2 => DifficultyTier::Intermediate,
            _ => DifficultyTier::Advanced,
        }
    }
}

impl TryFrom<u8> for ScaleLevel {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        ScaleLevel::new(level).ok_or_else(|| format!("difficulty level {} outside 1-5", level))
    }
}

impl From<ScaleLevel> for u8 {
    fn from(level: ScaleLevel) -> u8 {
        level.0
    }
}

// ─────────────────────────────────────────────────────────────────
// Normalizer
// ─────────────────────────────────────────────────────────────────

/// Shape of a raw difficulty value as received from upstream.
#[derive(Debug, Clone, PartialEq)]
pub enum DifficultyInput {
    /// Missing or null.
    Absent,
    Text(String),
    /// A structured value, carried as its string representation.
    Object(String),
    /// Numbers, booleans and anything else without a textual reading.
    Other,
}

impl DifficultyInput {
    /// Wrap any displayable value as an object input.
    pub fn object(value: &impl fmt::Display) -> Self {
        DifficultyInput::Object(value.to_string())
    }
}

impl From<Option<&str>> for DifficultyInput {
    fn from(value: Option<&str>) -> Self {
        value.map_or(DifficultyInput::Absent, |s| DifficultyInput::Text(s.to_string()))
    }
}

impl From<&serde_json::Value> for DifficultyInput {
    fn from(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => DifficultyInput::Absent,
            Value::String(s) => DifficultyInput::Text(s.clone()),
            Value::Object(_) | Value::Array(_) => DifficultyInput::Object(value.to_string()),
            Value::Bool(_) | Value::Number(_) => DifficultyInput::Other,
        }
    }
}

/// Map any difficulty input onto a tier. Unrecognized input yields the default tier.
pub fn normalize(input: &DifficultyInput) -> DifficultyTier {
    let tier = match input {
        DifficultyInput::Absent | DifficultyInput::Other => None,
        DifficultyInput::Text(text) => match_text(text),
        // Single re-entry through the string rule. A representation that is
        // itself object-shaped is never reprocessed.
        DifficultyInput::Object(repr) if looks_structured(repr) => None,
        DifficultyInput::Object(repr) => match_text(repr),
    };

    tier.unwrap_or_else(|| {
        debug!(input = ?input, "Unrecognized difficulty input, using default tier");
        DifficultyTier::default()
    })
}

/// Convenience wrapper for JSON payload values.
pub fn normalize_value(value: &serde_json::Value) -> DifficultyTier {
    normalize(&DifficultyInput::from(value))
}

fn match_text(text: &str) -> Option<DifficultyTier> {
    DifficultyTier::from_synonym(&text.trim().to_lowercase())
}

fn looks_structured(repr: &str) -> bool {
    let trimmed = repr.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[') || trimmed.starts_with("[object")
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
