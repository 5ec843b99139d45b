//! Core types for the trait catalog.
//!
//! Every entry is addressed by a `key` that is stable and unique within its
//! dimension. Sessions reference entries by key, never by storage identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────
// Trait Dimension
// ─────────────────────────────────────────────────────────────────

/// The independently curated catalogs a persona is fused from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraitDimension {
    Mood,
    CommunicationStyle,
    Archetype,
    AgeGroup,
    CoreTrait,
    Quirk,
}

impl TraitDimension {
    /// Slug used in CLI args and error messages.
    pub fn slug(&self) -> &'static str {
        match self {
            TraitDimension::Mood => "mood",
            TraitDimension::CommunicationStyle => "communication-style",
            TraitDimension::Archetype => "archetype",
            TraitDimension::AgeGroup => "age-group",
            TraitDimension::CoreTrait => "core-trait",
            TraitDimension::Quirk => "quirk",
        }
    }

    /// All dimensions in catalog order.
    pub fn all() -> &'static [TraitDimension] {
        &[
            TraitDimension::Mood,
            TraitDimension::CommunicationStyle,
            TraitDimension::Archetype,
            TraitDimension::AgeGroup,
            TraitDimension::CoreTrait,
            TraitDimension::Quirk,
        ]
    }
}

impl fmt::Display for TraitDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for TraitDimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mood" | "moods" => Ok(TraitDimension::Mood),
            "communication-style" | "communication_style" | "style" | "styles" => {
                Ok(TraitDimension::CommunicationStyle)
            }
            "archetype" | "archetypes" => Ok(TraitDimension::Archetype),
            "age-group" | "age_group" | "age" => Ok(TraitDimension::AgeGroup),
            "core-trait" | "core_trait" | "trait" | "traits" => Ok(TraitDimension::CoreTrait),
            "quirk" | "quirks" => Ok(TraitDimension::Quirk),
            _ => Err(format!(
                "Unknown dimension '{}'. Valid: mood, communication-style, archetype, age-group, core-trait, quirk",
                s
            )),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Catalog Entries
// ─────────────────────────────────────────────────────────────────

/// Emotional baseline of the simulated client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mood {
    pub key: String,
    pub label: String,
    /// Injected verbatim as the persona's tone guidance.
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicationStyle {
    pub key: String,
    pub label: String,
    pub description: String,
    /// Sample utterance, injected verbatim as reference guidance.
    pub example: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archetype {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Life stage bracket. `range` is authored text such as "35-50" or "65+".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeGroup {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub range: String,
}

impl AgeGroup {
    /// Inclusive bounds parsed from `range`; `None` upper bound means open-ended.
    pub fn bounds(&self) -> Option<(u32, Option<u32>)> {
        let range = self.range.trim();
        if let Some(lo) = range.strip_suffix('+') {
            return lo.trim().parse().ok().map(|lo| (lo, None));
        }
        let (lo, hi) = range.split_once(['-', '–'])?;
        let lo: u32 = lo.trim().parse().ok()?;
        let hi: u32 = hi.trim().parse().ok()?;
        (lo <= hi).then_some((lo, Some(hi)))
    }

    pub fn contains(&self, age: u32) -> bool {
        match self.bounds() {
            Some((lo, Some(hi))) => (lo..=hi).contains(&age),
            Some((lo, None)) => age >= lo,
            None => false,
        }
    }
}

/// Personality dimension with its influence weight on the fused profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreTrait {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Behavioral idiosyncrasy layered onto a persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quirk {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub example: String,
}

/// A catalog entry of any dimension, as returned by generic lookups.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "dimension", rename_all = "kebab-case")]
pub enum CatalogEntry {
    Mood(Mood),
    CommunicationStyle(CommunicationStyle),
    Archetype(Archetype),
    AgeGroup(AgeGroup),
    CoreTrait(CoreTrait),
    Quirk(Quirk),
}

impl CatalogEntry {
    pub fn dimension(&self) -> TraitDimension {
        match self {
            CatalogEntry::Mood(_) => TraitDimension::Mood,
            CatalogEntry::CommunicationStyle(_) => TraitDimension::CommunicationStyle,
            CatalogEntry::Archetype(_) => TraitDimension::Archetype,
            CatalogEntry::AgeGroup(_) => TraitDimension::AgeGroup,
            CatalogEntry::CoreTrait(_) => TraitDimension::CoreTrait,
            CatalogEntry::Quirk(_) => TraitDimension::Quirk,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            CatalogEntry::Mood(e) => &e.key,
            CatalogEntry::CommunicationStyle(e) => &e.key,
            CatalogEntry::Archetype(e) => &e.key,
            CatalogEntry::AgeGroup(e) => &e.key,
            CatalogEntry::CoreTrait(e) => &e.key,
            CatalogEntry::Quirk(e) => &e.key,
        }
    }

    /// Human-facing label (moods and styles) or name (everything else).
    pub fn label(&self) -> &str {
        match self {
            CatalogEntry::Mood(e) => &e.label,
            CatalogEntry::CommunicationStyle(e) => &e.label,
            CatalogEntry::Archetype(e) => &e.name,
            CatalogEntry::AgeGroup(e) => &e.name,
            CatalogEntry::CoreTrait(e) => &e.name,
            CatalogEntry::Quirk(e) => &e.name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            CatalogEntry::Mood(e) => &e.description,
            CatalogEntry::CommunicationStyle(e) => &e.description,
            CatalogEntry::Archetype(e) => &e.description,
            CatalogEntry::AgeGroup(e) => &e.range,
            CatalogEntry::CoreTrait(e) => &e.description,
            CatalogEntry::Quirk(e) => &e.description,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Selections
// ─────────────────────────────────────────────────────────────────

/// One key per fusion dimension, as chosen by a trainer or learner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaSelection {
    pub mood: String,
    pub communication_style: String,
    pub archetype: String,
    pub age_group: String,
}

/// A selection with every key resolved to its full catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPersona {
    pub mood: Mood,
    pub communication_style: CommunicationStyle,
    pub archetype: Archetype,
    pub age_group: AgeGroup,
}

impl ResolvedPersona {
    /// The keys this persona was resolved from.
    pub fn selection(&self) -> PersonaSelection {
        PersonaSelection {
            mood: self.mood.key.clone(),
            communication_style: self.communication_style.key.clone(),
            archetype: self.archetype.key.clone(),
            age_group: self.age_group.key.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
