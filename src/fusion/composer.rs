//! Persona fusion composer.
//!
//! Combines one resolved entry per catalog dimension with the scenario
//! context into the [`FusionPromptBlock`] handed to the generative client.
//! Composition is pure: identical requests always produce identical blocks,
//! which is what makes replays and pre-generated payloads reproducible.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::catalog::{AgeGroup, Archetype, CommunicationStyle, Mood, ResolvedPersona};

/// Cultural framing for the single locale supported by this release.
pub const DEFAULT_CULTURAL_CONTEXT: &str = "U.S. general adult population";

/// Substituted when a scenario names no focus areas.
const GENERIC_FOCUS: &str = "their needs";

// ─────────────────────────────────────────────────────────────────
// Inputs
// ─────────────────────────────────────────────────────────────────

/// A topic the scenario steers the conversation toward.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FocusArea {
    #[serde(default)]
    pub id: String,
    pub name: String,
}

impl FocusArea {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
        }
    }
}

/// Everything one composition needs. Catalog entries must already be resolved.
#[derive(Debug, Clone, Copy)]
pub struct FusionRequest<'a> {
    pub age: u32,
    pub mood: &'a Mood,
    pub communication_style: &'a CommunicationStyle,
    pub archetype: &'a Archetype,
    pub age_group: &'a AgeGroup,
    pub industry: &'a str,
    pub subcategory: Option<&'a str>,
    pub focus_areas: &'a [FocusArea],
}

impl<'a> FusionRequest<'a> {
    pub fn new(age: u32, persona: &'a ResolvedPersona, industry: &'a str) -> Self {
        Self {
            age,
            mood: &persona.mood,
            communication_style: &persona.communication_style,
            archetype: &persona.archetype,
            age_group: &persona.age_group,
            industry,
            subcategory: None,
            focus_areas: &[],
        }
    }

    pub fn with_subcategory(mut self, subcategory: Option<&'a str>) -> Self {
        self.subcategory = subcategory;
        self
    }

    pub fn with_focus_areas(mut self, focus_areas: &'a [FocusArea]) -> Self {
        self.focus_areas = focus_areas;
        self
    }

    /// Subcategory when one is given, otherwise the industry.
    fn scenario_label(&self) -> &'a str {
        self.subcategory
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.industry)
    }

    fn focus_phrase(&self) -> String {
        let names: Vec<&str> = self
            .focus_areas
            .iter()
            .map(|f| f.name.trim())
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            GENERIC_FOCUS.to_string()
        } else {
            names.join(", ")
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────

/// The composed persona instruction payload. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionPromptBlock {
    pub age: u32,
    pub life_stage: String,
    pub mood: String,
    pub communication_style: String,
    pub archetype: String,
    pub cultural_context: String,
    pub vocabulary_guidance: String,
    pub tone_guidance: String,
    pub reference_guidance: String,
}

impl FusionPromptBlock {
    /// Hex SHA-256 over every field, used as the key for pre-generated payloads.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.age.to_be_bytes());
        for field in [
            &self.life_stage,
            &self.mood,
            &self.communication_style,
            &self.archetype,
            &self.cultural_context,
            &self.vocabulary_guidance,
            &self.tone_guidance,
            &self.reference_guidance,
        ] {
            // Length prefix keeps adjacent fields from bleeding into each other.
            hasher.update((field.len() as u64).to_be_bytes());
            hasher.update(field.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

// ─────────────────────────────────────────────────────────────────
// Composer
// ─────────────────────────────────────────────────────────────────

/// Composer bound to a cultural context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composer {
    cultural_context: String,
}

impl Composer {
    pub fn new(cultural_context: impl Into<String>) -> Self {
        Self {
            cultural_context: cultural_context.into(),
        }
    }

    pub fn cultural_context(&self) -> &str {
        &self.cultural_context
    }

    pub fn compose(&self, request: &FusionRequest<'_>) -> FusionPromptBlock {
        let vocabulary_guidance = format!(
            "Speak as a {age}-year-old would in a real-world {scenario} scenario. \
             Use language consistent with someone discussing {focus}. \
             Avoid technical jargon unless prompted, and match the tone and style of the persona.",
            age = request.age,
            scenario = request.scenario_label(),
            focus = request.focus_phrase(),
        );

        FusionPromptBlock {
            age: request.age,
            life_stage: request.age_group.name.clone(),
            mood: request.mood.key.clone(),
            communication_style: request.communication_style.key.clone(),
            archetype: request.archetype.key.clone(),
            cultural_context: self.cultural_context.clone(),
            vocabulary_guidance,
            tone_guidance: request.mood.description.clone(),
            reference_guidance: request.communication_style.example.clone(),
        }
    }
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(DEFAULT_CULTURAL_CONTEXT)
    }
}

/// Compose with the release's default cultural context.
pub fn compose(request: &FusionRequest<'_>) -> FusionPromptBlock {
    Composer::default().compose(request)
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
