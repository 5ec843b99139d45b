//! Competency and rubric data, and the read interface the evaluator consumes.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::difficulty::DifficultyTier;
use crate::error::{Error, Result};

use super::evaluator::CompetencyRubric;

const BUNDLED_RUBRIC: &str = include_str!("../../config/rubric.toml");

// ─────────────────────────────────────────────────────────────────
// Data Types
// ─────────────────────────────────────────────────────────────────

/// One scoring band of a competency, as authored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricEntry {
    pub id: String,
    /// Owning competency. Filled from the enclosing competency when omitted.
    #[serde(default)]
    pub competency_id: String,
    /// Free-text band, e.g. "0–4".
    pub score_range: String,
    /// Qualitative criteria text shown with the band.
    pub criteria: String,
}

/// A skill being assessed, with its rubric bands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competency {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Bands shared by every difficulty tier.
    #[serde(default)]
    pub rubrics: Vec<RubricEntry>,
    /// Tier-specific bands. A tier listed here ignores `rubrics`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tiers: BTreeMap<DifficultyTier, Vec<RubricEntry>>,
}

impl Competency {
    pub fn new(id: impl Into<String>, name: impl Into<String>, rubrics: Vec<RubricEntry>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            rubrics,
            tiers: BTreeMap::new(),
        }
    }

    /// Replace the bands used for `tier`.
    pub fn with_tier(mut self, tier: DifficultyTier, rubrics: Vec<RubricEntry>) -> Self {
        self.tiers.insert(tier, rubrics);
        self
    }

    /// Bands that apply at `tier`.
    pub fn rubrics_for(&self, tier: DifficultyTier) -> &[RubricEntry] {
        self.tiers.get(&tier).unwrap_or(&self.rubrics)
    }
}

// ─────────────────────────────────────────────────────────────────
// Read Interface
// ─────────────────────────────────────────────────────────────────

/// Read-only access to competencies and their rubric bands.
pub trait CompetencySource: Send + Sync {
    /// All competencies, in authoring order.
    fn competencies(&self) -> Vec<Competency>;

    fn competency(&self, id: &str) -> Option<Competency> {
        self.competencies().into_iter().find(|c| c.id == id)
    }

    /// Competencies with the given ids, in the order requested.
    fn select(&self, ids: &[String]) -> Result<Vec<Competency>> {
        ids.iter()
            .map(|id| {
                self.competency(id)
                    .ok_or_else(|| Error::rubric_invalid(format!("unknown competency '{}'", id)))
            })
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────
// Rubric Store
// ─────────────────────────────────────────────────────────────────

/// Competencies loaded from a TOML file, with every band pre-parsed.
#[derive(Debug, Clone, Default)]
pub struct RubricStore {
    pub version: String,
    rubrics: Vec<CompetencyRubric>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RubricFile {
    version: String,
    competencies: Vec<Competency>,
}

impl RubricStore {
    /// Parse rubric TOML. Fails on the first malformed score range.
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: RubricFile = toml::from_str(content).map_err(|e| Error::ConfigParse {
            what: "rubric".to_string(),
            message: e.message().to_string(),
            source: Some(e),
        })?;
        Self::from_competencies(file.version, file.competencies)
    }

    /// Build a store from already-deserialized competencies.
    pub fn from_competencies(version: String, competencies: Vec<Competency>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut rubrics = Vec::with_capacity(competencies.len());

        for mut competency in competencies {
            if competency.id.trim().is_empty() {
                return Err(Error::rubric_invalid("competency with empty id"));
            }
            if !seen.insert(competency.id.clone()) {
                return Err(Error::rubric_invalid(format!(
                    "duplicate competency '{}'",
                    competency.id
                )));
            }
            let owner = competency.id.clone();
            let entries = competency
                .rubrics
                .iter_mut()
                .chain(competency.tiers.values_mut().flatten());
            for entry in entries {
                if entry.competency_id.is_empty() {
                    entry.competency_id = owner.clone();
                } else if entry.competency_id != owner {
                    return Err(Error::rubric_invalid(format!(
                        "rubric entry {} is listed under '{}' but owned by '{}'",
                        entry.id, owner, entry.competency_id
                    )));
                }
            }

            let rubric = CompetencyRubric::load(competency)?;
            for issue in rubric.issues() {
                warn!(competency = %rubric.competency.id, issue = %issue, "Rubric data-quality issue");
            }
            rubrics.push(rubric);
        }

        debug!(competencies = rubrics.len(), "Rubric store built");
        Ok(Self { version, rubrics })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let store = Self::from_toml(&content)?;
        info!(
            path = %path.display(),
            version = %store.version,
            competencies = store.rubrics.len(),
            "Rubric loaded"
        );
        Ok(store)
    }

    /// The rubric compiled into the binary.
    pub fn bundled() -> Result<Self> {
        Self::from_toml(BUNDLED_RUBRIC)
    }

    pub fn bundled_source() -> &'static str {
        BUNDLED_RUBRIC
    }

    /// Pre-parsed rubrics, in authoring order.
    pub fn rubrics(&self) -> &[CompetencyRubric] {
        &self.rubrics
    }

    pub fn rubric(&self, id: &str) -> Option<&CompetencyRubric> {
        self.rubrics.iter().find(|r| r.competency.id == id)
    }

    pub fn len(&self) -> usize {
        self.rubrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rubrics.is_empty()
    }
}

impl CompetencySource for RubricStore {
    fn competencies(&self) -> Vec<Competency> {
        self.rubrics.iter().map(|r| r.competency.clone()).collect()
    }

    fn competency(&self, id: &str) -> Option<Competency> {
        self.rubric(id).map(|r| r.competency.clone())
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
