//! Catalog lookup interface and the in-memory catalog store.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::types::{
    AgeGroup, Archetype, CatalogEntry, CommunicationStyle, CoreTrait, Mood, PersonaSelection,
    Quirk, ResolvedPersona, TraitDimension,
};

// ─────────────────────────────────────────────────────────────────
// Lookup Interface
// ─────────────────────────────────────────────────────────────────

/// Read-only access to the trait catalog.
///
/// Injected into the fusion path so composition can be tested without any
/// storage behind it. Implementations must be safe to share across requests.
pub trait CatalogLookup: Send + Sync {
    fn get_by_key(&self, dimension: TraitDimension, key: &str) -> Option<CatalogEntry>;

    fn mood(&self, key: &str) -> Result<Mood> {
        match self.get_by_key(TraitDimension::Mood, key) {
            Some(CatalogEntry::Mood(m)) => Ok(m),
            _ => Err(Error::unknown_key(TraitDimension::Mood, key)),
        }
    }

    fn communication_style(&self, key: &str) -> Result<CommunicationStyle> {
        match self.get_by_key(TraitDimension::CommunicationStyle, key) {
            Some(CatalogEntry::CommunicationStyle(s)) => Ok(s),
            _ => Err(Error::unknown_key(TraitDimension::CommunicationStyle, key)),
        }
    }

    fn archetype(&self, key: &str) -> Result<Archetype> {
        match self.get_by_key(TraitDimension::Archetype, key) {
            Some(CatalogEntry::Archetype(a)) => Ok(a),
            _ => Err(Error::unknown_key(TraitDimension::Archetype, key)),
        }
    }

    fn age_group(&self, key: &str) -> Result<AgeGroup> {
        match self.get_by_key(TraitDimension::AgeGroup, key) {
            Some(CatalogEntry::AgeGroup(g)) => Ok(g),
            _ => Err(Error::unknown_key(TraitDimension::AgeGroup, key)),
        }
    }

    /// Resolve every key of a selection. Fails on the first unknown key,
    /// in mood, style, archetype, age-group order.
    fn resolve(&self, selection: &PersonaSelection) -> Result<ResolvedPersona> {
        Ok(ResolvedPersona {
            mood: self.mood(&selection.mood)?,
            communication_style: self.communication_style(&selection.communication_style)?,
            archetype: self.archetype(&selection.archetype)?,
            age_group: self.age_group(&selection.age_group)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────
// Trait Catalog
// ─────────────────────────────────────────────────────────────────

/// Full catalog, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraitCatalog {
    /// Semantic version of the catalog content (e.g. "1.0.0").
    pub version: String,
    pub moods: Vec<Mood>,
    pub communication_styles: Vec<CommunicationStyle>,
    pub archetypes: Vec<Archetype>,
    pub age_groups: Vec<AgeGroup>,
    pub core_traits: Vec<CoreTrait>,
    pub quirks: Vec<Quirk>,
}

impl TraitCatalog {
    /// Parse and validate a catalog from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let catalog: TraitCatalog = toml::from_str(content).map_err(|e| Error::ConfigParse {
            what: "trait catalog".to_string(),
            message: e.message().to_string(),
            source: Some(e),
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading trait catalog");
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let catalog = Self::from_toml(&content)?;
        info!(
            path = %path.display(),
            version = %catalog.version,
            entries = catalog.len(),
            "Trait catalog loaded"
        );
        Ok(catalog)
    }

    /// Keys must be non-empty and unique within their dimension.
    pub fn validate(&self) -> Result<()> {
        for dimension in TraitDimension::all() {
            let mut seen = HashSet::new();
            for entry in self.entries(*dimension) {
                let key = entry.key();
                if key.trim().is_empty() {
                    return Err(Error::CatalogInvalid {
                        dimension: *dimension,
                        key: None,
                        message: "entry with empty key".to_string(),
                    });
                }
                if !seen.insert(key.to_string()) {
                    return Err(Error::CatalogInvalid {
                        dimension: *dimension,
                        key: Some(key.to_string()),
                        message: format!("duplicate key '{}'", key),
                    });
                }
            }
        }
        Ok(())
    }

    /// All entries of one dimension, in authoring order.
    pub fn entries(&self, dimension: TraitDimension) -> Vec<CatalogEntry> {
        match dimension {
            TraitDimension::Mood => self.moods.iter().cloned().map(CatalogEntry::Mood).collect(),
            TraitDimension::CommunicationStyle => self
                .communication_styles
                .iter()
                .cloned()
                .map(CatalogEntry::CommunicationStyle)
                .collect(),
            TraitDimension::Archetype => {
                self.archetypes.iter().cloned().map(CatalogEntry::Archetype).collect()
            }
            TraitDimension::AgeGroup => {
                self.age_groups.iter().cloned().map(CatalogEntry::AgeGroup).collect()
            }
            TraitDimension::CoreTrait => {
                self.core_traits.iter().cloned().map(CatalogEntry::CoreTrait).collect()
            }
            TraitDimension::Quirk => self.quirks.iter().cloned().map(CatalogEntry::Quirk).collect(),
        }
    }

    /// Total entries across all dimensions.
    pub fn len(&self) -> usize {
        self.moods.len()
            + self.communication_styles.len()
            + self.archetypes.len()
            + self.age_groups.len()
            + self.core_traits.len()
            + self.quirks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First age group whose range covers `age`.
    pub fn age_group_for(&self, age: u32) -> Option<&AgeGroup> {
        self.age_groups.iter().find(|g| g.contains(age))
    }
}

impl CatalogLookup for TraitCatalog {
    fn get_by_key(&self, dimension: TraitDimension, key: &str) -> Option<CatalogEntry> {
        match dimension {
            TraitDimension::Mood => self
                .moods
                .iter()
                .find(|e| e.key == key)
                .cloned()
                .map(CatalogEntry::Mood),
            TraitDimension::CommunicationStyle => self
                .communication_styles
                .iter()
                .find(|e| e.key == key)
                .cloned()
                .map(CatalogEntry::CommunicationStyle),
            TraitDimension::Archetype => self
                .archetypes
                .iter()
                .find(|e| e.key == key)
                .cloned()
                .map(CatalogEntry::Archetype),
            TraitDimension::AgeGroup => self
                .age_groups
                .iter()
                .find(|e| e.key == key)
                .cloned()
                .map(CatalogEntry::AgeGroup),
            TraitDimension::CoreTrait => self
                .core_traits
                .iter()
                .find(|e| e.key == key)
                .cloned()
                .map(CatalogEntry::CoreTrait),
            TraitDimension::Quirk => self
                .quirks
                .iter()
                .find(|e| e.key == key)
                .cloned()
                .map(CatalogEntry::Quirk),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
