//! Bundled catalog registry: the default trait catalog shipped with the binary.

use crate::error::Result;

use super::store::TraitCatalog;
use super::types::TraitDimension;

const BUNDLED_CATALOG: &str = include_str!("../../config/catalog.toml");

/// Serves the catalog compiled into the binary.
///
/// Deployments normally point `[catalog] file` at an administrator-curated
/// catalog; the bundled one keeps the CLI and tests self-contained.
pub struct CatalogRegistry;

impl CatalogRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Raw TOML of the bundled catalog.
    pub fn bundled_source(&self) -> &'static str {
        BUNDLED_CATALOG
    }

    /// Parse the bundled catalog.
    pub fn bundled(&self) -> Result<TraitCatalog> {
        TraitCatalog::from_toml(BUNDLED_CATALOG)
    }

    /// Per-dimension entry counts of the bundled catalog.
    pub fn summary(&self) -> Result<Vec<DimensionSummary>> {
        let catalog = self.bundled()?;
        Ok(TraitDimension::all()
            .iter()
            .map(|d| DimensionSummary {
                dimension: *d,
                entries: catalog.entries(*d).len(),
            })
            .collect())
    }
}

impl Default for CatalogRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry count for one catalog dimension.
#[derive(Debug, Clone)]
pub struct DimensionSummary {
    pub dimension: TraitDimension,
    pub entries: usize,
}
