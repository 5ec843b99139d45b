//! Trait catalog, the selectable ingredients a client persona is fused from.
//!
//! Moods, communication styles, archetypes, age groups, core personality
//! traits and quirks are curated independently by administrators. This
//! crate only reads them, through the [`CatalogLookup`] interface.

pub mod registry;
pub mod store;
pub mod types;

pub use registry::{CatalogRegistry, DimensionSummary};
pub use store::{CatalogLookup, TraitCatalog};
pub use types::{
    AgeGroup, Archetype, CatalogEntry, CommunicationStyle, CoreTrait, Mood, PersonaSelection,
    Quirk, ResolvedPersona, TraitDimension,
};
