//! rolesim - persona fusion and rubric-based evaluation
//!
//! Composes a simulated client's behavioral profile from curated trait
//! catalogs, issues traceable session identities for fresh runs and replays,
//! and scores finished sessions against competency rubrics.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod fusion;
pub mod identity;
pub mod logging;
pub mod rubric;
pub mod session;
pub mod version;

pub use error::{Error, Result};
