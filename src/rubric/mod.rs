//! Rubric-based evaluation
//!
//! Competencies own rubric bands, optionally per difficulty tier, whose
//! free-text score ranges are parsed once at load time. The evaluator maps
//! achieved scores onto the bands for the session's tier and produces the
//! [`PerformanceReview`] for a finished session.

mod band;
mod evaluator;
mod prompt;
mod store;
mod transcript;

pub use band::ScoreRange;
pub use evaluator::*;
pub use prompt::render_evaluation_prompt;
pub use store::{Competency, CompetencySource, RubricEntry, RubricStore};
pub use transcript::{Role, TranscriptSummary, Turn, LOW_ENGAGEMENT_THRESHOLD};
