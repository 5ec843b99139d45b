//! Persona fusion
//!
//! - Composing resolved catalog entries into a [`FusionPromptBlock`]
//! - Rendering the block as instructions for the generative client
//! - Batch pre-generation of common configurations

mod composer;
mod pregen;
mod prompt;

pub use composer::*;
pub use pregen::*;
pub use prompt::*;
