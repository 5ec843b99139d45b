//! Text rendering of a fusion block for the generative collaborator.

use std::fmt::Write as _;

use crate::difficulty::DifficultyTier;

use super::composer::FusionPromptBlock;

/// The guideline block appended to the client persona's system prompt.
pub fn render_guidelines(block: &FusionPromptBlock) -> String {
    let mut out = String::from("COMMUNICATION GUIDELINES:\n");
    let lines = [
        ("Age-Appropriate Vocabulary", block.vocabulary_guidance.as_str()),
        ("Tone and Style", &block.tone_guidance),
        ("Cultural References", &block.reference_guidance),
        ("Cultural Context", &block.cultural_context),
        ("Life Stage Context", &block.life_stage),
        ("Communication Style", &block.communication_style),
        ("Archetype", &block.archetype),
        ("Mood", &block.mood),
    ];
    for (label, value) in lines {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "- {}: {}", label, value);
    }
    out
}

/// Full client instructions: identity line, guidelines and tier behavior.
pub fn render_client_instructions(block: &FusionPromptBlock, tier: DifficultyTier) -> String {
    let mut out = format!(
        "You are a {}-year-old client ({}) in a role-play training conversation. \
         Stay in character for the whole conversation.\n\n",
        block.age, block.life_stage
    );
    out.push_str(&render_guidelines(block));
    let _ = write!(
        out,
        "\nDIFFICULTY ({}):\n{}\n",
        tier.label(),
        tier.disclosure_guidance()
    );
    out
}
