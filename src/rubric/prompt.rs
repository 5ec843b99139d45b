//! Evaluation instructions for the scoring collaborator.

use std::fmt::Write as _;

use crate::difficulty::DifficultyTier;

use super::evaluator::CompetencyRubric;
use super::transcript::{TranscriptSummary, LOW_ENGAGEMENT_THRESHOLD};

const GENERAL_GUIDELINES: &[&str] = &[
    "If the advisor did not ask discovery questions, score Needs Assessment low.",
    "If the advisor did not address client concerns, score Objection Handling low.",
    "If the advisor did not build rapport or used unprofessional language, score Communication low.",
    "Inappropriate recommendations made without context score 1-2 in Solution Recommendations.",
    "Do not give credit for skills that were not demonstrated in the conversation.",
    "Use the full 1-10 range and do not inflate scores.",
];

/// The system prompt asking a collaborator to score a finished session.
///
/// Lists each competency with the bands that apply at `tier`, the general
/// scoring rules and, when a transcript summary is supplied, its engagement
/// facts.
pub fn render_evaluation_prompt<'a, I>(
    rubrics: I,
    tier: DifficultyTier,
    summary: Option<&TranscriptSummary>,
) -> String
where
    I: IntoIterator<Item = &'a CompetencyRubric>,
{
    let rubrics: Vec<&CompetencyRubric> = rubrics.into_iter().collect();

    let mut out = String::from(
        "You are an expert financial advisor trainer evaluating a simulation conversation \
         between an advisor and a client. Be honest and critical.\n\n",
    );
    // Writing into a String cannot fail.
    let _ = writeln!(out, "Difficulty level: {}\n", tier.key());

    out.push_str("Competencies being evaluated:\n");
    for rubric in &rubrics {
        let c = &rubric.competency;
        let description = if c.description.is_empty() { &c.name } else { &c.description };
        let _ = writeln!(out, "- {} ({}): {}", c.name, c.id, description);
    }

    out.push_str("\nCOMPETENCY-SPECIFIC EVALUATION CRITERIA:\n");
    for rubric in &rubrics {
        let _ = writeln!(out, "\n{}:", rubric.competency.name);
        for band in rubric.bands_for(tier) {
            let mut lines = band.entry.criteria.lines();
            let _ = writeln!(out, "  - Score {}: {}", band.entry.score_range, lines.next().unwrap_or_default());
            for line in lines {
                let _ = writeln!(out, "    {}", line);
            }
        }
    }

    out.push_str("\nGENERAL EVALUATION GUIDELINES:\n");
    let _ = writeln!(
        out,
        "- If the advisor sent fewer than {} messages, score every competency 1-3; \
         this indicates minimal engagement.",
        LOW_ENGAGEMENT_THRESHOLD
    );
    for line in GENERAL_GUIDELINES {
        let _ = writeln!(out, "- {}", line);
    }

    if let Some(summary) = summary {
        let _ = writeln!(
            out,
            "\nIMPORTANT: The advisor sent {} message(s) in this conversation.",
            summary.learner_turns
        );
        if summary.low_engagement {
            out.push_str("This is minimal engagement and must result in low scores.\n");
        }
        if !summary.client_excerpt.is_empty() {
            let _ = writeln!(out, "The client was asking about: \"{}\"", summary.client_excerpt);
        }
    }

    let ids: Vec<String> = rubrics
        .iter()
        .map(|r| format!("\"{}\": number", r.competency.id))
        .collect();
    let _ = write!(
        out,
        "\nRespond with a JSON object of the form \
         {{\"scores\": {{{}}}, \"analysis\": \"key moments where the advisor succeeded or failed\"}}\n",
        ids.join(", ")
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rubric::{Competency, RubricEntry, RubricStore, Role, Turn};

    fn entry(id: &str, range: &str, criteria: &str) -> RubricEntry {
        RubricEntry {
            id: id.into(),
            competency_id: String::new(),
            score_range: range.into(),
            criteria: criteria.into(),
        }
    }

    fn closing() -> CompetencyRubric {
        let competency = Competency::new(
            "closing",
            "Closing",
            vec![entry("low", "1-5", "Weak close.\n- No next step"), entry("high", "6-10", "Clear close.")],
        )
        .with_tier(DifficultyTier::Advanced, vec![entry("adv", "1-10", "Earned commitment.")]);
        CompetencyRubric::load(competency).unwrap()
    }

    #[test]
    fn test_prompt_uses_shared_bands_below_advanced() {
        let rubric = closing();
        let text = render_evaluation_prompt([&rubric], DifficultyTier::Intermediate, None);
        assert!(text.contains("Difficulty level: intermediate"));
        assert!(text.contains("- Closing (closing): Closing\n"));
        assert!(text.contains("  - Score 1-5: Weak close.\n    - No next step\n"));
        assert!(text.contains("  - Score 6-10: Clear close.\n"));
        assert!(!text.contains("Earned commitment."));
        assert!(text.contains("fewer than 3 messages"));
        assert!(text.contains(r#"{"scores": {"closing": number}"#));
        assert!(!text.contains("IMPORTANT"));
    }

    #[test]
    fn test_prompt_uses_tier_bands() {
        let rubric = closing();
        let text = render_evaluation_prompt([&rubric], DifficultyTier::Advanced, None);
        assert!(text.contains("Difficulty level: advanced"));
        assert!(text.contains("  - Score 1-10: Earned commitment.\n"));
        assert!(!text.contains("Weak close."));
    }

    #[test]
    fn test_prompt_carries_engagement_facts() {
        let rubric = closing();
        let summary = TranscriptSummary::from_turns(&[
            Turn::new(Role::Client, "Can I retire at 60?"),
            Turn::new(Role::Learner, "Maybe."),
        ]);
        let text = render_evaluation_prompt([&rubric], DifficultyTier::Beginner, Some(&summary));
        assert!(text.contains("The advisor sent 1 message(s)"));
        assert!(text.contains("minimal engagement and must result in low scores"));
        assert!(text.contains("The client was asking about: \"Can I retire at 60?\""));
    }

    #[test]
    fn test_bundled_prompt_switches_communication_bands() {
        let store = RubricStore::bundled().unwrap();
        let easy = render_evaluation_prompt(store.rubrics(), DifficultyTier::Beginner, None);
        let hard = render_evaluation_prompt(store.rubrics(), DifficultyTier::Advanced, None);
        assert!(easy.contains("Used inappropriate or unprofessional language"));
        assert!(!hard.contains("Used inappropriate or unprofessional language"));
        assert!(hard.contains("Talked past a guarded client's concerns"));
        // Competencies without tier bands render identically
        assert!(hard.contains("Failed to ask relevant discovery questions"));
    }
}
