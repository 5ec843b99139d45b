//! Conversation transcript summary.

use serde::{Deserialize, Serialize};

/// Fewer learner turns than this marks the session as minimally engaged.
pub const LOW_ENGAGEMENT_THRESHOLD: usize = 3;

/// Length of the client excerpt carried in the summary, in characters.
const CLIENT_EXCERPT_CHARS: usize = 300;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// The trainee.
    #[serde(rename = "user", alias = "learner")]
    Learner,
    /// The simulated client persona.
    #[serde(rename = "assistant", alias = "client")]
    Client,
    #[serde(rename = "system")]
    System,
}

/// One transcript message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Engagement facts extracted from a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSummary {
    pub learner_turns: usize,
    pub client_turns: usize,
    pub low_engagement: bool,
    /// Opening of what the client talked about, for the review narrative.
    pub client_excerpt: String,
}

impl TranscriptSummary {
    pub fn from_turns(turns: &[Turn]) -> Self {
        let learner_turns = turns.iter().filter(|t| t.role == Role::Learner).count();
        let client_turns = turns.iter().filter(|t| t.role == Role::Client).count();

        let client_text = turns
            .iter()
            .filter(|t| t.role == Role::Client)
            .map(|t| t.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let client_excerpt = client_text.chars().take(CLIENT_EXCERPT_CHARS).collect();

        Self {
            learner_turns,
            client_turns,
            low_engagement: learner_turns < LOW_ENGAGEMENT_THRESHOLD,
            client_excerpt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_engagement() {
        let turns = vec![
            Turn::new(Role::System, "setup"),
            Turn::new(Role::Client, "I'm worried about premiums."),
            Turn::new(Role::Learner, "Tell me more."),
            Turn::new(Role::Client, "They went up again."),
            Turn::new(Role::Learner, "By how much?"),
        ];
        let summary = TranscriptSummary::from_turns(&turns);
        assert_eq!(summary.learner_turns, 2);
        assert_eq!(summary.client_turns, 2);
        assert!(summary.low_engagement);
        assert_eq!(summary.client_excerpt, "I'm worried about premiums.\nThey went up again.");
    }

    #[test]
    fn test_engaged_at_threshold() {
        let turns: Vec<Turn> = (0..LOW_ENGAGEMENT_THRESHOLD)
            .map(|i| Turn::new(Role::Learner, format!("question {}", i)))
            .collect();
        assert!(!TranscriptSummary::from_turns(&turns).low_engagement);
        assert!(TranscriptSummary::from_turns(&[]).low_engagement);
    }

    #[test]
    fn test_excerpt_is_truncated_on_char_boundary() {
        let turns = vec![Turn::new(Role::Client, "é".repeat(400))];
        let summary = TranscriptSummary::from_turns(&turns);
        assert_eq!(summary.client_excerpt.chars().count(), 300);
    }

    #[test]
    fn test_role_wire_names() {
        let turns: Vec<Turn> = serde_json::from_str(
            r#"[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"},{"role":"learner","content":"x"}]"#,
        )
        .unwrap();
        assert_eq!(turns[0].role, Role::Learner);
        assert_eq!(turns[1].role, Role::Client);
        assert_eq!(turns[2].role, Role::Learner);
        assert_eq!(serde_json::to_string(&turns[1].role).unwrap(), "\"assistant\"");
    }
}
