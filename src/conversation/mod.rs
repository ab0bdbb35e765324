//! Chat turns and the classification that gates estimation.

pub mod classifier;

pub use classifier::{ClassificationScores, ConversationClassifier};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who sent a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// A single message in a chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub text: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Create a user turn stamped now.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant turn stamped now.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == TurnRole::User
    }
}

/// What a conversation is about, recomputed on every turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationType {
    /// Questions about the agency, small talk.
    General,
    /// The client is describing a project.
    Project,
    /// The client is describing a project and asking about cost or time.
    Estimate,
}

impl ConversationType {
    /// Whether the estimation pipeline should run for this conversation.
    pub fn wants_estimate(&self) -> bool {
        !matches!(self, ConversationType::General)
    }
}

impl std::fmt::Display for ConversationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConversationType::General => "general",
            ConversationType::Project => "project",
            ConversationType::Estimate => "estimate",
        };
        write!(f, "{}", s)
    }
}

/// Coarse dialogue progress counter, `ceil(turns / 2)` capped at 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationStep(u8);

impl ConversationStep {
    /// Highest step the counter reaches.
    pub const MAX: u8 = 5;

    /// Step for a conversation with `turns` messages (both roles).
    pub fn from_turn_count(turns: usize) -> Self {
        let step = turns.div_ceil(2).min(Self::MAX as usize);
        Self(step as u8)
    }

    pub fn from_turns(turns: &[ConversationTurn]) -> Self {
        Self::from_turn_count(turns.len())
    }

    /// Wrap an explicit step value. Values above the cap are kept as given,
    /// the estimator treats everything from 5 upwards alike.
    pub const fn new(step: u8) -> Self {
        Self(step)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Below step 2 there is too little information to estimate.
    pub fn is_estimable(&self) -> bool {
        self.0 >= 2
    }
}

impl From<u8> for ConversationStep {
    fn from(step: u8) -> Self {
        Self(step)
    }
}

impl std::fmt::Display for ConversationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Join a conversation into the plain transcript handed to the oracle.
pub fn transcript(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                TurnRole::User => "Client",
                TurnRole::Assistant => "Assistant",
            };
            format!("{}: {}", speaker, turn.text.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_from_turn_count() {
        let steps: Vec<u8> = (0..=12)
            .map(|n| ConversationStep::from_turn_count(n).value())
            .collect();
        assert_eq!(steps, vec![0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 5, 5]);
    }

    #[test]
    fn test_step_estimable_boundary() {
        assert!(!ConversationStep::new(0).is_estimable());
        assert!(!ConversationStep::new(1).is_estimable());
        assert!(ConversationStep::new(2).is_estimable());
    }

    #[test]
    fn test_turn_deserializes_without_timestamp() {
        let turn: ConversationTurn =
            serde_json::from_str(r#"{"role":"user","text":"hello"}"#).unwrap();
        assert!(turn.is_user());
        assert_eq!(turn.text, "hello");
    }

    #[test]
    fn test_transcript_labels_speakers() {
        let turns = vec![
            ConversationTurn::user("  I need a shop "),
            ConversationTurn::assistant("Tell me more"),
        ];
        assert_eq!(
            transcript(&turns),
            "Client: I need a shop\nAssistant: Tell me more"
        );
    }
}
