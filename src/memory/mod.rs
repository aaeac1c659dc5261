//! Conversation memory.
//!
//! An in-process, append-only log of question/answer turns. It is rendered
//! into stage prompts so follow-up questions can refer back to earlier ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header that introduces rendered history inside a prompt.
pub const HISTORY_HEADER: &str = "Previous conversation:";

/// One recorded question and the answer that was returned for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub recorded_at: DateTime<Utc>,
}

/// Ordered turns, oldest first. No eviction.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    turns: Vec<ConversationTurn>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed turn.
    pub fn add_turn(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ConversationTurn {
            question: question.into(),
            answer: answer.into(),
            recorded_at: Utc::now(),
        });
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Render turns as alternating `User i:` / `Agent i:` lines, 1-based.
    pub fn format_for_prompt(&self) -> String {
        self.turns
            .iter()
            .enumerate()
            .flat_map(|(i, turn)| {
                [
                    format!("User {}: {}", i + 1, turn.question),
                    format!("Agent {}: {}", i + 1, turn.answer),
                ]
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The full history block for a prompt, or `None` when there is nothing to show.
    pub fn prompt_block(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(format!("{}\n{}", HISTORY_HEADER, self.format_for_prompt()))
    }
}
