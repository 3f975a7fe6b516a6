//! Conversation transcript owned by the turn loop.
//!
//! The transcript is append-only except for one operation: rolling back the
//! most recent user turn after a failed model call, which must leave the
//! transcript exactly as it was before the attempt. It lives in memory only
//! and is never persisted across runs.

use serde::Serialize;

/// Author of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// Ordered conversation history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::User,
            content: content.into(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::Assistant,
            content: content.into(),
        });
    }

    /// Remove the most recent turn if and only if it is a user turn.
    ///
    /// Used to revert a failed model call so the attempt leaves no trace.
    /// Returns `true` when a turn was removed.
    pub fn rollback_last_user(&mut self) -> bool {
        match self.turns.last() {
            Some(turn) if turn.role == Role::User => {
                self.turns.pop();
                true
            }
            _ => false,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
