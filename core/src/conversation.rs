//! In-memory conversation log for a single session.
//!
//! Turns are only ever appended. What gets forwarded to the model as prior
//! context is bounded separately by a [`ContextPolicy`], so the on-screen
//! history is never truncated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    /// Label used when serializing turns into prompt context
    pub fn context_label(&self) -> &'static str {
        match self {
            Speaker::User => "User",
            Speaker::Assistant => "AI",
        }
    }

    /// Label shown to the person at the terminal
    pub fn display_label(&self) -> &'static str {
        match self {
            Speaker::User => "You",
            Speaker::Assistant => "AI Doctor",
        }
    }
}

/// One message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(speaker: Speaker, text: String) -> Self {
        Self {
            speaker,
            text,
            created_at: Utc::now(),
        }
    }

    fn context_line(&self) -> String {
        format!("{}: {}", self.speaker.context_label(), self.text)
    }
}

/// Limits on the prior context forwarded with each prompt. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextPolicy {
    pub max_turns: Option<usize>,
    pub max_chars: Option<usize>,
}

impl ContextPolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }
}

/// Ordered, append-only log of turns
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, speaker: Speaker, text: impl Into<String>) -> &ConversationTurn {
        self.turns.push(ConversationTurn::new(speaker, text.into()));
        &self.turns[self.turns.len() - 1]
    }

    pub fn all(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of turns authored by `speaker`
    pub fn count(&self, speaker: Speaker) -> usize {
        self.turns.iter().filter(|t| t.speaker == speaker).count()
    }

    /// Drops every turn. Only used when the user explicitly starts over.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    fn history(&self, excluding_last: bool) -> &[ConversationTurn] {
        if excluding_last {
            &self.turns[..self.turns.len().saturating_sub(1)]
        } else {
            &self.turns
        }
    }

    /// Joins turns as `"<Speaker>: <text>"` lines.
    ///
    /// With `excluding_last` the most recent turn is left out, so a freshly
    /// appended user message is not repeated inside its own prompt.
    pub fn serialize_for_context(&self, excluding_last: bool) -> String {
        self.history(excluding_last)
            .iter()
            .map(ConversationTurn::context_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Like [`serialize_for_context`](Self::serialize_for_context) but keeps only
    /// the most recent turns allowed by `policy`. Oldest turns are dropped first.
    pub fn context_window(&self, excluding_last: bool, policy: &ContextPolicy) -> String {
        let history = self.history(excluding_last);

        let mut start = match policy.max_turns {
            Some(max) => history.len().saturating_sub(max),
            None => 0,
        };

        if let Some(max_chars) = policy.max_chars {
            // Walk backwards, counting each line plus its joining newline
            let mut used = 0usize;
            let mut keep_from = history.len();
            for (idx, turn) in history.iter().enumerate().skip(start).rev() {
                let cost = turn.context_line().chars().count() + usize::from(used > 0);
                if used + cost > max_chars {
                    break;
                }
                used += cost;
                keep_from = idx;
            }
            start = keep_from;
        }

        let window = &history[start..];
        if window.len() < history.len() {
            tracing::debug!(
                dropped = history.len() - window.len(),
                kept = window.len(),
                "Truncated conversation context"
            );
        }

        window
            .iter()
            .map(ConversationTurn::context_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Conversation {
        let mut conversation = Conversation::new();
        conversation.append(Speaker::User, "a");
        conversation.append(Speaker::Assistant, "b");
        conversation.append(Speaker::User, "c");
        conversation
    }

    #[test]
    fn test_serialize_excluding_last() {
        assert_eq!(sample().serialize_for_context(true), "User: a\nAI: b");
    }

    #[test]
    fn test_serialize_including_last() {
        assert_eq!(sample().serialize_for_context(false), "User: a\nAI: b\nUser: c");
    }

    #[test]
    fn test_serialize_empty() {
        let conversation = Conversation::new();
        assert_eq!(conversation.serialize_for_context(true), "");
        assert_eq!(conversation.serialize_for_context(false), "");
    }

    #[test]
    fn test_append_preserves_order() {
        let conversation = sample();
        let texts: Vec<&str> = conversation.all().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert_eq!(conversation.count(Speaker::User), 2);
        assert_eq!(conversation.count(Speaker::Assistant), 1);
        assert_eq!(conversation.last().map(|t| t.speaker), Some(Speaker::User));
    }

    #[test]
    fn test_unbounded_window_matches_serialization() {
        let conversation = sample();
        assert_eq!(
            conversation.context_window(true, &ContextPolicy::unbounded()),
            conversation.serialize_for_context(true)
        );
    }

    #[test]
    fn test_window_max_turns_keeps_most_recent() {
        let policy = ContextPolicy {
            max_turns: Some(1),
            max_chars: None,
        };
        assert_eq!(sample().context_window(true, &policy), "AI: b");
        assert_eq!(sample().context_window(false, &policy), "User: c");
    }

    #[test]
    fn test_window_max_chars() {
        // "AI: b" is 5 chars, "User: a\nAI: b" is 13
        let tight = ContextPolicy {
            max_turns: None,
            max_chars: Some(12),
        };
        assert_eq!(sample().context_window(true, &tight), "AI: b");

        let exact = ContextPolicy {
            max_turns: None,
            max_chars: Some(13),
        };
        assert_eq!(sample().context_window(true, &exact), "User: a\nAI: b");

        let none = ContextPolicy {
            max_turns: None,
            max_chars: Some(2),
        };
        assert_eq!(sample().context_window(true, &none), "");
    }

    #[test]
    fn test_clear() {
        let mut conversation = sample();
        conversation.clear();
        assert!(conversation.is_empty());
        assert_eq!(conversation.len(), 0);
    }
}
