//! Conversation history storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(MessageRole::User),
            "assistant" => Some(MessageRole::Assistant),
            _ => None,
        }
    }
}

/// A single remembered text turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub message_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub role: MessageRole,
    pub content: String,
}

impl ConversationMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Bounded history of one conversation thread, oldest first.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: VecDeque<ConversationMessage>,
    capacity: usize,
}

impl ConversationHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            capacity,
        }
    }

    /// Append a message, dropping the oldest ones past capacity.
    pub fn add_message(&mut self, message: ConversationMessage) {
        self.messages.push_back(message);
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &ConversationMessage> {
        self.messages.iter()
    }

    /// The last `count` messages in chronological order.
    pub fn recent_messages(&self, count: usize) -> Vec<ConversationMessage> {
        let skip = self.messages.len().saturating_sub(count);
        self.messages.iter().skip(skip).cloned().collect()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded() {
        let mut history = ConversationHistory::new(3);
        for i in 0..5 {
            history.add_message(ConversationMessage::user(format!("Pergunta {}", i)));
        }

        assert_eq!(history.message_count(), 3);
        let contents: Vec<String> = history.messages().map(|m| m.content.clone()).collect();
        assert_eq!(contents, vec!["Pergunta 2", "Pergunta 3", "Pergunta 4"]);
    }

    #[test]
    fn test_recent_messages_keep_order() {
        let mut history = ConversationHistory::new(10);
        history.add_message(ConversationMessage::user("oi"));
        history.add_message(ConversationMessage::assistant("Olá!"));
        history.add_message(ConversationMessage::user("quanto gastei?"));

        let recent = history.recent_messages(2);
        assert_eq!(recent[0].role, MessageRole::Assistant);
        assert_eq!(recent[1].content, "quanto gastei?");
        assert_eq!(history.recent_messages(50).len(), 3);

        history.clear();
        assert_eq!(history.message_count(), 0);
    }

    #[test]
    fn test_role_names() {
        assert_eq!(MessageRole::parse(MessageRole::Assistant.as_str()), Some(MessageRole::Assistant));
        assert_eq!(MessageRole::parse("agent"), None);
    }
}
