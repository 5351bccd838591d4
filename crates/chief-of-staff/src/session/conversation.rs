//! Append-only conversation log

use crate::types::{ConversationTurn, Role};

/// Ordered turns of the current conversation
#[derive(Debug, Default, Clone)]
pub struct ConversationLog {
    turns: Vec<ConversationTurn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_user(&mut self, text: impl Into<String>) {
        self.append(Role::User, text.into());
    }

    pub fn append_assistant(&mut self, text: impl Into<String>) {
        self.append(Role::Assistant, text.into());
    }

    fn append(&mut self, role: Role, content: String) {
        self.turns.push(ConversationTurn { role, content });
    }

    /// All turns, oldest first
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Forget the whole conversation
    pub fn reset(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_then_append() {
        let mut log = ConversationLog::new();
        log.append_user("question");
        log.append_assistant("answer");
        assert_eq!(log.len(), 2);

        log.reset();
        assert!(log.turns().is_empty());

        log.append_user("hi");
        assert_eq!(log.turns(), &[ConversationTurn::user("hi")]);
        assert_eq!(log.turns()[0].role, Role::User);
    }

    #[test]
    fn test_order_is_chronological() {
        let mut log = ConversationLog::new();
        log.append_user("1");
        log.append_assistant("2");
        log.append_user("3");
        let contents: Vec<&str> = log.turns().iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["1", "2", "3"]);
    }
}
