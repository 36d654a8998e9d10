use profai_llm::{ProviderMessage, Role as ProviderRole};
use serde::{Deserialize, Serialize};

use crate::error::{ChatResult, InvalidSequenceSnafu};

/// Conversation speaker role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn opposite(self) -> Self {
        match self {
            Self::User => Self::Assistant,
            Self::Assistant => Self::User,
        }
    }
}

impl From<Role> for ProviderRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => ProviderRole::User,
            Role::Assistant => ProviderRole::Assistant,
        }
    }
}

/// One finalized message. Fields are private so a turn cannot change once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

impl From<&Turn> for ProviderMessage {
    fn from(turn: &Turn) -> Self {
        ProviderMessage::new(turn.role.into(), turn.content.clone())
    }
}

/// What `append` does with a turn that breaks user/assistant alternation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequencePolicy {
    #[default]
    Reject,
    Warn,
}

/// Ordered, append-only turn log for one session.
///
/// Turns alternate user/assistant starting with a user turn. There is no
/// retention bound: the history grows for as long as the session lives.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
    policy: SequencePolicy,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(policy: SequencePolicy) -> Self {
        Self {
            turns: Vec::new(),
            policy,
        }
    }

    pub fn policy(&self) -> SequencePolicy {
        self.policy
    }

    /// Role the next turn must have to keep alternation.
    pub fn expects(&self) -> Role {
        self.turns
            .last()
            .map(|turn| turn.role.opposite())
            .unwrap_or(Role::User)
    }

    pub fn append(&mut self, turn: Turn) -> ChatResult<()> {
        let expected = self.expects();
        if turn.role != expected {
            let position = self.turns.len();
            match self.policy {
                SequencePolicy::Reject => {
                    return InvalidSequenceSnafu {
                        stage: "history-append",
                        position,
                        expected,
                        found: turn.role,
                    }
                    .fail();
                }
                SequencePolicy::Warn => {
                    tracing::warn!(
                        position,
                        expected = ?expected,
                        found = ?turn.role,
                        "appending turn that breaks role alternation"
                    );
                }
            }
        }

        self.turns.push(turn);
        Ok(())
    }

    /// Read view of every turn in conversation order.
    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;

    #[test]
    fn new_history_is_empty_and_expects_user() {
        let history = ConversationHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.expects(), Role::User);
        assert_eq!(history.policy(), SequencePolicy::Reject);
    }

    #[test]
    fn alternating_turns_are_kept_in_order() {
        let mut history = ConversationHistory::new();
        history.append(Turn::user("Hi")).unwrap();
        history.append(Turn::assistant("Hello!")).unwrap();
        history.append(Turn::user("Explain attention")).unwrap();

        let contents = history
            .snapshot()
            .iter()
            .map(Turn::content)
            .collect::<Vec<_>>();
        assert_eq!(contents, ["Hi", "Hello!", "Explain attention"]);
        assert_eq!(history.expects(), Role::Assistant);
    }

    #[test]
    fn assistant_first_is_rejected() {
        let mut history = ConversationHistory::new();
        let error = history.append(Turn::assistant("hello")).unwrap_err();

        assert!(matches!(
            error,
            ChatError::InvalidSequence {
                position: 0,
                expected: Role::User,
                found: Role::Assistant,
                ..
            }
        ));
        assert!(history.is_empty());
    }

    #[test]
    fn repeated_role_is_rejected_without_appending() {
        let mut history = ConversationHistory::new();
        history.append(Turn::user("one")).unwrap();

        assert!(history.append(Turn::user("two")).is_err());
        assert_eq!(history.len(), 1);
        assert_eq!(history.last(), Some(&Turn::user("one")));
    }

    #[test]
    fn warn_policy_appends_out_of_order_turns() {
        let mut history = ConversationHistory::create(SequencePolicy::Warn);
        history.append(Turn::user("one")).unwrap();
        history.append(Turn::user("two")).unwrap();

        assert_eq!(history.len(), 2);
    }

    #[test]
    fn snapshot_is_stable_without_appends() {
        let mut history = ConversationHistory::new();
        history.append(Turn::user("Hi")).unwrap();
        history.append(Turn::assistant("Hello!")).unwrap();

        let first = history.snapshot().to_vec();
        let second = history.snapshot().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn turns_convert_into_provider_messages() {
        let message = ProviderMessage::from(&Turn::assistant("Hello!"));
        assert_eq!(message, ProviderMessage::new(ProviderRole::Assistant, "Hello!"));
    }

    #[test]
    fn policy_parses_from_lowercase() {
        let policy: SequencePolicy = serde_json::from_str("\"warn\"").unwrap();
        assert_eq!(policy, SequencePolicy::Warn);
    }
}
