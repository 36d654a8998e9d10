//! Ids are minted here and only ever travel outward; nothing parses them back.

use std::fmt;

use uuid::Uuid;

/// One browser connection's conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new_v7() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, formatter)
    }
}

/// A UI message, addressed by later appends and the final close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new_v7() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, formatter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_ids_are_time_ordered_uuids() {
        let session_id = SessionId::new_v7();
        let message_id = MessageId::new_v7();

        assert_eq!(session_id.as_uuid().get_version_num(), 7);
        assert_eq!(message_id.as_uuid().get_version_num(), 7);
        assert_ne!(session_id.as_uuid(), message_id.as_uuid());
    }

    #[test]
    fn display_is_the_hyphenated_uuid() {
        let message_id = MessageId::new_v7();
        assert_eq!(message_id.to_string(), message_id.as_uuid().hyphenated().to_string());
    }
}
