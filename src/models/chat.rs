use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stream::CardsData;

pub const GREETING: &str =
    "Hi! I'm your Credit Card Advisor. I can help you find the perfect credit card \
     based on your needs, spending habits, and preferences. What kind of credit card \
     are you looking for?";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One user or assistant entry in the conversation list.
///
/// Assistant turns carry `is_streaming = true` from submission until the
/// stream terminates; at most one turn is streaming at any time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cards: Option<CardsData>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_streaming: bool,
}

impl ConversationTurn {
    pub fn user(content: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.to_string(),
            cards: None,
            timestamp: Utc::now(),
            is_streaming: false,
        }
    }

    /// Empty assistant turn awaiting stream output.
    pub fn assistant_pending() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: String::new(),
            cards: None,
            timestamp: Utc::now(),
            is_streaming: true,
        }
    }

    /// The seed turn every fresh conversation starts with.
    pub fn greeting() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: GREETING.to_string(),
            cards: None,
            timestamp: Utc::now(),
            is_streaming: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_round_trips_with_timestamp() {
        let turn = ConversationTurn::user("cashback card with no annual fee");
        let json = serde_json::to_string(&turn).unwrap();
        let back: ConversationTurn = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, turn.id);
        assert_eq!(back.role, Role::User);
        assert_eq!(back.timestamp, turn.timestamp);
        assert!(!back.is_streaming);
    }

    #[test]
    fn greeting_is_assistant_and_not_streaming() {
        let turn = ConversationTurn::greeting();
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.content, GREETING);
        assert!(!turn.is_streaming);
    }
}
