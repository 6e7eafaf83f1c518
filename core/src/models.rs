/// Entities mirrored from the REST API
///
/// All of these are owned server-side; the client only holds snapshots.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned identity. Provisional client copies use negative values.
pub type EntityId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub interests: String,
    #[serde(default)]
    pub date_joined: Option<DateTime<Utc>>,
}

impl User {
    /// "First Last", falling back to the username
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One message in an AI conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: EntityId,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

/// AI conversation with its full message history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: EntityId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub user: Option<EntityId>,
    /// Missing timestamps decode as the Unix epoch
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// One message between two users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerMessage {
    pub id: EntityId,
    pub sender: EntityId,
    #[serde(default)]
    pub sender_username: String,
    #[serde(default)]
    pub sender_profile_picture: Option<String>,
    pub content: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

/// Conversation between the current user and one counterpart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerConversation {
    pub id: EntityId,
    #[serde(default)]
    pub participants: Vec<User>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<PeerMessage>,
    #[serde(default)]
    pub last_message: Option<PeerMessage>,
}

impl PeerConversation {
    /// The participant that is not `me`
    pub fn counterpart(&self, me: Option<EntityId>) -> Option<&User> {
        self.participants
            .iter()
            .find(|u| Some(u.id) != me)
            .or_else(|| self.participants.first())
    }

    pub fn unread_count(&self, me: Option<EntityId>) -> usize {
        self.messages
            .iter()
            .filter(|m| !m.is_read && Some(m.sender) != me)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: EntityId,
    pub recommended_user: User,
    /// Cosine similarity in [0, 1]
    pub similarity_score: f64,
    #[serde(default)]
    pub common_interests: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_viewed: bool,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Reply to `POST /login/`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginReply {
    pub token: String,
    pub user: User,
}

/// Reply to `POST /chats/{id}/message/`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageReply {
    pub message: Message,
}

/// Sign-up form
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub interests: String,
}

/// Image uploaded as the new profile picture
#[derive(Debug, Clone, PartialEq)]
pub struct Avatar {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Partial profile edit, sent as multipart form data.
/// `None` fields are left untouched server-side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub interests: Option<String>,
    pub avatar: Option<Avatar>,
}

impl ProfileUpdate {
    /// Text fields that are set, in wire names
    pub fn text_fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("username", &self.username),
            ("email", &self.email),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("bio", &self.bio),
            ("interests", &self.interests),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.text_fields().is_empty() && self.avatar.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_decodes_with_missing_optional_fields() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": 7,
            "username": "ana",
            "profile_picture": null
        }))
        .unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.display_name(), "ana");
        assert!(user.date_joined.is_none());
    }

    #[test]
    fn test_message_role_wire_names() {
        let msg: Message = serde_json::from_value(serde_json::json!({
            "id": 1,
            "role": "assistant",
            "content": "hello",
            "created_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(
            serde_json::to_value(Role::System).unwrap(),
            serde_json::json!("system")
        );
    }

    #[test]
    fn test_conversation_without_timestamps() {
        let chat: Conversation = serde_json::from_value(serde_json::json!({
            "id": 1,
            "title": "",
            "messages": []
        }))
        .unwrap();
        assert_eq!(chat.id, 1);
        assert_eq!(chat.updated_at, DateTime::<Utc>::default());

        let peer: PeerConversation =
            serde_json::from_value(serde_json::json!({ "id": 2 })).unwrap();
        assert!(peer.participants.is_empty());
        assert!(peer.last_message.is_none());
    }

    #[test]
    fn test_profile_update_text_fields() {
        let update = ProfileUpdate {
            bio: Some("climber".to_string()),
            interests: Some("rust, bouldering".to_string()),
            ..Default::default()
        };
        assert_eq!(
            update.text_fields(),
            vec![("bio", "climber"), ("interests", "rust, bouldering")]
        );
        assert!(!update.is_empty());
        assert!(ProfileUpdate::default().is_empty());
    }
}
