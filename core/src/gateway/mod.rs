/// Gateway: the requests the client can issue and the transport seam.
///
/// Stores never talk to the network. Their transitions return a [`Request`]
/// describing what to send; the session hands it to a [`Gateway`] and feeds
/// the decoded reply back.
pub mod http;

use crate::error::{ClientError, Result};
use crate::models::{EntityId, ProfileUpdate, Registration};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

pub use http::HttpGateway;

/// One REST call
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Login { username: String, password: String },
    Logout,
    Register(Registration),
    CurrentUser,
    UpdateProfile(ProfileUpdate),
    ChangePassword {
        current_password: String,
        new_password: String,
    },

    ListChats,
    ChatDetail(EntityId),
    CreateChat { title: String },
    SendChatMessage { chat_id: EntityId, content: String },

    ListRecommendations,
    GenerateRecommendations,
    MarkRecommendationViewed(EntityId),

    ListPeerChats,
    PeerChatDetail(EntityId),
    CreatePeerChat { participants: Vec<EntityId> },
    SendPeerMessage { chat_id: EntityId, content: String },
    MarkPeerChatRead(EntityId),
}

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum Body<'a> {
    Empty,
    Json(Value),
    Multipart(&'a ProfileUpdate),
}

impl Request {
    pub fn method(&self) -> Method {
        match self {
            Request::CurrentUser
            | Request::ListChats
            | Request::ChatDetail(_)
            | Request::ListRecommendations
            | Request::ListPeerChats
            | Request::PeerChatDetail(_) => Method::GET,
            Request::UpdateProfile(_) => Method::PATCH,
            _ => Method::POST,
        }
    }

    /// Path relative to the API base URL
    pub fn path(&self) -> String {
        match self {
            Request::Login { .. } => "/login/".to_string(),
            Request::Logout => "/logout/".to_string(),
            Request::Register(_) => "/users/".to_string(),
            Request::CurrentUser | Request::UpdateProfile(_) => "/users/me/".to_string(),
            Request::ChangePassword { .. } => "/change-password/".to_string(),
            Request::ListChats | Request::CreateChat { .. } => "/chats/".to_string(),
            Request::ChatDetail(id) => format!("/chats/{}/", id),
            Request::SendChatMessage { chat_id, .. } => format!("/chats/{}/message/", chat_id),
            Request::ListRecommendations => "/recommendations/".to_string(),
            Request::GenerateRecommendations => "/recommendations/generate/".to_string(),
            Request::MarkRecommendationViewed(id) => {
                format!("/recommendations/{}/mark_viewed/", id)
            }
            Request::ListPeerChats | Request::CreatePeerChat { .. } => "/user-chats/".to_string(),
            Request::PeerChatDetail(id) => format!("/user-chats/{}/", id),
            Request::SendPeerMessage { chat_id, .. } => {
                format!("/user-chats/{}/message/", chat_id)
            }
            Request::MarkPeerChatRead(id) => format!("/user-chats/{}/mark_read/", id),
        }
    }

    pub fn body(&self) -> Body<'_> {
        match self {
            Request::Login { username, password } => Body::Json(json!({
                "username": username,
                "password": password,
            })),
            Request::Register(form) => Body::Json(json!(form)),
            Request::UpdateProfile(update) => Body::Multipart(update),
            Request::ChangePassword {
                current_password,
                new_password,
            } => Body::Json(json!({
                "current_password": current_password,
                "new_password": new_password,
            })),
            Request::CreateChat { title } => Body::Json(json!({ "title": title })),
            Request::SendChatMessage { content, .. } | Request::SendPeerMessage { content, .. } => {
                Body::Json(json!({ "content": content }))
            }
            Request::CreatePeerChat { participants } => {
                Body::Json(json!({ "participants": participants }))
            }
            _ => Body::Empty,
        }
    }

    /// Whether the call needs a logged-in user
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Request::Login { .. } | Request::Register(_))
    }

    /// Error text used when the server gives no detail
    pub fn fallback_error(&self) -> &'static str {
        match self {
            Request::Login { .. } => "Login failed",
            Request::Logout => "Logout failed",
            Request::Register(_) => "Registration failed",
            Request::CurrentUser => "Failed to fetch user data",
            Request::UpdateProfile(_) => "Failed to update profile",
            Request::ChangePassword { .. } => "Failed to update password",
            Request::ListChats => "Failed to fetch chats",
            Request::ChatDetail(_) => "Failed to fetch chat",
            Request::CreateChat { .. } => "Failed to create chat",
            Request::SendChatMessage { .. } | Request::SendPeerMessage { .. } => {
                "Failed to send message"
            }
            Request::ListRecommendations => "Failed to fetch recommendations",
            Request::GenerateRecommendations => "Failed to generate recommendations",
            Request::MarkRecommendationViewed(_) => "Failed to mark recommendation as viewed",
            Request::ListPeerChats => "Failed to fetch user chats",
            Request::PeerChatDetail(_) => "Failed to fetch user chat",
            Request::CreatePeerChat { .. } => "Failed to create user chat",
            Request::MarkPeerChatRead(_) => "Failed to mark chat as read",
        }
    }
}

/// Transport that executes requests and returns the JSON reply body.
///
/// Non-2xx replies come back as [`ClientError::Api`]; an empty body is
/// `Value::Null`.
#[allow(async_fn_in_trait)]
pub trait Gateway {
    async fn send(&self, request: &Request) -> Result<Value>;
}

/// Decode a reply body into a typed entity
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(ClientError::Serialization)
}

/// Pull a human-readable message out of an error body.
///
/// `detail` is preferred; a non-string detail is serialised as JSON. The AI
/// endpoint reports failures under `error` instead.
pub fn error_detail(body: &Value) -> Option<String> {
    match body.get("detail") {
        Some(Value::String(s)) => return Some(s.clone()),
        Some(Value::Null) | None => {}
        Some(other) => return Some(other.to_string()),
    }
    match body.get("error") {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes() {
        assert_eq!(Request::ChatDetail(4).path(), "/chats/4/");
        assert_eq!(Request::ChatDetail(4).method(), Method::GET);
        assert_eq!(
            Request::SendPeerMessage {
                chat_id: 2,
                content: "yo".to_string()
            }
            .path(),
            "/user-chats/2/message/"
        );
        assert_eq!(
            Request::UpdateProfile(ProfileUpdate::default()).method(),
            Method::PATCH
        );
        assert_eq!(
            Request::MarkRecommendationViewed(11).path(),
            "/recommendations/11/mark_viewed/"
        );
    }

    #[test]
    fn test_bodies() {
        let create = Request::CreatePeerChat {
            participants: vec![5],
        };
        assert_eq!(create.body(), Body::Json(json!({ "participants": [5] })));
        assert_eq!(Request::ListChats.body(), Body::Empty);
        assert!(!Request::Login {
            username: "a".to_string(),
            password: "b".to_string()
        }
        .requires_auth());
        assert!(Request::Logout.requires_auth());
    }

    #[test]
    fn test_error_detail() {
        assert_eq!(
            error_detail(&json!({ "detail": "Not found." })),
            Some("Not found.".to_string())
        );
        assert_eq!(
            error_detail(&json!({ "detail": ["a", "b"] })),
            Some(r#"["a","b"]"#.to_string())
        );
        assert_eq!(
            error_detail(&json!({ "error": "OpenAI timeout" })),
            Some("OpenAI timeout".to_string())
        );
        assert_eq!(error_detail(&json!({ "password": ["too short"] })), None);
        assert_eq!(error_detail(&Value::Null), None);
    }
}
