/// Error types for the client core
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {}", .detail.as_deref().unwrap_or("no detail"))]
    Api { status: u16, detail: Option<String> },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not authenticated")]
    Unauthenticated,
}

impl ClientError {
    /// Text written to a container's error slot.
    ///
    /// Only server-provided details and local validation messages are shown
    /// verbatim; everything else collapses to the operation's generic message.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Api {
                detail: Some(detail),
                ..
            } => detail.clone(),
            ClientError::Validation(msg) => msg.clone(),
            ClientError::Unauthenticated => "Authentication required".to_string(),
            _ => fallback.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_detail() {
        let err = ClientError::Api {
            status: 400,
            detail: Some("Invalid token.".to_string()),
        };
        assert_eq!(err.user_message("Failed to fetch chats"), "Invalid token.");
    }

    #[test]
    fn test_user_message_falls_back() {
        let err = ClientError::Api {
            status: 500,
            detail: None,
        };
        assert_eq!(err.user_message("Failed to fetch chats"), "Failed to fetch chats");

        let err = ClientError::Storage("disk full".to_string());
        assert_eq!(err.user_message("Login failed"), "Login failed");
    }
}
