/// GPTinder client core
///
/// State containers and an HTTP gateway for the GPTinder social messaging
/// service: AI chat, peer chat, and interest-based recommendations.

pub mod cli_app;
pub mod config;
pub mod credential_store;
pub mod error;
pub mod gateway;
pub mod models;
pub mod payload;
pub mod session;
pub mod store;

pub use config::Config;
pub use credential_store::CredentialStore;
pub use error::{ClientError, Result};
pub use gateway::{Gateway, HttpGateway, Request};
pub use session::{Outcome, Session};
