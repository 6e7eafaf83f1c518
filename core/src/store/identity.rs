/// Authenticated user state
use super::Status;
use crate::error::{ClientError, Result};
use crate::gateway::Request;
use crate::models::{ProfileUpdate, Registration, User};
use tracing::{info, warn};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct IdentityStore {
    user: Option<User>,
    authenticated: bool,
    status: Status,
}

impl IdentityStore {
    /// `authenticated` reflects whether a credential was found in storage.
    pub fn new(authenticated: bool) -> Self {
        Self {
            authenticated,
            ..Default::default()
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.status.error()
    }

    pub fn clear_error(&mut self) {
        self.status.clear_error();
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.status.fail(message);
    }

    pub fn begin_login(&mut self, username: String, password: String) -> Request {
        self.status.start();
        Request::Login { username, password }
    }

    pub fn resolve_login(&mut self, user: User) {
        info!("Logged in as {}", user.username);
        self.user = Some(user);
        self.authenticated = true;
        self.status.succeed();
    }

    pub fn begin_logout(&mut self) -> Request {
        self.status.start();
        Request::Logout
    }

    /// Local sign-out. Applied whether or not the server call succeeded.
    pub fn resolve_logout(&mut self) {
        info!("Logged out");
        self.user = None;
        self.authenticated = false;
        self.status.succeed();
    }

    pub fn begin_register(&mut self, form: Registration) -> Result<Request> {
        if form.username.trim().is_empty() {
            return self.reject("Username is required");
        }
        if form.password != form.password_confirm {
            return self.reject("Passwords do not match");
        }
        self.status.start();
        Ok(Request::Register(form))
    }

    /// Registration does not sign the user in.
    pub fn resolve_register(&mut self, user: User) {
        info!("Registered {}", user.username);
        self.status.succeed();
    }

    pub fn begin_fetch_current_user(&mut self) -> Request {
        self.status.start();
        Request::CurrentUser
    }

    pub fn resolve_current_user(&mut self, user: User) {
        self.user = Some(user);
        self.authenticated = true;
        self.status.succeed();
    }

    /// The stored credential no longer works: treat the session as expired.
    pub fn fail_current_user(&mut self, message: impl Into<String>) {
        self.user = None;
        self.authenticated = false;
        self.fail(message);
    }

    pub fn begin_update_profile(&mut self, update: ProfileUpdate) -> Result<Request> {
        if update.is_empty() {
            return self.reject("Nothing to update");
        }
        self.status.start();
        Ok(Request::UpdateProfile(update))
    }

    pub fn resolve_update_profile(&mut self, user: User) {
        self.user = Some(user);
        self.status.succeed();
    }

    /// Rejected locally, before any request, when `new` and `confirm` differ.
    pub fn begin_update_password(
        &mut self,
        current: String,
        new: String,
        confirm: String,
    ) -> Result<Request> {
        if new != confirm {
            return self.reject("Passwords do not match");
        }
        if new.len() < MIN_PASSWORD_LEN {
            return self.reject("Password must be at least 8 characters long.");
        }
        self.status.start();
        Ok(Request::ChangePassword {
            current_password: current,
            new_password: new,
        })
    }

    pub fn resolve_update_password(&mut self) {
        self.status.succeed();
    }

    fn reject<T>(&mut self, message: &str) -> Result<T> {
        self.status.fail(message);
        Err(ClientError::Validation(message.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        serde_json::from_value(serde_json::json!({ "id": 1, "username": "ana" })).unwrap()
    }

    #[test]
    fn test_login_logout() {
        let mut store = IdentityStore::new(false);
        store.begin_login("ana".to_string(), "secret123".to_string());
        assert!(store.is_loading());
        store.resolve_login(user());
        assert!(store.is_authenticated());
        assert_eq!(store.user().map(|u| u.id), Some(1));

        store.begin_logout();
        store.resolve_logout();
        assert!(!store.is_authenticated());
        assert!(store.user().is_none());
    }

    #[test]
    fn test_password_mismatch_rejected_locally() {
        let mut store = IdentityStore::new(true);
        let err = store
            .begin_update_password(
                "old-password".to_string(),
                "new-password".to_string(),
                "other-password".to_string(),
            )
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(store.error(), Some("Passwords do not match"));
        assert!(!store.is_loading());
    }

    #[test]
    fn test_register_validation() {
        let mut store = IdentityStore::new(false);
        let form = Registration {
            username: "ana".to_string(),
            password: "longenough".to_string(),
            password_confirm: "longenough".to_string(),
            ..Default::default()
        };
        assert!(store.begin_register(form.clone()).is_ok());

        let mismatched = Registration {
            password_confirm: "different".to_string(),
            ..form
        };
        assert!(store.begin_register(mismatched).is_err());
        assert_eq!(store.error(), Some("Passwords do not match"));
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_current_user_failure_expires_session() {
        let mut store = IdentityStore::new(true);
        store.begin_fetch_current_user();
        store.fail_current_user("Invalid token.");
        assert!(!store.is_authenticated());
        assert_eq!(store.error(), Some("Invalid token."));
    }
}
