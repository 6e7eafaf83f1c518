/// Session: the single owner of all client state.
///
/// Every user action goes through here. The relevant store produces a
/// request, the gateway executes it, and the reply (or failure) is fed back
/// into the same store. Failures never propagate past this boundary: each
/// operation resolves to an [`Outcome`] and the store's error slot is set.
use crate::credential_store::CredentialStore;
use crate::error::{ClientError, Result};
use crate::gateway::{decode, Gateway, Request};
use crate::models::{
    ChatMessageReply, Conversation, EntityId, LoginReply, Message, PeerConversation, PeerMessage,
    ProfileUpdate, Registration, User,
};
use crate::payload::ListPayload;
use crate::store::{
    ChatStore, IdentityStore, PeerChatStore, RecommendationStore, Thread, ThreadStore,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Resolved result of a session operation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Done(T),
    Failed(String),
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Done(_) => None,
            Outcome::Failed(msg) => Some(msg),
        }
    }

    pub fn into_result(self) -> std::result::Result<T, String> {
        match self {
            Outcome::Done(value) => Ok(value),
            Outcome::Failed(msg) => Err(msg),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Done(value) => Outcome::Done(f(value)),
            Outcome::Failed(msg) => Outcome::Failed(msg),
        }
    }
}

pub struct Session<G: Gateway> {
    gateway: G,
    credentials: CredentialStore,
    identity: IdentityStore,
    chats: ChatStore,
    peer_chats: PeerChatStore,
    recommendations: RecommendationStore,
}

impl<G: Gateway> Session<G> {
    /// The session starts authenticated iff a credential is stored.
    pub fn new(gateway: G, credentials: CredentialStore) -> Result<Self> {
        let authenticated = credentials.token()?.is_some();
        debug!("Session starting (stored credential: {})", authenticated);
        Ok(Self {
            gateway,
            credentials,
            identity: IdentityStore::new(authenticated),
            chats: ChatStore::new(),
            peer_chats: PeerChatStore::new(),
            recommendations: RecommendationStore::new(),
        })
    }

    pub fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    pub fn chats(&self) -> &ChatStore {
        &self.chats
    }

    pub fn chats_mut(&mut self) -> &mut ChatStore {
        &mut self.chats
    }

    pub fn peer_chats(&self) -> &PeerChatStore {
        &self.peer_chats
    }

    pub fn peer_chats_mut(&mut self) -> &mut PeerChatStore {
        &mut self.peer_chats
    }

    pub fn recommendations(&self) -> &RecommendationStore {
        &self.recommendations
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_authenticated()
    }

    // ─── Identity ────────────────────────────────────────────────────────────

    pub async fn login(&mut self, username: &str, password: &str) -> Outcome<User> {
        let request = self
            .identity
            .begin_login(username.to_string(), password.to_string());
        let reply = call(&self.gateway, true, &request)
            .await
            .and_then(decode::<LoginReply>)
            .and_then(|reply| {
                self.credentials.save_token(&reply.token)?;
                Ok(reply.user)
            });
        match reply {
            Ok(user) => {
                self.identity.resolve_login(user.clone());
                Outcome::Done(user)
            }
            Err(e) => fail_with(&mut self.identity, &request, e, |s, m| s.fail(m)),
        }
    }

    /// Signs out locally even when the server call fails. Other stores keep
    /// their data until the next fetch.
    pub async fn logout(&mut self) -> Outcome<()> {
        let request = self.identity.begin_logout();
        if let Err(e) = call(&self.gateway, self.is_authenticated(), &request).await {
            warn!("Server-side logout failed: {}", e);
        }
        let cleared = self.credentials.clear();
        self.identity.resolve_logout();
        match cleared {
            Ok(_) => Outcome::Done(()),
            Err(e) => fail_with(&mut self.identity, &request, e, |s, m| s.fail(m)),
        }
    }

    pub async fn register(&mut self, form: Registration) -> Outcome<User> {
        let request = match self.identity.begin_register(form) {
            Ok(request) => request,
            Err(e) => return Outcome::Failed(e.user_message("Registration failed")),
        };
        match call(&self.gateway, true, &request)
            .await
            .and_then(decode::<User>)
        {
            Ok(user) => {
                self.identity.resolve_register(user.clone());
                Outcome::Done(user)
            }
            Err(e) => fail_with(&mut self.identity, &request, e, |s, m| s.fail(m)),
        }
    }

    /// A rejected credential (401/403) ends the session; other failures
    /// only set the error slot.
    pub async fn fetch_current_user(&mut self) -> Outcome<User> {
        let request = self.identity.begin_fetch_current_user();
        match call(&self.gateway, self.is_authenticated(), &request)
            .await
            .and_then(decode::<User>)
        {
            Ok(user) => {
                self.identity.resolve_current_user(user.clone());
                Outcome::Done(user)
            }
            Err(e) if credential_rejected(&e) => {
                if let Err(clear_err) = self.credentials.clear() {
                    warn!("Could not clear stored credential: {}", clear_err);
                }
                info!("Stored credential rejected, session expired");
                fail_with(&mut self.identity, &request, e, |s, m| s.fail_current_user(m))
            }
            Err(e) => fail_with(&mut self.identity, &request, e, |s, m| s.fail(m)),
        }
    }

    pub async fn update_profile(&mut self, update: ProfileUpdate) -> Outcome<User> {
        let request = match self.identity.begin_update_profile(update) {
            Ok(request) => request,
            Err(e) => return Outcome::Failed(e.user_message("Failed to update profile")),
        };
        match call(&self.gateway, self.is_authenticated(), &request)
            .await
            .and_then(decode::<User>)
        {
            Ok(user) => {
                self.identity.resolve_update_profile(user.clone());
                Outcome::Done(user)
            }
            Err(e) => fail_with(&mut self.identity, &request, e, |s, m| s.fail(m)),
        }
    }

    pub async fn update_password(
        &mut self,
        current: &str,
        new: &str,
        confirm: &str,
    ) -> Outcome<()> {
        let request = match self.identity.begin_update_password(
            current.to_string(),
            new.to_string(),
            confirm.to_string(),
        ) {
            Ok(request) => request,
            Err(e) => return Outcome::Failed(e.user_message("Failed to update password")),
        };
        match call(&self.gateway, self.is_authenticated(), &request).await {
            Ok(_) => {
                self.identity.resolve_update_password();
                Outcome::Done(())
            }
            Err(e) => fail_with(&mut self.identity, &request, e, |s, m| s.fail(m)),
        }
    }

    // ─── AI chats ────────────────────────────────────────────────────────────

    pub async fn load_chats(&mut self) -> Outcome<usize> {
        let authenticated = self.is_authenticated();
        load_list(&self.gateway, authenticated, &mut self.chats).await
    }

    pub async fn open_chat(&mut self, id: EntityId) -> Outcome<Conversation> {
        let authenticated = self.is_authenticated();
        load_detail(&self.gateway, authenticated, &mut self.chats, id).await
    }

    pub async fn create_chat(&mut self, title: &str) -> Outcome<Conversation> {
        let authenticated = self.is_authenticated();
        create(&self.gateway, authenticated, &mut self.chats, title.to_string()).await
    }

    /// Send to the assistant; the reply message is returned.
    pub async fn ask(&mut self, chat_id: EntityId, content: &str) -> Outcome<Message> {
        let authenticated = self.is_authenticated();
        let author = self.identity.user().cloned();
        send(
            &self.gateway,
            authenticated,
            &mut self.chats,
            chat_id,
            content,
            author.as_ref(),
            |body| decode::<ChatMessageReply>(body).map(|reply| reply.message),
        )
        .await
    }

    // ─── Peer chats ──────────────────────────────────────────────────────────

    pub async fn load_peer_chats(&mut self) -> Outcome<usize> {
        let authenticated = self.is_authenticated();
        load_list(&self.gateway, authenticated, &mut self.peer_chats).await
    }

    /// Load a peer conversation and mark it read.
    pub async fn open_peer_chat(&mut self, id: EntityId) -> Outcome<PeerConversation> {
        let authenticated = self.is_authenticated();
        match load_detail(&self.gateway, authenticated, &mut self.peer_chats, id).await {
            Outcome::Done(_) => {
                if let Outcome::Failed(msg) = self.mark_peer_chat_read(id).await {
                    warn!("Opened conversation {} but could not mark it read: {}", id, msg);
                    // The open itself succeeded
                    self.peer_chats.clear_error();
                }
                match self.peer_chats.current() {
                    Some(current) => Outcome::Done(current.clone()),
                    None => Outcome::Failed("Conversation is no longer selected".to_string()),
                }
            }
            failed => failed,
        }
    }

    /// Start a conversation with `user_id`, reusing an existing one if the
    /// list already has it.
    pub async fn start_peer_chat(&mut self, user_id: EntityId) -> Outcome<PeerConversation> {
        let existing = self
            .peer_chats
            .items()
            .iter()
            .find(|c| c.participants.iter().any(|p| p.id == user_id))
            .map(|c| c.id);
        if let Some(id) = existing {
            debug!("Reusing conversation {} with user {}", id, user_id);
            return self.open_peer_chat(id).await;
        }
        let authenticated = self.is_authenticated();
        create(&self.gateway, authenticated, &mut self.peer_chats, user_id).await
    }

    /// The provisional copy is authored by the current user, so the profile
    /// is fetched first when it is not known yet.
    pub async fn send_peer_message(
        &mut self,
        chat_id: EntityId,
        content: &str,
    ) -> Outcome<PeerMessage> {
        if !content.trim().is_empty() && self.identity.user().is_none() {
            if let Outcome::Failed(msg) = self.fetch_current_user().await {
                warn!("Sending without a known author: {}", msg);
            }
        }
        let authenticated = self.is_authenticated();
        let author = self.identity.user().cloned();
        send(
            &self.gateway,
            authenticated,
            &mut self.peer_chats,
            chat_id,
            content,
            author.as_ref(),
            decode::<PeerMessage>,
        )
        .await
    }

    pub async fn mark_peer_chat_read(&mut self, chat_id: EntityId) -> Outcome<()> {
        let request = self.peer_chats.begin_mark_read(chat_id);
        match call(&self.gateway, self.is_authenticated(), &request).await {
            Ok(_) => {
                self.peer_chats.resolve_mark_read(chat_id);
                Outcome::Done(())
            }
            Err(e) => fail_with(&mut self.peer_chats, &request, e, |s, m| s.fail(m)),
        }
    }

    // ─── Recommendations ─────────────────────────────────────────────────────

    pub async fn load_recommendations(&mut self) -> Outcome<usize> {
        let request = self.recommendations.begin_load_list();
        match call(&self.gateway, self.is_authenticated(), &request).await {
            Ok(body) => {
                self.recommendations.resolve_load_list(ListPayload::decode(body));
                Outcome::Done(self.recommendations.items().len())
            }
            Err(e) => fail_with(&mut self.recommendations, &request, e, |s, m| s.fail(m)),
        }
    }

    pub async fn generate_recommendations(&mut self) -> Outcome<usize> {
        let request = self.recommendations.begin_generate();
        match call(&self.gateway, self.is_authenticated(), &request).await {
            Ok(body) => {
                self.recommendations.resolve_generate(ListPayload::decode(body));
                Outcome::Done(self.recommendations.items().len())
            }
            Err(e) => fail_with(&mut self.recommendations, &request, e, |s, m| s.fail(m)),
        }
    }

    pub async fn mark_recommendation_viewed(&mut self, id: EntityId) -> Outcome<()> {
        let request = self.recommendations.begin_mark_viewed(id);
        match call(&self.gateway, self.is_authenticated(), &request).await {
            Ok(_) => {
                self.recommendations.resolve_mark_viewed(id);
                Outcome::Done(())
            }
            Err(e) => fail_with(&mut self.recommendations, &request, e, |s, m| s.fail(m)),
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Execute a request, refusing protected ones when signed out.
async fn call<G: Gateway>(gateway: &G, authenticated: bool, request: &Request) -> Result<Value> {
    if request.requires_auth() && !authenticated {
        debug!("Refusing {} while signed out", request.path());
        return Err(ClientError::Unauthenticated);
    }
    gateway.send(request).await
}

fn credential_rejected(err: &ClientError) -> bool {
    matches!(
        err,
        ClientError::Unauthenticated | ClientError::Api { status: 401 | 403, .. }
    )
}

/// Write the failure into `store` via `fail` and return it as an outcome.
fn fail_with<S, T>(
    store: &mut S,
    request: &Request,
    err: ClientError,
    fail: impl FnOnce(&mut S, String),
) -> Outcome<T> {
    debug!("{} {} failed: {}", request.method(), request.path(), err);
    let message = err.user_message(request.fallback_error());
    fail(store, message.clone());
    Outcome::Failed(message)
}

async fn load_list<G, T>(
    gateway: &G,
    authenticated: bool,
    store: &mut ThreadStore<T>,
) -> Outcome<usize>
where
    G: Gateway,
    T: Thread + DeserializeOwned,
{
    let request = store.begin_load_list();
    match call(gateway, authenticated, &request).await {
        Ok(body) => {
            store.resolve_load_list(ListPayload::decode(body));
            Outcome::Done(store.items().len())
        }
        Err(e) => fail_with(store, &request, e, |s, m| s.fail(m)),
    }
}

async fn load_detail<G, T>(
    gateway: &G,
    authenticated: bool,
    store: &mut ThreadStore<T>,
    id: EntityId,
) -> Outcome<T>
where
    G: Gateway,
    T: Thread + DeserializeOwned,
{
    let (ticket, request) = store.begin_load_detail(id);
    match call(gateway, authenticated, &request).await.and_then(decode::<T>) {
        Ok(thread) => {
            if store.resolve_load_detail(ticket, thread.clone()) {
                Outcome::Done(thread)
            } else {
                Outcome::Failed("Superseded by a newer request".to_string())
            }
        }
        Err(e) => {
            let message = e.user_message(request.fallback_error());
            store.fail_load_detail(ticket, message.clone());
            Outcome::Failed(message)
        }
    }
}

async fn create<G, T>(
    gateway: &G,
    authenticated: bool,
    store: &mut ThreadStore<T>,
    seed: T::Seed,
) -> Outcome<T>
where
    G: Gateway,
    T: Thread + DeserializeOwned,
{
    let request = store.begin_create(seed);
    match call(gateway, authenticated, &request).await.and_then(decode::<T>) {
        Ok(thread) => {
            store.resolve_create(thread.clone());
            Outcome::Done(thread)
        }
        Err(e) => fail_with(store, &request, e, |s, m| s.fail(m)),
    }
}

async fn send<G, T>(
    gateway: &G,
    authenticated: bool,
    store: &mut ThreadStore<T>,
    thread_id: EntityId,
    content: &str,
    author: Option<&User>,
    decode_reply: impl FnOnce(Value) -> Result<T::Message>,
) -> Outcome<T::Message>
where
    G: Gateway,
    T: Thread,
{
    if content.trim().is_empty() {
        let message = "Message cannot be empty".to_string();
        store.fail(message.clone());
        return Outcome::Failed(message);
    }
    let (ticket, request) = store.begin_send(thread_id, content.to_string(), author);
    match call(gateway, authenticated, &request).await.and_then(decode_reply) {
        Ok(message) => {
            store.resolve_send(ticket, message.clone());
            Outcome::Done(message)
        }
        Err(e) => {
            let message = e.user_message(request.fallback_error());
            store.fail_send(ticket, message.clone());
            Outcome::Failed(message)
        }
    }
}
