/// Conversation containers (AI chats and peer chats).
///
/// Both kinds share one lifecycle, so a single generic [`ThreadStore`] is
/// parameterised by the conversation type through the [`Thread`] trait.
///
/// Invariants kept by every transition:
/// - messages inside a conversation stay in insertion order, and a
///   confirmed message never coexists with the provisional copy it replaces
/// - `items` is most-recently-updated first: whatever stamps `updated_at`
///   moves the entry to index 0
/// - `current` holds at most one conversation and is replaced wholesale
use super::{move_to_front, Status};
use crate::gateway::Request;
use crate::models::{
    Conversation, EntityId, Message, PeerConversation, PeerMessage, Role, User,
};
use crate::payload::ListPayload;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

pub trait ThreadMessage: Clone {
    fn id(&self) -> EntityId;

    /// Optimistic local copy of an outgoing message
    fn provisional(
        id: EntityId,
        author: Option<&User>,
        content: &str,
        at: DateTime<Utc>,
    ) -> Self;

    /// True when a confirmed message is the server's copy of what was sent,
    /// false when it is a reply to it.
    fn echoes_outgoing(&self) -> bool;
}

pub trait Thread: Clone {
    type Message: ThreadMessage;
    /// What `create` needs from the caller
    type Seed;

    fn id(&self) -> EntityId;
    fn messages(&self) -> &[Self::Message];
    fn messages_mut(&mut self) -> &mut Vec<Self::Message>;
    fn touch(&mut self, at: DateTime<Utc>);

    /// Hook for derived fields (e.g. a cached last message)
    fn note_confirmed(&mut self, _message: &Self::Message) {}

    fn list_request() -> Request;
    fn detail_request(id: EntityId) -> Request;
    fn create_request(seed: Self::Seed) -> Request;
    fn send_request(id: EntityId, content: String) -> Request;
}

/// Conversations whose messages carry a read flag
pub trait Readable: Thread {
    fn mark_all_read(&mut self);
    fn mark_read_request(id: EntityId) -> Request;
}

// ─── AI chat ─────────────────────────────────────────────────────────────────

impl ThreadMessage for Message {
    fn id(&self) -> EntityId {
        self.id
    }

    fn provisional(
        id: EntityId,
        _author: Option<&User>,
        content: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Message {
            id,
            role: Role::User,
            content: content.to_string(),
            created_at: at,
        }
    }

    fn echoes_outgoing(&self) -> bool {
        self.role == Role::User
    }
}

impl Thread for Conversation {
    type Message = Message;
    type Seed = String;

    fn id(&self) -> EntityId {
        self.id
    }

    fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn messages_mut(&mut self) -> &mut Vec<Message> {
        &mut self.messages
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    fn list_request() -> Request {
        Request::ListChats
    }

    fn detail_request(id: EntityId) -> Request {
        Request::ChatDetail(id)
    }

    fn create_request(title: String) -> Request {
        Request::CreateChat { title }
    }

    fn send_request(chat_id: EntityId, content: String) -> Request {
        Request::SendChatMessage { chat_id, content }
    }
}

// ─── Peer chat ───────────────────────────────────────────────────────────────

impl ThreadMessage for PeerMessage {
    fn id(&self) -> EntityId {
        self.id
    }

    fn provisional(
        id: EntityId,
        author: Option<&User>,
        content: &str,
        at: DateTime<Utc>,
    ) -> Self {
        PeerMessage {
            id,
            sender: author.map(|u| u.id).unwrap_or_default(),
            sender_username: author.map(|u| u.username.clone()).unwrap_or_default(),
            sender_profile_picture: author.and_then(|u| u.profile_picture.clone()),
            content: content.to_string(),
            created_at: at,
            is_read: false,
        }
    }

    fn echoes_outgoing(&self) -> bool {
        // The peer endpoint always answers with the stored copy of our message
        true
    }
}

impl Thread for PeerConversation {
    type Message = PeerMessage;
    type Seed = EntityId;

    fn id(&self) -> EntityId {
        self.id
    }

    fn messages(&self) -> &[PeerMessage] {
        &self.messages
    }

    fn messages_mut(&mut self) -> &mut Vec<PeerMessage> {
        &mut self.messages
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    fn note_confirmed(&mut self, message: &PeerMessage) {
        self.last_message = Some(message.clone());
    }

    fn list_request() -> Request {
        Request::ListPeerChats
    }

    fn detail_request(id: EntityId) -> Request {
        Request::PeerChatDetail(id)
    }

    fn create_request(participant: EntityId) -> Request {
        Request::CreatePeerChat {
            participants: vec![participant],
        }
    }

    fn send_request(chat_id: EntityId, content: String) -> Request {
        Request::SendPeerMessage { chat_id, content }
    }
}

impl Readable for PeerConversation {
    fn mark_all_read(&mut self) {
        for message in &mut self.messages {
            message.is_read = true;
        }
        if let Some(last) = &mut self.last_message {
            last.is_read = true;
        }
    }

    fn mark_read_request(id: EntityId) -> Request {
        Request::MarkPeerChatRead(id)
    }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Issued by [`ThreadStore::begin_load_detail`]; hand it back on resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailTicket {
    seq: u64,
    pub id: EntityId,
}

/// Issued by [`ThreadStore::begin_send`]; correlates the reply with the
/// provisional message it confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendTicket {
    pub correlation: Uuid,
    pub thread_id: EntityId,
    pub provisional_id: Option<EntityId>,
}

#[derive(Debug, Clone)]
pub struct ThreadStore<T: Thread> {
    items: Vec<T>,
    current: Option<T>,
    status: Status,
    pending: Vec<SendTicket>,
    next_provisional_id: EntityId,
    detail_issued: u64,
    detail_applied: u64,
}

pub type ChatStore = ThreadStore<Conversation>;
pub type PeerChatStore = ThreadStore<PeerConversation>;

impl<T: Thread> Default for ThreadStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Thread> ThreadStore<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            current: None,
            status: Status::default(),
            pending: Vec::new(),
            next_provisional_id: -1,
            detail_issued: 0,
            detail_applied: 0,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.items.iter().find(|t| t.id() == id)
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.status.error()
    }

    /// Whether `message_id` is a provisional message still awaiting its reply
    pub fn is_pending(&self, message_id: EntityId) -> bool {
        self.pending
            .iter()
            .any(|t| t.provisional_id == Some(message_id))
    }

    /// Replace the current conversation. In-flight detail fetches are
    /// invalidated so they cannot overwrite the selection.
    pub fn select(&mut self, thread: Option<T>) {
        self.current = thread;
        self.detail_applied = self.detail_issued;
    }

    pub fn clear_error(&mut self) {
        self.status.clear_error();
    }

    /// Generic failure for list, create and mark operations
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.status.fail(message);
    }

    // ── list ──

    pub fn begin_load_list(&mut self) -> Request {
        self.status.start();
        T::list_request()
    }

    pub fn resolve_load_list(&mut self, payload: ListPayload<T>) {
        self.items = payload.into_items();
        self.status.succeed();
        debug!("Loaded {} conversations", self.items.len());
    }

    // ── detail ──

    pub fn begin_load_detail(&mut self, id: EntityId) -> (DetailTicket, Request) {
        self.status.start();
        self.detail_issued += 1;
        let ticket = DetailTicket {
            seq: self.detail_issued,
            id,
        };
        (ticket, T::detail_request(id))
    }

    /// Apply a detail reply. Returns false when the reply was stale
    /// (a newer fetch or selection already landed) and was discarded.
    pub fn resolve_load_detail(&mut self, ticket: DetailTicket, thread: T) -> bool {
        if self.is_stale(ticket) {
            return false;
        }
        self.detail_applied = ticket.seq;
        if let Some(slot) = self.items.iter_mut().find(|t| t.id() == thread.id()) {
            *slot = thread.clone();
        }
        self.current = Some(thread);
        self.status.succeed();
        true
    }

    pub fn fail_load_detail(&mut self, ticket: DetailTicket, message: impl Into<String>) -> bool {
        if self.is_stale(ticket) {
            return false;
        }
        self.detail_applied = ticket.seq;
        self.fail(message);
        true
    }

    fn is_stale(&mut self, ticket: DetailTicket) -> bool {
        if ticket.seq > self.detail_applied {
            return false;
        }
        warn!(
            "Discarding stale reply for conversation {} (seq {} <= {})",
            ticket.id, ticket.seq, self.detail_applied
        );
        if self.detail_issued == self.detail_applied {
            self.status.succeed();
        }
        true
    }

    // ── create ──

    pub fn begin_create(&mut self, seed: T::Seed) -> Request {
        self.status.start();
        T::create_request(seed)
    }

    pub fn resolve_create(&mut self, thread: T) {
        self.items.insert(0, thread.clone());
        self.select(Some(thread));
        self.status.succeed();
    }

    // ── send ──

    /// Phase 1 of a send. If the conversation is the current one, a
    /// provisional message is appended to it and to its list entry, and the
    /// entry moves to the front.
    pub fn begin_send(
        &mut self,
        thread_id: EntityId,
        content: String,
        author: Option<&User>,
    ) -> (SendTicket, Request) {
        self.status.start();
        let now = Utc::now();

        let loaded = self.current.as_ref().is_some_and(|c| c.id() == thread_id);
        let provisional_id = if loaded {
            let id = self.next_provisional_id;
            self.next_provisional_id -= 1;
            let message = T::Message::provisional(id, author, &content, now);

            if let Some(current) = &mut self.current {
                current.messages_mut().push(message.clone());
                current.touch(now);
            }
            if let Some(index) = self.items.iter().position(|t| t.id() == thread_id) {
                let entry = &mut self.items[index];
                entry.messages_mut().push(message);
                entry.touch(now);
                move_to_front(&mut self.items, index);
            }
            Some(id)
        } else {
            None
        };

        let ticket = SendTicket {
            correlation: Uuid::new_v4(),
            thread_id,
            provisional_id,
        };
        self.pending.push(ticket);
        debug!(
            "Sending to conversation {} (correlation {}, provisional {:?})",
            thread_id, ticket.correlation, provisional_id
        );
        (ticket, T::send_request(thread_id, content))
    }

    /// Phase 2 of a send: reconcile the confirmed message.
    pub fn resolve_send(&mut self, ticket: SendTicket, confirmed: T::Message) {
        self.pending.retain(|t| t.correlation != ticket.correlation);
        let now = Utc::now();

        if let Some(current) = &mut self.current {
            if current.id() == ticket.thread_id {
                reconcile(current, ticket.provisional_id, &confirmed);
                current.touch(now);
            }
        }
        if let Some(index) = self.items.iter().position(|t| t.id() == ticket.thread_id) {
            let entry = &mut self.items[index];
            reconcile(entry, ticket.provisional_id, &confirmed);
            entry.touch(now);
            move_to_front(&mut self.items, index);
        }
        self.status.succeed();
    }

    /// A failed send keeps its provisional message in place.
    pub fn fail_send(&mut self, ticket: SendTicket, message: impl Into<String>) {
        self.pending.retain(|t| t.correlation != ticket.correlation);
        self.fail(message);
    }
}

impl<T: Readable> ThreadStore<T> {
    pub fn begin_mark_read(&mut self, id: EntityId) -> Request {
        self.status.start();
        T::mark_read_request(id)
    }

    pub fn resolve_mark_read(&mut self, id: EntityId) {
        if let Some(entry) = self.items.iter_mut().find(|t| t.id() == id) {
            entry.mark_all_read();
        }
        if let Some(current) = &mut self.current {
            if current.id() == id {
                current.mark_all_read();
            }
        }
        self.status.succeed();
    }
}

/// Put `confirmed` into `thread`: an echo replaces the provisional copy in
/// place; a reply is appended after it. A message already present by server
/// id (e.g. brought in by a detail fetch) is not added twice.
fn reconcile<T: Thread>(thread: &mut T, provisional_id: Option<EntityId>, confirmed: &T::Message) {
    let messages = thread.messages_mut();
    let slot = provisional_id.and_then(|pid| messages.iter().position(|m| m.id() == pid));
    let known = messages.iter().any(|m| m.id() == confirmed.id());

    match slot {
        Some(index) if confirmed.echoes_outgoing() => {
            if known {
                messages.remove(index);
            } else {
                messages[index] = confirmed.clone();
            }
        }
        _ if !known => messages.push(confirmed.clone()),
        _ => {}
    }
    thread.note_confirmed(confirmed);
}
