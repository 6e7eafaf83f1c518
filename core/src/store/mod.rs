/// Client-side state containers.
///
/// Each container holds one entity kind's snapshot of server truth plus a
/// loading flag and the last error. Operations are split into a `begin_*`
/// transition that returns the [`Request`](crate::gateway::Request) to issue
/// and a `resolve_*`/`fail_*` transition that applies the outcome. Nothing
/// in here performs I/O.
pub mod identity;
pub mod recommendations;
pub mod threads;

pub use identity::IdentityStore;
pub use recommendations::RecommendationStore;
pub use threads::{
    ChatStore, DetailTicket, PeerChatStore, SendTicket, Thread, ThreadMessage, ThreadStore,
};

/// Loading flag plus last error message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    loading: bool,
    error: Option<String>,
}

impl Status {
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn start(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub(crate) fn succeed(&mut self) {
        self.loading = false;
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.loading = false;
        self.error = Some(message.into());
    }

    pub(crate) fn clear_error(&mut self) {
        self.error = None;
    }
}

/// Move `items[index]` to the front, keeping the relative order of the rest.
pub(crate) fn move_to_front<T>(items: &mut [T], index: usize) {
    if index < items.len() {
        items[..=index].rotate_right(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_to_front() {
        let mut items = vec!['a', 'b', 'c', 'd'];
        move_to_front(&mut items, 2);
        assert_eq!(items, vec!['c', 'a', 'b', 'd']);

        move_to_front(&mut items, 0);
        assert_eq!(items, vec!['c', 'a', 'b', 'd']);

        move_to_front(&mut items, 9);
        assert_eq!(items, vec!['c', 'a', 'b', 'd']);
    }

    #[test]
    fn test_status_transitions() {
        let mut status = Status::default();
        status.fail("boom");
        assert_eq!(status.error(), Some("boom"));

        status.start();
        assert!(status.is_loading());
        assert_eq!(status.error(), None);

        status.succeed();
        assert!(!status.is_loading());
    }
}
