/// Recommended people
use super::Status;
use crate::gateway::Request;
use crate::models::{EntityId, Recommendation};
use crate::payload::ListPayload;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct RecommendationStore {
    items: Vec<Recommendation>,
    status: Status,
}

impl RecommendationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Recommendation] {
        &self.items
    }

    pub fn unviewed(&self) -> impl Iterator<Item = &Recommendation> {
        self.items.iter().filter(|r| !r.is_viewed)
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

    pub fn begin_load_list(&mut self) -> Request {
        self.status.start();
        Request::ListRecommendations
    }

    pub fn resolve_load_list(&mut self, payload: ListPayload<Recommendation>) {
        self.replace(payload);
    }

    /// Ask the server to recompute matches; the reply is the fresh list.
    pub fn begin_generate(&mut self) -> Request {
        self.status.start();
        Request::GenerateRecommendations
    }

    pub fn resolve_generate(&mut self, payload: ListPayload<Recommendation>) {
        self.replace(payload);
    }

    pub fn begin_mark_viewed(&mut self, id: EntityId) -> Request {
        self.status.start();
        Request::MarkRecommendationViewed(id)
    }

    pub fn resolve_mark_viewed(&mut self, id: EntityId) {
        if let Some(rec) = self.items.iter_mut().find(|r| r.id == id) {
            rec.is_viewed = true;
        }
        self.status.succeed();
    }

    fn replace(&mut self, payload: ListPayload<Recommendation>) {
        self.items = payload.into_items();
        self.status.succeed();
        debug!("Holding {} recommendations", self.items.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn rec(id: EntityId, score: f64) -> Recommendation {
        Recommendation {
            id,
            recommended_user: User {
                id: id + 100,
                username: format!("user{}", id),
                email: String::new(),
                first_name: String::new(),
                last_name: String::new(),
                profile_picture: None,
                bio: String::new(),
                interests: String::new(),
                date_joined: None,
            },
            similarity_score: score,
            common_interests: vec!["hiking".to_string()],
            created_at: None,
            is_viewed: false,
            explanation: None,
        }
    }

    #[test]
    fn test_generate_replaces_list() {
        let mut store = RecommendationStore::new();
        store.begin_load_list();
        store.resolve_load_list(vec![rec(1, 0.9)].into());

        assert_eq!(store.begin_generate(), Request::GenerateRecommendations);
        store.resolve_generate(ListPayload::Envelope {
            results: vec![rec(2, 0.8), rec(3, 0.7)],
        });
        let ids: Vec<_> = store.items().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_failed_generate_keeps_list() {
        let mut store = RecommendationStore::new();
        store.resolve_load_list(vec![rec(1, 0.9)].into());
        store.begin_generate();
        store.fail("No recommendations found. Try adding more to your interests and bio.");
        assert_eq!(store.items().len(), 1);
        assert!(store.error().unwrap().starts_with("No recommendations"));
    }

    #[test]
    fn test_mark_viewed() {
        let mut store = RecommendationStore::new();
        store.resolve_load_list(vec![rec(1, 0.9), rec(2, 0.5)].into());
        store.begin_mark_viewed(2);
        store.resolve_mark_viewed(2);
        assert!(store.items()[1].is_viewed);
        assert_eq!(store.unviewed().count(), 1);

        // Unknown id is a no-op
        store.resolve_mark_viewed(99);
        assert_eq!(store.unviewed().count(), 1);
    }
}
