/// List payload decoding.
///
/// List endpoints answer either with a bare JSON array or with a paginated
/// envelope (`{"count": .., "results": [..]}`). Anything else is treated as
/// an empty list: callers only ever see an ordered sequence. Items are
/// decoded one by one, so a single malformed entry is dropped on its own
/// instead of taking the rest of the list with it.
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum ListPayload<T> {
    Sequence(Vec<T>),
    Envelope { results: Vec<T> },
    Other(Value),
}

/// Outer shape only; items stay raw until decoded individually.
#[derive(Deserialize)]
#[serde(untagged)]
enum Shape {
    Sequence(Vec<Value>),
    Envelope { results: Vec<Value> },
    Other(Value),
}

impl<T: DeserializeOwned> ListPayload<T> {
    pub fn decode(value: Value) -> Self {
        // `Shape::Other` accepts any JSON value, so this cannot fail in practice.
        match serde_json::from_value(value).unwrap_or(Shape::Other(Value::Null)) {
            Shape::Sequence(items) => ListPayload::Sequence(decode_items(items)),
            Shape::Envelope { results } => ListPayload::Envelope {
                results: decode_items(results),
            },
            Shape::Other(value) => ListPayload::Other(value),
        }
    }
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>) -> Vec<T> {
    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Dropping list item {}: {}", index, e);
                None
            }
        })
        .collect();
    if decoded.len() < total {
        warn!("Kept {} of {} list items", decoded.len(), total);
    }
    decoded
}

impl<T> ListPayload<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListPayload::Sequence(items) => items,
            ListPayload::Envelope { results } => results,
            ListPayload::Other(value) => {
                warn!(
                    "Unrecognised list payload ({}), using empty list",
                    shape_of(&value)
                );
                Vec::new()
            }
        }
    }
}

impl<T> From<Vec<T>> for ListPayload<T> {
    fn from(items: Vec<T>) -> Self {
        ListPayload::Sequence(items)
    }
}

fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Item {
        id: i64,
    }

    fn ids(payload: ListPayload<Item>) -> Vec<i64> {
        payload.into_items().into_iter().map(|i| i.id).collect()
    }

    #[test]
    fn test_sequence_keeps_order() {
        let payload = ListPayload::<Item>::decode(json!([{"id": 3}, {"id": 1}, {"id": 2}]));
        assert!(matches!(payload, ListPayload::Sequence(_)));
        assert_eq!(ids(payload), vec![3, 1, 2]);
    }

    #[test]
    fn test_envelope_yields_results() {
        let payload = ListPayload::<Item>::decode(json!({
            "count": 2,
            "next": null,
            "results": [{"id": 9}, {"id": 4}]
        }));
        assert!(matches!(payload, ListPayload::Envelope { .. }));
        assert_eq!(ids(payload), vec![9, 4]);
    }

    #[test]
    fn test_unrecognised_shapes_are_empty() {
        for value in [
            json!(null),
            json!({}),
            json!({"detail": "ok"}),
            json!(42),
            json!("chats"),
            json!({"results": "nope"}),
        ] {
            assert_eq!(ids(ListPayload::decode(value)), Vec::<i64>::new());
        }
    }

    #[test]
    fn test_bad_items_are_dropped_individually() {
        let payload = ListPayload::<Item>::decode(json!({
            "results": [{"id": 1}, {"name": "missing id"}, {"id": 2}]
        }));
        assert_eq!(ids(payload), vec![1, 2]);

        let payload = ListPayload::<Item>::decode(json!([{"name": "missing id"}]));
        assert!(matches!(payload, ListPayload::Sequence(_)));
        assert_eq!(ids(payload), Vec::<i64>::new());
    }

    #[test]
    fn test_conversation_envelope_without_timestamps() {
        use crate::models::Conversation;

        let chats = ListPayload::<Conversation>::decode(json!({
            "results": [{"id": 1, "title": "", "messages": []}]
        }))
        .into_items();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].id, 1);
        assert!(chats[0].messages.is_empty());
    }
}
