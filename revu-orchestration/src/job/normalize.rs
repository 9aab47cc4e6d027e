//! Normalisation of raw review items
//!
//! Scraping actors disagree on field names, nest reviews under `review`,
//! `details` or `data`, and sometimes return one item per product carrying a
//! `reviews` array. Everything is reduced to [`ReviewRecord`].

use once_cell::sync::Lazy;
use regex::Regex;
use revu_interfaces::ReviewRecord;
use serde_json::{Map, Value as JsonValue};

const TEXT_KEYS: &[&str] = &[
    "text",
    "body",
    "reviewText",
    "reviewDescription",
    "description",
    "content",
    "review",
    "comment",
    "comments",
    "reviewContent",
    "message",
];

const NESTED_TEXT_KEYS: &[&str] = &["text", "body", "content", "reviewText", "description", "message"];

const RATING_KEYS: &[&str] = &["stars", "rating", "score", "reviewScore", "reviewRating", "star"];

const DATE_KEYS: &[&str] = &["date", "reviewDate", "timestamp", "dateString", "reviewedDate", "review_date"];

const CONTAINER_KEYS: &[&str] = &["review", "details", "data"];

static NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:[.,]\d+)?)").expect("number pattern is valid"));

/// Replace items that carry a `reviews` array with the reviews themselves
pub fn flatten_items(items: Vec<JsonValue>) -> Vec<JsonValue> {
    let mut flat = Vec::with_capacity(items.len());
    for item in items {
        match item {
            JsonValue::Object(mut map) if map.get("reviews").is_some_and(JsonValue::is_array) => {
                if let Some(JsonValue::Array(reviews)) = map.remove("reviews") {
                    flat.extend(reviews);
                }
            }
            other => flat.push(other),
        }
    }
    flat
}

/// Reduce one raw item to a review record. Non-object items become empty records.
pub fn normalize_review(item: &JsonValue) -> ReviewRecord {
    let Some(map) = item.as_object() else {
        return ReviewRecord {
            review_text: String::new(),
            rating: None,
            review_date: None,
        };
    };

    ReviewRecord {
        review_text: extract_text(map),
        rating: extract_rating(map),
        review_date: extract_date(map),
    }
}

/// First `max_words` whitespace-separated words of `name`
pub fn truncate_words(name: &str, max_words: usize) -> String {
    name.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

fn nested(map: &Map<String, JsonValue>) -> Option<&Map<String, JsonValue>> {
    CONTAINER_KEYS
        .iter()
        .filter_map(|key| map.get(*key))
        .find(|v| !is_falsy(v))
        .and_then(JsonValue::as_object)
}

fn first_text(map: &Map<String, JsonValue>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key).and_then(JsonValue::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn extract_text(map: &Map<String, JsonValue>) -> String {
    first_text(map, TEXT_KEYS)
        .or_else(|| nested(map).and_then(|inner| first_text(inner, NESTED_TEXT_KEYS)))
        .or_else(|| first_text(map, &["title"]))
        .unwrap_or_default()
}

fn extract_rating(map: &Map<String, JsonValue>) -> Option<f64> {
    let candidate = RATING_KEYS
        .iter()
        .filter_map(|key| map.get(*key))
        .find(|v| !is_falsy(v));

    match candidate {
        Some(JsonValue::Number(n)) => n.as_f64(),
        Some(JsonValue::String(s)) => NUMBER_PATTERN
            .captures(s)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().replace(',', ".").parse().ok()),
        _ => nested(map).and_then(extract_rating),
    }
}

fn extract_date(map: &Map<String, JsonValue>) -> Option<String> {
    let date_of = |m: &Map<String, JsonValue>| {
        DATE_KEYS
            .iter()
            .filter_map(|key| m.get(*key))
            .find(|v| !is_falsy(v))
            .map(|v| match v {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            })
    };
    date_of(map).or_else(|| nested(map).and_then(date_of))
}

/// Null, false, zero, and empty strings or containers count as absent
fn is_falsy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Bool(b) => !b,
        JsonValue::Number(n) => n.as_f64() == Some(0.0),
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(a) => a.is_empty(),
        JsonValue::Object(o) => o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_review_arrays() {
        let items = vec![
            json!({"asin": "B1", "reviews": [{"text": "a"}, {"text": "b"}]}),
            json!({"text": "c"}),
        ];
        let flat = flatten_items(items);
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[2]["text"], "c");
    }

    #[test]
    fn test_normalize_common_shape() {
        let record = normalize_review(&json!({
            "reviewText": "  Works great  ",
            "stars": 4,
            "date": "2024-01-02"
        }));
        assert_eq!(record.review_text, "Works great");
        assert_eq!(record.rating, Some(4.0));
        assert_eq!(record.review_date.as_deref(), Some("2024-01-02"));
    }

    #[test]
    fn test_rating_from_text() {
        let record = normalize_review(&json!({"body": "ok", "rating": "4,5 out of 5 stars"}));
        assert_eq!(record.rating, Some(4.5));
    }

    #[test]
    fn test_nested_containers_and_title_fallback() {
        let record = normalize_review(&json!({
            "details": {"content": "from details", "score": 3, "timestamp": 1700000000}
        }));
        assert_eq!(record.review_text, "from details");
        assert_eq!(record.rating, Some(3.0));
        assert_eq!(record.review_date.as_deref(), Some("1700000000"));

        let record = normalize_review(&json!({"title": "Only a title"}));
        assert_eq!(record.review_text, "Only a title");
        assert_eq!(record.rating, None);
    }

    #[test]
    fn test_non_object_item() {
        let record = normalize_review(&json!("just text"));
        assert!(record.review_text.is_empty());
    }

    #[test]
    fn test_truncate_words() {
        assert_eq!(truncate_words("One Two Three Four Five Six", 5), "One Two Three Four Five");
        assert_eq!(truncate_words("Short name", 5), "Short name");
    }
}
