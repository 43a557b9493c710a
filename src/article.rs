//! Article records shared between the batch embedder and the query path.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One article as stored on disk: title/content plus arbitrary metadata.
///
/// `embedding` is kept as a raw JSON value so a malformed persisted vector
/// survives parsing and gets rejected at the codec boundary instead of
/// failing the whole file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Article headline; `null` and missing are treated as empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Article body; `null` and missing are treated as empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Raw persisted embedding, if the batch job produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Value>,
    /// Any other fields (url, dates, ...) pass through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ArticleRecord {
    /// Title with missing/null collapsed to the empty string.
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    /// Content with missing/null collapsed to the empty string.
    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    /// Whether the record carries enough text to be worth embedding.
    pub fn is_embeddable(&self) -> bool {
        !self.title().trim().is_empty() || !self.content().trim().is_empty()
    }

    /// Text submitted to the embedding model: `title + ". " + content`.
    ///
    /// Returns `None` for records that fail [`is_embeddable`](Self::is_embeddable).
    pub fn embedding_text(&self) -> Option<String> {
        if !self.is_embeddable() {
            return None;
        }
        Some(format!("{}. {}", self.title(), self.content()))
    }

    /// Attaches a freshly computed vector in its persisted form.
    pub fn set_embedding(&mut self, vector: &[f32]) {
        self.embedding = Some(crate::codec::encode_embedding(vector));
    }

    /// Builds the transport representation: every field except `embedding`,
    /// plus the similarity score.
    pub fn to_hit(&self, similarity_score: f32) -> SearchHit {
        let mut fields = Map::new();
        if let Some(title) = &self.title {
            fields.insert("title".to_string(), Value::String(title.clone()));
        }
        if let Some(content) = &self.content {
            fields.insert("content".to_string(), Value::String(content.clone()));
        }
        for (key, value) in &self.extra {
            fields.insert(key.clone(), value.clone());
        }
        SearchHit {
            fields,
            similarity_score,
        }
    }
}

/// One ranked search result: article fields (embedding stripped) plus score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Original article fields minus `embedding`.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    /// Cosine similarity against the query, in `[-1, 1]`.
    pub similarity_score: f32,
}

impl SearchHit {
    /// Convenience accessor for console rendering.
    pub fn title(&self) -> Option<&str> {
        self.fields.get("title").and_then(Value::as_str)
    }

    /// Convenience accessor for console rendering.
    pub fn url(&self) -> Option<&str> {
        self.fields.get("url").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> ArticleRecord {
        serde_json::from_value(value).expect("parse record")
    }

    #[test]
    fn embeddable_requires_some_trimmed_text() {
        assert!(record(json!({"title": "Budget 2024", "content": ""})).is_embeddable());
        assert!(record(json!({"title": null, "content": "body"})).is_embeddable());
        assert!(!record(json!({"title": "   ", "content": "\n\t"})).is_embeddable());
        assert!(!record(json!({"url": "https://example.com/a"})).is_embeddable());
    }

    #[test]
    fn embedding_text_joins_title_and_content() {
        let rec = record(json!({"title": "Budget 2024", "content": "Tax changes ahead."}));
        assert_eq!(
            rec.embedding_text().expect("embeddable"),
            "Budget 2024. Tax changes ahead."
        );
        assert!(record(json!({"title": "", "content": ""}))
            .embedding_text()
            .is_none());
    }

    #[test]
    fn extra_fields_round_trip() {
        let rec = record(json!({
            "title": "A",
            "content": "B",
            "url": "https://example.com/a",
            "published": "2024-01-01"
        }));
        let back = serde_json::to_value(&rec).expect("serialize");
        assert_eq!(back["url"], "https://example.com/a");
        assert_eq!(back["published"], "2024-01-01");
        assert!(back.get("embedding").is_none());
    }

    #[test]
    fn hits_never_carry_the_embedding() {
        let mut rec = record(json!({"title": "A", "content": "B", "url": "u"}));
        rec.set_embedding(&[0.5, 0.5]);
        let hit = rec.to_hit(0.75);
        let value = serde_json::to_value(&hit).expect("serialize hit");
        assert!(value.get("embedding").is_none());
        assert_eq!(value["title"], "A");
        assert_eq!(value["url"], "u");
        assert!((value["similarity_score"].as_f64().expect("score") - 0.75).abs() < 1e-6);
    }
}
