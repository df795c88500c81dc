// src/article.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

use crate::normalize::ExtractionMethod;

/// Category assigned when nothing qualifies.
pub const GENERAL_CATEGORY: &str = "general";

/// Separator between fingerprint fields; never appears in titles or URLs.
const FIELD_SEP: char = '\u{1f}';

/// A candidate announcement as produced by a source adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub raw_content: String,
    pub url: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
    /// Source-specific item id, set when the URL alone does not identify the item.
    pub item_id: Option<String>,
    /// The URL is a list/feed address shared by several items.
    #[serde(default)]
    pub url_is_shared: bool,
}

impl Article {
    pub fn new(
        source: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        raw_content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            raw_content: raw_content.into(),
            url: url.into(),
            source: source.into(),
            published_at: None,
            item_id: None,
            url_is_shared: false,
        }
    }

    pub fn with_published_at(mut self, ts: DateTime<Utc>) -> Self {
        self.published_at = Some(ts);
        self
    }

    pub fn with_item_id(mut self, id: impl Into<String>) -> Self {
        self.item_id = Some(id.into());
        self
    }

    pub fn with_shared_url(mut self) -> Self {
        self.url_is_shared = true;
        self
    }

    /// Stable identity of this article across runs and restarts.
    ///
    /// Title + url, plus the item id when the source has one. A shared url
    /// without an item id says nothing about the item, so the raw content
    /// stands in for it.
    pub fn fingerprint(&self) -> String {
        match (&self.item_id, self.url_is_shared) {
            (Some(id), _) => fingerprint(&[&self.title, &self.url, id]),
            (None, true) => fingerprint(&[&self.title, "content", &collapse(&self.raw_content)]),
            (None, false) => fingerprint(&[&self.title, &self.url]),
        }
    }
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// SHA-256 hex over the trimmed fields, separated by U+001F.
pub fn fingerprint(fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, f) in fields.iter().enumerate() {
        if i > 0 {
            hasher.update(FIELD_SEP.to_string().as_bytes());
        }
        hasher.update(f.trim().as_bytes());
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// An article after normalization and classification. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedArticle {
    pub article: Article,
    pub normalized_content: String,
    pub extraction: Option<ExtractionMethod>,
    pub low_quality: bool,
    pub category: String,
    pub confidence: f64,
    pub fingerprint: String,
}

impl ProcessedArticle {
    pub fn is_general(&self) -> bool {
        self.category == GENERAL_CATEGORY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_hex() {
        let a = fingerprint(&["2026 수시 모집", "https://example.ac.kr/n/1"]);
        let b = fingerprint(&["2026 수시 모집", "https://example.ac.kr/n/1"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn fingerprint_differs_on_title_or_url() {
        let base = fingerprint(&["A", "https://x/1"]);
        assert_ne!(base, fingerprint(&["B", "https://x/1"]));
        assert_ne!(base, fingerprint(&["A", "https://x/2"]));
    }

    #[test]
    fn field_boundaries_do_not_collide() {
        assert_ne!(fingerprint(&["ab", "c"]), fingerprint(&["a", "bc"]));
    }

    #[test]
    fn item_id_separates_items_sharing_a_list_url() {
        let list = "https://board.example/list.do";
        let a = Article::new("board", "공지", list, "").with_item_id("101");
        let b = Article::new("board", "공지", list, "").with_item_id("102");
        assert_ne!(a.fingerprint(), b.fingerprint());
        let plain = Article::new("board", "공지", list, "");
        assert_ne!(a.fingerprint(), plain.fingerprint());
    }

    #[test]
    fn shared_url_without_id_uses_content() {
        let list = "https://board.example/list.do";
        let a = Article::new("board", "공지", list, "첫 번째  공지 본문").with_shared_url();
        let b = Article::new("board", "공지", list, "두 번째 공지 본문").with_shared_url();
        let a_again = Article::new("board", "공지", list, "첫 번째 공지 본문").with_shared_url();
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), a_again.fingerprint());
    }

    #[test]
    fn content_does_not_matter_for_distinct_urls() {
        let a = Article::new("s", "공지", "https://x/1", "v1");
        let b = Article::new("s", "공지", "https://x/1", "v2 edited");
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
