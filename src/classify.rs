// src/classify.rs
//! Keyword-ratio classifier.
//!
//! confidence = matched keywords / total keywords, matched by lower-cased
//! substring containment over `title + " " + content`. A category qualifies
//! when its confidence reaches its threshold; the winner is the highest
//! confidence, then the lowest priority number, then the smallest id.

use anyhow::{Context, Result};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use std::time::SystemTime;

use crate::article::GENERAL_CATEGORY;
use crate::config::AppConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryConfig {
    pub id: String,
    pub display_name: String,
    /// Lower-cased, de-duplicated, in configuration order.
    pub keywords: Vec<String>,
    pub confidence_threshold: f64,
    pub priority: i32,
    pub enabled: bool,
    pub emoji: String,
}

impl CategoryConfig {
    pub fn new(id: impl Into<String>, keywords: &[&str], threshold: f64, priority: i32) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            keywords: clean_keywords(keywords.iter().map(|k| k.to_string())),
            confidence_threshold: threshold,
            priority,
            enabled: true,
            emoji: "🎓".to_string(),
        }
    }

    /// Share of this category's keywords found in the (lower-cased) haystack.
    pub fn confidence(&self, haystack_lower: &str) -> f64 {
        if self.keywords.is_empty() {
            return 0.0;
        }
        let matches = self
            .keywords
            .iter()
            .filter(|k| haystack_lower.contains(k.as_str()))
            .count();
        matches as f64 / self.keywords.len() as f64
    }
}

fn clean_keywords(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub category: String,
    pub confidence: f64,
}

impl Classification {
    pub fn general() -> Self {
        Self {
            category: GENERAL_CATEGORY.to_string(),
            confidence: 0.0,
        }
    }
}

/// Immutable set of categories; swapped as a whole on reload.
#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    categories: Vec<CategoryConfig>,
}

impl CategoryTable {
    pub fn new(mut categories: Vec<CategoryConfig>) -> Self {
        for c in &mut categories {
            c.keywords = clean_keywords(std::mem::take(&mut c.keywords));
        }
        categories.sort_by(|a, b| a.id.cmp(&b.id));
        Self { categories }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        let global = cfg.classifier.min_confidence;
        let categories = cfg
            .categories
            .iter()
            .map(|(id, c)| CategoryConfig {
                id: id.clone(),
                display_name: c.display_name.clone().unwrap_or_else(|| id.clone()),
                keywords: c.keywords.clone(),
                confidence_threshold: c.confidence_threshold.unwrap_or(global),
                priority: c.priority,
                enabled: c.enabled,
                emoji: c.emoji.clone(),
            })
            .collect();
        Self::new(categories)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(Self::from_config(&AppConfig::from_toml_str(s)?))
    }

    pub fn get(&self, id: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryConfig> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Pure and deterministic; never fails.
    pub fn classify(&self, title: &str, content: &str) -> Classification {
        let haystack = format!("{title} {content}").to_lowercase();

        let mut best: Option<(&CategoryConfig, f64)> = None;
        for cat in self.categories.iter().filter(|c| c.enabled) {
            let confidence = cat.confidence(&haystack);
            // A category with zero matches never qualifies, even at threshold 0.
            if confidence <= 0.0 || confidence < cat.confidence_threshold {
                continue;
            }
            best = match best {
                Some((b, bc)) if !outranks(cat, confidence, b, bc) => Some((b, bc)),
                _ => Some((cat, confidence)),
            };
        }

        match best {
            Some((cat, confidence)) => {
                tracing::debug!(
                    category = %cat.id,
                    confidence = %format!("{confidence:.3}"),
                    "classified"
                );
                Classification {
                    category: cat.id.clone(),
                    confidence,
                }
            }
            None => Classification::general(),
        }
    }
}

fn outranks(a: &CategoryConfig, ac: f64, b: &CategoryConfig, bc: f64) -> bool {
    match ac.total_cmp(&bc) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => (a.priority, &a.id) < (b.priority, &b.id),
    }
}

/// Shared, swappable category table.
///
/// A run calls [`ClassifierHandle::snapshot`] once and classifies every
/// article against that snapshot, so a concurrent reload never mixes tables
/// within one run.
#[derive(Clone)]
pub struct ClassifierHandle {
    inner: Arc<RwLock<Arc<CategoryTable>>>,
    last_mtime: Arc<Mutex<Option<SystemTime>>>,
}

impl ClassifierHandle {
    pub fn new(table: CategoryTable) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(table))),
            last_mtime: Arc::new(Mutex::new(None)),
        }
    }

    pub fn snapshot(&self) -> Arc<CategoryTable> {
        // The guarded value is a single Arc; a poisoned lock still holds a whole table.
        match self.inner.read() {
            Ok(g) => Arc::clone(&g),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn replace(&self, table: CategoryTable) {
        let table = Arc::new(table);
        match self.inner.write() {
            Ok(mut g) => *g = table,
            Err(poisoned) => *poisoned.into_inner() = table,
        }
    }

    /// Re-read categories from `path`. On any error the current table stays.
    pub fn reload_from_file(&self, path: &Path) -> Result<usize> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading categories from {}", path.display()))?;
        let table = CategoryTable::from_toml_str(&content)
            .with_context(|| format!("parsing categories from {}", path.display()))?;
        let n = table.len();
        self.replace(table);
        if let Ok(m) = fs::metadata(path).and_then(|m| m.modified()) {
            self.remember_mtime(Some(m));
        }
        tracing::info!(path = %path.display(), categories = n, "category table reloaded");
        Ok(n)
    }

    /// Record the current mtime of `path` without reloading.
    pub fn track(&self, path: &Path) {
        self.remember_mtime(fs::metadata(path).and_then(|m| m.modified()).ok());
    }

    /// Reload only when the file's mtime moved since the last load/track.
    pub fn reload_if_changed(&self, path: &Path) -> Result<bool> {
        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .with_context(|| format!("stat {}", path.display()))?;
        let last = match self.last_mtime.lock() {
            Ok(g) => *g,
            Err(poisoned) => *poisoned.into_inner(),
        };
        if last == Some(modified) {
            return Ok(false);
        }
        self.reload_from_file(path)?;
        Ok(true)
    }

    fn remember_mtime(&self, m: Option<SystemTime>) {
        match self.last_mtime.lock() {
            Ok(mut g) => *g = m,
            Err(poisoned) => *poisoned.into_inner() = m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CategoryTable {
        CategoryTable::new(vec![
            CategoryConfig::new("music", &["음악", "실용음악", "작곡", "성악"], 0.10, 1),
            CategoryConfig::new("korean", &["국어", "국문", "문예창작"], 0.10, 2),
            CategoryConfig::new("english", &["영어", "영문", "English"], 0.10, 3),
        ])
    }

    #[test]
    fn ratio_confidence() {
        let c = table().classify("실용음악과 작곡 전공 모집", "");
        assert_eq!(c.category, "music");
        // 음악, 실용음악, 작곡 = 3 of 4
        assert!((c.confidence - 0.75).abs() < 1e-9);
    }

    #[test]
    fn no_match_is_general_zero() {
        let c = table().classify("기숙사 안내", "식당 운영 시간 변경");
        assert_eq!(c, Classification::general());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let c = table().classify("ENGLISH literature", "");
        assert_eq!(c.category, "english");
    }

    #[test]
    fn tie_goes_to_lower_priority_number() {
        let t = CategoryTable::new(vec![
            CategoryConfig::new("a", &["x", "y"], 0.1, 5),
            CategoryConfig::new("b", &["x", "z"], 0.1, 1),
        ]);
        let c = t.classify("x", "");
        assert_eq!(c.category, "b");
        assert!((c.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn full_tie_goes_to_smallest_id() {
        let t = CategoryTable::new(vec![
            CategoryConfig::new("zeta", &["x"], 0.1, 1),
            CategoryConfig::new("alpha", &["x"], 0.1, 1),
        ]);
        assert_eq!(t.classify("x", "").category, "alpha");
    }

    #[test]
    fn below_threshold_does_not_qualify() {
        let t = CategoryTable::new(vec![CategoryConfig::new("m", &["a", "b", "c", "d"], 0.5, 1)]);
        assert_eq!(t.classify("a only", "").category, "general");
        assert_eq!(t.classify("a and b", "").category, "m");
    }

    #[test]
    fn empty_keywords_and_disabled_never_qualify() {
        let mut disabled = CategoryConfig::new("off", &["음악"], 0.0, 0);
        disabled.enabled = false;
        let t = CategoryTable::new(vec![
            CategoryConfig::new("empty", &[], 0.0, 0),
            disabled,
        ]);
        assert_eq!(t.classify("음악", "").category, "general");
    }

    #[test]
    fn keywords_are_deduplicated_case_insensitively() {
        let t = CategoryTable::new(vec![CategoryConfig::new("e", &["Eng", "eng", " ENG "], 0.1, 1)]);
        assert_eq!(t.get("e").unwrap().keywords, vec!["eng".to_string()]);
        assert_eq!(t.classify("eng", "").confidence, 1.0);
    }

    #[test]
    fn classify_is_deterministic() {
        let t = table();
        let a = t.classify("국어국문학과 영어영문학과 공동 모집", "문예창작");
        for _ in 0..10 {
            assert_eq!(t.classify("국어국문학과 영어영문학과 공동 모집", "문예창작"), a);
        }
        assert!((0.0..=1.0).contains(&a.confidence));
    }

    #[test]
    fn handle_snapshot_is_unaffected_by_replace() {
        let h = ClassifierHandle::new(table());
        let snap = h.snapshot();
        h.replace(CategoryTable::default());
        assert_eq!(snap.len(), 3);
        assert!(h.snapshot().is_empty());
    }

    #[test]
    fn failed_reload_keeps_previous_table() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("monitor.toml");
        std::fs::write(&p, "[categories.music]\nkeywords = [\"음악\"]\n").unwrap();

        let h = ClassifierHandle::new(CategoryTable::default());
        assert_eq!(h.reload_from_file(&p).unwrap(), 1);

        std::fs::write(&p, "[categories.music\nkeywords = ").unwrap();
        assert!(h.reload_from_file(&p).is_err());
        assert!(h.snapshot().get("music").is_some());
    }

    #[test]
    fn reload_if_changed_skips_untouched_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("monitor.toml");
        std::fs::write(&p, "[categories.music]\nkeywords = [\"음악\"]\n").unwrap();

        let h = ClassifierHandle::new(CategoryTable::default());
        h.track(&p);
        assert!(!h.reload_if_changed(&p).unwrap());
        assert!(h.snapshot().is_empty());
    }
}
