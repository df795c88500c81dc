// src/normalize.rs
//! Content normalization: raw markup in, a short plain-text snippet out.
//!
//! Strategies run in a fixed order and the first one producing at least
//! `min_length` characters wins:
//!   1) hidden form field carrying an HTML-encoded body
//!   2) visible content container
//!   3) page metadata (og:title / og:description / description / <title>)
//!   4) the raw content itself, treated as an adapter-supplied preview
//!
//! Lengths are counted in chars, never bytes.

use anyhow::{anyhow, Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::config::NormalizerConfig;

/// Upper bound on repeated entity decoding (double/triple encoded bodies).
const MAX_DECODE_PASSES: usize = 3;

/// Elements whose text is never visible.
const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    HiddenField,
    Container,
    Metadata,
    PassThrough,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// Empty when no strategy produced enough text.
    pub text: String,
    pub method: Option<ExtractionMethod>,
}

impl Normalized {
    pub fn is_low_quality(&self) -> bool {
        self.text.is_empty()
    }
}

pub struct ContentNormalizer {
    min_length: usize,
    max_length: usize,
    hidden_fields: Vec<Selector>,
    containers: Vec<Selector>,
    placeholder_titles: Vec<String>,
    boilerplate: Vec<Regex>,
}

impl ContentNormalizer {
    pub fn from_config(cfg: &NormalizerConfig) -> Result<Self> {
        let mut boilerplate = builtin_boilerplate()?;
        for p in &cfg.boilerplate_patterns {
            boilerplate
                .push(Regex::new(p).with_context(|| format!("boilerplate pattern {p:?}"))?);
        }
        Ok(Self {
            min_length: cfg.min_length,
            max_length: cfg.max_length,
            hidden_fields: compile_selectors(&cfg.hidden_field_selectors)?,
            containers: compile_selectors(&cfg.container_selectors)?,
            placeholder_titles: cfg.placeholder_titles.clone(),
            boilerplate,
        })
    }

    /// Run the fallback chain over `raw`.
    pub fn normalize(&self, raw: &str) -> Normalized {
        if raw.trim().is_empty() {
            return Normalized {
                text: String::new(),
                method: None,
            };
        }

        let doc = Html::parse_document(raw);
        if let Some(text) = self.from_hidden_field(&doc) {
            return self.finish(text, ExtractionMethod::HiddenField);
        }
        if let Some(text) = self.from_container(&doc) {
            return self.finish(text, ExtractionMethod::Container);
        }
        if let Some(text) = self.from_metadata(&doc) {
            return self.finish(text, ExtractionMethod::Metadata);
        }

        let passthrough = self.clean(&strip_markup(raw));
        if self.long_enough(&passthrough) {
            return self.finish(passthrough, ExtractionMethod::PassThrough);
        }

        Normalized {
            text: String::new(),
            method: None,
        }
    }

    fn finish(&self, text: String, method: ExtractionMethod) -> Normalized {
        Normalized {
            text: cap_chars(&text, self.max_length),
            method: Some(method),
        }
    }

    fn long_enough(&self, s: &str) -> bool {
        !s.is_empty() && s.chars().count() >= self.min_length
    }

    fn from_hidden_field(&self, doc: &Html) -> Option<String> {
        for sel in &self.hidden_fields {
            for el in doc.select(sel) {
                let Some(value) = el.value().attr("value") else {
                    continue;
                };
                let decoded = decode_entities_repeatedly(value);
                let fragment = Html::parse_fragment(&decoded);
                let text = self.clean(&visible_text(fragment.root_element()));
                if self.long_enough(&text) {
                    return Some(text);
                }
            }
        }
        None
    }

    fn from_container(&self, doc: &Html) -> Option<String> {
        for sel in &self.containers {
            if let Some(el) = doc.select(sel).next() {
                let text = self.clean(&visible_text(el));
                if self.long_enough(&text) {
                    return Some(text);
                }
            }
        }
        None
    }

    fn from_metadata(&self, doc: &Html) -> Option<String> {
        static META: OnceCell<[Selector; 4]> = OnceCell::new();
        let sels = META.get_or_init(|| {
            [
                parse_static_selector(r#"meta[property="og:title"]"#),
                parse_static_selector(r#"meta[property="og:description"]"#),
                parse_static_selector(r#"meta[name="description"]"#),
                parse_static_selector("title"),
            ]
        });

        let mut parts: Vec<String> = Vec::new();
        for (i, sel) in sels.iter().enumerate() {
            let Some(el) = doc.select(sel).next() else {
                continue;
            };
            let raw = if i == 3 {
                el.text().collect::<String>()
            } else {
                el.value().attr("content").unwrap_or_default().to_string()
            };
            let part = collapse_whitespace(&html_escape::decode_html_entities(&raw));
            if part.is_empty() || self.is_placeholder(&part) || parts.contains(&part) {
                continue;
            }
            parts.push(part);
        }

        let text = self.clean(&parts.join(" "));
        self.long_enough(&text).then_some(text)
    }

    fn is_placeholder(&self, s: &str) -> bool {
        self.placeholder_titles
            .iter()
            .any(|p| p.trim().eq_ignore_ascii_case(s.trim()))
    }

    /// Remove boilerplate and collapse whitespace.
    fn clean(&self, s: &str) -> String {
        let mut out = collapse_whitespace(s);
        for re in &self.boilerplate {
            out = re.replace_all(&out, "").to_string();
        }
        collapse_whitespace(&out)
    }
}

impl Default for ContentNormalizer {
    fn default() -> Self {
        Self::from_config(&NormalizerConfig::default()).expect("default normalizer config")
    }
}

fn compile_selectors(list: &[String]) -> Result<Vec<Selector>> {
    list.iter()
        .map(|s| Selector::parse(s).map_err(|e| anyhow!("invalid selector {s:?}: {e}")))
        .collect()
}

/// Only for selectors written in this file or its defaults.
fn parse_static_selector(s: &str) -> Selector {
    Selector::parse(s).expect("built-in selector")
}

fn builtin_boilerplate() -> Result<Vec<Regex>> {
    const PATTERNS: &[&str] = &[
        // [매체명=홍길동 기자] / [홍길동 기자]
        r"^\s*\[[^\]]{1,40}기자\]\s*",
        // (서울=연합뉴스)
        r"^\s*\([^()=]{1,20}=[^()]{1,20}\)\s*",
        // trailing reporter byline with e-mail
        r"\s*[\p{Hangul}]{2,4}\s*기자\s*[\w.+-]+@[\w.-]+\s*$",
        r"(?i)\s*(?:read more|continue reading|더보기|자세히\s*보기)\s*(?:»|›|>|\.{3}|…)?\s*$",
        r"(?is)\s*The post .{0,300}? appeared first on .{0,200}$",
    ];
    PATTERNS
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("built-in pattern {p:?}")))
        .collect()
}

/// Text of `root`, skipping script/style and similar.
pub fn visible_text(root: ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| INVISIBLE_TAGS.contains(&e.name()))
        });
        if !hidden {
            parts.push(text);
        }
    }
    collapse_whitespace(&parts.join(" "))
}

/// Decode HTML entities until the string stops changing (bounded).
pub fn decode_entities_repeatedly(s: &str) -> String {
    let mut cur = s.to_string();
    for _ in 0..MAX_DECODE_PASSES {
        let next = html_escape::decode_html_entities(&cur).to_string();
        if next == cur {
            break;
        }
        cur = next;
    }
    cur
}

/// Regex tag strip for previews that may or may not be markup.
pub fn strip_markup(s: &str) -> String {
    static RE_BLOCKS: OnceCell<Regex> = OnceCell::new();
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_blocks = RE_BLOCKS.get_or_init(|| {
        Regex::new(r"(?is)<(script|style|noscript)\b[^>]*>.*?</(script|style|noscript)>").unwrap()
    });
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[a-z!][^>]*>").unwrap());

    let decoded = decode_entities_repeatedly(s);
    let no_blocks = re_blocks.replace_all(&decoded, " ");
    let no_tags = re_tags.replace_all(&no_blocks, " ");
    collapse_whitespace(&no_tags)
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max` chars. When something was cut the result ends
/// in "..." and the marker counts toward `max`.
pub fn cap_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= MARKER.len() {
        return s.chars().take(max).collect();
    }
    let mut out: String = s.chars().take(max - MARKER.len()).collect();
    out.truncate(out.trim_end().len());
    out.push_str(MARKER);
    out
}

const MARKER: &str = "...";

#[cfg(test)]
mod tests {
    use super::*;

    fn norm() -> ContentNormalizer {
        ContentNormalizer::default()
    }

    const LONG_KO: &str = "2026학년도 음악대학 신입생 모집 요강을 안내합니다. 실기고사 일정과 제출 서류를 반드시 확인하시기 바랍니다.";

    #[test]
    fn hidden_field_wins_over_container() {
        let encoded = html_escape::encode_text(&format!("<p>{LONG_KO}</p>")).to_string();
        let html = format!(
            r#"<html><body>
<input type="hidden" id="lnaCn1" value="{encoded}">
<div class="board-view">컨테이너 본문은 여기에 있습니다. 이것은 충분히 길어야 하는 두 번째 후보 텍스트입니다.</div>
</body></html>"#
        );
        let out = norm().normalize(&html);
        assert_eq!(out.method, Some(ExtractionMethod::HiddenField));
        assert_eq!(out.text, LONG_KO);
    }

    #[test]
    fn double_encoded_hidden_field_is_decoded() {
        let once = html_escape::encode_text(&format!("<b>{LONG_KO}</b>")).to_string();
        let twice = html_escape::encode_text(&once).to_string();
        let html = format!(r#"<input id="lnaCn1" value="{twice}">"#);
        let out = norm().normalize(&html);
        assert_eq!(out.method, Some(ExtractionMethod::HiddenField));
        assert!(!out.text.contains('<'));
        assert!(!out.text.contains("&lt;"));
        assert!(out.text.contains("음악대학"));
    }

    #[test]
    fn short_hidden_field_falls_through_to_container() {
        let html = format!(
            r#"<input id="lnaCn1" value="짧음"><div class="board-view"><script>var x = 1;</script>{LONG_KO}</div>"#
        );
        let out = norm().normalize(&html);
        assert_eq!(out.method, Some(ExtractionMethod::Container));
        assert_eq!(out.text, LONG_KO);
    }

    #[test]
    fn metadata_skips_placeholder_title() {
        let html = r#"<html><head>
<title>제목 없음</title>
<meta property="og:title" content="2026 수시모집 안내">
<meta property="og:description" content="국어국문학과 및 영어영문학과 신입생 수시모집 일정을 안내드립니다. 원서접수 기간을 확인하세요.">
</head><body></body></html>"#;
        let out = norm().normalize(html);
        assert_eq!(out.method, Some(ExtractionMethod::Metadata));
        assert!(out.text.starts_with("2026 수시모집 안내 국어국문학과"));
        assert!(!out.text.contains("제목 없음"));
    }

    #[test]
    fn passthrough_strips_tags_and_boilerplate() {
        let raw = format!("[대학신문=홍길동 기자] <p>{LONG_KO}</p> 더보기");
        let out = norm().normalize(&raw);
        assert_eq!(out.method, Some(ExtractionMethod::PassThrough));
        assert_eq!(out.text, LONG_KO);
    }

    #[test]
    fn too_short_everywhere_is_low_quality() {
        let out = norm().normalize("<p>공지</p>");
        assert!(out.is_low_quality());
        assert_eq!(out.method, None);
        assert!(norm().normalize("").is_low_quality());
    }

    #[test]
    fn output_is_capped_in_chars_with_marker() {
        let body = "가".repeat(1500);
        let out = norm().normalize(&body);
        assert_eq!(out.text.chars().count(), 1000);
        assert!(out.text.ends_with("..."));
        assert!(out.text.starts_with(&"가".repeat(997)));
    }

    #[test]
    fn cap_never_exceeds_budget() {
        assert_eq!(cap_chars("abcdef", 6), "abcdef");
        assert_eq!(cap_chars("abcdefg", 6), "abc...");
        assert_eq!(cap_chars("가나다라마바사", 5), "가나...");
        assert_eq!(cap_chars("abcdef", 2), "ab");
    }

    #[test]
    fn min_length_counts_chars_not_bytes() {
        // 20 Hangul chars = 60 bytes, still below a 50-char minimum.
        let out = norm().normalize(&"한".repeat(20));
        assert!(out.is_low_quality());
    }

    #[test]
    fn invalid_selector_is_a_config_error() {
        let cfg = NormalizerConfig {
            container_selectors: vec!["div[".to_string()],
            ..NormalizerConfig::default()
        };
        assert!(ContentNormalizer::from_config(&cfg).is_err());
    }
}
