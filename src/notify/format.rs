// src/notify/format.rs
//! Renders a processed article into Telegram's HTML subset.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::OutgoingMessage;
use crate::article::ProcessedArticle;
use crate::classify::CategoryTable;
use crate::config::AppConfig;
use crate::deadline::{today_kst, Deadline, Urgency};
use crate::normalize::cap_chars;

/// Telegram rejects longer messages.
pub const MAX_MESSAGE_CHARS: usize = 4096;
const SNIPPET_CHARS: usize = 300;
const SHORT_TITLE_CHARS: usize = 200;
const MAX_HREF_CHARS: usize = 2000;
const DEFAULT_EMOJI: &str = "🎓";
const GENERAL_LABEL: &str = "일반";

pub struct MessageFormatter {
    source_names: HashMap<String, String>,
}

impl MessageFormatter {
    pub fn new(source_names: HashMap<String, String>) -> Self {
        Self { source_names }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.sources
                .iter()
                .map(|s| (s.id.clone(), s.display_name().to_string()))
                .collect(),
        )
    }

    pub fn format(&self, a: &ProcessedArticle, categories: &CategoryTable) -> OutgoingMessage {
        self.format_on(a, categories, today_kst())
    }

    /// Like [`format`](Self::format), with deadlines counted from `today`.
    pub fn format_on(
        &self,
        a: &ProcessedArticle,
        categories: &CategoryTable,
        today: NaiveDate,
    ) -> OutgoingMessage {
        let deadline = Deadline::find(&a.article.title, &a.normalized_content, today);
        let full = self.render(a, categories, deadline, false);
        let text = if full.chars().count() <= MAX_MESSAGE_CHARS {
            full
        } else {
            let compact = self.render(a, categories, deadline, true);
            cap_chars(&compact, MAX_MESSAGE_CHARS)
        };
        OutgoingMessage {
            text,
            title: a.article.title.clone(),
        }
    }

    fn render(
        &self,
        a: &ProcessedArticle,
        categories: &CategoryTable,
        deadline: Option<Deadline>,
        compact: bool,
    ) -> String {
        let cat = categories.get(&a.category);
        let emoji = cat.map(|c| c.emoji.as_str()).unwrap_or(DEFAULT_EMOJI);
        let label = match cat {
            Some(c) => c.display_name.as_str(),
            None if a.is_general() => GENERAL_LABEL,
            None => a.category.as_str(),
        };
        let source = self
            .source_names
            .get(&a.article.source)
            .map(String::as_str)
            .unwrap_or(&a.article.source);

        let title = if compact {
            cap_chars(&a.article.title, SHORT_TITLE_CHARS)
        } else {
            a.article.title.clone()
        };

        let mut out = String::new();
        out.push_str(&format!("{emoji} <b>새 입학 공고</b>\n\n"));
        out.push_str(&format!("📌 <b>{}</b>\n", esc(&title)));
        if a.is_general() {
            out.push_str(&format!("🏷 {}\n", esc(label)));
        } else {
            out.push_str(&format!(
                "🏷 {} ({:.0}%)\n",
                esc(label),
                a.confidence * 100.0
            ));
        }
        if let Some(line) = deadline.and_then(deadline_line) {
            out.push_str(&line);
        }
        if !compact && !a.low_quality {
            out.push_str(&format!(
                "\n📝 {}\n",
                esc(&cap_chars(&a.normalized_content, SNIPPET_CHARS))
            ));
        }

        let href = html_escape::encode_double_quoted_attribute(&a.article.url);
        if href.chars().count() <= MAX_HREF_CHARS {
            out.push_str(&format!("\n🔗 <a href=\"{href}\">원문 보기</a>\n"));
        }
        out.push_str(&format!("📰 {}\n", esc(source)));
        if let Some(ts) = a.article.published_at {
            out.push_str(&format!("🕒 {}\n", ts.format("%Y-%m-%d %H:%M UTC")));
        }

        let tag: String = label.chars().filter(|c| !c.is_whitespace()).collect();
        out.push_str(&format!("\n#대학입시 #{}", esc(&tag)));
        out
    }
}

fn deadline_line(d: Deadline) -> Option<String> {
    let date = d.date.format("%Y.%m.%d");
    match d.urgency {
        Urgency::Expired => None,
        Urgency::RecentPast => Some(format!("⏰ {} {date} (마감)\n", d.urgency.icon())),
        u => Some(format!("⏰ {} {date} ({}d)\n", u.icon(), d.days_left)),
    }
}

fn esc(s: &str) -> String {
    html_escape::encode_text(s).to_string()
}
