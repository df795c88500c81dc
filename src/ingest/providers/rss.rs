// src/ingest/providers/rss.rs
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use metrics::counter;
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::article::Article;
use crate::error::{FetchError, ParseError};
use crate::ingest::types::{FetchOutcome, SourceAdapter};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    guid: Option<Guid>,
}
#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text", default)]
    value: String,
}

/// RFC 2822 first (the RSS norm), RFC 3339 for feeds that ignore it.
fn parse_pub_date(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if let Ok(odt) = OffsetDateTime::parse(ts, &Rfc2822) {
        return Utc
            .timestamp_opt(odt.unix_timestamp(), odt.nanosecond())
            .single();
    }
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// RSS 2.0 feed source.
pub struct RssAdapter {
    id: String,
    url: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http(Client),
}

impl RssAdapter {
    pub fn from_url(id: &str, url: &str, client: Client) -> Self {
        Self {
            id: id.to_string(),
            url: url.to_string(),
            mode: Mode::Http(client),
        }
    }

    /// Serve a fixed document instead of fetching `feed_url`.
    pub fn from_fixture_str(id: &str, feed_url: &str, xml: &str) -> Self {
        Self {
            id: id.to_string(),
            url: feed_url.to_string(),
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    fn parse_items(&self, xml: &str) -> FetchOutcome {
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean).map_err(|e| FetchError::Parse {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;

        let out: Vec<Result<Article, ParseError>> = rss
            .channel
            .item
            .into_iter()
            .map(|it| self.to_article(it))
            .collect();

        counter!("monitor_articles_fetched_total", "source" => self.id.clone())
            .increment(out.iter().filter(|r| r.is_ok()).count() as u64);
        Ok(out)
    }

    /// Items without a link fall back to the feed URL (marked shared) and keep
    /// their guid as item id.
    fn to_article(&self, it: Item) -> Result<Article, ParseError> {
        let title = it
            .title
            .as_deref()
            .map(crate::normalize::strip_markup)
            .unwrap_or_default();
        if title.is_empty() {
            return Err(ParseError::new(&self.id, "rss item without title"));
        }

        let link = it
            .link
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty());
        let mut article = Article::new(
            &self.id,
            title,
            link.unwrap_or(&self.url),
            it.description.unwrap_or_default(),
        );
        if link.is_none() {
            article = article.with_shared_url();
            if let Some(g) = it.guid.map(|g| g.value.trim().to_string()) {
                if !g.is_empty() {
                    article = article.with_item_id(g);
                }
            }
        }
        if let Some(ts) = it.pub_date.as_deref().and_then(parse_pub_date) {
            article = article.with_published_at(ts);
        }
        Ok(article)
    }
}

#[async_trait]
impl SourceAdapter for RssAdapter {
    async fn fetch(&self) -> FetchOutcome {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items(s),
            Mode::Http(client) => {
                let body = crate::ingest::get_text(client, &self.url).await?;
                self.parse_items(&body)
            }
        }
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// HTML entities that are invalid in XML but common in feeds.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&middot;", "·")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pub_date_formats() {
        let a = parse_pub_date("Tue, 01 Sep 2026 09:30:00 +0900").unwrap();
        assert_eq!(a.to_rfc3339(), "2026-09-01T00:30:00+00:00");
        let b = parse_pub_date("2026-09-01T00:30:00Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_pub_date("어제").is_none());
    }

    #[tokio::test]
    async fn missing_link_uses_feed_url_and_guid() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
<title>입학처</title>
<link>https://univ.example/notice</link>
<item>
  <title>수시 모집 요강</title>
  <guid isPermaLink="false">notice-77</guid>
  <description>요강 안내&nbsp;입니다</description>
</item>
<item>
  <description>제목 없는 항목</description>
</item>
</channel></rss>"#;
        let out = RssAdapter::from_fixture_str("univ", "https://univ.example/rss", xml)
            .fetch()
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        let first = out[0].as_ref().unwrap();
        assert_eq!(first.url, "https://univ.example/rss");
        assert_eq!(first.item_id.as_deref(), Some("notice-77"));
        assert!(first.url_is_shared);
        assert_eq!(first.raw_content, "요강 안내 입니다");
        assert!(out[1].is_err());
    }

    #[tokio::test]
    async fn broken_feed_is_a_fetch_error() {
        let err = RssAdapter::from_fixture_str("x", "https://x/rss", "<rss><channel><item>")
            .fetch()
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
    }
}
