// src/ingest/providers/board.rs
//! HTML bulletin-board source.
//!
//! Items are located with CSS selectors from config. The item id usually
//! hides in a JavaScript handler (`onclick="fnDetailPopup('12345')"`), so an
//! optional regex pulls it out of the link attribute and a URL template turns
//! it into the detail page address.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use url::Url;

use crate::article::Article;
use crate::config::BoardConfig;
use crate::error::ParseError;
use crate::ingest::types::{FetchOutcome, SourceAdapter};
use crate::normalize::visible_text;

/// One list entry, before the (optional) detail fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ListEntry {
    title: String,
    url: String,
    item_id: Option<String>,
    preview: String,
    has_detail_page: bool,
}

enum Transport {
    Http(Client),
    /// List page plus detail pages keyed by URL.
    Fixture {
        list: String,
        details: HashMap<String, String>,
    },
}

pub struct BoardAdapter {
    id: String,
    list_url: Url,
    item: Selector,
    title: Selector,
    link: Option<Selector>,
    link_attr: String,
    preview: Option<Selector>,
    id_pattern: Option<Regex>,
    detail_url_template: Option<String>,
    fetch_detail: bool,
    max_items: Option<usize>,
    transport: Transport,
}

fn selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| anyhow!("invalid selector {s:?}: {e}"))
}

impl BoardAdapter {
    pub fn http(id: &str, list_url: &str, cfg: &BoardConfig, client: Client) -> Result<Self> {
        Self::build(id, list_url, cfg, Transport::Http(client))
    }

    pub fn from_fixture(
        id: &str,
        list_url: &str,
        cfg: &BoardConfig,
        list_html: &str,
        details: HashMap<String, String>,
    ) -> Result<Self> {
        Self::build(
            id,
            list_url,
            cfg,
            Transport::Fixture {
                list: list_html.to_string(),
                details,
            },
        )
    }

    fn build(id: &str, list_url: &str, cfg: &BoardConfig, transport: Transport) -> Result<Self> {
        let id_pattern = cfg
            .id_pattern
            .as_deref()
            .map(|p| Regex::new(p).with_context(|| format!("id_pattern {p:?}")))
            .transpose()?;
        if let Some(re) = &id_pattern {
            if re.captures_len() < 2 {
                return Err(anyhow!("id_pattern needs one capture group"));
            }
        }
        Ok(Self {
            id: id.to_string(),
            list_url: Url::parse(list_url).with_context(|| format!("list url {list_url:?}"))?,
            item: selector(&cfg.item_selector)?,
            title: selector(&cfg.title_selector)?,
            link: cfg.link_selector.as_deref().map(selector).transpose()?,
            link_attr: cfg.link_attr.clone(),
            preview: cfg.preview_selector.as_deref().map(selector).transpose()?,
            id_pattern,
            detail_url_template: cfg.detail_url_template.clone(),
            fetch_detail: cfg.fetch_detail,
            max_items: cfg.max_items,
            transport,
        })
    }

    /// Synchronous on purpose: `Html` is not `Send` and must not live across an await.
    fn parse_list(&self, html: &str) -> Vec<Result<ListEntry, ParseError>> {
        let doc = Html::parse_document(html);
        let limit = self.max_items.unwrap_or(usize::MAX);
        doc.select(&self.item)
            .take(limit)
            .map(|item| self.parse_entry(item))
            .collect()
    }

    fn parse_entry(&self, item: ElementRef<'_>) -> Result<ListEntry, ParseError> {
        let title = item
            .select(&self.title)
            .next()
            .map(visible_text)
            .unwrap_or_default();
        if title.is_empty() {
            return Err(ParseError::new(&self.id, "board item without title"));
        }

        let link_el = match &self.link {
            Some(sel) => item.select(sel).next(),
            None => first_anchor(item),
        };
        let attr = link_el
            .and_then(|el| el.value().attr(&self.link_attr))
            .map(str::trim)
            .unwrap_or_default();

        let item_id = self
            .id_pattern
            .as_ref()
            .and_then(|re| re.captures(attr))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        let detail = match (&self.detail_url_template, &item_id) {
            (Some(tpl), Some(id)) => Some(tpl.replace("{id}", id)),
            _ => self.resolve_href(attr),
        };

        let preview = self
            .preview
            .as_ref()
            .and_then(|sel| item.select(sel).next())
            .map(visible_text)
            .unwrap_or_default();

        let entry = match detail {
            Some(url) => ListEntry {
                title,
                url,
                item_id: None,
                preview,
                has_detail_page: true,
            },
            // No detail page: the list URL stands in and the id keeps items apart.
            None => ListEntry {
                title,
                url: self.list_url.to_string(),
                item_id,
                preview,
                has_detail_page: false,
            },
        };
        Ok(entry)
    }

    fn resolve_href(&self, attr: &str) -> Option<String> {
        if attr.is_empty() || attr.starts_with('#') || attr.to_ascii_lowercase().starts_with("javascript:") {
            return None;
        }
        if self.link_attr != "href" {
            return None;
        }
        self.list_url.join(attr).ok().map(|u| u.to_string())
    }

    async fn load(&self, url: &str) -> Result<String, crate::error::FetchError> {
        match &self.transport {
            Transport::Http(client) => crate::ingest::get_text(client, url).await,
            Transport::Fixture { list, details } => {
                if url == self.list_url.as_str() {
                    Ok(list.clone())
                } else {
                    details
                        .get(url)
                        .cloned()
                        .ok_or_else(|| crate::error::FetchError::Status {
                            url: url.to_string(),
                            status: 404,
                        })
                }
            }
        }
    }
}

fn first_anchor(item: ElementRef<'_>) -> Option<ElementRef<'_>> {
    static A: once_cell::sync::OnceCell<Selector> = once_cell::sync::OnceCell::new();
    let a = A.get_or_init(|| Selector::parse("a").unwrap());
    if item.value().name() == "a" {
        return Some(item);
    }
    item.select(a).next()
}

#[async_trait]
impl SourceAdapter for BoardAdapter {
    async fn fetch(&self) -> FetchOutcome {
        let list_html = self.load(self.list_url.as_str()).await?;
        let entries = self.parse_list(&list_html);

        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    out.push(Err(e));
                    continue;
                }
            };

            let mut raw = entry.preview.clone();
            if self.fetch_detail && entry.has_detail_page {
                match self.load(&entry.url).await {
                    Ok(html) => raw = html,
                    Err(e) => {
                        tracing::warn!(source = %self.id, error = %e, "detail fetch failed, using list preview");
                    }
                }
            }

            let mut article = Article::new(&self.id, entry.title, entry.url, raw);
            if !entry.has_detail_page {
                article = article.with_shared_url();
            }
            if let Some(id) = entry.item_id {
                article = article.with_item_id(id);
            }
            out.push(Ok(article));
        }

        counter!("monitor_articles_fetched_total", "source" => self.id.clone())
            .increment(out.iter().filter(|r| r.is_ok()).count() as u64);
        Ok(out)
    }

    fn id(&self) -> &str {
        &self.id
    }
}
