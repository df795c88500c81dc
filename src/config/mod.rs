// src/config/mod.rs
//! TOML configuration for the monitor.
//!
//! Every section is optional; missing fields fall back to the defaults below.
//! Secret fields set to `"ENV"` are resolved from the process environment
//! after parsing.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::{env, fs, path::Path};

pub const ENV_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/monitor.toml";

pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; admission-monitor/0.1)".to_string()
}
fn default_min_length() -> usize {
    50
}
fn default_max_length() -> usize {
    1000
}
fn default_hidden_fields() -> Vec<String> {
    vec!["input#lnaCn1".to_string()]
}
fn default_containers() -> Vec<String> {
    [
        "#newsPopCont .ArchiveDtContent",
        "#newsPopCont",
        ".board-view",
        ".article-content",
        ".view-content",
        ".content",
        "article",
        "main",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_placeholder_titles() -> Vec<String> {
    vec!["제목 없음".to_string(), "Untitled".to_string()]
}
fn default_storage_path() -> String {
    "data/seen.db".to_string()
}
fn default_min_interval_ms() -> u64 {
    1000
}
fn default_env_marker() -> String {
    "ENV".to_string()
}
fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}
fn default_sink_timeout_secs() -> u64 {
    10
}
fn default_min_confidence() -> f64 {
    0.10
}
fn default_priority() -> i32 {
    99
}
fn default_emoji() -> String {
    "🎓".to_string()
}
fn default_link_attr() -> String {
    "href".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Keyed by category id; BTreeMap keeps iteration order stable.
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryEntry>,
    /// Polled in the order given here.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NormalizerConfig {
    /// Minimum characters a strategy must produce to win.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_hidden_fields")]
    pub hidden_field_selectors: Vec<String>,
    #[serde(default = "default_containers")]
    pub container_selectors: Vec<String>,
    #[serde(default = "default_placeholder_titles")]
    pub placeholder_titles: Vec<String>,
    /// Extra regexes stripped from extracted text, on top of the built-ins.
    #[serde(default)]
    pub boilerplate_patterns: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            max_length: default_max_length(),
            hidden_field_selectors: default_hidden_fields(),
            container_selectors: default_containers(),
            placeholder_titles: default_placeholder_titles(),
            boilerplate_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    #[default]
    Telegram,
    Console,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub kind: NotifierKind,
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: NotifierKind::default(),
            min_interval_ms: default_min_interval_ms(),
            telegram: TelegramConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// "ENV" means: read from TELEGRAM_BOT_TOKEN. Empty after resolution = unconfigured.
    #[serde(default = "default_env_marker")]
    pub bot_token: String,
    /// "ENV" means: read from TELEGRAM_CHAT_ID.
    #[serde(default = "default_env_marker")]
    pub chat_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub disable_link_preview: bool,
    #[serde(default = "default_sink_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: default_env_marker(),
            chat_id: default_env_marker(),
            api_base: default_api_base(),
            disable_link_preview: false,
            timeout_secs: default_sink_timeout_secs(),
        }
    }
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Threshold for categories that do not set their own.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Send articles that matched no category (as "general"). When off they
    /// are counted and left unrecorded.
    #[serde(default = "default_true")]
    pub notify_general: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            notify_general: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryEntry {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub confidence_threshold: Option<f64>,
    /// Lower wins ties.
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_emoji")]
    pub emoji: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Rss,
    Board,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub kind: SourceKind,
    pub url: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Required when `kind = "board"`.
    #[serde(default)]
    pub board: Option<BoardConfig>,
}

impl SourceConfig {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoardConfig {
    pub item_selector: String,
    pub title_selector: String,
    #[serde(default)]
    pub link_selector: Option<String>,
    #[serde(default = "default_link_attr")]
    pub link_attr: String,
    #[serde(default)]
    pub preview_selector: Option<String>,
    /// First capture group becomes the item id.
    #[serde(default)]
    pub id_pattern: Option<String>,
    /// `{id}` is replaced by the extracted item id.
    #[serde(default)]
    pub detail_url_template: Option<String>,
    #[serde(default)]
    pub fetch_detail: bool,
    #[serde(default)]
    pub max_items: Option<usize>,
}

impl AppConfig {
    /// Parse, resolve "ENV" secrets and validate.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s).context("parsing monitor config")?;
        cfg.resolve_env();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    fn resolve_env(&mut self) {
        let tg = &mut self.notifier.telegram;
        if tg.bot_token.trim().eq_ignore_ascii_case("env") {
            tg.bot_token = env::var(ENV_TELEGRAM_BOT_TOKEN).unwrap_or_default();
        }
        if tg.chat_id.trim().eq_ignore_ascii_case("env") {
            tg.chat_id = env::var(ENV_TELEGRAM_CHAT_ID).unwrap_or_default();
        }
    }

    fn validate(&mut self) -> Result<()> {
        let n = &self.normalizer;
        if n.max_length == 0 {
            bail!("normalizer.max_length must be positive");
        }
        if n.min_length > n.max_length {
            bail!(
                "normalizer.min_length ({}) exceeds max_length ({})",
                n.min_length,
                n.max_length
            );
        }

        self.classifier.min_confidence = clamp_unit(
            self.classifier.min_confidence,
            "classifier.min_confidence",
        );
        for (id, cat) in self.categories.iter_mut() {
            if id.trim().is_empty() || id == crate::article::GENERAL_CATEGORY {
                bail!("invalid category id {id:?}");
            }
            if let Some(t) = cat.confidence_threshold {
                cat.confidence_threshold = Some(clamp_unit(t, id));
            }
        }

        let mut ids = HashSet::new();
        for src in &self.sources {
            if src.id.trim().is_empty() {
                bail!("source with empty id");
            }
            if !ids.insert(src.id.as_str()) {
                bail!("duplicate source id {:?}", src.id);
            }
            if src.url.trim().is_empty() {
                return Err(anyhow!("source {:?} has an empty url", src.id));
            }
            if src.kind == SourceKind::Board && src.board.is_none() {
                bail!("board source {:?} needs a [sources.board] section", src.id);
            }
        }
        Ok(())
    }
}

fn clamp_unit(v: f64, what: &str) -> f64 {
    if v.is_nan() {
        tracing::warn!(field = what, "NaN threshold, using 0");
        return 0.0;
    }
    if !(0.0..=1.0).contains(&v) {
        tracing::warn!(field = what, value = v, "threshold outside [0,1], clamping");
    }
    v.clamp(0.0, 1.0)
}
