//! # Configuration
//!
//! Configuration surface the core consumes: dataset source path/URL,
//! refresh TTL, default page size, rate-limit window and budget, scorer
//! selection, and the optional AI query-understanding provider.
//!
//! Resolution order: JSON file (if `UNI_FINDER_CONFIG` points at one),
//! then environment variable overrides, then built-in defaults. Reading or
//! parsing failures fall back silently to defaults; configuration is
//! never a reason to refuse startup.

use serde::Deserialize;
use std::{fs, path::Path};

pub const ENV_CONFIG_PATH: &str = "UNI_FINDER_CONFIG";

/// Dataset source + cache settings consumed by the corpus store.
#[derive(Debug, Clone, Deserialize)]
pub struct CorpusConfig {
    /// Local JSON/CSV snapshot path, used when the feed URL is unset or empty.
    #[serde(default = "default_data_path")]
    pub data_path: String,
    /// Remote CSV/JSON feed; tried first when configured.
    #[serde(default)]
    pub data_url: Option<String>,
    #[serde(default = "default_ttl")]
    pub refresh_ttl_secs: u64,
    #[serde(default)]
    pub latest_year_only: bool,
    /// Pin the corpus to one admission cycle instead of the newest present.
    #[serde(default)]
    pub pinned_year: Option<i32>,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_data_path() -> String {
    "data/programs.json".to_string()
}
fn default_ttl() -> u64 {
    21_600 // 6h
}
fn default_fetch_timeout() -> u64 {
    12
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            data_url: None,
            refresh_ttl_secs: default_ttl(),
            latest_year_only: false,
            pinned_year: None,
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

/// Optional AI-backed query understanding; the deterministic parser is the
/// unconditional fallback, so this stays disabled unless explicitly enabled.
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    /// "openai" is the only real provider; anything else means disabled.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default = "default_ai_model")]
    pub model: String,
}

fn default_ai_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: None,
            model: default_ai_model(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_rate_budget")]
    pub rate_limit_budget: usize,
    #[serde(default = "default_rate_window")]
    pub rate_limit_window_secs: u64,
    /// "fuzzy" (strsim-backed) or "token" (plain overlap fallback).
    #[serde(default = "default_scorer")]
    pub scorer: String,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_page_size() -> usize {
    6
}
fn default_rate_budget() -> usize {
    12
}
fn default_rate_window() -> u64 {
    60
}
fn default_scorer() -> String {
    "fuzzy".to_string()
}
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            corpus: CorpusConfig::default(),
            page_size: default_page_size(),
            rate_limit_budget: default_rate_budget(),
            rate_limit_window_secs: default_rate_window(),
            scorer: default_scorer(),
            ai: AiConfig::default(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file. Falls back to defaults on error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Resolve the effective configuration: optional JSON file, then env
    /// var overrides on top.
    pub fn resolve() -> Self {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => Self::load_from_file(p),
            Err(_) => Self::default(),
        };
        cfg.apply_env();
        cfg
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("DATA_JSON_PATH") {
            if !v.trim().is_empty() {
                self.corpus.data_path = v;
            }
        }
        if let Ok(v) = std::env::var("DATA_CSV_URL") {
            if !v.trim().is_empty() {
                self.corpus.data_url = Some(v);
            }
        }
        if let Some(v) = parse_env::<u64>("DATA_REFRESH_TTL_SECONDS") {
            self.corpus.refresh_ttl_secs = v;
        }
        if let Some(v) = parse_env::<i32>("DATA_YEAR") {
            self.corpus.pinned_year = Some(v);
            self.corpus.latest_year_only = true;
        }
        if std::env::var("LATEST_YEAR_ONLY").ok().as_deref() == Some("1") {
            self.corpus.latest_year_only = true;
        }
        if let Some(v) = parse_env::<usize>("PAGE_SIZE") {
            self.page_size = v.max(1);
        }
        if let Some(v) = parse_env::<usize>("RATE_LIMIT_BUDGET") {
            self.rate_limit_budget = v.max(1);
        }
        if let Some(v) = parse_env::<u64>("RATE_LIMIT_WINDOW_SECS") {
            self.rate_limit_window_secs = v.max(1);
        }
        if let Ok(v) = std::env::var("SCORER") {
            if !v.trim().is_empty() {
                self.scorer = v.trim().to_ascii_lowercase();
            }
        }
        if std::env::var("AI_PARSER_ENABLED").ok().as_deref() == Some("1") {
            self.ai.enabled = true;
            if self.ai.provider.is_none() {
                self.ai.provider = Some("openai".to_string());
            }
        }
        if let Ok(v) = std::env::var("OPENAI_MODEL") {
            if !v.trim().is_empty() {
                self.ai.model = v;
            }
        }
        if let Ok(v) = std::env::var("BIND_ADDR") {
            if !v.trim().is_empty() {
                self.bind_addr = v;
            }
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
