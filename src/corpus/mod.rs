//! # Offline Corpus
//!
//! In-memory collection of admission-program records loaded from a dataset
//! snapshot (remote CSV/JSON feed or local file), cached with a TTL.
//!
//! Records are normalized once at load time and never mutated afterwards;
//! a refresh builds the new snapshot off to the side and swaps the shared
//! reference atomically, so concurrent queries always see either the old
//! or the new fully-loaded snapshot. All source failures degrade to an
//! empty corpus, so the caller answers "nothing found" instead of crashing.

pub mod scheduler;
pub mod source;

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::config::CorpusConfig;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("corpus_reloads_total", "Completed corpus reloads.");
        describe_counter!(
            "corpus_reload_empty_total",
            "Reloads that produced an empty corpus (source missing/malformed)."
        );
        describe_gauge!("corpus_records", "Records in the current snapshot.");
        describe_gauge!("corpus_last_reload_ts", "Unix ts of the last reload.");
    });
}

/// One admission program offering. All comparable fields (`city`, `level`,
/// `form`, `exam_list`) are already normalized; `city_key` is the lower-case
/// comparison form resolved once at load time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramRecord {
    pub university: String,
    pub program: String,
    pub city: String,
    #[serde(skip)]
    pub city_key: String,
    pub level: String,
    pub form: String,
    pub exam_list: Vec<String>,
    pub budget_available: Option<bool>,
    pub dorm_available: Option<bool>,
    pub min_score: Option<u32>,
    pub url: Option<String>,
    pub source_year: Option<i32>,
}

#[derive(Debug)]
struct Snapshot {
    records: Arc<Vec<ProgramRecord>>,
    loaded_at: Option<Instant>,
}

/// TTL-cached snapshot store. Owns `{snapshot, loaded_at}` explicitly rather
/// than as a process-wide singleton; whoever composes the corpus with the
/// matcher owns the handle's lifecycle.
#[derive(Debug)]
pub struct CorpusStore {
    inner: RwLock<Snapshot>,
    cfg: CorpusConfig,
}

/// Cloneable shared handle over [`CorpusStore`].
#[derive(Clone)]
pub struct CorpusHandle {
    store: Arc<CorpusStore>,
}

impl CorpusHandle {
    pub fn new(cfg: CorpusConfig) -> Self {
        Self {
            store: Arc::new(CorpusStore {
                inner: RwLock::new(Snapshot {
                    records: Arc::new(Vec::new()),
                    loaded_at: None,
                }),
                cfg,
            }),
        }
    }

    /// Current snapshot; cheap clone of the shared reference, never blocks
    /// on a reload in flight.
    pub fn snapshot(&self) -> Arc<Vec<ProgramRecord>> {
        self.store
            .inner
            .read()
            .map(|s| Arc::clone(&s.records))
            .unwrap_or_default()
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.store.cfg.refresh_ttl_secs)
    }

    pub fn is_stale(&self) -> bool {
        match self.store.inner.read() {
            Ok(s) => match s.loaded_at {
                None => true,
                // A failed load stays cached as empty until the TTL expires;
                // retrying on every query would hammer a dead source.
                Some(at) => at.elapsed() >= self.ttl(),
            },
            Err(_) => false,
        }
    }

    /// Reload only if the cache is empty or older than the TTL, then return
    /// the (possibly refreshed) snapshot.
    pub async fn ensure_fresh(&self) -> Arc<Vec<ProgramRecord>> {
        if self.is_stale() {
            self.refresh().await;
        }
        self.snapshot()
    }

    /// Unconditional reload. The new snapshot is fully built before the
    /// write lock is taken, so readers never observe a partial load.
    pub async fn refresh(&self) {
        ensure_metrics_described();

        let mut records = source::load(&self.store.cfg).await;
        if self.store.cfg.latest_year_only {
            records = latest_year_filter(records, self.store.cfg.pinned_year);
        }

        counter!("corpus_reloads_total").increment(1);
        if records.is_empty() {
            counter!("corpus_reload_empty_total").increment(1);
        }
        gauge!("corpus_records").set(records.len() as f64);
        gauge!("corpus_last_reload_ts").set(chrono::Utc::now().timestamp().max(0) as f64);
        tracing::info!(target: "corpus", records = records.len(), "corpus reloaded");

        if let Ok(mut guard) = self.store.inner.write() {
            guard.records = Arc::new(records);
            guard.loaded_at = Some(Instant::now());
        }
    }

    /// Test/embedding constructor: install a prebuilt snapshot directly.
    pub fn with_records(cfg: CorpusConfig, records: Vec<ProgramRecord>) -> Self {
        let handle = Self::new(cfg);
        if let Ok(mut guard) = handle.store.inner.write() {
            guard.records = Arc::new(records);
            guard.loaded_at = Some(Instant::now());
        }
        handle
    }
}

/// Narrow the corpus to one admission cycle: the pinned year if configured,
/// otherwise the most recent `source_year` present. Records without a year
/// are kept; an unknown cycle is not treated as stale data. Runs once per
/// reload, never per query.
fn latest_year_filter(records: Vec<ProgramRecord>, pinned: Option<i32>) -> Vec<ProgramRecord> {
    let target = pinned.or_else(|| records.iter().filter_map(|r| r.source_year).max());
    match target {
        Some(year) => records
            .into_iter()
            .filter(|r| r.source_year.is_none() || r.source_year == Some(year))
            .collect(),
        None => records,
    }
}
