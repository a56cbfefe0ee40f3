// src/corpus/scheduler.rs
use tokio::task::JoinHandle;

use super::CorpusHandle;

/// Spawn a background task that refreshes the corpus on a fixed interval.
/// Queries never wait on this: they read whatever snapshot is current and
/// only trigger an inline reload when the TTL has lapsed.
pub fn spawn_refresh_scheduler(handle: CorpusHandle, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
        // The first tick fires immediately, which doubles as the warm-up load.
        loop {
            ticker.tick().await;
            handle.refresh().await;
            tracing::info!(
                target: "corpus",
                records = handle.snapshot().len(),
                "scheduled corpus refresh tick"
            );
        }
    })
}
