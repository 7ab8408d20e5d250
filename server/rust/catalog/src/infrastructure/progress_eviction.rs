use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::domain::repository::ImportProgressStore;

/// spawn_progress_eviction は interval ごとに終了済みジョブの進捗を掃除するタスクを起動する。
/// retention 以上更新されていない complete / error のジョブが削除対象になる。
pub fn spawn_progress_eviction(
    store: Arc<dyn ImportProgressStore>,
    retention: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // 初回の tick は即座に返るため読み捨てる
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = store.evict_expired(retention).await;
            if evicted > 0 {
                debug!(evicted, "evicted finished import jobs");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::entity::import_progress::ImportProgress;
    use crate::infrastructure::in_memory::InMemoryImportProgressStore;

    #[tokio::test(start_paused = true)]
    async fn evicts_finished_jobs_on_each_tick() {
        let store = Arc::new(InMemoryImportProgressStore::new());
        let mut done = ImportProgress::new("done");
        done.complete(3);
        store.set("done", done).await;
        store.set("running", ImportProgress::new("running")).await;

        let handle = spawn_progress_eviction(store.clone(), Duration::ZERO, Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(store.get("done").await.is_some());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(store.get("done").await.is_none());
        assert!(store.get("running").await.is_some());

        handle.abort();
    }
}
