use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};

use crate::domain::entity::import_progress::ImportProgress;
use crate::domain::repository::ImportProgressStore;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// ProgressEvent は進捗フィードの 1 要素。
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Snapshot(ImportProgress),
    /// ジョブが存在しない。フィードの最後の要素になる。
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    First,
    Polling,
    Done,
}

/// WatchImportProgressUseCase は進捗ストアを一定間隔でポーリングし、
/// スナップショットを遅延ストリームとして返す。
///
/// ストリームは complete / error のスナップショット、または NotFound を流した時点で終わる。
/// ストリームを drop するとポーリングも止まる。
pub struct WatchImportProgressUseCase {
    store: Arc<dyn ImportProgressStore>,
    interval: Duration,
}

impl WatchImportProgressUseCase {
    pub fn new(store: Arc<dyn ImportProgressStore>) -> Self {
        Self {
            store,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn execute(&self, job_id: String) -> BoxStream<'static, ProgressEvent> {
        let store = self.store.clone();
        let interval = self.interval;

        stream::unfold(Phase::First, move |phase| {
            let store = store.clone();
            let job_id = job_id.clone();
            async move {
                match phase {
                    Phase::Done => return None,
                    Phase::Polling => tokio::time::sleep(interval).await,
                    Phase::First => {}
                }

                let (event, next) = match store.get(&job_id).await {
                    None => (ProgressEvent::NotFound, Phase::Done),
                    Some(p) if p.is_terminal() => (ProgressEvent::Snapshot(p), Phase::Done),
                    Some(p) => (ProgressEvent::Snapshot(p), Phase::Polling),
                };
                Some((event, next))
            }
        })
        .boxed()
    }
}
