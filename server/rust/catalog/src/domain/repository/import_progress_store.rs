use std::time::Duration;

use async_trait::async_trait;

use crate::domain::entity::import_progress::ImportProgress;

/// ImportProgressStore はジョブ ID ごとの進捗を保持するプロセス内ストア。
/// 書き込みはジョブを所有するワーカーのみが行い、読み取りは任意の数のリクエストから並行に行われる。
/// 読み取り側が書き込み途中のレコードを観測することはない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImportProgressStore: Send + Sync {
    async fn get(&self, job_id: &str) -> Option<ImportProgress>;
    async fn set(&self, job_id: &str, progress: ImportProgress);
    /// evict_expired は最終更新から retention 以上経過した終了済みジョブを削除し、削除件数を返す。
    async fn evict_expired(&self, retention: Duration) -> usize;
}
