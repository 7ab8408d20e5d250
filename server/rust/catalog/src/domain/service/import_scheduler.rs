use bytes::Bytes;

/// ImportJobScheduler はインポートジョブをリクエスト処理とは独立に実行させる。
/// schedule は即座に戻り、ジョブの失敗は進捗ストアを通じてのみ観測される。
#[cfg_attr(test, mockall::automock)]
pub trait ImportJobScheduler: Send + Sync {
    fn schedule(&self, job_id: String, content: Bytes);
}
