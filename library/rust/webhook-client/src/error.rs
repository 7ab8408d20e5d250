use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("リクエスト送信エラー: {0}")]
    RequestFailed(String),
    #[error("リクエストがタイムアウトしました")]
    Timeout,
    #[error("リトライ上限に到達しました (attempts={attempts}, last_status={last_status_code})")]
    MaxRetriesExceeded { attempts: u32, last_status_code: u16 },
    #[error("シリアライズエラー: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("HTTP クライアントの初期化に失敗しました: {0}")]
    ClientBuild(String),
}

impl WebhookError {
    /// status_code は受信側が応答したステータスコードを返す。応答がない場合は None。
    pub fn status_code(&self) -> Option<u16> {
        match self {
            WebhookError::MaxRetriesExceeded {
                last_status_code, ..
            } if *last_status_code != 0 => Some(*last_status_code),
            _ => None,
        }
    }
}
