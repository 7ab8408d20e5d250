use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ImportStatus はインポートジョブの状態。
/// 遷移は parsing -> importing -> (complete | error) の一方向のみ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Parsing,
    Importing,
    Complete,
    Error,
}

impl ImportStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ImportStatus::Complete | ImportStatus::Error)
    }
}

/// ImportProgress は 1 つのインポートジョブの進捗スナップショット。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportProgress {
    pub job_id: String,
    pub status: ImportStatus,
    pub progress: f64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_records: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_records: Option<u64>,
    /// 最終更新時刻。保持期間の判定に使い、レスポンスには含めない。
    #[serde(skip, default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl ImportProgress {
    /// new はディスパッチ直後の parsing 状態の進捗を生成する。
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: ImportStatus::Parsing,
            progress: 0.0,
            message: "Parsing CSV...".to_string(),
            total_records: None,
            processed_records: None,
            updated_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// start_importing は件数確定後に importing へ遷移する。
    pub fn start_importing(&mut self, total_records: u64) {
        self.status = ImportStatus::Importing;
        self.total_records = Some(total_records);
        self.processed_records = Some(0);
        self.message = format!("Importing {total_records} records...");
        self.touch();
    }

    /// record_progress は処理済み件数を更新する。
    /// 件数と進捗率は単調非減少に保たれる。
    pub fn record_progress(&mut self, processed: u64) {
        let processed = processed.max(self.processed_records.unwrap_or(0));
        let total = self.total_records.unwrap_or(0);
        self.processed_records = Some(processed);
        if total > 0 {
            #[allow(clippy::cast_precision_loss)]
            let pct = (processed as f64 / total as f64 * 100.0).min(100.0);
            self.progress = self.progress.max(pct);
        }
        self.message = format!("Processed {processed}/{total} records...");
        self.touch();
    }

    pub fn complete(&mut self, processed: u64) {
        self.status = ImportStatus::Complete;
        self.progress = 100.0;
        self.processed_records = Some(processed);
        self.message = format!("Import complete! Processed {processed} records.");
        self.touch();
    }

    pub fn fail(&mut self, reason: &str) {
        self.status = ImportStatus::Error;
        self.message = format!("Error: {reason}");
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_is_parsing() {
        let p = ImportProgress::new("job-1");
        assert_eq!(p.status, ImportStatus::Parsing);
        assert_eq!(p.progress, 0.0);
        assert!(p.total_records.is_none());
        assert!(!p.is_terminal());
    }

    #[test]
    fn progress_never_decreases() {
        let mut p = ImportProgress::new("job-1");
        p.start_importing(200);
        p.record_progress(100);
        assert_eq!(p.progress, 50.0);
        p.record_progress(40);
        assert_eq!(p.processed_records, Some(100));
        assert_eq!(p.progress, 50.0);
    }

    #[test]
    fn complete_sets_full_progress() {
        let mut p = ImportProgress::new("job-1");
        p.start_importing(3);
        p.complete(2);
        assert_eq!(p.status, ImportStatus::Complete);
        assert_eq!(p.progress, 100.0);
        assert_eq!(p.message, "Import complete! Processed 2 records.");
        assert!(p.is_terminal());
    }

    #[test]
    fn serialized_form_omits_unknown_counts() {
        let p = ImportProgress::new("job-1");
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["status"], "parsing");
        assert!(v.get("total_records").is_none());
        assert!(v.get("updated_at").is_none());
    }
}
