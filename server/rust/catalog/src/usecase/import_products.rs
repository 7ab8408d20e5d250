use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use csv::StringRecord;
use tracing::{debug, info};

use crate::domain::entity::import_progress::ImportProgress;
use crate::domain::entity::product::{clean_description, normalize_sku, NewProduct};
use crate::domain::entity::webhook::WebhookEventType;
use crate::domain::repository::{ImportProgressStore, ProductImportSession, ProductRepository};
use crate::domain::service::ProductEventNotifier;

/// 新規商品の一括挿入とトランザクションのコミットを行う行数の閾値。
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// 一括挿入 1 回あたりの行数の上限。
/// 1 行 6 パラメータのため、PostgreSQL のバインド上限 65535 に収まる値にする。
pub const MAX_BATCH_SIZE: usize = 10_000;

const REQUIRED_COLUMNS: [&str; 2] = ["sku", "name"];

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("file is not valid UTF-8 text: {0}")]
    Decode(#[from] std::str::Utf8Error),
    #[error("CSV must contain columns: {}", .0.join(", "))]
    Schema(Vec<String>),
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("internal error: {0}")]
    Internal(String),
}

fn storage(e: anyhow::Error) -> ImportError {
    ImportError::Storage(e.to_string())
}

/// ImportSummary はジョブ終了時の集計。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// 有効行の数。作成・更新された行の合計に等しい。
    pub processed: u64,
    pub created: u64,
    pub updated: u64,
    /// sku または name が空でスキップされた行の数。
    pub skipped: u64,
}

/// 必須列と任意列のヘッダー上の位置。
#[derive(Debug, Clone, Copy)]
struct Columns {
    sku: usize,
    name: usize,
    description: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, ImportError> {
        let position = |column: &str| headers.iter().position(|h| h == column);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .into_iter()
            .filter(|c| position(*c).is_none())
            .map(str::to_string)
            .collect();

        match (position("sku"), position("name")) {
            (Some(sku), Some(name)) => Ok(Self {
                sku,
                name,
                description: position("description"),
            }),
            _ => Err(ImportError::Schema(missing)),
        }
    }
}

/// decode はバイト列を UTF-8 として解釈し、先頭の BOM を取り除く。
fn decode(content: &[u8]) -> Result<&str, ImportError> {
    let text = std::str::from_utf8(content)?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}

fn reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes())
}

/// count_records はヘッダーを除くレコード数を数える。
fn count_records(content: &[u8]) -> Result<u64, ImportError> {
    let mut rdr = reader(decode(content)?);
    let mut record = StringRecord::new();
    let mut total = 0u64;
    while rdr.read_record(&mut record)? {
        total += 1;
    }
    Ok(total)
}

/// 挿入待ちの新規商品。同じ sku の後続行は待機中の商品を上書きする。
#[derive(Default)]
struct StagedInserts {
    products: Vec<NewProduct>,
    index: HashMap<String, usize>,
}

impl StagedInserts {
    fn len(&self) -> usize {
        self.products.len()
    }

    fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// overwrite は同じキーの商品が待機中なら上書きして true を返す。
    fn overwrite(&mut self, key: &str, name: &str, description: Option<String>) -> bool {
        match self.index.get(key) {
            Some(&i) => {
                self.products[i].name = name.to_string();
                self.products[i].description = description;
                true
            }
            None => false,
        }
    }

    fn push(&mut self, key: String, product: NewProduct) {
        self.index.insert(key, self.products.len());
        self.products.push(product);
    }

    fn clear(&mut self) {
        self.products.clear();
        self.index.clear();
    }
}

/// ImportProductsUseCase は CSV をストリーミングで読み、商品を sku で upsert する。
///
/// 件数確定のための事前走査と適用走査の 2 パスで処理する。
/// 新規商品は batch_size 件溜まるごとに一括挿入してコミットし、
/// 既存商品の更新は 1 行ずつ適用して batch_size 件ごとにコミットする。
/// 進捗はどちらのコミット境界でも更新する。
pub struct ImportProductsUseCase {
    repo: Arc<dyn ProductRepository>,
    store: Arc<dyn ImportProgressStore>,
    notifier: Arc<dyn ProductEventNotifier>,
    batch_size: usize,
    notify_webhooks: bool,
}

impl ImportProductsUseCase {
    pub fn new(
        repo: Arc<dyn ProductRepository>,
        store: Arc<dyn ImportProgressStore>,
        notifier: Arc<dyn ProductEventNotifier>,
    ) -> Self {
        Self {
            repo,
            store,
            notifier,
            batch_size: DEFAULT_BATCH_SIZE,
            notify_webhooks: false,
        }
    }

    /// with_batch_size は閾値を 1..=MAX_BATCH_SIZE に丸めて設定する。
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    /// with_webhook_notifications が true の場合、挿入・更新した商品ごとに通知を要求する。
    pub fn with_webhook_notifications(mut self, enabled: bool) -> Self {
        self.notify_webhooks = enabled;
        self
    }

    /// execute はジョブを最後まで実行し、終了状態を進捗ストアに書き込む。
    /// 失敗時はストアを error にしたうえでエラーを返す。
    pub async fn execute(&self, job_id: &str, content: Bytes) -> Result<ImportSummary, ImportError> {
        let mut progress = self
            .store
            .get(job_id)
            .await
            .unwrap_or_else(|| ImportProgress::new(job_id));

        match self.run(job_id, content, &mut progress).await {
            Ok(summary) => {
                progress.complete(summary.processed);
                self.store.set(job_id, progress).await;
                info!(
                    job_id = %job_id,
                    processed = summary.processed,
                    created = summary.created,
                    updated = summary.updated,
                    skipped = summary.skipped,
                    "import complete"
                );
                Ok(summary)
            }
            Err(e) => {
                progress.fail(&e.to_string());
                self.store.set(job_id, progress).await;
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        job_id: &str,
        content: Bytes,
        progress: &mut ImportProgress,
    ) -> Result<ImportSummary, ImportError> {
        let text = decode(&content)?;
        let mut rdr = reader(text);
        let columns = Columns::resolve(rdr.headers()?)?;

        let counted = content.clone();
        let total = tokio::task::spawn_blocking(move || count_records(&counted))
            .await
            .map_err(|e| ImportError::Internal(e.to_string()))??;

        progress.start_importing(total);
        self.store.set(job_id, progress.clone()).await;
        info!(job_id = %job_id, total_records = total, "import started");

        let mut session = self.repo.begin_import().await.map_err(storage)?;
        let mut staged = StagedInserts::default();
        let mut summary = ImportSummary::default();
        let mut updates_since_commit = 0usize;

        let mut record = StringRecord::new();
        while rdr.read_record(&mut record)? {
            let sku = record.get(columns.sku).unwrap_or("").trim();
            let name = record.get(columns.name).unwrap_or("").trim();
            if sku.is_empty() || name.is_empty() {
                summary.skipped += 1;
                continue;
            }
            let description = clean_description(
                columns
                    .description
                    .and_then(|i| record.get(i))
                    .map(str::to_string),
            );
            let key = normalize_sku(sku);

            if staged.overwrite(&key, name, description.clone()) {
                summary.updated += 1;
            } else if let Some(mut existing) =
                session.find_by_sku(sku).await.map_err(storage)?
            {
                existing.apply_import(name.to_string(), description);
                session.update(&existing).await.map_err(storage)?;
                if self.notify_webhooks {
                    self.notifier
                        .notify(WebhookEventType::ProductUpdated, &existing);
                }
                summary.updated += 1;
                updates_since_commit += 1;
            } else {
                staged.push(
                    key,
                    NewProduct::new(sku.to_string(), name.to_string(), description, true),
                );
            }
            summary.processed += 1;

            if staged.len() >= self.batch_size {
                self.flush(session.as_mut(), &mut staged, &mut summary)
                    .await?;
                updates_since_commit = 0;
                self.report(job_id, progress, summary.processed).await;
            } else if updates_since_commit >= self.batch_size {
                session.commit().await.map_err(storage)?;
                updates_since_commit = 0;
                self.report(job_id, progress, summary.processed).await;
            }
        }

        if !staged.is_empty() {
            self.flush(session.as_mut(), &mut staged, &mut summary)
                .await?;
        }
        session.commit().await.map_err(storage)?;

        Ok(summary)
    }

    async fn flush(
        &self,
        session: &mut dyn ProductImportSession,
        staged: &mut StagedInserts,
        summary: &mut ImportSummary,
    ) -> Result<(), ImportError> {
        let inserted = session
            .insert_batch(&staged.products)
            .await
            .map_err(storage)?;
        session.commit().await.map_err(storage)?;
        debug!(rows = inserted.len(), "insert batch flushed");

        summary.created += inserted.len() as u64;
        if self.notify_webhooks {
            for product in &inserted {
                self.notifier
                    .notify(WebhookEventType::ProductCreated, product);
            }
        }
        staged.clear();
        Ok(())
    }

    async fn report(&self, job_id: &str, progress: &mut ImportProgress, processed: u64) {
        progress.record_progress(processed);
        self.store.set(job_id, progress.clone()).await;
    }
}
