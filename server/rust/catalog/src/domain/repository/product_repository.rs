use async_trait::async_trait;

use crate::domain::entity::product::{NewProduct, Product, ProductFilter};

/// DuplicateSku は sku の一意制約違反を表す。
/// create / update はこれを anyhow::Error に包んで返す。
#[derive(Debug, thiserror::Error)]
#[error("duplicate sku: {0}")]
pub struct DuplicateSku(pub String);

impl DuplicateSku {
    /// sku_of は err が一意制約違反であればその sku を返す。
    pub fn sku_of(err: &anyhow::Error) -> Option<&str> {
        err.downcast_ref::<DuplicateSku>().map(|d| d.0.as_str())
    }
}

/// ProductRepository は商品の永続化を担う。
/// sku の検索は大文字小文字を区別しない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Product>>;
    async fn find_by_sku(&self, sku: &str) -> anyhow::Result<Option<Product>>;
    /// find_all はフィルタに一致する商品を id 昇順でページングして返す。戻り値の 2 要素目は総件数。
    async fn find_all(
        &self,
        filter: &ProductFilter,
        page: u32,
        page_size: u32,
    ) -> anyhow::Result<(Vec<Product>, u64)>;
    async fn create(&self, product: &NewProduct) -> anyhow::Result<Product>;
    async fn update(&self, product: &Product) -> anyhow::Result<()>;
    async fn delete(&self, id: i64) -> anyhow::Result<bool>;
    async fn delete_all(&self) -> anyhow::Result<u64>;
    /// begin_import はインポートジョブ専用のセッションを開く。
    /// セッションは HTTP リクエストとは独立した接続とトランザクションを持つ。
    async fn begin_import(&self) -> anyhow::Result<Box<dyn ProductImportSession>>;
}

/// ProductImportSession は 1 ジョブ分の書き込みスコープ。
/// commit までの変更は同じセッション内の find_by_sku から参照できる。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductImportSession: Send {
    async fn find_by_sku(&mut self, sku: &str) -> anyhow::Result<Option<Product>>;
    async fn update(&mut self, product: &Product) -> anyhow::Result<()>;
    async fn insert_batch(&mut self, products: &[NewProduct]) -> anyhow::Result<Vec<Product>>;
    async fn commit(&mut self) -> anyhow::Result<()>;
}
