//! データベース設定がない場合に使うインメモリ実装。

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::entity::import_progress::ImportProgress;
use crate::domain::entity::product::{normalize_sku, NewProduct, Product, ProductFilter};
use crate::domain::entity::webhook::{NewWebhook, Webhook, WebhookEventType};
use crate::domain::repository::{
    DuplicateSku, ImportProgressStore, ProductImportSession, ProductRepository,
    WebhookRepository,
};

/// ProductRows は id 順の商品と、小文字化した sku から id への索引を保持する。
#[derive(Default)]
struct ProductRows {
    rows: BTreeMap<i64, Product>,
    by_sku: HashMap<String, i64>,
}

impl ProductRows {
    fn find_sku(&self, sku: &str) -> Option<Product> {
        self.by_sku
            .get(&normalize_sku(sku))
            .and_then(|id| self.rows.get(id))
            .cloned()
    }

    fn insert_new(&mut self, next_id: &AtomicI64, new: &NewProduct) -> anyhow::Result<Product> {
        let key = normalize_sku(&new.sku);
        if self.by_sku.contains_key(&key) {
            return Err(DuplicateSku(new.sku.clone()).into());
        }
        let now = Utc::now();
        let product = Product {
            id: next_id.fetch_add(1, Ordering::SeqCst),
            sku: new.sku.clone(),
            name: new.name.clone(),
            description: new.description.clone(),
            active: new.active,
            created_at: now,
            updated_at: now,
        };
        self.by_sku.insert(key, product.id);
        self.rows.insert(product.id, product.clone());
        Ok(product)
    }

    /// put は既存行を置き換える。sku が変わった場合は索引も張り替える。
    fn put(&mut self, product: &Product) -> anyhow::Result<()> {
        let key = product.sku_key();
        if self.by_sku.get(&key).is_some_and(|id| *id != product.id) {
            return Err(DuplicateSku(product.sku.clone()).into());
        }
        if let Some(old) = self.rows.get(&product.id) {
            let old_key = old.sku_key();
            if self.by_sku.get(&old_key) == Some(&product.id) {
                self.by_sku.remove(&old_key);
            }
        }
        self.by_sku.insert(key, product.id);
        self.rows.insert(product.id, product.clone());
        Ok(())
    }

    fn remove(&mut self, id: i64) -> bool {
        let Some(removed) = self.rows.remove(&id) else {
            return false;
        };
        let key = removed.sku_key();
        if self.by_sku.get(&key) == Some(&id) {
            self.by_sku.remove(&key);
        }
        true
    }

    fn clear(&mut self) -> u64 {
        let count = self.rows.len() as u64;
        self.rows.clear();
        self.by_sku.clear();
        count
    }
}

type ProductTable = Arc<RwLock<ProductRows>>;

/// InMemoryProductRepository は商品を id 順に保持し、sku 検索は索引で引く。
pub struct InMemoryProductRepository {
    products: ProductTable,
    next_id: Arc<AtomicI64>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self {
            products: Arc::new(RwLock::new(ProductRows::default())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for InMemoryProductRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Product>> {
        Ok(self.products.read().await.rows.get(&id).cloned())
    }

    async fn find_by_sku(&self, sku: &str) -> anyhow::Result<Option<Product>> {
        Ok(self.products.read().await.find_sku(sku))
    }

    async fn find_all(
        &self,
        filter: &ProductFilter,
        page: u32,
        page_size: u32,
    ) -> anyhow::Result<(Vec<Product>, u64)> {
        let products = self.products.read().await;
        let matched: Vec<&Product> = products.rows.values().filter(|p| filter.matches(p)).collect();
        let total = matched.len() as u64;
        let offset = usize::try_from(page.saturating_sub(1))? * usize::try_from(page_size)?;
        let items = matched
            .into_iter()
            .skip(offset)
            .take(usize::try_from(page_size)?)
            .cloned()
            .collect();
        Ok((items, total))
    }

    async fn create(&self, product: &NewProduct) -> anyhow::Result<Product> {
        self.products
            .write()
            .await
            .insert_new(&self.next_id, product)
    }

    async fn update(&self, product: &Product) -> anyhow::Result<()> {
        self.products.write().await.put(product)
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.products.write().await.remove(id))
    }

    async fn delete_all(&self) -> anyhow::Result<u64> {
        Ok(self.products.write().await.clear())
    }

    async fn begin_import(&self) -> anyhow::Result<Box<dyn ProductImportSession>> {
        Ok(Box::new(InMemoryImportSession {
            products: self.products.clone(),
            next_id: self.next_id.clone(),
        }))
    }
}

/// InMemoryImportSession は書き込みを即座にテーブルへ反映する。commit は何もしない。
struct InMemoryImportSession {
    products: ProductTable,
    next_id: Arc<AtomicI64>,
}

#[async_trait]
impl ProductImportSession for InMemoryImportSession {
    async fn find_by_sku(&mut self, sku: &str) -> anyhow::Result<Option<Product>> {
        Ok(self.products.read().await.find_sku(sku))
    }

    async fn update(&mut self, product: &Product) -> anyhow::Result<()> {
        self.products.write().await.put(product)
    }

    async fn insert_batch(&mut self, products: &[NewProduct]) -> anyhow::Result<Vec<Product>> {
        let mut table = self.products.write().await;
        products
            .iter()
            .map(|p| table.insert_new(&self.next_id, p))
            .collect()
    }

    async fn commit(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct InMemoryWebhookRepository {
    webhooks: RwLock<BTreeMap<i64, Webhook>>,
    next_id: AtomicI64,
}

impl InMemoryWebhookRepository {
    pub fn new() -> Self {
        Self {
            webhooks: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryWebhookRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebhookRepository for InMemoryWebhookRepository {
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Webhook>> {
        Ok(self.webhooks.read().await.get(&id).cloned())
    }

    async fn find_all(&self) -> anyhow::Result<Vec<Webhook>> {
        Ok(self.webhooks.read().await.values().cloned().collect())
    }

    async fn find_enabled_by_event(
        &self,
        event_type: WebhookEventType,
    ) -> anyhow::Result<Vec<Webhook>> {
        Ok(self
            .webhooks
            .read()
            .await
            .values()
            .filter(|w| w.enabled && w.event_type == event_type)
            .cloned()
            .collect())
    }

    async fn create(&self, webhook: &NewWebhook) -> anyhow::Result<Webhook> {
        let created = Webhook {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            url: webhook.url.clone(),
            event_type: webhook.event_type,
            enabled: webhook.enabled,
            created_at: Utc::now(),
        };
        self.webhooks
            .write()
            .await
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, webhook: &Webhook) -> anyhow::Result<()> {
        self.webhooks
            .write()
            .await
            .insert(webhook.id, webhook.clone());
        Ok(())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.webhooks.write().await.remove(&id).is_some())
    }
}

/// InMemoryImportProgressStore はジョブの進捗をプロセス内に保持する。
/// レコードは丸ごと置き換えるため、読み取り側が部分的な更新を観測することはない。
pub struct InMemoryImportProgressStore {
    jobs: RwLock<HashMap<String, ImportProgress>>,
}

impl InMemoryImportProgressStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryImportProgressStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImportProgressStore for InMemoryImportProgressStore {
    async fn get(&self, job_id: &str) -> Option<ImportProgress> {
        self.jobs.read().await.get(job_id).cloned()
    }

    async fn set(&self, job_id: &str, progress: ImportProgress) {
        self.jobs.write().await.insert(job_id.to_string(), progress);
    }

    async fn evict_expired(&self, retention: Duration) -> usize {
        let now = Utc::now();
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, p| {
            let expired = p.is_terminal()
                && (now - p.updated_at)
                    .to_std()
                    .is_ok_and(|age| age >= retention);
            !expired
        });
        before - jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product(sku: &str) -> NewProduct {
        NewProduct::new(sku.to_string(), "Widget".to_string(), None, true)
    }

    #[tokio::test]
    async fn sku_lookup_is_case_insensitive() {
        let repo = InMemoryProductRepository::new();
        repo.create(&new_product("ABC-1")).await.unwrap();
        let found = repo.find_by_sku("abc-1").await.unwrap().unwrap();
        assert_eq!(found.sku, "ABC-1");
        let err = repo.create(&new_product("abc-1")).await.unwrap_err();
        assert_eq!(DuplicateSku::sku_of(&err), Some("abc-1"));
    }

    #[tokio::test]
    async fn sku_index_follows_updates_and_deletes() {
        let repo = InMemoryProductRepository::new();
        let mut product = repo.create(&new_product("OLD-1")).await.unwrap();

        product.sku = "New-1".to_string();
        repo.update(&product).await.unwrap();
        assert!(repo.find_by_sku("old-1").await.unwrap().is_none());
        assert_eq!(repo.find_by_sku("NEW-1").await.unwrap().unwrap().id, product.id);
        // 旧 sku は再利用できる
        repo.create(&new_product("OLD-1")).await.unwrap();

        assert!(repo.delete(product.id).await.unwrap());
        assert!(repo.find_by_sku("new-1").await.unwrap().is_none());
        repo.create(&new_product("new-1")).await.unwrap();

        let mut clash = repo.find_by_sku("old-1").await.unwrap().unwrap();
        clash.sku = "NEW-1".to_string();
        let err = repo.update(&clash).await.unwrap_err();
        assert_eq!(DuplicateSku::sku_of(&err), Some("NEW-1"));

        assert_eq!(repo.delete_all().await.unwrap(), 2);
        assert!(repo.find_by_sku("old-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_all_pages_in_id_order() {
        let repo = InMemoryProductRepository::new();
        for i in 0..5 {
            repo.create(&new_product(&format!("SKU-{i}"))).await.unwrap();
        }
        let (items, total) = repo
            .find_all(&ProductFilter::default(), 2, 2)
            .await
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(
            items.iter().map(|p| p.sku.as_str()).collect::<Vec<_>>(),
            vec!["SKU-2", "SKU-3"]
        );
    }

    #[tokio::test]
    async fn import_session_writes_through() {
        let repo = InMemoryProductRepository::new();
        let mut session = repo.begin_import().await.unwrap();
        let inserted = session
            .insert_batch(&[new_product("A1"), new_product("B1")])
            .await
            .unwrap();
        assert_eq!(inserted.len(), 2);
        assert!(session.find_by_sku("a1").await.unwrap().is_some());
        assert!(repo.find_by_sku("b1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn enabled_webhooks_filtered_by_event() {
        let repo = InMemoryWebhookRepository::new();
        for (event_type, enabled) in [
            (WebhookEventType::ProductCreated, true),
            (WebhookEventType::ProductCreated, false),
            (WebhookEventType::ProductDeleted, true),
        ] {
            repo.create(&NewWebhook {
                url: "http://example.com".to_string(),
                event_type,
                enabled,
            })
            .await
            .unwrap();
        }
        let hooks = repo
            .find_enabled_by_event(WebhookEventType::ProductCreated)
            .await
            .unwrap();
        assert_eq!(hooks.len(), 1);
    }

    #[tokio::test]
    async fn eviction_keeps_running_jobs() {
        let store = InMemoryImportProgressStore::new();

        let mut done = ImportProgress::new("done");
        done.complete(1);
        done.updated_at = Utc::now() - chrono::Duration::seconds(120);
        store.set("done", done).await;

        let mut running = ImportProgress::new("running");
        running.updated_at = Utc::now() - chrono::Duration::seconds(120);
        store.set("running", running).await;

        let mut fresh = ImportProgress::new("fresh");
        fresh.fail("boom");
        store.set("fresh", fresh).await;

        let evicted = store.evict_expired(Duration::from_secs(60)).await;
        assert_eq!(evicted, 1);
        assert!(store.get("done").await.is_none());
        assert!(store.get("running").await.is_some());
        assert!(store.get("fresh").await.is_some());
    }
}
