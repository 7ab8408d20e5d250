use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use crate::domain::entity::product::{NewProduct, Product, ProductFilter};
use crate::domain::repository::{DuplicateSku, ProductImportSession, ProductRepository};

const COLUMNS: &str = "id, sku, name, description, active, created_at, updated_at";

/// sku_error は lower(sku) のユニークインデックス違反 (23505) を DuplicateSku に変換する。
fn sku_error(err: sqlx::Error, sku: &str) -> anyhow::Error {
    if err
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation())
    {
        return DuplicateSku(sku.to_string()).into();
    }
    err.into()
}

pub struct ProductPostgresRepository {
    pool: Arc<PgPool>,
}

impl ProductPostgresRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    sku: String,
    name: String,
    description: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Product {
            id: r.id,
            sku: r.sku,
            name: r.name,
            description: r.description,
            active: r.active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// ILIKE 用の部分一致パターン。ワイルドカード文字はエスケープする。
fn contains_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" WHERE TRUE");
    if let Some(sku) = &filter.sku {
        qb.push(" AND sku ILIKE ").push_bind(contains_pattern(sku));
    }
    if let Some(name) = &filter.name {
        qb.push(" AND name ILIKE ").push_bind(contains_pattern(name));
    }
    if let Some(description) = &filter.description {
        qb.push(" AND description ILIKE ")
            .push_bind(contains_pattern(description));
    }
    if let Some(active) = filter.active {
        qb.push(" AND active = ").push_bind(active);
    }
}

#[async_trait]
impl ProductRepository for ProductPostgresRepository {
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Product>> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM products WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool.as_ref())
                .await?;
        Ok(row.map(Into::into))
    }

    async fn find_by_sku(&self, sku: &str) -> anyhow::Result<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM products WHERE lower(sku) = lower($1)"
        ))
        .bind(sku)
        .fetch_optional(self.pool.as_ref())
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_all(
        &self,
        filter: &ProductFilter,
        page: u32,
        page_size: u32,
    ) -> anyhow::Result<(Vec<Product>, u64)> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM products");
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(self.pool.as_ref())
            .await?;

        let limit = i64::from(page_size);
        let offset = i64::from(page.saturating_sub(1)) * limit;
        let mut query = QueryBuilder::new(format!("SELECT {COLUMNS} FROM products"));
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows: Vec<ProductRow> = query
            .build_query_as()
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok((
            rows.into_iter().map(Into::into).collect(),
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    async fn create(&self, product: &NewProduct) -> anyhow::Result<Product> {
        let now = Utc::now();
        let row: ProductRow = sqlx::query_as(&format!(
            "INSERT INTO products (sku, name, description, active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) RETURNING {COLUMNS}"
        ))
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.active)
        .bind(now)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| sku_error(e, &product.sku))?;
        Ok(row.into())
    }

    async fn update(&self, product: &Product) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE products \
             SET sku = $2, name = $3, description = $4, active = $5, updated_at = $6 \
             WHERE id = $1",
        )
        .bind(product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.active)
        .bind(product.updated_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| sku_error(e, &product.sku))?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM products")
            .execute(self.pool.as_ref())
            .await?;
        Ok(result.rows_affected())
    }

    async fn begin_import(&self) -> anyhow::Result<Box<dyn ProductImportSession>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresImportSession {
            pool: self.pool.clone(),
            tx: Some(tx),
        }))
    }
}

/// PostgresImportSession はインポートジョブ専用のトランザクションを保持する。
/// commit 後の最初の操作で次のトランザクションを開始する。
/// commit されずに破棄されたトランザクションはロールバックされる。
pub struct PostgresImportSession {
    pool: Arc<PgPool>,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PostgresImportSession {
    async fn tx(&mut self) -> anyhow::Result<&mut Transaction<'static, Postgres>> {
        if self.tx.is_none() {
            self.tx = Some(self.pool.begin().await?);
        }
        self.tx
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("import transaction is not open"))
    }
}

#[async_trait]
impl ProductImportSession for PostgresImportSession {
    async fn find_by_sku(&mut self, sku: &str) -> anyhow::Result<Option<Product>> {
        let tx = self.tx().await?;
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM products WHERE lower(sku) = lower($1)"
        ))
        .bind(sku)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn update(&mut self, product: &Product) -> anyhow::Result<()> {
        let tx = self.tx().await?;
        sqlx::query(
            "UPDATE products \
             SET name = $2, description = $3, active = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.active)
        .bind(product.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn insert_batch(&mut self, products: &[NewProduct]) -> anyhow::Result<Vec<Product>> {
        if products.is_empty() {
            return Ok(Vec::new());
        }
        let now = Utc::now();
        let mut qb = QueryBuilder::new(
            "INSERT INTO products (sku, name, description, active, created_at, updated_at) ",
        );
        qb.push_values(products, |mut b, p| {
            b.push_bind(p.sku.clone())
                .push_bind(p.name.clone())
                .push_bind(p.description.clone())
                .push_bind(p.active)
                .push_bind(now)
                .push_bind(now);
        });
        qb.push(format!(" RETURNING {COLUMNS}"));

        let tx = self.tx().await?;
        let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(&mut **tx).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn commit(&mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }
}
