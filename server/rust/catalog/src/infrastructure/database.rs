use sqlx::PgPool;

/// 起動時に作成するテーブルとインデックス。
/// sku の一意性は lower(sku) のユニークインデックスで大文字小文字を区別せずに保証する。
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS products (\
        id BIGSERIAL PRIMARY KEY, \
        sku VARCHAR(255) NOT NULL, \
        name VARCHAR(255) NOT NULL, \
        description TEXT, \
        active BOOLEAN NOT NULL DEFAULT TRUE, \
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(), \
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW())",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_products_sku_lower ON products (lower(sku))",
    "CREATE INDEX IF NOT EXISTS idx_products_active ON products (active)",
    "CREATE TABLE IF NOT EXISTS webhooks (\
        id BIGSERIAL PRIMARY KEY, \
        url VARCHAR(2048) NOT NULL, \
        event_type VARCHAR(32) NOT NULL, \
        enabled BOOLEAN NOT NULL DEFAULT TRUE, \
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW())",
    "CREATE INDEX IF NOT EXISTS idx_webhooks_event_type ON webhooks (event_type, enabled)",
];

/// PostgreSQL 接続プールを作成する。
pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;
    Ok(pool)
}

/// ensure_schema はテーブルが存在しなければ作成する。
pub async fn ensure_schema(pool: &PgPool) -> anyhow::Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::info!("database schema ready");
    Ok(())
}
