use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;
use std::str::FromStr;

use super::{OrderStore, StoreError};
use crate::config::PostgresConfig;
use crate::domain::order::{Delivery, Item, Order, Payment};

// ============================================================================
// Postgres Order Store
// ============================================================================
//
// One row per order. Top-level scalar fields map to flat columns; Delivery,
// Payment and the item list are stored as opaque JSONB blobs that the store
// never interprets or indexes.
//
// ============================================================================

const CREATE_ORDERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS orders (
        order_uid          TEXT PRIMARY KEY,
        track_number       TEXT NOT NULL,
        entry              TEXT NOT NULL,
        delivery           JSONB NOT NULL,
        payment            JSONB NOT NULL,
        items              JSONB NOT NULL,
        locale             TEXT NOT NULL,
        internal_signature TEXT NOT NULL,
        customer_id        TEXT NOT NULL,
        delivery_service   TEXT NOT NULL,
        shardkey           TEXT NOT NULL,
        sm_id              BIGINT NOT NULL,
        date_created       TEXT NOT NULL,
        oof_shard          TEXT NOT NULL,
        updated_at         TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

const UPSERT_ORDER: &str = r#"
    INSERT INTO orders (
        order_uid, track_number, entry, delivery, payment, items, locale,
        internal_signature, customer_id, delivery_service, shardkey, sm_id,
        date_created, oof_shard, updated_at
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, now())
    ON CONFLICT (order_uid) DO UPDATE SET
        track_number       = EXCLUDED.track_number,
        entry              = EXCLUDED.entry,
        delivery           = EXCLUDED.delivery,
        payment            = EXCLUDED.payment,
        items              = EXCLUDED.items,
        locale             = EXCLUDED.locale,
        internal_signature = EXCLUDED.internal_signature,
        customer_id        = EXCLUDED.customer_id,
        delivery_service   = EXCLUDED.delivery_service,
        shardkey           = EXCLUDED.shardkey,
        sm_id              = EXCLUDED.sm_id,
        date_created       = EXCLUDED.date_created,
        oof_shard          = EXCLUDED.oof_shard,
        updated_at         = now()
"#;

const SELECT_COLUMNS: &str = "order_uid, track_number, entry, delivery, payment, items, locale, \
     internal_signature, customer_id, delivery_service, shardkey, sm_id, date_created, oof_shard";

/// Row shape of the `orders` table.
#[derive(Debug, FromRow)]
struct OrderRow {
    order_uid: String,
    track_number: String,
    entry: String,
    delivery: Json<Delivery>,
    payment: Json<Payment>,
    items: Json<Vec<Item>>,
    locale: String,
    internal_signature: String,
    customer_id: String,
    delivery_service: String,
    shardkey: String,
    sm_id: i64,
    date_created: String,
    oof_shard: String,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            order_uid: row.order_uid,
            track_number: row.track_number,
            entry: row.entry,
            delivery: row.delivery.0,
            payment: row.payment.0,
            items: row.items.0,
            locale: row.locale,
            internal_signature: row.internal_signature,
            customer_id: row.customer_id,
            delivery_service: row.delivery_service,
            shardkey: row.shardkey,
            sm_id: row.sm_id,
            date_created: row.date_created,
            oof_shard: row.oof_shard,
        }
    }
}

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Open the pool and make sure the database answers.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, StoreError> {
        let options = PgConnectOptions::from_str(&config.dsn())?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.db_name,
            "Connected to Postgres"
        );

        Ok(Self { pool })
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.pool.is_closed() {
            return Err(StoreError::Unavailable("connection pool closed".to_string()));
        }
        Ok(())
    }

    /// Create the `orders` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_ORDERS_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn upsert(&self, order: &Order) -> Result<(), StoreError> {
        self.ensure_open()?;
        sqlx::query(UPSERT_ORDER)
            .bind(&order.order_uid)
            .bind(&order.track_number)
            .bind(&order.entry)
            .bind(Json(&order.delivery))
            .bind(Json(&order.payment))
            .bind(Json(&order.items))
            .bind(&order.locale)
            .bind(&order.internal_signature)
            .bind(&order.customer_id)
            .bind(&order.delivery_service)
            .bind(&order.shardkey)
            .bind(order.sm_id)
            .bind(&order.date_created)
            .bind(&order.oof_shard)
            .execute(&self.pool)
            .await?;

        tracing::debug!(order_uid = %order.order_uid, "Upserted order");
        Ok(())
    }

    async fn get(&self, order_uid: &str) -> Result<Option<Order>, StoreError> {
        self.ensure_open()?;
        let query = format!("SELECT {SELECT_COLUMNS} FROM orders WHERE order_uid = $1");
        let row = sqlx::query_as::<_, OrderRow>(&query)
            .bind(order_uid)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Order::from))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Order>, StoreError> {
        self.ensure_open()?;
        let query = format!("SELECT {SELECT_COLUMNS} FROM orders ORDER BY updated_at DESC LIMIT $1");
        let rows = sqlx::query_as::<_, OrderRow>(&query)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Postgres pool closed");
    }
}
