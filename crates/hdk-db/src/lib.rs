//! hdk-db: persistence boundary for kitchen orders.
//!
//! [`OrderStore`] is the narrow contract the service layer consumes. Two
//! implementations ship:
//!
//! - [`PgOrderStore`]: Postgres via SQLx. The claim path uses
//!   `FOR UPDATE SKIP LOCKED` so concurrent preparers never wait on each
//!   other's in-flight claim.
//! - [`MemOrderStore`]: in-process store with the same observable
//!   semantics, including skip-locked claiming via per-row claim flags.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;

mod mem;
mod pg;
mod store;

pub use mem::MemOrderStore;
pub use pg::PgOrderStore;
pub use store::{OrderStore, StoreError};

/// Re-exported so consumers need no direct sqlx dependency.
pub use sqlx::PgPool;

pub const ENV_DB_URL: &str = "HDK_DATABASE_URL";

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='orders'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    let pending = if exists {
        let (n,): (i64,) = sqlx::query_as::<_, (i64,)>(
            "select count(*)::bigint from orders where order_status = 'ORDERED'",
        )
        .fetch_one(pool)
        .await
        .context("status pending-count query failed")?;
        n
    } else {
        0
    };

    Ok(DbStatus {
        ok,
        has_orders_table: exists,
        pending_orders: pending,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_orders_table: bool,
    /// Orders currently waiting in the claim queue.
    pub pending_orders: i64,
}
