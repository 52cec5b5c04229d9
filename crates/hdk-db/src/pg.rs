//! Postgres-backed [`OrderStore`].
//!
//! # Claim protocol
//!
//! `claim_next_ordered` runs one transaction:
//!
//! ```text
//! begin
//!   select ... from orders
//!    where order_status = 'ORDERED'
//!    order by order_time asc, id asc
//!    limit 1
//!    for update skip locked          -- rows held by other claims are skipped
//!   update orders set order_status = 'IN_PREPARATION', prepared_by, preparation_time
//! commit
//! ```
//!
//! A concurrent claimer never blocks on a row another claim holds; it moves
//! on to the next eligible row, or gets nothing. Under contention a later
//! order may therefore be served before an earlier one that is momentarily
//! locked.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use hdk_domain::lifecycle::{self, StatusChange};
use hdk_domain::{
    Item, ItemId, ItemKind, Order, OrderFilter, OrderId, OrderStatus, PaymentType, Price, Toppings,
};
use sqlx::postgres::{PgExecutor, PgRow};
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::store::{OrderStore, StoreError};

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
    /// Zone in which the date filter evaluates `order_time`.
    tz: Tz,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self::with_time_zone(pool, Tz::UTC)
    }

    pub fn with_time_zone(pool: PgPool, tz: Tz) -> Self {
        Self { pool, tz }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
    let status_raw: String = row.try_get("order_status")?;
    let status =
        OrderStatus::parse(&status_raw).map_err(|e| StoreError::Corrupt(e.to_string()))?;

    let payment_type = row
        .try_get::<Option<String>, _>("payment_type")?
        .map(|s| PaymentType::parse(&s))
        .transpose()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;

    Ok(Order {
        id: Some(OrderId(row.try_get("id")?)),
        status,
        ordered_by: row.try_get("ordered_by")?,
        prepared_by: row.try_get("prepared_by")?,
        order_time: row.try_get("order_time")?,
        preparation_time: row.try_get("preparation_time")?,
        customer_name: row.try_get("customer_name")?,
        payment_type,
        total_price: Price::from_micros(row.try_get("total_price_micros")?),
        items: Vec::new(),
    })
}

fn item_from_row(row: &PgRow) -> Result<Item, StoreError> {
    let kind_raw: String = row.try_get("kind")?;
    let kind = ItemKind::parse(&kind_raw).map_err(|e| StoreError::Corrupt(e.to_string()))?;

    Ok(Item {
        id: Some(ItemId(row.try_get("id")?)),
        order_id: Some(OrderId(row.try_get("order_id")?)),
        kind,
        toppings: Toppings {
            with_ketchup: row.try_get("with_ketchup")?,
            with_mustard: row.try_get("with_mustard")?,
            with_mayo: row.try_get("with_mayo")?,
            with_onions: row.try_get("with_onions")?,
            vege: row.try_get("is_vege")?,
        },
        comment: row.try_get("comment")?,
        price: Price::from_micros(row.try_get("price_micros")?),
    })
}

/// Items of `order_ids`, grouped by order, each group in position order.
async fn load_items<'e, E>(
    exec: E,
    order_ids: &[i64],
) -> Result<HashMap<i64, Vec<Item>>, StoreError>
where
    E: PgExecutor<'e>,
{
    let mut grouped: HashMap<i64, Vec<Item>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(grouped);
    }

    let rows = sqlx::query(
        r#"
        select
          id, order_id, kind,
          with_ketchup, with_mustard, with_mayo, with_onions, is_vege,
          comment, price_micros
        from order_items
        where order_id = any($1)
        order by order_id, position
        "#,
    )
    .bind(order_ids)
    .fetch_all(exec)
    .await?;

    for row in &rows {
        let item = item_from_row(row)?;
        let owner = item.order_id.map(|o| o.0).unwrap_or_default();
        grouped.entry(owner).or_default().push(item);
    }
    Ok(grouped)
}

fn attach_items(orders: &mut [Order], mut grouped: HashMap<i64, Vec<Item>>) {
    for order in orders {
        if let Some(OrderId(id)) = order.id {
            order.items = grouped.remove(&id).unwrap_or_default();
        }
    }
}

// ---------------------------------------------------------------------------
// OrderStore
// ---------------------------------------------------------------------------

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn save(&self, mut order: Order) -> Result<Order, StoreError> {
        lifecycle::reprice(&mut order)?;
        let mut tx = self.pool.begin().await?;

        let id: i64 = match order.id {
            None => {
                let (id,): (i64,) = sqlx::query_as::<_, (i64,)>(
                    r#"
                    insert into orders (
                      order_status, ordered_by, prepared_by, order_time, preparation_time,
                      customer_name, payment_type, total_price_micros
                    ) values (
                      $1, $2, $3, $4, $5, $6, $7, $8
                    )
                    returning id
                    "#,
                )
                .bind(order.status.as_str())
                .bind(&order.ordered_by)
                .bind(&order.prepared_by)
                .bind(order.order_time)
                .bind(order.preparation_time)
                .bind(&order.customer_name)
                .bind(order.payment_type.map(|p| p.as_str()))
                .bind(order.total_price.micros())
                .fetch_one(&mut *tx)
                .await?;
                id
            }
            Some(OrderId(id)) => {
                let res = sqlx::query(
                    r#"
                    update orders
                    set order_status = $2,
                        ordered_by = $3,
                        prepared_by = $4,
                        order_time = $5,
                        preparation_time = $6,
                        customer_name = $7,
                        payment_type = $8,
                        total_price_micros = $9
                    where id = $1
                    "#,
                )
                .bind(id)
                .bind(order.status.as_str())
                .bind(&order.ordered_by)
                .bind(&order.prepared_by)
                .bind(order.order_time)
                .bind(order.preparation_time)
                .bind(&order.customer_name)
                .bind(order.payment_type.map(|p| p.as_str()))
                .bind(order.total_price.micros())
                .execute(&mut *tx)
                .await?;

                if res.rows_affected() == 0 {
                    return Err(StoreError::UnknownOrder(OrderId(id)));
                }

                sqlx::query("delete from order_items where order_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                id
            }
        };

        order.id = Some(OrderId(id));
        for (position, item) in order.items.iter_mut().enumerate() {
            let (item_id,): (i64,) = sqlx::query_as::<_, (i64,)>(
                r#"
                insert into order_items (
                  order_id, position, kind,
                  with_ketchup, with_mustard, with_mayo, with_onions, is_vege,
                  comment, price_micros
                ) values (
                  $1, $2, $3, $4, $5, $6, $7, $8, $9, $10
                )
                returning id
                "#,
            )
            .bind(id)
            .bind(position as i32)
            .bind(item.kind.as_str())
            .bind(item.toppings.with_ketchup)
            .bind(item.toppings.with_mustard)
            .bind(item.toppings.with_mayo)
            .bind(item.toppings.with_onions)
            .bind(item.toppings.vege)
            .bind(&item.comment)
            .bind(item.price.micros())
            .fetch_one(&mut *tx)
            .await?;
            item.id = Some(ItemId(item_id));
        }
        order.adopt_items();

        tx.commit().await?;
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            r#"
            select
              id, order_status, ordered_by, prepared_by, order_time, preparation_time,
              customer_name, payment_type, total_price_micros
            from orders
            where id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut order = order_from_row(&row)?;
        let grouped = load_items(&self.pool, &[id.0]).await?;
        attach_items(std::slice::from_mut(&mut order), grouped);
        Ok(Some(order))
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let row = sqlx::query(
            r#"
            select
              id, order_id, kind,
              with_ketchup, with_mustard, with_mayo, with_onions, is_vege,
              comment, price_micros
            from order_items
            where id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            r#"
            select
              o.id, o.order_status, o.ordered_by, o.prepared_by, o.order_time,
              o.preparation_time, o.customer_name, o.payment_type, o.total_price_micros
            from orders o
            where ($1::date is null or (o.order_time at time zone $2)::date = $1)
              and ($3::text is null or o.order_status = $3)
              and ($4::text is null or o.ordered_by = $4)
            order by o.order_time desc, o.preparation_time desc nulls first, o.id desc
            "#,
        )
        .bind(filter.date)
        .bind(self.tz.name())
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.ordered_by.as_deref())
        .fetch_all(&self.pool)
        .await?;

        let mut orders = rows
            .iter()
            .map(order_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        let ids: Vec<i64> = orders.iter().filter_map(|o| o.id.map(|i| i.0)).collect();
        let grouped = load_items(&self.pool, &ids).await?;
        attach_items(&mut orders, grouped);
        Ok(orders)
    }

    async fn claim_next_ordered(
        &self,
        preparer: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            select
              id, order_status, ordered_by, prepared_by, order_time, preparation_time,
              customer_name, payment_type, total_price_micros
            from orders
            where order_status = 'ORDERED'
            order by order_time asc, id asc
            limit 1
            for update skip locked
            "#,
        )
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut order = order_from_row(&row)?;
        let id = order.id.map(|i| i.0).unwrap_or_default();
        let grouped = load_items(&mut *tx, &[id]).await?;
        attach_items(std::slice::from_mut(&mut order), grouped);

        lifecycle::claim(&mut order, preparer, now)?;

        sqlx::query(
            r#"
            update orders
            set order_status = $2,
                prepared_by = $3,
                preparation_time = $4
            where id = $1
            "#,
        )
        .bind(id)
        .bind(order.status.as_str())
        .bind(&order.prepared_by)
        .bind(order.preparation_time)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(order_id = id, preparer, "pg claim committed");
        Ok(Some(order))
    }

    async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<(Order, StatusChange)>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // plain FOR UPDATE: a status update may wait for an in-flight claim
        let row = sqlx::query(
            r#"
            select
              id, order_status, ordered_by, prepared_by, order_time, preparation_time,
              customer_name, payment_type, total_price_micros
            from orders
            where id = $1
            for update
            "#,
        )
        .bind(id.0)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut order = order_from_row(&row)?;
        let change = lifecycle::apply_status(&mut order, status, now);

        sqlx::query(
            r#"
            update orders
            set order_status = $2,
                preparation_time = $3
            where id = $1
            "#,
        )
        .bind(id.0)
        .bind(order.status.as_str())
        .bind(order.preparation_time)
        .execute(&mut *tx)
        .await?;

        let grouped = load_items(&mut *tx, &[id.0]).await?;
        attach_items(std::slice::from_mut(&mut order), grouped);

        tx.commit().await?;
        Ok(Some((order, change)))
    }

    async fn delete(&self, id: OrderId) -> Result<bool, StoreError> {
        // order_items rows go with it (on delete cascade)
        let res = sqlx::query("delete from orders where id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
