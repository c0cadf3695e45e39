//! Database operations for `orders` and `order_items`.
//!
//! Line prices are copied from `products` inside the insert transaction, so
//! an order records what the catalog charged at the time it was placed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use storefront_core::{order_totals, OrderRequest, OrderStatus};
use uuid::Uuid;

use crate::DbError;

const ORDER_COLUMNS: &str = "id, public_id, tax, shipping_fee, subtotal, total, status, user_id, \
                             client_secret, payment_intent_id, created_at, updated_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub public_id: Uuid,
    pub tax: Decimal,
    pub shipping_fee: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub status: String,
    pub user_id: i64,
    pub client_secret: String,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    /// Parsed status; the schema constrains the column to known values.
    #[must_use]
    pub fn status(&self) -> OrderStatus {
        self.status.parse().unwrap_or(OrderStatus::Pending)
    }
}

/// One purchased line. `product_id` is `None` once the product is deleted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: i64,
    pub order_id: i64,
    pub product_id: Option<i64>,
    pub name: String,
    pub image: String,
    pub price: Decimal,
    pub amount: i32,
}

#[derive(Debug, Clone)]
pub struct OrderWithItems {
    pub order: OrderRow,
    pub items: Vec<OrderItemRow>,
}

#[derive(Debug, sqlx::FromRow)]
struct CatalogLine {
    id: i64,
    name: String,
    image: String,
    price: Decimal,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Places an order for `user_id` priced from the current catalog.
///
/// Each referenced product is locked `FOR KEY SHARE` until commit, so a
/// concurrent cascade delete waits for the order to land (after which the
/// line's `product_id` is nulled rather than the order being lost).
///
/// # Errors
///
/// Returns [`DbError::MissingProduct`] for the first line whose product does
/// not exist, [`DbError::Validation`] when the total overflows, or
/// [`DbError::Sqlx`] if any statement fails. Nothing is written on error.
pub async fn create_order(
    pool: &PgPool,
    user_id: i64,
    request: &OrderRequest,
    client_secret: &str,
) -> Result<OrderWithItems, DbError> {
    let mut tx = pool.begin().await?;

    let mut priced = Vec::with_capacity(request.lines.len());
    for line in &request.lines {
        let product = sqlx::query_as::<_, CatalogLine>(
            "SELECT id, name, image, price FROM products WHERE id = $1 FOR KEY SHARE",
        )
        .bind(line.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::MissingProduct(line.product_id))?;
        priced.push((product, line.amount));
    }

    let totals = order_totals(
        priced.iter().map(|(product, amount)| (product.price, *amount)),
        request.tax,
        request.shipping_fee,
    )?;

    let order = sqlx::query_as::<_, OrderRow>(&format!(
        "INSERT INTO orders (tax, shipping_fee, subtotal, total, user_id, client_secret) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(request.tax)
    .bind(request.shipping_fee)
    .bind(totals.subtotal)
    .bind(totals.total)
    .bind(user_id)
    .bind(client_secret)
    .fetch_one(&mut *tx)
    .await?;

    let mut items = Vec::with_capacity(priced.len());
    for (product, amount) in &priced {
        items.push(insert_item(&mut tx, order.id, product, *amount).await?);
    }

    tx.commit().await?;

    tracing::info!(
        order_id = order.id,
        user_id,
        lines = items.len(),
        total = %order.total,
        "order placed"
    );
    Ok(OrderWithItems { order, items })
}

async fn insert_item(
    conn: &mut PgConnection,
    order_id: i64,
    product: &CatalogLine,
    amount: i32,
) -> Result<OrderItemRow, DbError> {
    let row = sqlx::query_as::<_, OrderItemRow>(
        "INSERT INTO order_items (order_id, product_id, name, image, price, amount) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id, order_id, product_id, name, image, price, amount",
    )
    .bind(order_id)
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.image)
    .bind(product.price)
    .bind(amount)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

/// Records a payment and moves a pending order to `paid`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the order does not exist,
/// [`DbError::OrderNotPending`] if it already left `pending`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn mark_order_paid(
    pool: &PgPool,
    order_id: i64,
    payment_intent_id: &str,
) -> Result<OrderWithItems, DbError> {
    let updated = sqlx::query_as::<_, OrderRow>(&format!(
        "UPDATE orders \
         SET status = 'paid', payment_intent_id = $2, updated_at = NOW() \
         WHERE id = $1 AND status = 'pending' \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order_id)
    .bind(payment_intent_id)
    .fetch_optional(pool)
    .await?;

    let Some(order) = updated else {
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(pool)
            .await?;
        return Err(match status {
            Some(status) => DbError::OrderNotPending { order_id, status },
            None => DbError::NotFound,
        });
    };

    tracing::info!(order_id, "order paid");
    let mut orders = attach_items(pool, vec![order]).await?;
    orders.pop().ok_or(DbError::NotFound)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Every order, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_orders(pool: &PgPool) -> Result<Vec<OrderWithItems>, DbError> {
    let orders = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await?;
    attach_items(pool, orders).await
}

/// Orders placed by `user_id`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_orders_for_user(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<OrderWithItems>, DbError> {
    let orders = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    attach_items(pool, orders).await
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_order(pool: &PgPool, order_id: i64) -> Result<Option<OrderWithItems>, DbError> {
    let order = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
    ))
    .bind(order_id)
    .fetch_optional(pool)
    .await?;

    match order {
        Some(order) => Ok(attach_items(pool, vec![order]).await?.pop()),
        None => Ok(None),
    }
}

async fn attach_items(
    pool: &PgPool,
    orders: Vec<OrderRow>,
) -> Result<Vec<OrderWithItems>, DbError> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let rows = sqlx::query_as::<_, OrderItemRow>(
        "SELECT id, order_id, product_id, name, image, price, amount \
         FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut by_order: HashMap<i64, Vec<OrderItemRow>> = HashMap::new();
    for row in rows {
        by_order.entry(row.order_id).or_default().push(row);
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = by_order.remove(&order.id).unwrap_or_default();
            OrderWithItems { order, items }
        })
        .collect())
}
