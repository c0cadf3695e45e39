//! Order handlers. Checkout prices come from the catalog; payment is
//! recorded by the client echoing back its payment intent id.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storefront_core::{check_permissions, generate_client_secret, OrderDraft, OrderStatus};
use storefront_db::{DbError, OrderItemRow, OrderWithItems};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::extract::{AdminUser, AuthUser, IdPath};
use super::{json_body, map_core_error, map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

const MAX_PAYMENT_INTENT_LEN: usize = 255;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(in crate::api) struct PayOrderRequest {
    pub payment_intent_id: String,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(in crate::api) struct OrderLineItem {
    pub product: Option<i64>,
    pub name: String,
    pub image: String,
    pub price: Decimal,
    pub amount: i32,
}

impl From<OrderItemRow> for OrderLineItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            product: row.product_id,
            name: row.name,
            image: row.image,
            price: row.price,
            amount: row.amount,
        }
    }
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct OrderItem {
    pub id: i64,
    pub public_id: Uuid,
    pub status: OrderStatus,
    pub user_id: i64,
    pub items: Vec<OrderLineItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderWithItems> for OrderItem {
    fn from(value: OrderWithItems) -> Self {
        let status = value.order.status();
        let order = value.order;
        Self {
            id: order.id,
            public_id: order.public_id,
            status,
            user_id: order.user_id,
            items: value.items.into_iter().map(OrderLineItem::from).collect(),
            subtotal: order.subtotal,
            tax: order.tax,
            shipping_fee: order.shipping_fee,
            total: order.total,
            payment_intent_id: order.payment_intent_id,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct PlacedOrder {
    pub order: OrderItem,
    pub client_secret: String,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct OrderList {
    pub orders: Vec<OrderItem>,
    pub count: usize,
}

impl From<Vec<OrderWithItems>> for OrderList {
    fn from(rows: Vec<OrderWithItems>) -> Self {
        let orders: Vec<OrderItem> = rows.into_iter().map(OrderItem::from).collect();
        Self {
            count: orders.len(),
            orders,
        }
    }
}

fn order_not_found(req_id: &str, order_id: i64) -> ApiError {
    ApiError::new(req_id, "not_found", format!("no order with id {order_id}"))
}

async fn load_order(
    state: &AppState,
    req_id: &str,
    order_id: i64,
) -> Result<OrderWithItems, ApiError> {
    storefront_db::get_order(&state.pool, order_id)
        .await
        .map_err(|e| map_db_error(req_id.to_owned(), &e))?
        .ok_or_else(|| order_not_found(req_id, order_id))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/orders
pub(in crate::api) async fn create_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    AuthUser(user): AuthUser,
    body: Result<Json<OrderDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<PlacedOrder>>), ApiError> {
    let rid = &req_id.0;
    let request = json_body(rid, body)?
        .validate()
        .map_err(|e| map_core_error(rid, &e))?;

    let client_secret = generate_client_secret();
    let placed = storefront_db::create_order(&state.pool, user.id, &request, &client_secret)
        .await
        .map_err(|e| match e {
            DbError::MissingProduct(id) => {
                ApiError::new(rid, "not_found", format!("no product with id {id}"))
            }
            DbError::Validation(core) => map_core_error(rid, &core),
            other => map_db_error(rid.clone(), &other),
        })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: PlacedOrder {
                order: placed.into(),
                client_secret,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/orders: admin only.
pub(in crate::api) async fn list_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<ApiResponse<OrderList>>, ApiError> {
    let rows = storefront_db::list_orders(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse {
        data: rows.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/orders/mine
pub(in crate::api) async fn my_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<OrderList>>, ApiError> {
    let rows = storefront_db::list_orders_for_user(&state.pool, user.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse {
        data: rows.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/orders/{id}: owner or admin.
pub(in crate::api) async fn get_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    AuthUser(user): AuthUser,
    IdPath(order_id): IdPath,
) -> Result<Json<ApiResponse<OrderItem>>, ApiError> {
    let rid = &req_id.0;
    let order = load_order(&state, rid, order_id).await?;
    check_permissions(&user.actor(), order.order.user_id).map_err(|e| map_core_error(rid, &e))?;

    Ok(Json(ApiResponse {
        data: order.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PATCH /api/v1/orders/{id}: owner or admin; marks a pending order paid.
pub(in crate::api) async fn pay_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    AuthUser(user): AuthUser,
    IdPath(order_id): IdPath,
    body: Result<Json<PayOrderRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<OrderItem>>, ApiError> {
    let rid = &req_id.0;
    let body = json_body(rid, body)?;
    let payment_intent_id = body.payment_intent_id.trim();
    if payment_intent_id.is_empty() || payment_intent_id.len() > MAX_PAYMENT_INTENT_LEN {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("payment_intent_id must be 1-{MAX_PAYMENT_INTENT_LEN} characters"),
        ));
    }

    let existing = load_order(&state, rid, order_id).await?;
    check_permissions(&user.actor(), existing.order.user_id)
        .map_err(|e| map_core_error(rid, &e))?;

    let paid = storefront_db::mark_order_paid(&state.pool, order_id, payment_intent_id)
        .await
        .map_err(|e| match e {
            DbError::NotFound => order_not_found(rid, order_id),
            DbError::OrderNotPending { status, .. } => ApiError::new(
                rid,
                "conflict",
                format!("order {order_id} is already {status}"),
            ),
            other => map_db_error(rid.clone(), &other),
        })?;

    Ok(Json(ApiResponse {
        data: paid.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
