//! Product handlers: catalog reads, admin writes, and the cascading delete.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use storefront_core::{ProductDraft, ProductPatch};
use storefront_db::{DbError, ProductRow};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::extract::{AdminUser, IdPath};
use super::reviews::{ReviewDetailItem, ReviewList};
use super::{json_body, map_core_error, map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(in crate::api) struct ProductItem {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub description: String,
    pub image: String,
    pub category: String,
    pub company: String,
    pub colors: Vec<String>,
    pub featured: bool,
    pub free_shipping: bool,
    pub inventory: i32,
    pub average_rating: Decimal,
    pub num_of_reviews: i32,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for ProductItem {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            public_id: row.public_id,
            name: row.name,
            price: row.price,
            description: row.description,
            image: row.image,
            category: row.category,
            company: row.company,
            colors: row.colors,
            featured: row.featured,
            free_shipping: row.free_shipping,
            inventory: row.inventory,
            average_rating: row.average_rating,
            num_of_reviews: row.num_of_reviews,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct ProductList {
    pub products: Vec<ProductItem>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct ProductDetail {
    pub product: ProductItem,
    pub reviews: Vec<ReviewDetailItem>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct DeletedProduct {
    pub deleted: bool,
    pub product_id: i64,
    pub reviews_deleted: u64,
}

fn product_not_found(req_id: &str, product_id: i64) -> ApiError {
    ApiError::new(
        req_id,
        "not_found",
        format!("no product with id {product_id}"),
    )
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/products
pub(in crate::api) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<ProductList>>, ApiError> {
    let rows = storefront_db::list_products(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let products: Vec<ProductItem> = rows.into_iter().map(ProductItem::from).collect();
    Ok(Json(ApiResponse {
        data: ProductList {
            count: products.len(),
            products,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/products/{id}: the product with its reviews.
pub(in crate::api) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    IdPath(product_id): IdPath,
) -> Result<Json<ApiResponse<ProductDetail>>, ApiError> {
    let rid = &req_id.0;
    let product = storefront_db::get_product(&state.pool, product_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| product_not_found(rid, product_id))?;
    let reviews = storefront_db::list_reviews_for_product(&state.pool, product_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ProductDetail {
            product: product.into(),
            reviews: reviews.into_iter().map(ReviewDetailItem::from).collect(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/products/{id}/reviews
pub(in crate::api) async fn list_product_reviews(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    IdPath(product_id): IdPath,
) -> Result<Json<ApiResponse<ReviewList>>, ApiError> {
    let rid = &req_id.0;
    storefront_db::get_product(&state.pool, product_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| product_not_found(rid, product_id))?;
    let rows = storefront_db::list_reviews_for_product(&state.pool, product_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let reviews: Vec<ReviewDetailItem> = rows.into_iter().map(ReviewDetailItem::from).collect();
    Ok(Json(ApiResponse {
        data: ReviewList {
            count: reviews.len(),
            reviews,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/products: admin only.
pub(in crate::api) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    AdminUser(admin): AdminUser,
    body: Result<Json<ProductDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ProductItem>>), ApiError> {
    let rid = &req_id.0;
    let draft = json_body(rid, body)?;
    let product = draft.validate().map_err(|e| map_core_error(rid, &e))?;

    let row = storefront_db::create_product(&state.pool, admin.id, &product)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(product_id = row.id, user_id = admin.id, "product created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: row.into(),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PATCH /api/v1/products/{id}: admin only, sparse.
pub(in crate::api) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    AdminUser(_admin): AdminUser,
    IdPath(product_id): IdPath,
    body: Result<Json<ProductPatch>, JsonRejection>,
) -> Result<Json<ApiResponse<ProductItem>>, ApiError> {
    let rid = &req_id.0;
    let patch = json_body(rid, body)?;
    let changes = patch.validate().map_err(|e| map_core_error(rid, &e))?;

    let row = storefront_db::update_product(&state.pool, product_id, &changes)
        .await
        .map_err(|e| match e {
            DbError::NotFound => product_not_found(rid, product_id),
            other => map_db_error(rid.clone(), &other),
        })?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/products/{id}: admin only. Removes the product's reviews
/// first, then the product, as one unit.
pub(in crate::api) async fn delete_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    AdminUser(_admin): AdminUser,
    IdPath(product_id): IdPath,
) -> Result<Json<ApiResponse<DeletedProduct>>, ApiError> {
    let rid = &req_id.0;
    let outcome = storefront_db::delete_product_cascade(&state.pool, product_id)
        .await
        .map_err(|e| match e {
            DbError::NotFound => product_not_found(rid, product_id),
            other => map_db_error(rid.clone(), &other),
        })?;

    Ok(Json(ApiResponse {
        data: DeletedProduct {
            deleted: true,
            product_id: outcome.product_id,
            reviews_deleted: outcome.reviews_deleted,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
