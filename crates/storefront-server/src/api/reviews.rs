//! Review handlers. Every write goes through the db layer, which keeps the
//! product's rating fields in step inside the same transaction.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storefront_core::{check_permissions, validate_comment, validate_title, Rating};
use storefront_db::{DbError, NewReview, ReviewChanges, ReviewDetailRow, ReviewRow};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::extract::{AuthUser, IdPath};
use super::{json_body, map_core_error, map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(in crate::api) struct CreateReviewRequest {
    pub product: i64,
    pub rating: i64,
    pub title: String,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(in crate::api) struct UpdateReviewRequest {
    pub rating: Option<i64>,
    pub title: Option<String>,
    pub comment: Option<String>,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(in crate::api) struct ReviewItem {
    pub id: i64,
    pub public_id: Uuid,
    pub rating: i16,
    pub title: String,
    pub comment: String,
    pub user_id: i64,
    pub product_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for ReviewItem {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            public_id: row.public_id,
            rating: row.rating,
            title: row.title,
            comment: row.comment,
            user_id: row.user_id,
            product_id: row.product_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct ReviewAuthor {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct ReviewProduct {
    pub id: i64,
    pub name: String,
    pub company: String,
    pub price: Decimal,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct ReviewDetailItem {
    pub id: i64,
    pub public_id: Uuid,
    pub rating: i16,
    pub title: String,
    pub comment: String,
    pub user: ReviewAuthor,
    pub product: ReviewProduct,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReviewDetailRow> for ReviewDetailItem {
    fn from(row: ReviewDetailRow) -> Self {
        Self {
            id: row.id,
            public_id: row.public_id,
            rating: row.rating,
            title: row.title,
            comment: row.comment,
            user: ReviewAuthor {
                id: row.user_id,
                name: row.user_name,
            },
            product: ReviewProduct {
                id: row.product_id,
                name: row.product_name,
                company: row.product_company,
                price: row.product_price,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct ReviewList {
    pub reviews: Vec<ReviewDetailItem>,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn review_not_found(req_id: &str, review_id: i64) -> ApiError {
    ApiError::new(req_id, "not_found", format!("no review with id {review_id}"))
}

async fn load_review(
    state: &AppState,
    req_id: &str,
    review_id: i64,
) -> Result<ReviewDetailRow, ApiError> {
    storefront_db::get_review(&state.pool, review_id)
        .await
        .map_err(|e| map_db_error(req_id.to_owned(), &e))?
        .ok_or_else(|| review_not_found(req_id, review_id))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/reviews
pub(in crate::api) async fn list_reviews(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<ReviewList>>, ApiError> {
    let rows = storefront_db::list_reviews(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let reviews: Vec<ReviewDetailItem> = rows.into_iter().map(ReviewDetailItem::from).collect();
    Ok(Json(ApiResponse {
        data: ReviewList {
            count: reviews.len(),
            reviews,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/reviews/{id}
pub(in crate::api) async fn get_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    IdPath(review_id): IdPath,
) -> Result<Json<ApiResponse<ReviewDetailItem>>, ApiError> {
    let row = load_review(&state, &req_id.0, review_id).await?;
    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/reviews: one review per user per product.
pub(in crate::api) async fn create_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    AuthUser(user): AuthUser,
    body: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewItem>>), ApiError> {
    let rid = &req_id.0;
    let body = json_body(rid, body)?;

    let review = NewReview {
        user_id: user.id,
        product_id: body.product,
        rating: Rating::new(body.rating).map_err(|e| map_core_error(rid, &e))?,
        title: validate_title(&body.title).map_err(|e| map_core_error(rid, &e))?,
        comment: validate_comment(&body.comment).map_err(|e| map_core_error(rid, &e))?,
    };

    let row = storefront_db::create_review(&state.pool, &review)
        .await
        .map_err(|e| match e {
            DbError::NotFound => ApiError::new(
                rid,
                "not_found",
                format!("no product with id {}", review.product_id),
            ),
            DbError::DuplicateReview { .. } => ApiError::new(
                rid,
                "conflict",
                "already submitted a review for this product",
            ),
            other => map_db_error(rid.clone(), &other),
        })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: row.into(),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PATCH /api/v1/reviews/{id}: owner or admin.
pub(in crate::api) async fn update_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    AuthUser(user): AuthUser,
    IdPath(review_id): IdPath,
    body: Result<Json<UpdateReviewRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ReviewItem>>, ApiError> {
    let rid = &req_id.0;
    let body = json_body(rid, body)?;

    let changes = ReviewChanges {
        rating: body
            .rating
            .map(Rating::new)
            .transpose()
            .map_err(|e| map_core_error(rid, &e))?,
        title: body
            .title
            .as_deref()
            .map(validate_title)
            .transpose()
            .map_err(|e| map_core_error(rid, &e))?,
        comment: body
            .comment
            .as_deref()
            .map(validate_comment)
            .transpose()
            .map_err(|e| map_core_error(rid, &e))?,
    };

    let existing = load_review(&state, rid, review_id).await?;
    check_permissions(&user.actor(), existing.user_id).map_err(|e| map_core_error(rid, &e))?;

    let row = storefront_db::update_review(&state.pool, review_id, &changes)
        .await
        .map_err(|e| match e {
            DbError::NotFound => review_not_found(rid, review_id),
            other => map_db_error(rid.clone(), &other),
        })?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/reviews/{id}: owner or admin.
pub(in crate::api) async fn delete_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    AuthUser(user): AuthUser,
    IdPath(review_id): IdPath,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;
    let existing = load_review(&state, rid, review_id).await?;
    check_permissions(&user.actor(), existing.user_id).map_err(|e| map_core_error(rid, &e))?;

    storefront_db::delete_review(&state.pool, review_id)
        .await
        .map_err(|e| match e {
            DbError::NotFound => review_not_found(rid, review_id),
            other => map_db_error(rid.clone(), &other),
        })?;

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}
