use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use storefront_core::{check_permissions, Role, UserPatch};
use storefront_db::{DbError, UserRow};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::extract::{AdminUser, AuthUser, IdPath};
use super::{json_body, map_core_error, map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(in crate::api) struct MeItem {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct UserItem {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for UserItem {
    fn from(row: UserRow) -> Self {
        let role = row.role();
        Self {
            id: row.id,
            public_id: row.public_id,
            name: row.name,
            email: row.email,
            role,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct UserList {
    pub users: Vec<UserItem>,
    pub count: usize,
}

/// GET /api/v1/users/me
pub(in crate::api) async fn me(
    Extension(req_id): Extension<RequestId>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<MeItem>>, ApiError> {
    Ok(Json(ApiResponse {
        data: MeItem {
            id: user.id,
            public_id: user.public_id,
            name: user.name,
            email: user.email,
            role: user.role,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PATCH /api/v1/users/me: name and email only.
pub(in crate::api) async fn update_me(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    AuthUser(user): AuthUser,
    body: Result<Json<UserPatch>, JsonRejection>,
) -> Result<Json<ApiResponse<UserItem>>, ApiError> {
    let rid = &req_id.0;
    let changes = json_body(rid, body)?
        .validate()
        .map_err(|e| map_core_error(rid, &e))?;

    let row = storefront_db::update_user_profile(&state.pool, user.id, &changes)
        .await
        .map_err(|e| match e {
            DbError::DuplicateEmail(email) => ApiError::new(
                rid,
                "conflict",
                format!("email '{email}' is already registered"),
            ),
            other => map_db_error(rid.clone(), &other),
        })?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/users: admin only; customer accounts.
pub(in crate::api) async fn list_users(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<ApiResponse<UserList>>, ApiError> {
    let rows = storefront_db::list_users_by_role(&state.pool, Role::User)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let users: Vec<UserItem> = rows.into_iter().map(UserItem::from).collect();
    Ok(Json(ApiResponse {
        data: UserList {
            count: users.len(),
            users,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/users/{id}: the user themselves or an admin.
pub(in crate::api) async fn get_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    AuthUser(user): AuthUser,
    IdPath(user_id): IdPath,
) -> Result<Json<ApiResponse<UserItem>>, ApiError> {
    let rid = &req_id.0;
    check_permissions(&user.actor(), user_id).map_err(|e| map_core_error(rid, &e))?;

    let row = storefront_db::get_user(&state.pool, user_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", format!("no user with id {user_id}")))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
