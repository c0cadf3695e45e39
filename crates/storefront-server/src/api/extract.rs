//! Identity extractors layered on top of the `resolve_user` middleware, and
//! a numeric path id that rejects with the JSON error envelope.

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use storefront_core::Role;

use crate::middleware::{CurrentUser, RequestId};

use super::ApiError;

/// Any authenticated user. Rejects anonymous requests with 401.
#[derive(Debug, Clone)]
pub(crate) struct AuthUser(pub CurrentUser);

/// An authenticated admin. Rejects anonymous requests with 401 and
/// non-admins with 403.
#[derive(Debug, Clone)]
pub(crate) struct AdminUser(pub CurrentUser);

fn request_id(parts: &Parts) -> String {
    parts
        .extensions
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default()
}

fn current_user(parts: &Parts) -> Result<CurrentUser, ApiError> {
    parts
        .extensions
        .get::<CurrentUser>()
        .cloned()
        .ok_or_else(|| ApiError::new(request_id(parts), "unauthorized", "authentication required"))
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts).map(AuthUser)
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts)?;
        if user.role != Role::Admin {
            return Err(ApiError::new(
                request_id(parts),
                "forbidden",
                "admin role required",
            ));
        }
        Ok(AdminUser(user))
    }
}

/// A numeric `{id}` path segment. Anything else is a `bad_request`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IdPath(pub i64);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<i64>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(IdPath(id)),
            Err(rejection) => Err(ApiError::new(
                request_id(parts),
                "bad_request",
                format!("invalid id: {}", rejection.body_text()),
            )),
        }
    }
}
