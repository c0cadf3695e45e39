use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::extract::AdminUser;
use super::{ApiError, ApiResponse, AppState, ResponseMeta};

const IMAGE_FIELD: &str = "image";

#[derive(Debug, Serialize)]
pub(in crate::api) struct UploadedImage {
    pub image: String,
}

/// Keeps the final path component and only `[A-Za-z0-9._-]`.
fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

fn multipart_error(req_id: &str, error: &axum::extract::multipart::MultipartError) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(req_id, "payload_too_large", "image exceeds the upload limit")
    } else {
        ApiError::new(req_id, "bad_request", error.body_text())
    }
}

/// POST /api/v1/products/upload-image: admin only, multipart field `image`.
pub(in crate::api) async fn upload_image(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    AdminUser(_admin): AdminUser,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadedImage>>, ApiError> {
    let rid = &req_id.0;

    let mut field = loop {
        match multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(rid, &e))?
        {
            Some(field) if field.name() == Some(IMAGE_FIELD) => break field,
            Some(_) => {}
            None => return Err(ApiError::new(rid, "bad_request", "no file uploaded")),
        }
    };

    let is_image = field
        .content_type()
        .is_some_and(|ct| ct.starts_with("image/"));
    if !is_image {
        return Err(ApiError::new(rid, "bad_request", "please upload an image"));
    }

    let file_name = format!(
        "{}-{}",
        Uuid::new_v4().simple(),
        sanitize_file_name(field.file_name().unwrap_or_default())
    );

    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(rid, &e))? {
        if bytes.len() + chunk.len() > state.uploads.max_bytes {
            return Err(ApiError::new(
                rid,
                "bad_request",
                format!(
                    "please upload an image smaller than {} bytes",
                    state.uploads.max_bytes
                ),
            ));
        }
        bytes.extend_from_slice(&chunk);
    }

    let write = async {
        tokio::fs::create_dir_all(&state.uploads.dir).await?;
        tokio::fs::write(state.uploads.dir.join(&file_name), &bytes).await
    };
    if let Err(e) = write.await {
        tracing::error!(error = %e, file_name = %file_name, "failed to store uploaded image");
        return Err(ApiError::new(rid, "internal_error", "failed to store image"));
    }

    tracing::info!(file_name = %file_name, size = bytes.len(), "product image uploaded");
    Ok(Json(ApiResponse {
        data: UploadedImage {
            image: format!("/uploads/{file_name}"),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
