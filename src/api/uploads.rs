// src/api/uploads.rs

use actix_multipart::Multipart;
use actix_web::{post, web, HttpResponse, Responder};
use chrono::Utc;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::s3_utils::{self, UPLOAD_URL_TTL_SECS};
use crate::security;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUrlRequest {
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
}

/// Mints a write-scoped upload URL after type/size checks. The key is
/// `uploads/{user}/{millis}-{name}`, so collisions need the same user, name
/// and millisecond.
#[utoipa::path(
    post,
    path = "/uploads/presigned-url",
    tag = "uploads",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "Presigned PUT URL and object key"),
        (status = 400, description = "Disallowed type or size"),
        (status = 500, description = "Server error")
    )
)]
#[post("/uploads/presigned-url")]
pub async fn presigned_url(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    payload: web::Json<PresignedUrlRequest>,
) -> impl Responder {
    let user_id = *user_id;

    if !security::allowed_mime_type(&payload.file_type) {
        return HttpResponse::BadRequest().json(json!({
            "error": "Invalid file type. Only Excel and CSV files are allowed."
        }));
    }

    if !security::validate_file_size(payload.file_size) {
        return HttpResponse::BadRequest().json(json!({
            "error": "File size too large. Maximum size is 50MB."
        }));
    }

    let file_name = security::sanitize_file_name(&payload.file_name);
    let key = format!("uploads/{}/{}-{}", user_id, Utc::now().timestamp_millis(), file_name);

    match s3_utils::presign_upload(
        &state.s3_client,
        &state.s3_bucket,
        &key,
        &payload.file_type,
        UPLOAD_URL_TTL_SECS,
    )
    .await
    {
        Ok(url) => HttpResponse::Ok().json(json!({ "presignedUrl": url, "key": key })),
        Err(e) => {
            log::error!("presign upload error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Multipart file validation: allowed type, size ceiling, byte-signature
/// scan. Rate limited to 5 requests per minute per user.
#[utoipa::path(
    post,
    path = "/uploads/validate",
    tag = "uploads",
    responses(
        (status = 200, description = "File passed validation"),
        (status = 400, description = "Validation or security scan failed"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
#[post("/uploads/validate")]
pub async fn validate_upload(
    mut payload: Multipart,
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
) -> impl Responder {
    let user_id = *user_id;

    let decision = state
        .rate_limiter
        .check(&format!("upload_validate_{user_id}"), 5, 60_000);
    if !decision.allowed {
        return HttpResponse::TooManyRequests().json(json!({
            "error": "Rate limit exceeded",
            "remainingRequests": decision.remaining,
            "resetTime": decision.reset_at_ms,
        }));
    }

    let mut file_bytes: Vec<u8> = Vec::new();
    let mut file_name = String::new();
    let mut file_type = String::new();

    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(f) => f,
            Err(_) => continue,
        };

        let cd = field.content_disposition();
        if cd.get_name() != Some("file") {
            continue;
        }
        if let Some(name) = cd.get_filename() {
            file_name = name.to_string();
        }
        if let Some(mime) = field.content_type() {
            file_type = mime.to_string();
        }

        while let Some(chunk) = field.next().await {
            if let Ok(data) = chunk {
                file_bytes.extend_from_slice(&data);
            }
        }
    }

    if file_name.is_empty() && file_bytes.is_empty() {
        return HttpResponse::BadRequest().json(json!({ "error": "No file provided" }));
    }

    if !security::validate_file_type(&file_name, &file_type) {
        return HttpResponse::BadRequest().json(json!({
            "error": "Invalid file type. Only Excel and CSV files are allowed."
        }));
    }

    if !security::validate_file_size(file_bytes.len() as i64) {
        return HttpResponse::BadRequest().json(json!({
            "error": "File size too large. Maximum size is 50MB."
        }));
    }

    let report = security::scan_buffer(&file_bytes);
    if !report.safe {
        return HttpResponse::BadRequest().json(json!({
            "error": "Security scan failed",
            "threats": report.threats,
        }));
    }

    HttpResponse::Ok().json(json!({
        "valid": true,
        "fileName": file_name,
        "fileSize": file_bytes.len(),
        "fileType": file_type,
        "scanResult": {
            "safe": report.safe,
            "scannedAt": Utc::now().to_rfc3339(),
        },
    }))
}
