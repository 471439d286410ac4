use crate::startup::AppState;
use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use service_core::error::AppError;
use std::time::Duration;

pub async fn convert_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
        })?
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("No file uploaded")))?;

    let filename = field.file_name().unwrap_or("unnamed").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    // The whole upload is buffered; peak memory is bounded by the size limit
    // plus the body-limit slack configured in startup.
    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e)))?
        .to_vec();

    if multipart
        .next_field()
        .await
        .map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
        })?
        .is_some()
    {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Request must contain exactly one file field"
        )));
    }

    let size = data.len();
    tracing::info!(
        filename = %filename,
        content_type = %content_type,
        size = size,
        "Received file for conversion"
    );

    // Reject oversized uploads before any conversion work starts.
    let limit = state.config.upload.max_size_bytes;
    if size > limit {
        tracing::warn!(
            filename = %filename,
            size = size,
            limit = limit,
            "Upload exceeds size limit"
        );
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "File size exceeds {} limit",
            state.config.upload.limit_display()
        )));
    }

    let converter = state.converter.clone();
    let task_filename = filename.clone();
    let conversion =
        tokio::task::spawn_blocking(move || converter.convert(&data, &task_filename));

    let timeout = Duration::from_secs(state.config.conversion.timeout_secs);
    let markdown = match tokio::time::timeout(timeout, conversion).await {
        Err(_) => {
            tracing::error!(filename = %filename, timeout_secs = timeout.as_secs(), "Conversion timed out");
            return Err(AppError::ConversionError(format!(
                "Conversion did not finish within {} seconds",
                timeout.as_secs()
            )));
        }
        Ok(Err(join_err)) => {
            tracing::error!(filename = %filename, error = %join_err, "Conversion task panicked");
            return Err(AppError::InternalError(anyhow::anyhow!(
                "Conversion task failed: {}",
                join_err
            )));
        }
        Ok(Ok(Err(e))) => {
            tracing::error!(filename = %filename, error = %e, "Conversion failed");
            return Err(AppError::ConversionError(e.to_string()));
        }
        Ok(Ok(Ok(markdown))) => markdown,
    };

    tracing::info!(
        filename = %filename,
        output_bytes = markdown.len(),
        "Conversion completed successfully"
    );

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        markdown,
    ))
}
