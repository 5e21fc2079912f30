use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
};
use serde_json::{Value, json};
use tracing::{Span, info, warn};

use super::AppState;
use super::error::ApiError;
use crate::service::{
    self, ExampleListResponse, FormatsResponse, PowerFlowRequest, PowerFlowResult, UploadResponse,
};

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Runs blocking service work off the async executor.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> service::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

fn record_session(id: &str) {
    Span::current().record("session_id", id);
}

fn xlsx_attachment(bytes: Vec<u8>, disposition: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;
            upload = Some((filename, bytes));
            break;
        }
    }
    let Some((filename, bytes)) = upload else {
        return Err(ApiError::BadRequest("No file provided".into()));
    };
    if filename.is_empty() {
        warn!("upload request with no filename");
        return Err(ApiError::BadRequest("No filename provided".into()));
    }
    info!(filename = %filename, size = bytes.len(), "processing upload request");

    let response = blocking(move || state.service.upload(&bytes, &filename)).await?;
    record_session(&response.session_id);
    Ok(Json(response))
}

pub async fn run(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> Result<Json<PowerFlowResult>, ApiError> {
    record_session(&session_id);
    let request: PowerFlowRequest = if body.iter().all(u8::is_ascii_whitespace) {
        PowerFlowRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))?
    };
    info!(
        session_id = %session_id,
        algorithm = %request.algorithm,
        max_iteration = ?request.max_iteration,
        "running power flow"
    );
    let result = blocking(move || state.service.run(&session_id, &request)).await?;
    Ok(Json(result))
}

pub async fn results(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<PowerFlowResult>, ApiError> {
    record_session(&session_id);
    Ok(Json(blocking(move || state.service.results(&session_id)).await?))
}

pub async fn download(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    record_session(&session_id);
    let short: String = session_id.chars().take(8).collect();
    let bytes = blocking(move || state.service.download(&session_id)).await?;
    Ok(xlsx_attachment(
        bytes,
        format!("attachment; filename=powerflow_results_{short}.xlsx"),
    ))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    record_session(&session_id);
    blocking(move || state.service.delete(&session_id)).await?;
    Ok(Json(json!({ "message": "Session deleted successfully" })))
}

pub async fn formats() -> Json<FormatsResponse> {
    Json(service::formats())
}

pub async fn examples() -> Json<ExampleListResponse> {
    Json(service::examples())
}

pub async fn download_example(Path(case_name): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let name = case_name.clone();
    let bytes = blocking(move || service::download_example(&name)).await?;
    Ok(xlsx_attachment(
        bytes,
        format!("attachment; filename=\"{case_name}.xlsx\""),
    ))
}
