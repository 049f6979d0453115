use crate::api::error::ApiError;
use crate::api::routes::AppState;
use crate::models::{ExtractionStatus, FieldSources, StoredInvoice};
use crate::service::submission_parser::{self, RawPart, SubmissionShape};
use axum::{
    body::Bytes,
    extract::{FromRequest, Json, Multipart, Path, Request, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use serde::Serialize;
use uuid::Uuid;

/// 录入接口响应体
#[derive(Debug, Serialize)]
pub struct CreateInvoiceResponse {
    pub invoice: StoredInvoice,
    pub sources: FieldSources,
    pub extraction: ExtractionStatus,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 发票录入: application/json 或 multipart/form-data
pub async fn create_invoice(
    State(state): State<AppState>,
    request: Request,
) -> Result<(StatusCode, Json<CreateInvoiceResponse>), ApiError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let submission = match SubmissionShape::from_content_type(content_type.as_deref())? {
        SubmissionShape::Json => {
            let body = Bytes::from_request(request, &state)
                .await
                .map_err(|e| ApiError::from_rejection(e.status(), e.body_text()))?;
            submission_parser::parse_json_body(&body)?
        }
        SubmissionShape::Multipart => {
            let multipart = Multipart::from_request(request, &state)
                .await
                .map_err(|e| ApiError::from_rejection(e.status(), e.body_text()))?;
            submission_parser::parse_multipart(read_parts(multipart).await?)?
        }
    };

    let outcome = state.ingest.ingest(submission).await?;
    let stored = state.repository.insert(&outcome.invoice).await?;
    tracing::info!("Invoice {} created ({:?})", stored.id, outcome.extraction);

    let response = CreateInvoiceResponse {
        invoice: stored,
        sources: outcome.sources,
        extraction: outcome.extraction,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// 读取全部 multipart part
async fn read_parts(mut multipart: Multipart) -> Result<Vec<RawPart>, ApiError> {
    let mut parts = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::from_rejection(e.status(), e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::from_rejection(e.status(), e.body_text()))?;

        parts.push(RawPart {
            name,
            file_name,
            content_type,
            data: data.to_vec(),
        });
    }
    Ok(parts)
}

/// 查询单张发票
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StoredInvoice>, ApiError> {
    match state.repository.get(id).await? {
        Some(invoice) => Ok(Json(invoice)),
        None => Err(ApiError::NotFound(format!("invoice {} not found", id))),
    }
}

/// 按存储引用下载原始文件
pub async fn get_file(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.ingest.storage().read(&reference).await?;
    let content_type = match reference.rsplit_once('.').map(|(_, ext)| ext) {
        Some("json") => "application/json",
        Some("txt" | "log") => "text/plain; charset=utf-8",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    };
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}
