use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::application::services::document_catalog::CatalogError;
use crate::application::use_cases::{
    DownloadDocumentUseCase, ListDocumentsUseCase, UploadDocumentUseCase,
    download_document::DownloadDocumentRequest, list_documents::ListDocumentsRequest,
    upload_document::UploadDocumentRequest,
};
use crate::presentation::http::dto::{
    ApiResponse, DocumentListResponseDto, DownloadQuery, ListDocumentsQuery, UploadResponseDto,
};

pub struct DocumentHandler {
    upload_use_case: Arc<UploadDocumentUseCase>,
    list_documents_use_case: Arc<ListDocumentsUseCase>,
    download_use_case: Arc<DownloadDocumentUseCase>,
    expose_error_details: bool,
}

/// Multipart fields of an upload form.
#[derive(Default)]
struct UploadForm {
    file: Option<(String, Option<String>, Vec<u8>)>,
    accountant: String,
    client: String,
    document_type: Option<String>,
    note: Option<String>,
}

impl DocumentHandler {
    pub fn new(
        upload_use_case: Arc<UploadDocumentUseCase>,
        list_documents_use_case: Arc<ListDocumentsUseCase>,
        download_use_case: Arc<DownloadDocumentUseCase>,
        expose_error_details: bool,
    ) -> Self {
        Self {
            upload_use_case,
            list_documents_use_case,
            download_use_case,
            expose_error_details,
        }
    }

    async fn read_form(multipart: &mut Multipart) -> Result<UploadForm, String> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    let file_name = field.file_name().unwrap_or("upload").to_string();
                    let content_type = field.content_type().map(|ct| ct.to_string());
                    let data = field.bytes().await.map_err(|e| e.body_text())?.to_vec();
                    form.file = Some((file_name, content_type, data));
                }
                "accountant" => form.accountant = field.text().await.map_err(|e| e.body_text())?,
                "client" => form.client = field.text().await.map_err(|e| e.body_text())?,
                "type" => {
                    let document_type = field.text().await.map_err(|e| e.body_text())?;
                    if !document_type.trim().is_empty() {
                        form.document_type = Some(document_type.trim().to_string());
                    }
                }
                // Older clients send `notes`.
                "note" | "notes" => {
                    let note = field.text().await.map_err(|e| e.body_text())?;
                    if !note.trim().is_empty() {
                        form.note = Some(note.trim().to_string());
                    }
                }
                other => tracing::debug!("Ignoring upload field {}", other),
            }
        }

        Ok(form)
    }

    pub async fn upload_document(
        State(handler): State<Arc<DocumentHandler>>,
        mut multipart: Multipart,
    ) -> Result<impl IntoResponse, StatusCode> {
        let form = match Self::read_form(&mut multipart).await {
            Ok(form) => form,
            Err(message) => {
                return Ok((
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::<UploadResponseDto>::error(
                        "INVALID_MULTIPART".to_string(),
                        message,
                        None,
                    )),
                ));
            }
        };

        let Some((file_name, content_type, file_data)) = form.file else {
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(
                    "NO_FILE_PROVIDED".to_string(),
                    "No file provided in the request".to_string(),
                    None,
                )),
            ));
        };

        let request = UploadDocumentRequest {
            accountant: form.accountant,
            client: form.client,
            file_name,
            content_type,
            file_data,
            document_type: form.document_type,
            note: form.note,
        };

        match handler.upload_use_case.execute(request).await {
            Ok(response) => Ok((
                StatusCode::CREATED,
                Json(ApiResponse::success(UploadResponseDto::from(response))),
            )),
            Err(e) => Ok(ApiResponse::from_error(&e, handler.expose_error_details)),
        }
    }

    pub async fn list_documents(
        State(handler): State<Arc<DocumentHandler>>,
        Path(accountant): Path<String>,
        Query(query): Query<ListDocumentsQuery>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let request = ListDocumentsRequest {
            accountant,
            client: query.client,
        };

        match handler.list_documents_use_case.execute(request).await {
            Ok(response) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(DocumentListResponseDto::from(response))),
            )),
            Err(e) => Ok(ApiResponse::from_error(&e, handler.expose_error_details)),
        }
    }

    pub async fn download_document(
        State(handler): State<Arc<DocumentHandler>>,
        Path(key): Path<String>,
        Query(query): Query<DownloadQuery>,
    ) -> Response {
        let request = DownloadDocumentRequest {
            key,
            expires: query.expires,
            signature: query.signature,
        };

        match handler.download_use_case.execute(request).await {
            Ok(document) => (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, document.content_type.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("inline; filename=\"{}\"", document.file_name.replace('"', "")),
                    ),
                ],
                Body::from(document.data),
            )
                .into_response(),
            Err(e) => {
                let (status, body) = ApiResponse::<()>::from_error(&e, handler.expose_error_details);
                let status = match e {
                    CatalogError::InvalidLink => StatusCode::FORBIDDEN,
                    CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
                    _ => status,
                };
                (status, body).into_response()
            }
        }
    }
}
