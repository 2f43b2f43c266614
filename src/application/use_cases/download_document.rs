use std::sync::Arc;

use crate::application::services::DocumentCatalog;
use crate::application::services::document_catalog::CatalogError;

#[derive(Debug, Clone)]
pub struct DownloadDocumentRequest {
    pub key: String,
    pub expires: i64,
    pub signature: String,
}

#[derive(Debug, Clone)]
pub struct DownloadDocumentResponse {
    pub file_name: String,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

/// Serves the bytes behind a signed link from the document listing.
pub struct DownloadDocumentUseCase {
    document_catalog: Arc<DocumentCatalog>,
}

impl DownloadDocumentUseCase {
    pub fn new(document_catalog: Arc<DocumentCatalog>) -> Self {
        Self { document_catalog }
    }

    pub async fn execute(
        &self,
        request: DownloadDocumentRequest,
    ) -> Result<DownloadDocumentResponse, CatalogError> {
        let data = self
            .document_catalog
            .open(&request.key, request.expires, &request.signature)
            .await?;
        let file_name = request
            .key
            .rsplit('/')
            .next()
            .unwrap_or(request.key.as_str())
            .to_string();

        Ok(DownloadDocumentResponse {
            content_type: content_type_for(&file_name),
            file_name,
            data,
        })
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}
