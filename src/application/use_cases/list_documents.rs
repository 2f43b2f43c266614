use std::sync::Arc;

use crate::application::services::DocumentCatalog;
use crate::application::services::document_catalog::{CatalogEntry, CatalogError};

#[derive(Debug, Clone)]
pub struct ListDocumentsRequest {
    pub accountant: String,
    pub client: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ListDocumentsResponse {
    pub documents: Vec<CatalogEntry>,
    pub total: usize,
}

pub struct ListDocumentsUseCase {
    document_catalog: Arc<DocumentCatalog>,
}

impl ListDocumentsUseCase {
    pub fn new(document_catalog: Arc<DocumentCatalog>) -> Self {
        Self { document_catalog }
    }

    pub async fn execute(
        &self,
        request: ListDocumentsRequest,
    ) -> Result<ListDocumentsResponse, CatalogError> {
        let documents = self
            .document_catalog
            .list(&request.accountant, request.client.as_deref())
            .await?;

        Ok(ListDocumentsResponse {
            total: documents.len(),
            documents,
        })
    }
}
