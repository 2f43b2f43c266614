use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::presentation::http::handlers::DocumentHandler;

pub fn document_routes(document_handler: Arc<DocumentHandler>) -> Router {
    Router::new()
        .route("/api/upload", post(DocumentHandler::upload_document))
        .route("/api/files/{accountant}", get(DocumentHandler::list_documents))
        .route("/files/{*key}", get(DocumentHandler::download_document))
        .with_state(document_handler)
}
