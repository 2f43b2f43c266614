use axum::{Router, routing::post};
use std::sync::Arc;

use crate::presentation::http::handlers::ReportHandler;

pub fn report_routes(report_handler: Arc<ReportHandler>) -> Router {
    Router::new()
        .route("/api/report/{accountant}/{client}", post(ReportHandler::generate_report))
        .with_state(report_handler)
}
