use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use crate::application::use_cases::GenerateReportUseCase;
use crate::presentation::http::dto::{ApiResponse, ReportResponseDto};

pub struct ReportHandler {
    report_use_case: Arc<GenerateReportUseCase>,
    expose_error_details: bool,
}

impl ReportHandler {
    pub fn new(report_use_case: Arc<GenerateReportUseCase>, expose_error_details: bool) -> Self {
        Self {
            report_use_case,
            expose_error_details,
        }
    }

    pub async fn generate_report(
        State(handler): State<Arc<ReportHandler>>,
        Path((accountant, client)): Path<(String, String)>,
    ) -> Result<impl IntoResponse, StatusCode> {
        match handler.report_use_case.execute(&accountant, &client).await {
            Ok(report) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(ReportResponseDto::from(report))),
            )),
            Err(e) => Ok(ApiResponse::from_error(&e, handler.expose_error_details)),
        }
    }
}
