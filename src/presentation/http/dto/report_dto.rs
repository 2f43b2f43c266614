use serde::Serialize;

use crate::application::services::report_generator::Report;

#[derive(Debug, Serialize)]
pub struct ReportResponseDto {
    pub report: String,
    pub chunk_count: usize,
}

impl From<Report> for ReportResponseDto {
    fn from(report: Report) -> Self {
        Self {
            report: report.text,
            chunk_count: report.chunk_count,
        }
    }
}
