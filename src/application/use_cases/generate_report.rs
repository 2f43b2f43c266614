use std::sync::Arc;

use crate::application::errors::{Classified, ErrorClass};
use crate::application::services::ReportGenerator;
use crate::application::services::report_generator::{Report, ReportError};
use crate::domain::value_objects::{Tenant, TenantError};

#[derive(Debug, thiserror::Error)]
pub enum GenerateReportError {
    #[error(transparent)]
    InvalidTenant(#[from] TenantError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

impl Classified for GenerateReportError {
    fn class(&self) -> ErrorClass {
        match self {
            GenerateReportError::InvalidTenant(_) => ErrorClass::Input,
            GenerateReportError::Report(e) => e.class(),
        }
    }
}

pub struct GenerateReportUseCase {
    report_generator: Arc<ReportGenerator>,
}

impl GenerateReportUseCase {
    pub fn new(report_generator: Arc<ReportGenerator>) -> Self {
        Self { report_generator }
    }

    pub async fn execute(
        &self,
        accountant: &str,
        client: &str,
    ) -> Result<Report, GenerateReportError> {
        let tenant = Tenant::new(accountant, client)?;
        Ok(self.report_generator.generate(&tenant).await?)
    }
}
