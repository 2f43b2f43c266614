use serde::Serialize;

/// Coarse failure class every entry point reports next to its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Rejected before any side effect.
    Input,
    /// The document itself could not be read.
    Extraction,
    /// Blob store, embedding, generation or sink failure.
    DependentService,
}

impl ErrorClass {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorClass::Input => "INVALID_INPUT",
            ErrorClass::Extraction => "EXTRACTION_FAILED",
            ErrorClass::DependentService => "DEPENDENT_SERVICE_FAILED",
        }
    }
}

pub trait Classified {
    fn class(&self) -> ErrorClass;
}
