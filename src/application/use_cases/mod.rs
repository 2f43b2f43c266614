pub mod ask_assistant;
pub mod chat_with_documents;
pub mod download_document;
pub mod generate_report;
pub mod list_documents;
pub mod upload_document;

pub use ask_assistant::AskAssistantUseCase;
pub use chat_with_documents::ChatWithDocumentsUseCase;
pub use download_document::DownloadDocumentUseCase;
pub use generate_report::GenerateReportUseCase;
pub use list_documents::ListDocumentsUseCase;
pub use upload_document::UploadDocumentUseCase;
