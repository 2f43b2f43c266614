pub mod chat_dto;
pub mod document_dto;
pub mod report_dto;
pub mod response_dto;

pub use chat_dto::*;
pub use document_dto::*;
pub use report_dto::*;
pub use response_dto::*;
