use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::ports::document_extractor::ExtractionMethod;
use crate::application::services::document_catalog::CatalogEntry;
use crate::application::use_cases::list_documents::ListDocumentsResponse;
use crate::application::use_cases::upload_document::UploadDocumentResponse;
use crate::domain::entities::UploadRecord;
use crate::domain::value_objects::Category;

#[derive(Debug, Serialize)]
pub struct UploadMetadataDto {
    pub client: String,
    pub file_name: String,
    pub original_name: String,
    #[serde(rename = "type")]
    pub document_type: String,
    pub notes: String,
    pub upload_date: DateTime<Utc>,
    pub ai_note: String,
    pub suggested_category: Category,
    pub is_reviewed: bool,
}

impl From<UploadRecord> for UploadMetadataDto {
    fn from(record: UploadRecord) -> Self {
        Self {
            client: record.client,
            file_name: record.file_name,
            original_name: record.original_name,
            document_type: record.document_type,
            notes: record.notes,
            upload_date: record.upload_date,
            ai_note: record.ai_note,
            suggested_category: record.suggested_category,
            is_reviewed: record.is_reviewed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponseDto {
    pub storage_key: String,
    pub source_filename: String,
    pub chunk_count: usize,
    pub extraction_method: ExtractionMethod,
    pub note: Option<String>,
    pub suggested_category: Category,
    pub metadata: UploadMetadataDto,
}

impl From<UploadDocumentResponse> for UploadResponseDto {
    fn from(response: UploadDocumentResponse) -> Self {
        Self {
            storage_key: response.storage_key,
            source_filename: response.source_filename,
            chunk_count: response.chunk_count,
            extraction_method: response.extraction_method,
            note: response.note,
            suggested_category: response.suggested_category,
            metadata: UploadMetadataDto::from(response.record),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentDto {
    pub key: String,
    pub name: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub url: String,
    pub metadata: Option<UploadMetadataDto>,
}

impl From<CatalogEntry> for DocumentDto {
    fn from(entry: CatalogEntry) -> Self {
        Self {
            key: entry.key,
            name: entry.name,
            size: entry.size,
            last_modified: entry.last_modified,
            url: entry.signed_url,
            metadata: entry.record.map(UploadMetadataDto::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentListResponseDto {
    pub documents: Vec<DocumentDto>,
    pub total: usize,
}

impl From<ListDocumentsResponse> for DocumentListResponseDto {
    fn from(response: ListDocumentsResponse) -> Self {
        Self {
            documents: response.documents.into_iter().map(DocumentDto::from).collect(),
            total: response.total,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListDocumentsQuery {
    pub client: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub expires: i64,
    pub signature: String,
}
