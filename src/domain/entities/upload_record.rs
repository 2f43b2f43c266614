use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Category, SourceFilename, Tenant};

/// What the accountant declared about one upload, plus what enrichment found.
///
/// Stored as JSON beside the blob; field names follow the upload form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub client: String,
    pub file_name: String,
    pub original_name: String,
    #[serde(rename = "type")]
    pub document_type: String,
    pub notes: String,
    pub upload_date: DateTime<Utc>,
    pub ai_note: String,
    #[serde(default = "unclear")]
    pub suggested_category: Category,
    pub is_reviewed: bool,
}

fn unclear() -> Category {
    Category::Unclear
}

impl UploadRecord {
    /// A fresh, unreviewed record. The upload date is the timestamp embedded
    /// in the source filename.
    pub fn new(
        tenant: &Tenant,
        source_filename: &SourceFilename,
        original_name: &str,
        document_type: Option<&str>,
        notes: Option<&str>,
    ) -> Self {
        let upload_date = source_filename
            .timestamp_millis()
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(Utc::now);

        Self {
            client: tenant.client().to_string(),
            file_name: source_filename.to_string(),
            original_name: original_name.trim().to_string(),
            document_type: document_type.map(str::trim).unwrap_or_default().to_string(),
            notes: notes.map(str::trim).unwrap_or_default().to_string(),
            upload_date,
            ai_note: String::new(),
            suggested_category: Category::Unclear,
            is_reviewed: false,
        }
    }

    pub fn with_insights(mut self, summary: Option<&str>, category: Category) -> Self {
        self.ai_note = summary.unwrap_or_default().to_string();
        self.suggested_category = category;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_takes_its_date_from_the_source_filename() {
        let tenant = Tenant::new("maria", "acme").unwrap();
        let name = SourceFilename::new(1_700_000_000_000, "invoice.pdf").unwrap();

        let record = UploadRecord::new(&tenant, &name, " invoice.pdf ", Some("invoice"), None)
            .with_insights(Some("Invoice for March."), Category::Expenses);

        assert_eq!(record.client, "acme");
        assert_eq!(record.file_name, "1700000000000-invoice.pdf");
        assert_eq!(record.original_name, "invoice.pdf");
        assert_eq!(record.document_type, "invoice");
        assert_eq!(record.notes, "");
        assert_eq!(record.upload_date.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(record.ai_note, "Invoice for March.");
        assert!(!record.is_reviewed);
    }

    #[test]
    fn test_json_uses_the_form_field_names() {
        let tenant = Tenant::new("maria", "acme").unwrap();
        let name = SourceFilename::new(1_700_000_000_000, "a.pdf").unwrap();
        let record = UploadRecord::new(&tenant, &name, "a.pdf", Some("receipt"), Some("paid"));

        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["type"], "receipt");
        assert_eq!(json["originalName"], "a.pdf");
        assert_eq!(json["aiNote"], "");
        assert_eq!(json["isReviewed"], false);
        assert_eq!(json["suggestedCategory"], "unclear");
        let back: UploadRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
