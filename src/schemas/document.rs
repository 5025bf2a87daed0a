use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::{Document, DocumentType};
use crate::db::types::DocumentStatus;

#[derive(Debug, Serialize)]
pub(crate) struct DocumentResponse {
    pub(crate) id: i32,
    pub(crate) document_type: i32,
    pub(crate) subtype: Option<String>,
    pub(crate) status: DocumentStatus,
    pub(crate) extracted_data: Option<serde_json::Value>,
    pub(crate) rejection_reason: Option<String>,
    pub(crate) uploaded_at: String,
    pub(crate) file_key: Option<String>,
}

impl DocumentResponse {
    pub(crate) fn from_db(document: Document) -> Self {
        Self {
            id: document.id,
            document_type: document.document_type_id,
            subtype: document.subtype,
            status: document.status,
            extracted_data: document.extracted_data.map(|data| data.0),
            rejection_reason: document.rejection_reason,
            uploaded_at: format_primitive(document.uploaded_at),
            file_key: Some(document.file_key),
        }
    }

    /// Stand-in row for a required type the candidate never submitted. The
    /// negated type id marks it as synthetic for the frontend.
    pub(crate) fn placeholder(document_type: &DocumentType) -> Self {
        Self {
            id: -document_type.id,
            document_type: document_type.id,
            subtype: None,
            status: DocumentStatus::Pending,
            extracted_data: None,
            rejection_reason: None,
            uploaded_at: String::new(),
            file_key: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DocumentTypeResponse {
    pub(crate) id: i32,
    pub(crate) name: String,
    pub(crate) required: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadResponse {
    pub(crate) id: i32,
    pub(crate) status: DocumentStatus,
    pub(crate) uploaded_at: String,
    pub(crate) message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusUpdateRequest {
    pub(crate) document_id: i32,
    pub(crate) status: DocumentStatus,
    #[serde(default)]
    pub(crate) extracted_data: Option<serde_json::Value>,
    #[serde(default)]
    pub(crate) rejection_reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusUpdateResponse {
    pub(crate) document_id: i32,
    pub(crate) status: DocumentStatus,
    pub(crate) message: String,
}
