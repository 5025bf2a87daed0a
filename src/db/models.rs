use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::{Date, PrimitiveDateTime};

use crate::db::types::{DocumentStatus, EnrollmentStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Candidate {
    pub(crate) id: i32,
    pub(crate) full_name: String,
    pub(crate) national_id: String,
    pub(crate) email: String,
    pub(crate) phone: Option<String>,
    pub(crate) birth_date: Option<Date>,
    pub(crate) social_name: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct DocumentType {
    pub(crate) id: i32,
    pub(crate) name: String,
    pub(crate) required: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Document {
    pub(crate) id: i32,
    pub(crate) candidate_id: i32,
    pub(crate) document_type_id: i32,
    pub(crate) subtype: Option<String>,
    pub(crate) file_key: String,
    pub(crate) status: DocumentStatus,
    pub(crate) extracted_data: Option<Json<serde_json::Value>>,
    pub(crate) rejection_reason: Option<String>,
    pub(crate) uploaded_at: PrimitiveDateTime,
    pub(crate) validated_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Course {
    pub(crate) id: i32,
    pub(crate) name: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Section {
    pub(crate) id: i32,
    pub(crate) course_id: i32,
    pub(crate) code: String,
    pub(crate) term: String,
    pub(crate) shift: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

/// One state-machine instance per candidate. `updated_at` is NULL until the
/// first pre-check attempt; the reconciler relies on that to decide whether
/// a freshly approved document is "newer than the last validation".
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Enrollment {
    pub(crate) id: i32,
    pub(crate) candidate_id: i32,
    pub(crate) section_id: Option<i32>,
    pub(crate) status: EnrollmentStatus,
    pub(crate) precheck_status: String,
    pub(crate) precheck_note: Option<String>,
    pub(crate) observations: Option<String>,
    pub(crate) enrolled_at: PrimitiveDateTime,
    pub(crate) updated_at: Option<PrimitiveDateTime>,
}
