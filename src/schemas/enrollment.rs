use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::Enrollment;
use crate::db::types::EnrollmentStatus;
use crate::repositories::enrollments::ReviewRow;
use crate::repositories::sections::SectionDetail;
use crate::schemas::candidate::CandidateResponse;
use crate::schemas::document::DocumentResponse;

#[derive(Debug, Serialize)]
pub(crate) struct SectionSummary {
    pub(crate) id: i32,
    pub(crate) code: String,
    pub(crate) course_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentSummary {
    pub(crate) id: i32,
    pub(crate) candidate_id: i32,
    pub(crate) candidate_name: String,
    pub(crate) candidate_national_id: String,
    pub(crate) section: Option<SectionSummary>,
    pub(crate) status: EnrollmentStatus,
    pub(crate) precheck_status: String,
    pub(crate) precheck_note: Option<String>,
    pub(crate) enrolled_at: String,
}

impl EnrollmentSummary {
    pub(crate) fn from_row(row: ReviewRow) -> Self {
        let section = match (row.section_id, row.section_code) {
            (Some(id), Some(code)) => {
                Some(SectionSummary { id, code, course_name: row.course_name })
            }
            _ => None,
        };

        Self {
            id: row.id,
            candidate_id: row.candidate_id,
            candidate_name: row.candidate_name,
            candidate_national_id: row.candidate_national_id,
            section,
            status: row.status,
            precheck_status: row.precheck_status,
            precheck_note: row.precheck_note,
            enrolled_at: format_primitive(row.enrolled_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SectionResponse {
    pub(crate) id: i32,
    pub(crate) code: String,
    pub(crate) term: String,
    pub(crate) shift: Option<String>,
    pub(crate) course_name: String,
}

impl SectionResponse {
    pub(crate) fn from_detail(detail: SectionDetail) -> Self {
        Self {
            id: detail.id,
            code: detail.code,
            term: detail.term,
            shift: detail.shift,
            course_name: detail.course_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentDetails {
    pub(crate) id: i32,
    pub(crate) status: EnrollmentStatus,
    pub(crate) precheck_status: String,
    pub(crate) precheck_note: Option<String>,
    pub(crate) candidate: CandidateResponse,
    pub(crate) section: Option<SectionResponse>,
    pub(crate) documents: Vec<DocumentResponse>,
    pub(crate) observations: Option<String>,
    pub(crate) updated_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentDecisionResponse {
    pub(crate) id: i32,
    pub(crate) status: EnrollmentStatus,
    pub(crate) precheck_status: String,
    pub(crate) observations: Option<String>,
}

impl EnrollmentDecisionResponse {
    pub(crate) fn from_db(enrollment: Enrollment) -> Self {
        Self {
            id: enrollment.id,
            status: enrollment.status,
            precheck_status: enrollment.precheck_status,
            observations: enrollment.observations,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApproveRequest {
    #[serde(default)]
    pub(crate) observations: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectRequest {
    #[serde(default)]
    pub(crate) observations: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SweepResponse {
    pub(crate) processed: usize,
}
