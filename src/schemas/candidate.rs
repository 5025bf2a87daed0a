use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Candidate;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CandidateCreate {
    #[validate(length(min = 1, message = "full_name must not be empty"))]
    pub(crate) full_name: String,
    #[validate(length(min = 11, max = 14, message = "national_id must be 11-14 characters"))]
    pub(crate) national_id: String,
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    #[serde(default)]
    #[validate(length(max = 20, message = "phone must be at most 20 characters"))]
    pub(crate) phone: Option<String>,
    /// ISO date, e.g. 2001-03-28.
    #[serde(default)]
    pub(crate) birth_date: Option<String>,
    #[serde(default)]
    pub(crate) social_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CandidateResponse {
    pub(crate) id: i32,
    pub(crate) full_name: String,
    pub(crate) national_id: String,
    pub(crate) email: String,
    pub(crate) phone: Option<String>,
    pub(crate) birth_date: Option<String>,
    pub(crate) social_name: Option<String>,
    pub(crate) created_at: String,
}

impl CandidateResponse {
    pub(crate) fn from_db(candidate: Candidate) -> Self {
        let birth_date_format = time::macros::format_description!("[year]-[month]-[day]");
        Self {
            id: candidate.id,
            full_name: candidate.full_name,
            national_id: candidate.national_id,
            email: candidate.email,
            phone: candidate.phone,
            birth_date: candidate
                .birth_date
                .and_then(|date| date.format(&birth_date_format).ok()),
            social_name: candidate.social_name,
            created_at: format_primitive(candidate.created_at),
        }
    }
}
