use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "documentstatus", rename_all = "lowercase")]
pub(crate) enum DocumentStatus {
    Pending,
    Review,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "enrollmentstatus", rename_all = "lowercase")]
pub(crate) enum EnrollmentStatus {
    Pending,
    Approved,
}

impl EnrollmentStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
        }
    }
}

/// Well-known pre-check outcomes. The column itself is free text because the
/// verification service may return outcome strings beyond this set; anything
/// other than `processing` is treated as settled or retryable.
pub(crate) mod precheck {
    pub(crate) const PENDING: &str = "pending";
    pub(crate) const PROCESSING: &str = "processing";
    pub(crate) const APPROVED: &str = "approved";
}
