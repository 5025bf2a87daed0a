use anyhow::{Context, Result};
use thiserror::Error;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc as now_primitive;
use crate::db::models::Enrollment;
use crate::db::types::{precheck, DocumentStatus, EnrollmentStatus};
use crate::repositories;

#[derive(Debug, Error)]
pub(crate) enum EnrollmentActionError {
    #[error("Enrollment not found")]
    NotFound,
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    InvalidArgument(&'static str),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Re-evaluates one candidate's documents and, when both required types are
/// approved and something changed since the last run, executes the external
/// pre-check exactly once and records the outcome.
///
/// Verification transport failures never escape this function: they become a
/// diagnostic note on the record, which reverts to `pending` for the sweeper
/// to retry. Only infrastructure (database) errors are returned, and every
/// caller treats those as log-and-continue.
pub(crate) async fn reconcile(state: &AppState, candidate_id: i32) -> Result<()> {
    let documents = repositories::documents::list_by_candidate(state.db(), candidate_id)
        .await
        .context("Failed to fetch candidate documents")?;

    let identity_type = state.settings().documents().identity_type_id;
    let transcript_type = state.settings().documents().transcript_type_id;

    let identity_approved = documents.iter().any(|doc| {
        doc.document_type_id == identity_type && doc.status == DocumentStatus::Approved
    });
    let transcript_approved = documents.iter().any(|doc| {
        doc.document_type_id == transcript_type && doc.status == DocumentStatus::Approved
    });

    if !identity_approved || !transcript_approved {
        tracing::debug!(
            candidate_id,
            identity_approved,
            transcript_approved,
            "Required documents incomplete; skipping pre-check"
        );
        return Ok(());
    }

    let enrollment = match repositories::enrollments::find_latest_by_candidate(
        state.db(),
        candidate_id,
    )
    .await
    .context("Failed to fetch enrollment")?
    {
        Some(existing) => existing,
        None => {
            let created =
                repositories::enrollments::create(state.db(), candidate_id, now_primitive())
                    .await
                    .context("Failed to create enrollment")?;
            tracing::info!(candidate_id, enrollment_id = created.id, "Enrollment created");
            metrics::counter!("enrollments_created_total").increment(1);
            created
        }
    };

    // Nothing approved since the last validation means nothing to re-check.
    let latest_approved =
        repositories::documents::latest_approved_validated_at(state.db(), candidate_id)
            .await
            .context("Failed to fetch latest document validation")?;
    if let (Some(approved_at), Some(validated_at)) = (latest_approved, enrollment.updated_at) {
        if approved_at <= validated_at {
            tracing::debug!(
                candidate_id,
                enrollment_id = enrollment.id,
                "No document approved since last validation; skipping"
            );
            return Ok(());
        }
    }

    if enrollment.precheck_status == precheck::PROCESSING {
        tracing::info!(
            enrollment_id = enrollment.id,
            "Pre-check already in progress; skipping"
        );
        return Ok(());
    }

    // Persist the processing marker before calling out, so concurrent
    // reconciliations (and other instances) observe it. The conditional
    // update re-checks the status, closing the window between the read
    // above and this write.
    let claimed =
        repositories::enrollments::mark_processing(state.db(), enrollment.id, now_primitive())
            .await
            .context("Failed to mark enrollment as processing")?;
    if !claimed {
        tracing::info!(
            enrollment_id = enrollment.id,
            "Pre-check claimed by another worker; skipping"
        );
        return Ok(());
    }

    run_verification(state, enrollment.id).await;
    Ok(())
}

/// Calls the verification service for one enrollment and persists whatever
/// comes back. On transport failure the record is put back to `pending` with
/// a human-readable note; it is never left in `processing`.
pub(crate) async fn run_verification(state: &AppState, enrollment_id: i32) {
    match state.verification().verify(enrollment_id).await {
        Ok(outcome) => {
            tracing::info!(
                enrollment_id,
                status = %outcome.status,
                "Pre-check verification completed"
            );
            metrics::counter!("precheck_runs_total", "outcome" => "completed").increment(1);

            if let Err(err) = repositories::enrollments::record_precheck_result(
                state.db(),
                enrollment_id,
                &outcome.status,
                outcome.note.as_deref(),
                now_primitive(),
            )
            .await
            {
                tracing::error!(enrollment_id, error = %err, "Failed to persist pre-check result");
            }
        }
        Err(err) => {
            let note = format!("{}: {}", err.category(), err);
            tracing::warn!(enrollment_id, error = %err, "Pre-check verification failed");
            metrics::counter!("precheck_runs_total", "outcome" => "failed").increment(1);

            if let Err(db_err) = repositories::enrollments::record_precheck_result(
                state.db(),
                enrollment_id,
                precheck::PENDING,
                Some(&note),
                now_primitive(),
            )
            .await
            {
                tracing::error!(
                    enrollment_id,
                    error = %db_err,
                    "Failed to revert enrollment to pending after verification failure"
                );
            }
        }
    }
}

pub(crate) async fn approve(
    state: &AppState,
    enrollment_id: i32,
    observations: Option<&str>,
) -> Result<Enrollment, EnrollmentActionError> {
    let enrollment = repositories::enrollments::find_by_id(state.db(), enrollment_id)
        .await?
        .ok_or(EnrollmentActionError::NotFound)?;

    if enrollment.status != EnrollmentStatus::Pending {
        return Err(EnrollmentActionError::InvalidState(format!(
            "Enrollment cannot be approved because its status is '{}'",
            enrollment.status.as_str()
        )));
    }

    let updated = repositories::enrollments::approve(state.db(), enrollment_id, observations).await?;
    tracing::info!(enrollment_id, "Enrollment approved");
    Ok(updated)
}

pub(crate) async fn reject(
    state: &AppState,
    enrollment_id: i32,
    observations: &str,
) -> Result<Enrollment, EnrollmentActionError> {
    let enrollment = repositories::enrollments::find_by_id(state.db(), enrollment_id)
        .await?
        .ok_or(EnrollmentActionError::NotFound)?;

    if enrollment.status != EnrollmentStatus::Pending {
        return Err(EnrollmentActionError::InvalidState(format!(
            "Enrollment cannot be rejected because its status is '{}'",
            enrollment.status.as_str()
        )));
    }

    if observations.trim().is_empty() {
        return Err(EnrollmentActionError::InvalidArgument(
            "A rejection reason (observations) is required",
        ));
    }

    let updated =
        repositories::enrollments::reject(state.db(), enrollment_id, observations, now_primitive())
            .await?;
    tracing::info!(enrollment_id, "Enrollment rejected; pre-check reset to pending");
    Ok(updated)
}

#[cfg(test)]
mod tests;
