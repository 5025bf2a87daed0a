use anyhow::{Context, Result};
use time::Duration;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc as now_primitive;
use crate::repositories;
use crate::services::enrollment;

/// Retries every enrollment whose pre-check is still `pending`, skipping
/// records attempted within the cooldown window. Returns how many records
/// were handed to the reconciler; individual failures are logged and do not
/// abort the batch.
///
/// A record stuck in `processing` (say, a worker that died mid-call) is not
/// picked up here; it re-enters the flow only when a later document approval
/// passes through the reconciler again.
pub(crate) async fn sweep(state: &AppState) -> Result<usize> {
    let pending = repositories::enrollments::list_pending_precheck(state.db())
        .await
        .context("Failed to fetch pending enrollments")?;

    if pending.is_empty() {
        return Ok(0);
    }

    let cooldown = seconds_as_duration(state.settings().verification().retry_cooldown_seconds);
    let cutoff = now_primitive() - cooldown;

    let mut processed = 0;
    let mut skipped = 0;

    for enrollment in pending {
        if let Some(last_attempt) = enrollment.updated_at {
            if last_attempt > cutoff {
                tracing::debug!(
                    enrollment_id = enrollment.id,
                    "Last pre-check attempt within cooldown; skipping"
                );
                skipped += 1;
                continue;
            }
        }

        match enrollment::reconcile(state, enrollment.candidate_id).await {
            Ok(()) => processed += 1,
            Err(err) => {
                tracing::error!(
                    enrollment_id = enrollment.id,
                    candidate_id = enrollment.candidate_id,
                    error = %err,
                    "Failed to reconcile pending enrollment"
                );
            }
        }
    }

    tracing::info!(processed, skipped, "Swept pending pre-checks");
    metrics::counter!("precheck_sweeps_total").increment(1);
    metrics::counter!("precheck_swept_enrollments_total").increment(processed as u64);

    Ok(processed)
}

fn seconds_as_duration(seconds: u64) -> Duration {
    Duration::seconds(seconds.min(i64::MAX as u64) as i64)
}
