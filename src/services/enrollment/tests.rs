use std::sync::atomic::Ordering;

use axum::http::StatusCode;
use serde_json::json;
use time::Duration;

use super::{approve, reconcile, reject, EnrollmentActionError};
use crate::core::time::primitive_now_utc;
use crate::db::types::{precheck, DocumentStatus, EnrollmentStatus};
use crate::repositories;
use crate::test_support;

const IDENTITY_TYPE: i32 = 1;
const TRANSCRIPT_TYPE: i32 = 3;

#[tokio::test]
async fn reconcile_is_noop_when_required_documents_incomplete() {
    let ctx = test_support::setup_test_context().await;

    let candidate =
        test_support::insert_candidate(ctx.state.db(), "Ana Souza", "10000000001").await;
    test_support::insert_document(
        ctx.state.db(),
        candidate.id,
        IDENTITY_TYPE,
        DocumentStatus::Approved,
        Some(primitive_now_utc()),
    )
    .await;
    test_support::insert_document(
        ctx.state.db(),
        candidate.id,
        TRANSCRIPT_TYPE,
        DocumentStatus::Review,
        None,
    )
    .await;

    reconcile(&ctx.state, candidate.id).await.expect("reconcile");

    let enrollment =
        repositories::enrollments::find_latest_by_candidate(ctx.state.db(), candidate.id)
            .await
            .expect("query");
    assert!(enrollment.is_none(), "no enrollment should exist before both documents approve");
}

#[tokio::test]
async fn reconcile_creates_one_enrollment_and_records_success() {
    let (base_url, calls) = test_support::spawn_verification_stub(
        StatusCode::OK,
        json!({"status": "approved", "observacao": "all good"}),
    )
    .await;
    let ctx = test_support::setup_test_context_with_env(&[("VERIFY_DOCS_URL", &base_url)]).await;

    let candidate =
        test_support::insert_candidate(ctx.state.db(), "Bruno Lima", "10000000002").await;
    let now = primitive_now_utc();
    test_support::insert_document(
        ctx.state.db(),
        candidate.id,
        IDENTITY_TYPE,
        DocumentStatus::Approved,
        Some(now),
    )
    .await;
    test_support::insert_document(
        ctx.state.db(),
        candidate.id,
        TRANSCRIPT_TYPE,
        DocumentStatus::Approved,
        Some(now),
    )
    .await;

    reconcile(&ctx.state, candidate.id).await.expect("reconcile");

    let enrollment =
        repositories::enrollments::find_latest_by_candidate(ctx.state.db(), candidate.id)
            .await
            .expect("query")
            .expect("enrollment created");
    assert_eq!(enrollment.status, EnrollmentStatus::Pending);
    assert_eq!(enrollment.precheck_status, "approved");
    assert_eq!(enrollment.precheck_note.as_deref(), Some("all good"));
    assert!(enrollment.updated_at.is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // A second pass finds nothing newer than the last validation: no second
    // external call, no second record, fields untouched.
    reconcile(&ctx.state, candidate.id).await.expect("reconcile again");

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE candidate_id = $1")
            .bind(candidate.id)
            .fetch_one(ctx.state.db())
            .await
            .expect("count");
    assert_eq!(count, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let unchanged = repositories::enrollments::find_by_id(ctx.state.db(), enrollment.id)
        .await
        .expect("query")
        .expect("enrollment");
    assert_eq!(unchanged.precheck_status, "approved");
    assert_eq!(unchanged.precheck_note.as_deref(), Some("all good"));
}

#[tokio::test]
async fn reconcile_skips_when_nothing_new_since_last_validation() {
    let (base_url, calls) =
        test_support::spawn_verification_stub(StatusCode::OK, json!({"status": "approved"})).await;
    let ctx = test_support::setup_test_context_with_env(&[("VERIFY_DOCS_URL", &base_url)]).await;

    let candidate =
        test_support::insert_candidate(ctx.state.db(), "Carla Dias", "10000000003").await;
    let validated = primitive_now_utc() - Duration::seconds(60);
    test_support::insert_document(
        ctx.state.db(),
        candidate.id,
        IDENTITY_TYPE,
        DocumentStatus::Approved,
        Some(validated),
    )
    .await;
    test_support::insert_document(
        ctx.state.db(),
        candidate.id,
        TRANSCRIPT_TYPE,
        DocumentStatus::Approved,
        Some(validated),
    )
    .await;
    test_support::insert_enrollment(
        ctx.state.db(),
        candidate.id,
        precheck::PENDING,
        Some(primitive_now_utc()),
    )
    .await;

    reconcile(&ctx.state, candidate.id).await.expect("reconcile");

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn reconcile_skips_when_already_processing() {
    let (base_url, calls) =
        test_support::spawn_verification_stub(StatusCode::OK, json!({"status": "approved"})).await;
    let ctx = test_support::setup_test_context_with_env(&[("VERIFY_DOCS_URL", &base_url)]).await;

    let candidate =
        test_support::insert_candidate(ctx.state.db(), "Diego Alves", "10000000004").await;
    let now = primitive_now_utc();
    test_support::insert_document(
        ctx.state.db(),
        candidate.id,
        IDENTITY_TYPE,
        DocumentStatus::Approved,
        Some(now),
    )
    .await;
    test_support::insert_document(
        ctx.state.db(),
        candidate.id,
        TRANSCRIPT_TYPE,
        DocumentStatus::Approved,
        Some(now),
    )
    .await;
    let enrollment =
        test_support::insert_enrollment(ctx.state.db(), candidate.id, precheck::PROCESSING, None)
            .await;

    reconcile(&ctx.state, candidate.id).await.expect("reconcile");

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let current = repositories::enrollments::find_by_id(ctx.state.db(), enrollment.id)
        .await
        .expect("query")
        .expect("enrollment");
    assert_eq!(current.precheck_status, precheck::PROCESSING);
}

#[tokio::test]
async fn reconcile_reverts_to_pending_on_bad_response() {
    let (base_url, calls) = test_support::spawn_verification_stub(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"error": "boom"}),
    )
    .await;
    let ctx = test_support::setup_test_context_with_env(&[("VERIFY_DOCS_URL", &base_url)]).await;

    let candidate =
        test_support::insert_candidate(ctx.state.db(), "Elisa Prado", "10000000005").await;
    let now = primitive_now_utc();
    test_support::insert_document(
        ctx.state.db(),
        candidate.id,
        IDENTITY_TYPE,
        DocumentStatus::Approved,
        Some(now),
    )
    .await;
    test_support::insert_document(
        ctx.state.db(),
        candidate.id,
        TRANSCRIPT_TYPE,
        DocumentStatus::Approved,
        Some(now),
    )
    .await;

    reconcile(&ctx.state, candidate.id).await.expect("reconcile");

    let enrollment =
        repositories::enrollments::find_latest_by_candidate(ctx.state.db(), candidate.id)
            .await
            .expect("query")
            .expect("enrollment");
    assert_eq!(enrollment.precheck_status, precheck::PENDING);
    let note = enrollment.precheck_note.expect("diagnostic note");
    assert!(note.contains("BadResponse"), "note: {note}");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reconcile_records_connection_failure() {
    // Default test env points at an unroutable address.
    let ctx = test_support::setup_test_context().await;

    let candidate =
        test_support::insert_candidate(ctx.state.db(), "Fabio Reis", "10000000006").await;
    let now = primitive_now_utc();
    test_support::insert_document(
        ctx.state.db(),
        candidate.id,
        IDENTITY_TYPE,
        DocumentStatus::Approved,
        Some(now),
    )
    .await;
    test_support::insert_document(
        ctx.state.db(),
        candidate.id,
        TRANSCRIPT_TYPE,
        DocumentStatus::Approved,
        Some(now),
    )
    .await;

    reconcile(&ctx.state, candidate.id).await.expect("reconcile");

    let enrollment =
        repositories::enrollments::find_latest_by_candidate(ctx.state.db(), candidate.id)
            .await
            .expect("query")
            .expect("enrollment");
    assert_eq!(enrollment.precheck_status, precheck::PENDING);
    let note = enrollment.precheck_note.expect("diagnostic note");
    assert!(note.contains("ConnectionFailed"), "note: {note}");
}

#[tokio::test]
async fn reconcile_records_timeout() {
    let (base_url, _calls) = test_support::spawn_verification_stub_with_delay(
        StatusCode::OK,
        json!({"status": "approved"}),
        std::time::Duration::from_secs(3),
    )
    .await;
    let ctx = test_support::setup_test_context_with_env(&[
        ("VERIFY_DOCS_URL", &base_url),
        ("VERIFY_DOCS_TIMEOUT_SECONDS", "1"),
    ])
    .await;

    let candidate =
        test_support::insert_candidate(ctx.state.db(), "Gina Costa", "10000000007").await;
    let now = primitive_now_utc();
    test_support::insert_document(
        ctx.state.db(),
        candidate.id,
        IDENTITY_TYPE,
        DocumentStatus::Approved,
        Some(now),
    )
    .await;
    test_support::insert_document(
        ctx.state.db(),
        candidate.id,
        TRANSCRIPT_TYPE,
        DocumentStatus::Approved,
        Some(now),
    )
    .await;

    reconcile(&ctx.state, candidate.id).await.expect("reconcile");

    let enrollment =
        repositories::enrollments::find_latest_by_candidate(ctx.state.db(), candidate.id)
            .await
            .expect("query")
            .expect("enrollment");
    assert_eq!(enrollment.precheck_status, precheck::PENDING);
    let note = enrollment.precheck_note.expect("diagnostic note");
    assert!(note.contains("Timeout"), "note: {note}");
}

#[tokio::test]
async fn missing_status_in_response_defaults_to_pending() {
    let (base_url, _calls) =
        test_support::spawn_verification_stub(StatusCode::OK, json!({})).await;
    let ctx = test_support::setup_test_context_with_env(&[("VERIFY_DOCS_URL", &base_url)]).await;

    let candidate =
        test_support::insert_candidate(ctx.state.db(), "Hugo Melo", "10000000008").await;
    let now = primitive_now_utc();
    test_support::insert_document(
        ctx.state.db(),
        candidate.id,
        IDENTITY_TYPE,
        DocumentStatus::Approved,
        Some(now),
    )
    .await;
    test_support::insert_document(
        ctx.state.db(),
        candidate.id,
        TRANSCRIPT_TYPE,
        DocumentStatus::Approved,
        Some(now),
    )
    .await;

    reconcile(&ctx.state, candidate.id).await.expect("reconcile");

    let enrollment =
        repositories::enrollments::find_latest_by_candidate(ctx.state.db(), candidate.id)
            .await
            .expect("query")
            .expect("enrollment");
    assert_eq!(enrollment.precheck_status, precheck::PENDING);
    assert!(enrollment.updated_at.is_some());
}

#[tokio::test]
async fn approve_sets_status_and_leaves_precheck_untouched() {
    let ctx = test_support::setup_test_context().await;

    let candidate =
        test_support::insert_candidate(ctx.state.db(), "Iris Nunes", "10000000009").await;
    let enrollment = test_support::insert_enrollment(
        ctx.state.db(),
        candidate.id,
        precheck::APPROVED,
        Some(primitive_now_utc()),
    )
    .await;

    let updated = approve(&ctx.state, enrollment.id, Some("documents verified in person"))
        .await
        .expect("approve");

    assert_eq!(updated.status, EnrollmentStatus::Approved);
    assert_eq!(updated.observations.as_deref(), Some("documents verified in person"));
    assert_eq!(updated.precheck_status, precheck::APPROVED);
}

#[tokio::test]
async fn approve_fails_when_not_pending() {
    let ctx = test_support::setup_test_context().await;

    let candidate =
        test_support::insert_candidate(ctx.state.db(), "Joao Paz", "10000000010").await;
    let enrollment = test_support::insert_enrollment(
        ctx.state.db(),
        candidate.id,
        precheck::APPROVED,
        None,
    )
    .await;

    approve(&ctx.state, enrollment.id, None).await.expect("first approve");
    let err = approve(&ctx.state, enrollment.id, Some("again")).await.expect_err("second approve");
    assert!(matches!(err, EnrollmentActionError::InvalidState(_)));

    let current = repositories::enrollments::find_by_id(ctx.state.db(), enrollment.id)
        .await
        .expect("query")
        .expect("enrollment");
    assert_eq!(current.status, EnrollmentStatus::Approved);
    assert_eq!(current.observations, None);
}

#[tokio::test]
async fn approve_missing_enrollment_fails_not_found() {
    let ctx = test_support::setup_test_context().await;

    let err = approve(&ctx.state, 424242, None).await.expect_err("missing");
    assert!(matches!(err, EnrollmentActionError::NotFound));
}

#[tokio::test]
async fn reject_requires_observations() {
    let ctx = test_support::setup_test_context().await;

    let candidate =
        test_support::insert_candidate(ctx.state.db(), "Karen Luz", "10000000011").await;
    let enrollment = test_support::insert_enrollment(
        ctx.state.db(),
        candidate.id,
        precheck::APPROVED,
        None,
    )
    .await;

    let err = reject(&ctx.state, enrollment.id, "  ").await.expect_err("empty reason");
    assert!(matches!(err, EnrollmentActionError::InvalidArgument(_)));

    let current = repositories::enrollments::find_by_id(ctx.state.db(), enrollment.id)
        .await
        .expect("query")
        .expect("enrollment");
    assert_eq!(current.status, EnrollmentStatus::Pending);
    assert_eq!(current.precheck_status, precheck::APPROVED);
    assert_eq!(current.observations, None);
    assert!(current.updated_at.is_none());
}

#[tokio::test]
async fn reject_resets_precheck_and_stores_reason() {
    let ctx = test_support::setup_test_context().await;

    let candidate =
        test_support::insert_candidate(ctx.state.db(), "Livia Ramos", "10000000012").await;
    let enrollment = test_support::insert_enrollment(
        ctx.state.db(),
        candidate.id,
        precheck::APPROVED,
        None,
    )
    .await;

    let updated =
        reject(&ctx.state, enrollment.id, "transcript is illegible").await.expect("reject");

    assert_eq!(updated.status, EnrollmentStatus::Pending);
    assert_eq!(updated.precheck_status, precheck::PENDING);
    assert_eq!(updated.observations.as_deref(), Some("transcript is illegible"));
    assert!(updated.updated_at.is_some());
}

#[tokio::test]
async fn reject_fails_on_approved_enrollment() {
    let ctx = test_support::setup_test_context().await;

    let candidate =
        test_support::insert_candidate(ctx.state.db(), "Marta Sa", "10000000013").await;
    let enrollment = test_support::insert_enrollment(
        ctx.state.db(),
        candidate.id,
        precheck::APPROVED,
        None,
    )
    .await;

    approve(&ctx.state, enrollment.id, None).await.expect("approve");
    let err = reject(&ctx.state, enrollment.id, "late change").await.expect_err("reject approved");
    assert!(matches!(err, EnrollmentActionError::InvalidState(_)));
}
