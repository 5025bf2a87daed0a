use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::core::time::primitive_now_utc;
use crate::db::types::DocumentStatus;
use crate::repositories;
use crate::test_support;

#[tokio::test]
async fn status_callback_requires_api_key() {
    let ctx = test_support::setup_test_context().await;

    let payload = json!({"document_id": 1, "status": "approved"});

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/documents/status",
            Some(payload.clone()),
        ))
        .await
        .expect("no key");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = ctx
        .app
        .oneshot(test_support::api_key_request(
            Method::POST,
            "/api/v1/documents/status",
            "wrong-key",
            Some(payload),
        ))
        .await
        .expect("wrong key");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn status_callback_updates_document_verdict() {
    let ctx = test_support::setup_test_context().await;

    let candidate =
        test_support::insert_candidate(ctx.state.db(), "Callback Case", "30000000001").await;
    let document = test_support::insert_document(
        ctx.state.db(),
        candidate.id,
        1,
        DocumentStatus::Review,
        None,
    )
    .await;

    let response = ctx
        .app
        .oneshot(test_support::api_key_request(
            Method::POST,
            "/api/v1/documents/status",
            test_support::TEST_EXTRACTION_API_KEY,
            Some(json!({
                "document_id": document.id,
                "status": "rejected",
                "rejection_reason": "photo is blurry"
            })),
        ))
        .await
        .expect("callback");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["status"], "rejected");

    let current = repositories::documents::find_by_id(ctx.state.db(), document.id)
        .await
        .expect("query")
        .expect("document");
    assert_eq!(current.status, DocumentStatus::Rejected);
    assert_eq!(current.rejection_reason.as_deref(), Some("photo is blurry"));
    assert!(current.validated_at.is_some());
}

#[tokio::test]
async fn status_callback_unknown_document_returns_404() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .oneshot(test_support::api_key_request(
            Method::POST,
            "/api/v1/documents/status",
            test_support::TEST_EXTRACTION_API_KEY,
            Some(json!({"document_id": 999999, "status": "approved"})),
        ))
        .await
        .expect("callback");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn approving_last_required_document_triggers_reconciliation() {
    let (base_url, _calls) = test_support::spawn_verification_stub(
        StatusCode::OK,
        json!({"status": "approved", "observacao": "cross-checked"}),
    )
    .await;
    let ctx = test_support::setup_test_context_with_env(&[("VERIFY_DOCS_URL", &base_url)]).await;

    let candidate =
        test_support::insert_candidate(ctx.state.db(), "Trigger Case", "30000000002").await;
    test_support::insert_document(
        ctx.state.db(),
        candidate.id,
        3,
        DocumentStatus::Approved,
        Some(primitive_now_utc()),
    )
    .await;
    let identity = test_support::insert_document(
        ctx.state.db(),
        candidate.id,
        1,
        DocumentStatus::Review,
        None,
    )
    .await;

    let response = ctx
        .app
        .oneshot(test_support::api_key_request(
            Method::POST,
            "/api/v1/documents/status",
            test_support::TEST_EXTRACTION_API_KEY,
            Some(json!({
                "document_id": identity.id,
                "status": "approved",
                "extracted_data": {"name": "Trigger Case"}
            })),
        ))
        .await
        .expect("callback");
    assert_eq!(response.status(), StatusCode::OK);

    // The reconciliation runs in a background task; poll until it lands.
    let db = ctx.state.db().clone();
    let enrollment = test_support::wait_for(
        || {
            let db = db.clone();
            async move {
                repositories::enrollments::find_latest_by_candidate(&db, candidate.id)
                    .await
                    .ok()
                    .flatten()
                    .filter(|enrollment| enrollment.precheck_status == "approved")
            }
        },
        std::time::Duration::from_secs(3),
    )
    .await
    .expect("enrollment created and verified");

    assert_eq!(enrollment.precheck_note.as_deref(), Some("cross-checked"));
}

#[tokio::test]
async fn upload_rejects_unknown_document_type() {
    let ctx = test_support::setup_test_context().await;

    let candidate =
        test_support::insert_candidate(ctx.state.db(), "Upload Case", "30000000003").await;

    let response = ctx
        .app
        .oneshot(test_support::multipart_request(
            "/api/v1/documents/upload",
            &[("candidate_id", &candidate.id.to_string()), ("document_type", "99")],
            Some(("id.pdf", "application/pdf", b"%PDF-1.4 test")),
        ))
        .await
        .expect("upload");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_identity_requires_subtype() {
    let ctx = test_support::setup_test_context().await;

    let candidate =
        test_support::insert_candidate(ctx.state.db(), "Subtype Case", "30000000004").await;

    let response = ctx
        .app
        .oneshot(test_support::multipart_request(
            "/api/v1/documents/upload",
            &[("candidate_id", &candidate.id.to_string()), ("document_type", "1")],
            Some(("id.pdf", "application/pdf", b"%PDF-1.4 test")),
        ))
        .await
        .expect("upload");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert!(body["detail"].as_str().unwrap_or("").contains("Subtype"));
}

#[tokio::test]
async fn upload_rejects_disallowed_extension() {
    let ctx = test_support::setup_test_context().await;

    let candidate =
        test_support::insert_candidate(ctx.state.db(), "Extension Case", "30000000005").await;

    let response = ctx
        .app
        .oneshot(test_support::multipart_request(
            "/api/v1/documents/upload",
            &[("candidate_id", &candidate.id.to_string()), ("document_type", "3")],
            Some(("transcript.exe", "application/pdf", b"MZ")),
        ))
        .await
        .expect("upload");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_without_storage_is_unavailable() {
    let ctx = test_support::setup_test_context().await;

    let candidate =
        test_support::insert_candidate(ctx.state.db(), "Storage Case", "30000000006").await;

    let response = ctx
        .app
        .oneshot(test_support::multipart_request(
            "/api/v1/documents/upload",
            &[("candidate_id", &candidate.id.to_string()), ("document_type", "3")],
            Some(("transcript.pdf", "application/pdf", b"%PDF-1.4 test")),
        ))
        .await
        .expect("upload");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn reupload_enforces_document_ownership() {
    let ctx = test_support::setup_test_context().await;

    let owner = test_support::insert_candidate(ctx.state.db(), "Owner", "30000000007").await;
    let other = test_support::insert_candidate(ctx.state.db(), "Other", "30000000008").await;
    let document = test_support::insert_document(
        ctx.state.db(),
        owner.id,
        3,
        DocumentStatus::Review,
        None,
    )
    .await;

    let response = ctx
        .app
        .oneshot(test_support::multipart_request(
            "/api/v1/documents/reupload",
            &[
                ("candidate_id", &other.id.to_string()),
                ("document_id", &document.id.to_string()),
            ],
            Some(("transcript.pdf", "application/pdf", b"%PDF-1.4 test")),
        ))
        .await
        .expect("reupload");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn document_type_catalog_is_seeded() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/documents/types", None))
        .await
        .expect("types");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");

    let types = body.as_array().expect("array");
    assert_eq!(types.len(), 6);
    assert_eq!(types[0]["id"], 1);
    assert_eq!(types[0]["required"], true);
    let transcript = types.iter().find(|t| t["id"] == 3).expect("transcript type");
    assert_eq!(transcript["required"], true);
}
