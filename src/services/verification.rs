use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use crate::core::config::Settings;
use crate::db::types::precheck;

/// Outcome of one call to the external document-verification service.
/// `status` is stored verbatim on the enrollment; a missing field defaults
/// to `pending` so a half-formed response never settles a record.
#[derive(Debug, Clone)]
pub(crate) struct VerificationOutcome {
    pub(crate) status: String,
    pub(crate) note: Option<String>,
}

#[derive(Debug, Error)]
pub(crate) enum VerificationError {
    #[error("verification request timed out after {0}s")]
    Timeout(u64),
    #[error("could not reach verification service: {0}")]
    ConnectionFailed(String),
    #[error("verification service returned HTTP {status}: {body}")]
    BadResponse { status: u16, body: String },
    #[error("verification service returned a malformed payload: {0}")]
    MalformedPayload(String),
}

impl VerificationError {
    pub(crate) fn category(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "Timeout",
            Self::ConnectionFailed(_) => "ConnectionFailed",
            Self::BadResponse { .. } => "BadResponse",
            Self::MalformedPayload(_) => "MalformedPayload",
        }
    }
}

/// Thin client for the verification endpoint. Does not retry: record-level
/// retries are the pending sweeper's job, not the transport's.
#[derive(Debug, Clone)]
pub(crate) struct VerificationService {
    client: Client,
    base_url: String,
    timeout_seconds: u64,
}

impl VerificationService {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let timeout_seconds = settings.verification().timeout_seconds;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(timeout_seconds))
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|err| anyhow::anyhow!("Failed to build verification HTTP client: {err}"))?;

        Ok(Self {
            client,
            base_url: settings.verification().base_url.trim_end_matches('/').to_string(),
            timeout_seconds,
        })
    }

    pub(crate) async fn verify(
        &self,
        enrollment_id: i32,
    ) -> Result<VerificationOutcome, VerificationError> {
        let endpoint = format!("{}/verify-docs", self.base_url);

        let response = self
            .client
            .post(&endpoint)
            .json(&serde_json::json!({ "enrollment_id": enrollment_id }))
            .send()
            .await
            .map_err(|err| self.classify_transport_error(err))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| self.classify_transport_error(err))?;

        if !status.is_success() {
            return Err(VerificationError::BadResponse { status: status.as_u16(), body });
        }

        let payload: Value = serde_json::from_str(&body)
            .map_err(|err| VerificationError::MalformedPayload(format!("{err}: {body}")))?;

        let status = payload
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or(precheck::PENDING)
            .to_string();
        let note = payload
            .get("observacao")
            .and_then(Value::as_str)
            .or_else(|| payload.get("note").and_then(Value::as_str))
            .map(|value| value.to_string());

        Ok(VerificationOutcome { status, note })
    }

    fn classify_transport_error(&self, err: reqwest::Error) -> VerificationError {
        if err.is_timeout() {
            VerificationError::Timeout(self.timeout_seconds)
        } else {
            VerificationError::ConnectionFailed(err.to_string())
        }
    }
}
