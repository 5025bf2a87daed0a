use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;

use crate::api::errors::ApiError;
use crate::core::state::AppState;

/// Shared-key check for the extraction pipeline's status callback.
pub(crate) struct ExtractionApiKey;

#[async_trait]
impl FromRequestParts<AppState> for ExtractionApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let configured = &app_state.settings().security().extraction_api_key;
        if configured.is_empty() {
            return Err(ApiError::Unauthorized("Extraction API key is not configured"));
        }

        let provided = parts
            .headers
            .get("X-API-Key")
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Invalid API key"))?;

        if provided != configured {
            return Err(ApiError::Unauthorized("Invalid API key"));
        }

        Ok(ExtractionApiKey)
    }
}
