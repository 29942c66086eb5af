use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::state::SharedState;

/// Caller of the `/v1` hook routes. Passes unconditionally when no hook
/// token is configured.
#[derive(Debug, Clone)]
pub struct HookCaller;

impl FromRequestParts<SharedState> for HookCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.hook_token.as_deref() else {
            return Ok(HookCaller);
        };

        let token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        if tokens_match(token, expected) {
            Ok(HookCaller)
        } else {
            Err(AppError::Unauthorized("Invalid hook token".to_string()))
        }
    }
}

/// Compares digests so neither length nor content leaks through timing.
fn tokens_match(given: &str, expected: &str) -> bool {
    let given = Sha256::digest(given.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    given.as_slice().ct_eq(expected.as_slice()).into()
}
