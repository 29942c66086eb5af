use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Failure while ensuring a site's tables. Carries the qualified table name.
#[derive(Debug)]
pub enum ProvisionError {
    CheckFailed { table: String, source: sqlx::Error },
    CreateFailed { table: String, source: sqlx::Error },
    NameTooLong { table: String, limit: usize },
}

impl ProvisionError {
    pub fn table(&self) -> &str {
        match self {
            ProvisionError::CheckFailed { table, .. }
            | ProvisionError::CreateFailed { table, .. }
            | ProvisionError::NameTooLong { table, .. } => table,
        }
    }
}

impl std::fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProvisionError::CheckFailed { table, source } => {
                write!(f, "Provisioning check failed for {table}: {source}")
            }
            ProvisionError::CreateFailed { table, source } => {
                write!(f, "Failed to create {table}: {source}")
            }
            ProvisionError::NameTooLong { table, limit } => {
                write!(f, "Table name {table} exceeds {limit} bytes")
            }
        }
    }
}

impl std::error::Error for ProvisionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProvisionError::CheckFailed { source, .. } | ProvisionError::CreateFailed { source, .. } => {
                Some(source)
            }
            ProvisionError::NameTooLong { .. } => None,
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    Unauthorized(String),
    BadRequest(String),
    Internal(String),
    Provision(ProvisionError),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {msg}"),
            AppError::Internal(msg) => write!(f, "Internal Error: {msg}"),
            AppError::Provision(err) => write!(f, "Provisioning Error: {err}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Provision(err) => {
                tracing::error!("Provisioning error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<ProvisionError> for AppError {
    fn from(err: ProvisionError) -> Self {
        AppError::Provision(err)
    }
}
