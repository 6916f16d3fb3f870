use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// A structural precondition of the template is missing. Aborts the tick.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A cache read found nothing yet. Callers treat the feature as absent.
    #[error("Transient lookup error: {0}")]
    TransientLookupError(String),

    /// A required collaborator could not be built at startup.
    #[error("Irrecoverable wiring error: {0}")]
    IrrecoverableWiringError(String),

    #[error("K8s API error: {0}")]
    K8sApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

/// Helper for mapping any unknown error into internal error
pub fn internal_error<E: ToString>(err: E) -> AppError {
    AppError::InternalServerError(err.to_string())
}

/// Helper for mapping a startup failure into a fatal wiring error
pub fn wiring_error<E: std::fmt::Display>(what: &str, err: E) -> AppError {
    AppError::IrrecoverableWiringError(format!("{what}: {err}"))
}

/// The one error a hook raises when it has something to inject but the
/// container it targets is not in the template.
pub fn missing_container(hook: &str, container: &str) -> AppError {
    AppError::ConfigurationError(format!(
        "hook {hook} could not mutate the deployment because the {container} container is missing"
    ))
}

impl AppError {
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::TransientLookupError(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::IrrecoverableWiringError(_))
    }
}

impl From<kube::Error> for AppError {
    fn from(err: kube::Error) -> Self {
        AppError::K8sApiError(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            AppError::ConfigurationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::TransientLookupError(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::IrrecoverableWiringError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::K8sApiError(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "message": self.to_string()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_container_is_a_configuration_error() {
        let err = missing_container("CustomCABundle", "csi-driver");
        assert!(matches!(err, AppError::ConfigurationError(_)));
        assert!(err.to_string().contains("csi-driver"));
        assert!(!err.is_transient());
        assert!(!err.is_fatal());
    }

    #[test]
    fn wiring_errors_are_fatal() {
        let err = wiring_error("guest kubeconfig", "file not found");
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "Irrecoverable wiring error: guest kubeconfig: file not found"
        );
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = AppError::NotFound("status".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
