//! Gateway error types.
//!
//! Every per-request failure maps to a terminal HTTP outcome.  The enum
//! implements [`axum::response::IntoResponse`] so handlers can simply
//! return `Err(GatewayError::Unauthorized)`.  Conditional outcomes
//! (304/412) are modeled here too: they are designed control-flow results,
//! not faults, but they terminate the pipeline the same way.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Generate a 16-character hex request ID.
pub fn generate_request_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes).to_uppercase()
}

/// Terminal request outcomes expressed as a Rust enum.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Token missing, malformed, unsigned, wrong audience, or expired.
    /// Reasons are never distinguished to the client.
    #[error("Unauthorized")]
    Unauthorized,

    /// The object does not exist and no conditional applies.
    #[error("Not found")]
    NotFound {
        /// HEAD responses carry no body.
        head: bool,
    },

    /// Conditional outcome: the client's copy is current.
    #[error("Not Modified")]
    NotModified,

    /// Conditional outcome: a precondition did not hold.
    #[error("Precondition failed")]
    PreconditionFailed,

    /// A verified token whose payload lacks the object-key claim.  This is
    /// a contract violation by the token issuer, not a client error.
    #[error("token payload is missing the file claim")]
    MalformedClaims,

    /// The bounded range/encoding re-fetch returned nothing for an object
    /// that existed a moment ago.
    #[error("object missing without range")]
    StoreInconsistency,

    /// Catch-all for unexpected internal errors.
    #[error("We encountered an internal error, please try again.")]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    /// Return the appropriate HTTP status code for this outcome.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::NotModified => StatusCode::NOT_MODIFIED,
            GatewayError::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            GatewayError::MalformedClaims => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::StoreInconsistency => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Plain-text body for this outcome, or `None` for body-less statuses.
    fn body(&self) -> Option<&'static str> {
        match self {
            GatewayError::Unauthorized => Some("Unauthorized"),
            GatewayError::NotFound { head: true } => None,
            GatewayError::NotFound { head: false } => Some("Not found"),
            // 304 responses must not have a body.
            GatewayError::NotModified => None,
            GatewayError::PreconditionFailed => Some("Precondition failed"),
            GatewayError::MalformedClaims
            | GatewayError::StoreInconsistency
            | GatewayError::Internal(_) => Some("Internal error"),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal detail goes to the log, never to the client.
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }

        match self.body() {
            Some(body) => (
                status,
                [("content-type", "text/plain; charset=utf-8")],
                body,
            )
                .into_response(),
            None => status.into_response(),
        }
    }
}

// -- Tests -------------------------------------------------------------------
