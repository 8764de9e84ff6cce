use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use helpdesk_core::error::HelpdeskError;

// ---------------------------------------------------------------------------
// Sentinels for statuses with no HelpdeskError counterpart
// ---------------------------------------------------------------------------

/// Carries an explicit HTTP 401 through the `anyhow::Error` chain.
#[derive(Debug)]
struct UnauthorizedError(String);

impl std::fmt::Display for UnauthorizedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for UnauthorizedError {}

/// Carries an explicit HTTP 422 for request bodies that contradict the
/// ticket, e.g. an escalation to the wrong tier.
#[derive(Debug)]
struct UnprocessableError(String);

impl std::fmt::Display for UnprocessableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for UnprocessableError {}

/// A body or query string axum could not parse, with the status it chose.
#[derive(Debug)]
struct MalformedInput {
    status: StatusCode,
    message: String,
}

impl std::fmt::Display for MalformedInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for MalformedInput {}

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses. Rendered as a failure envelope:
/// `{"success": false, "message": "..."}`.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(HelpdeskError::InvalidTicket(msg.into()).into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self(UnauthorizedError(msg.into()).into())
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self(UnprocessableError(msg.into()).into())
    }

    pub fn malformed_input(status: StatusCode, msg: impl Into<String>) -> Self {
        Self(
            MalformedInput {
                status,
                message: msg.into(),
            }
            .into(),
        )
    }

    fn status(&self) -> StatusCode {
        if let Some(input) = self.0.downcast_ref::<MalformedInput>() {
            return input.status;
        }
        if self.0.downcast_ref::<UnauthorizedError>().is_some() {
            return StatusCode::UNAUTHORIZED;
        }
        if self.0.downcast_ref::<UnprocessableError>().is_some() {
            return StatusCode::UNPROCESSABLE_ENTITY;
        }
        let Some(e) = self.0.downcast_ref::<HelpdeskError>() else {
            return StatusCode::INTERNAL_SERVER_ERROR;
        };
        match e {
            HelpdeskError::TicketNotFound(_) => StatusCode::NOT_FOUND,
            HelpdeskError::TicketExists(_) | HelpdeskError::TransitionInFlight(_) => {
                StatusCode::CONFLICT
            }
            HelpdeskError::IllegalTransition { .. }
            | HelpdeskError::TransitionRejected(_)
            | HelpdeskError::MalformedTicket { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            HelpdeskError::NotInitialized
            | HelpdeskError::InvalidTicketId(_)
            | HelpdeskError::InvalidTicket(_)
            | HelpdeskError::UnknownRole(_)
            | HelpdeskError::UnknownStatus(_)
            | HelpdeskError::UnknownTier(_)
            | HelpdeskError::UnknownSeverity(_) => StatusCode::BAD_REQUEST,
            HelpdeskError::Transport(_)
            | HelpdeskError::Io(_)
            | HelpdeskError::Yaml(_)
            | HelpdeskError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        // Store refusals travel verbatim.
        let message = match self.0.downcast_ref::<HelpdeskError>() {
            Some(HelpdeskError::TransitionRejected(msg)) => msg.clone(),
            _ => self.0.to_string(),
        };
        let body = serde_json::json!({
            "success": false,
            "message": message,
        });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
