use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use super::policy::WindowViolation;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("Only active members may check in")]
    NotEligible,

    #[error("{0}")]
    WindowClosed(#[from] WindowViolation),

    #[error("You have already checked in today")]
    AlreadyRecorded,

    #[error("attendance store failure: {0}")]
    StoreFailure(#[from] StoreError),
}

impl AttendanceError {
    /// Stable machine-readable tag sent next to the message.
    pub fn reason(&self) -> &'static str {
        match self {
            AttendanceError::NotEligible => "NOT_ELIGIBLE",
            AttendanceError::WindowClosed(_) => "WINDOW_CLOSED",
            AttendanceError::AlreadyRecorded => "ALREADY_RECORDED",
            AttendanceError::StoreFailure(_) => "STORE_FAILURE",
        }
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::NotEligible => StatusCode::FORBIDDEN,
            AttendanceError::WindowClosed(_) | AttendanceError::AlreadyRecorded => {
                StatusCode::BAD_REQUEST
            }
            AttendanceError::StoreFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // store details stay in the logs
        let message = match self {
            AttendanceError::StoreFailure(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "message": message,
            "reason": self.reason(),
        }))
    }
}
