use axum::http::StatusCode;
use thiserror::Error;

/// Validation failures raised by the ledger, roster and aggregation code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("session slot {0} is out of range (expected 0-3)")]
    InvalidSlot(u8),

    #[error("session slot {slot} is inactive (day has {active_count} active sessions)")]
    InactiveSlot { slot: u8, active_count: usize },

    #[error("active session count {0} is out of range (expected 1-4)")]
    InvalidActiveCount(u8),

    #[error("too many {field}: {len} given, at most 4 allowed")]
    TooManyLabels { field: &'static str, len: usize },

    #[error("invalid date key '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("invalid month {0} (expected 1-12)")]
    InvalidMonth(u32),

    #[error("member name must not be empty")]
    EmptyName,

    #[error("unknown member: {0}")]
    UnknownMember(String),

    #[error("member id already exists: {0}")]
    DuplicateMember(String),

    #[error("name '{0}' is on the banned list")]
    BannedName(String),

    #[error("unknown banned entry: {0}")]
    UnknownBanned(String),

    #[error("unknown record: {0}")]
    UnknownRecord(String),
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let status = match err {
            LedgerError::UnknownMember(_)
            | LedgerError::UnknownBanned(_)
            | LedgerError::UnknownRecord(_) => StatusCode::NOT_FOUND,
            LedgerError::DuplicateMember(_) | LedgerError::BannedName(_) => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
