use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// A common error type that can be used throughout the App
#[derive(thiserror::Error, Debug)]
pub enum Error {
    // 400 Bad Request
    #[error(transparent)]
    Validation(#[from] validator::ValidationErrors),
    #[error("Room '{0}' already exists.")]
    RoomExists(String),

    // 401 Unauthorized
    #[error("Unauthorized access")]
    Unauthorized,
    #[error("Api Key was not provided.")]
    MissingApiKey,
    #[error("Unauthorized client")]
    InvalidApiKey,

    // 403 Forbidden
    #[error("Forbidden: IP not allowed.")]
    Forbidden,

    // 404 NotFound
    #[error("Resource not found")]
    NotFound,

    // 500 Internal Server Error
    #[error("Store operation timed out")]
    StoreTimeout,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("{0}")]
    Internal(String),

    // Websocket Error
    #[error("Failed to serialize websocket message")]
    SerializeMessage,
}

impl Error {
    /// Whether the failure came from the persistent store
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Error::StoreTimeout | Error::Sqlx(_) | Error::Migrate(_))
    }

    /// Rejections of a room creation request which are reported as
    /// `RoomCreationFailed` instead of a generic failure
    pub fn is_room_rejection(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::RoomExists(_))
    }

    pub fn into_error(self) -> (StatusCode, String) {
        let status = match self {
            // 400
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::RoomExists(_) => StatusCode::BAD_REQUEST,
            // 401
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::MissingApiKey => StatusCode::UNAUTHORIZED,
            Error::InvalidApiKey => StatusCode::UNAUTHORIZED,
            // 403
            Error::Forbidden => StatusCode::FORBIDDEN,
            // 404
            Error::NotFound => StatusCode::NOT_FOUND,
            _ => {
                tracing::error!("{}", self.to_string());
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An error occurred".into(),
                );
            }
        };
        (status, self.to_string())
    }

    /// The text sent to a websocket client, internal faults are masked
    pub fn client_message(&self) -> String {
        match self {
            Error::Validation(errs) => errs
                .field_errors()
                .values()
                .flat_map(|v| v.iter())
                .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| self.to_string()),
            Error::RoomExists(_) | Error::Unauthorized | Error::NotFound => self.to_string(),
            e if e.is_store_failure() => "Database operation failed".into(),
            _ => "An error occurred".into(),
        }
    }
}

// Axum allows you to return Error which impl IntoResponse
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.into_error().into_response()
    }
}
