//! Defines the app level error type and its conversion to HTTP responses.
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The current UTC offset of the local timezone, or of a timezone in the
    /// timezone database, could not be determined.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("could not resolve UTC offset: {0}")]
    Resolution(String),

    /// Tried to find the nearest offset in an offset map with no entries.
    ///
    /// This should not happen with a real timezone database.
    #[error("the UTC offset map is empty")]
    EmptyOffsetMap,

    /// The client provided a time that is not an ISO time of day.
    #[error("invalid time \"{0}\", expected an ISO time such as \"07:30\"")]
    InvalidTime(String),

    /// A time could not be formatted for the response.
    #[error("could not format time: {0}")]
    TimeFormat(String),

    /// A request or response body could not be read while logging it.
    #[error("could not read body: {0}")]
    BodyRead(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::InvalidTime(_) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "detail": self.to_string() })))
                    .into_response()
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "Internal Server Error" })),
                )
                    .into_response()
            }
        }
    }
}
