use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use libweather::provider::ProviderError;
use serde::Serialize;
use tracing::warn;

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error(transparent)]
    Libweather(#[from] libweather::Error),
    #[error("Resource Not Found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Required parameter '{0}' is missing")]
    RequiredParameterMissing(String),
    #[error("{context}: {source}")]
    ProviderUnavailable {
        context: &'static str,
        #[source]
        source: ProviderError,
    },
}

impl From<JsonRejection> for Error {
    fn from(value: JsonRejection) -> Self {
        Error::InvalidRequest(value.body_text())
    }
}

// an id that doesn't parse can't name an existing object
impl From<PathRejection> for Error {
    fn from(value: PathRejection) -> Self {
        Error::NotFound(value.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(value: QueryRejection) -> Self {
        Error::InvalidRequest(value.body_text())
    }
}

impl Error {
    /// Convert a library error, reporting a missing row as a missing `what`
    pub(crate) fn not_found(what: String) -> impl FnOnce(libweather::Error) -> Self {
        move |e| {
            if e.is_not_found() {
                Error::NotFound(what)
            } else {
                Error::Libweather(e)
            }
        }
    }

    pub(crate) fn provider(context: &'static str) -> impl FnOnce(ProviderError) -> Self {
        move |source| Error::ProviderUnavailable { context, source }
    }

    pub(crate) fn to_client_status(&self) -> (StatusCode, String) {
        match self {
            Error::Libweather(e) if e.is_not_found() => {
                (StatusCode::NOT_FOUND, "Not found.".to_string())
            }
            Error::Libweather(e @ libweather::Error::Validation { .. }) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            Error::Libweather(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Library error".to_string(),
            ),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Error::InvalidRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Error::RequiredParameterMissing(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::ProviderUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

// Tell axum how to convert `Error` into a response.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        warn!("Got error for response: {self:?}");
        let (status, error) = self.to_client_status();
        (status, Json(ErrorBody { error })).into_response()
    }
}
