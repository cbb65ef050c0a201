use std::fmt;

use crate::backend::BoxError;
use crate::http;
use crate::http::error::ErrorResponse;

const UNKNOWN_ERROR: &str = "Unknown error";

/// Outcome of every non-streaming [`Client`](crate::client::Client) operation.
pub type Result<T, E = RequestError> = std::result::Result<T, E>;

/// An error with a request, stripped of provider specific types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RequestError {
    pub message: String,
    /// HTTP status reported by the storage service, `404` when the object or bucket is missing.
    pub status_code: Option<u16>,
}

impl RequestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN_ERROR)
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }

    /// Normalizes whatever a backend failed with. Never fails itself.
    pub fn from_provider(err: BoxError) -> Self {
        let err = match err.downcast::<http::Error>() {
            Ok(err) => return Self::from(*err),
            Err(err) => err,
        };
        let err = match err.downcast::<ErrorResponse>() {
            Ok(err) => return Self::from(*err),
            Err(err) => err,
        };
        let err = match err.downcast::<RequestError>() {
            Ok(err) => return *err,
            Err(err) => err,
        };
        Self::from_message(err.to_string())
    }

    fn from_message(message: String) -> Self {
        if message.is_empty() {
            Self::unknown()
        } else {
            Self::new(message)
        }
    }
}

impl From<ErrorResponse> for RequestError {
    fn from(err: ErrorResponse) -> Self {
        Self::with_status(err.message, err.code)
    }
}

impl From<http::Error> for RequestError {
    fn from(err: http::Error) -> Self {
        match err {
            http::Error::Response(e) => e.into(),
            http::Error::HttpClient(e) => match e.status() {
                Some(status) => Self::with_status(e.to_string(), status.as_u16()),
                // the innermost cause, e.g. the failed body stream behind "error sending request".
                None => Self::from_message(root_cause(&e).to_string()),
            },
            other => Self::from_message(other.to_string()),
        }
    }
}

fn root_cause<'a>(err: &'a (dyn std::error::Error + 'static)) -> &'a (dyn std::error::Error + 'static) {
    let mut cause = err;
    while let Some(source) = cause.source() {
        cause = source;
    }
    cause
}

impl From<std::io::Error> for RequestError {
    fn from(err: std::io::Error) -> Self {
        Self::from_message(err.to_string())
    }
}

/// A [`RequestError`] delivered through a stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamRequestError {
    request_error: RequestError,
}

impl StreamRequestError {
    pub fn request_error(&self) -> &RequestError {
        &self.request_error
    }

    pub fn into_request_error(self) -> RequestError {
        self.request_error
    }
}

impl From<RequestError> for StreamRequestError {
    fn from(request_error: RequestError) -> Self {
        Self { request_error }
    }
}

impl fmt::Display for StreamRequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.request_error.status_code {
            Some(code) => write!(f, "{}: {}", code, self.request_error.message),
            None => self.request_error.message.fmt(f),
        }
    }
}

impl std::error::Error for StreamRequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.request_error)
    }
}

#[cfg(test)]
mod test {
    use std::io;

    use crate::backend::BoxError;
    use crate::error::{RequestError, StreamRequestError};
    use crate::http;
    use crate::http::error::ErrorResponse;

    #[derive(Debug, thiserror::Error)]
    #[error("")]
    struct Silent;

    #[test]
    fn test_from_provider_api_error() {
        let err: BoxError = Box::new(http::Error::Response(ErrorResponse::new(404, "No such object: b/o")));
        assert_eq!(
            RequestError::from_provider(err),
            RequestError::with_status("No such object: b/o", 404)
        );

        let err: BoxError = Box::new(ErrorResponse::new(412, "At least one of the pre-conditions you specified did not hold."));
        let normalized = RequestError::from_provider(err);
        assert_eq!(normalized.status_code, Some(412));
        assert!(!normalized.is_not_found());
    }

    #[test]
    fn test_from_provider_generic_error() {
        let err: BoxError = Box::new(io::Error::other("connection reset"));
        assert_eq!(RequestError::from_provider(err), RequestError::new("connection reset"));

        let err: BoxError = "token exchange failed".into();
        assert_eq!(RequestError::from_provider(err), RequestError::new("token exchange failed"));

        let err: BoxError = Box::new(http::Error::TokenSource("expired".into()));
        assert_eq!(
            RequestError::from_provider(err),
            RequestError::new("token source failed: expired")
        );
    }

    #[derive(Debug, thiserror::Error)]
    #[error("error sending request")]
    struct Outer(#[source] io::Error);

    #[test]
    fn test_root_cause() {
        let err = Outer(io::Error::other("broken pipe"));
        assert_eq!(super::root_cause(&err).to_string(), "broken pipe");
        let err = io::Error::other("broken pipe");
        assert_eq!(super::root_cause(&err).to_string(), "broken pipe");
    }

    #[test]
    fn test_from_provider_unknown() {
        let err: BoxError = Box::new(Silent);
        assert_eq!(RequestError::from_provider(err), RequestError::unknown());
        assert_eq!(RequestError::unknown().message, "Unknown error");
    }

    #[test]
    fn test_stream_request_error_display() {
        let err = StreamRequestError::from(RequestError::with_status("No such object: b/o", 404));
        assert_eq!(err.to_string(), "404: No such object: b/o");
        assert!(err.request_error().is_not_found());

        let err = StreamRequestError::from(RequestError::new("broken pipe"));
        assert_eq!(err.to_string(), "broken pipe");
        assert_eq!(err.into_request_error().status_code, None);
    }
}
