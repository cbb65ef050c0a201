use std::fmt::Display;
use std::str::FromStr;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Response;
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

pub mod error;
pub mod objects;
pub mod storage_client;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An error returned from the Google Cloud Storage service.
    #[error(transparent)]
    Response(#[from] error::ErrorResponse),

    /// An error from the underlying HTTP client.
    #[error(transparent)]
    HttpClient(#[from] reqwest::Error),

    /// An error from one of the middleware used.
    #[error(transparent)]
    HttpMiddleware(anyhow::Error),

    /// An error from a token source.
    #[error("token source failed: {0}")]
    TokenSource(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// The HTTP status reported by the service, if the request got that far.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Response(e) => Some(e.code),
            Error::HttpClient(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(error: reqwest_middleware::Error) -> Self {
        match error {
            reqwest_middleware::Error::Middleware(err) => Error::HttpMiddleware(err),
            reqwest_middleware::Error::Reqwest(err) => Error::HttpClient(err),
        }
    }
}

/// Checks whether an HTTP response is successful and returns it, or returns an error.
///
/// Media endpoints answer failures with a plain text body, so anything that is not the JSON
/// error envelope becomes an [`error::ErrorResponse`] carrying the status and the raw text.
pub(crate) async fn check_response_status(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return Ok(response);
    }

    let body = response.text().await?;
    let error = match serde_json::from_str::<error::ErrorWrapper>(&body) {
        Ok(wrapper) => wrapper.error,
        Err(_) => {
            let message = match body.trim() {
                "" => status.canonical_reason().unwrap_or("unknown status").to_string(),
                text => text.to_string(),
            };
            error::ErrorResponse::new(status.as_u16(), message)
        }
    };
    tracing::trace!("storage responded {}: {}", error.code, error.message);
    Err(Error::Response(error))
}

pub(crate) trait Escape {
    fn escape(&self) -> String;
}

impl Escape for String {
    fn escape(&self) -> String {
        utf8_percent_encode(self, ENCODE_SET).to_string()
    }
}

const ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'*').remove(b'-').remove(b'.').remove(b'_');

/// GCS encodes int64 fields as JSON strings.
fn from_str_option<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: FromStr,
    T::Err: Display,
    D: Deserializer<'de>,
{
    let s: Option<Value> = Deserialize::deserialize(deserializer)?;
    match s {
        Some(Value::String(s)) => T::from_str(&s).map_err(de::Error::custom).map(Some),
        Some(Value::Number(num)) => T::from_str(&num.to_string()).map_err(de::Error::custom).map(Some),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(de::Error::custom("Incorrect type")),
    }
}
