use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

use crate::sink::CopyError;

/// Result type for WPS operations.
pub type Result<T> = std::result::Result<T, Error>;

/// OWS exception reported by the server, either inline in an HTTP error
/// response or inside a failed asynchronous status document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwsException {
    pub code: String,
    pub locator: Option<String>,
    pub text: Option<String>,
}

impl fmt::Display for OwsException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        if let Some(locator) = &self.locator {
            write!(f, " [{}]", locator)?;
        }
        if let Some(text) = &self.text {
            write!(f, ": {}", text)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Connection-level failure (refused, timed out, broken body stream).
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered 401 or 403 at some point of the exchange.
    #[error("authentication failed; perhaps credentials are missing or invalid")]
    Authentication,

    /// The server reported an OWS exception.
    #[error("WPS request failed: {0}")]
    Protocol(OwsException),

    /// The response could not be understood as a WPS document.
    #[error("malformed WPS response: {0}")]
    MalformedResponse(String),

    /// HTTP error whose body did not carry an OWS exception.
    #[error("HTTP {status} for url ({url})")]
    Http { status: StatusCode, url: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured poll deadline expired before the job finished.
    #[error("job did not finish within {0:?}")]
    PollTimeout(std::time::Duration),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The caller's request body builder failed.
    #[error("failed to render request: {0}")]
    RequestBody(#[source] anyhow::Error),
}

impl Error {
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication)
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedResponse(msg.into())
    }
}

/// A response body that fails mid-read is a transport failure; failures of
/// the local writer stay [`Error::Io`].
impl From<CopyError> for Error {
    fn from(e: CopyError) -> Self {
        match e {
            CopyError::Read(e) if e.get_ref().is_some() => {
                let kind = e.kind();
                match e.into_inner().map(|inner| inner.downcast::<reqwest::Error>()) {
                    Some(Ok(inner)) => Error::Transport(*inner),
                    Some(Err(other)) => Error::Io(std::io::Error::new(kind, other)),
                    None => Error::Io(kind.into()),
                }
            }
            CopyError::Read(e) | CopyError::Write(e) => Error::Io(e),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::MalformedResponse(e.to_string())
    }
}
