//! Error types for the SCORM Cloud client

use thiserror::Error;

/// Classified failure of a single service call.
///
/// Every public service operation resolves to a [`crate::response::Response`];
/// when the call fails its error is one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    /// The body could not be parsed as XML
    #[error("InvalidXml")]
    InvalidXml,

    /// The body held no document at all
    #[error("EmptyResponse")]
    EmptyResponse,

    /// A document was returned but not in the shape the service documents
    #[error("MalformedResponse")]
    MalformedResponse,

    /// The service reported an error of its own
    #[error("service error {code}: {message}")]
    ServiceError { code: String, message: String },

    /// The request never produced a body
    #[error("transport error: {0}")]
    Transport(String),
}

impl ResponseError {
    /// Stable short name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseError::InvalidXml => "InvalidXml",
            ResponseError::EmptyResponse => "EmptyResponse",
            ResponseError::MalformedResponse => "MalformedResponse",
            ResponseError::ServiceError { .. } => "ServiceError",
            ResponseError::Transport(_) => "Transport",
        }
    }
}

/// Failures of the HTTP collaborator.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Http(err.to_string())
    }
}

impl From<TransportError> for ResponseError {
    fn from(err: TransportError) -> Self {
        ResponseError::Transport(err.to_string())
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    MissingVar(&'static str),

    #[error("service url is not absolute: {0}")]
    InvalidServiceUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_match_wire_names() {
        assert_eq!(ResponseError::InvalidXml.kind(), "InvalidXml");
        assert_eq!(ResponseError::EmptyResponse.to_string(), "EmptyResponse");
        let err = ResponseError::ServiceError {
            code: "100".to_string(),
            message: "The maximum number of registrations has been reached.".to_string(),
        };
        assert_eq!(err.kind(), "ServiceError");
        assert!(err.to_string().contains("maximum number"));
    }

    #[test]
    fn transport_errors_become_response_errors() {
        let err: ResponseError = TransportError::Status {
            status: 502,
            url: "http://cloud.scorm.com/api".to_string(),
        }
        .into();
        assert_eq!(err.kind(), "Transport");
        assert!(err.to_string().contains("502"));
    }
}
