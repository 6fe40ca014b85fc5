//! Service responses and their classification.

use serde::Serialize;

use crate::error::ResponseError;
use crate::xml::Element;

/// Name of the root element every service document carries.
pub const RESPONSE_ELEMENT: &str = "rsp";
const ERROR_ELEMENT: &str = "err";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Failed,
}

/// What came back from the wire, after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The `rsp` element (also kept for service errors).
    Document(Element),
    /// Bytes that could not be parsed.
    Raw(Vec<u8>),
    Empty,
}

/// Outcome of one request before any service-specific decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    status: Status,
    error: Option<ResponseError>,
    payload: Payload,
}

impl RawResponse {
    pub fn ok(document: Element) -> Self {
        Self {
            status: Status::Ok,
            error: None,
            payload: Payload::Document(document),
        }
    }

    pub fn failed(error: ResponseError, payload: Payload) -> Self {
        Self {
            status: Status::Failed,
            error: Some(error),
            payload,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn error(&self) -> Option<&ResponseError> {
        self.error.as_ref()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// The `rsp` element of a successful response.
    pub fn document(&self) -> Option<&Element> {
        match (&self.status, &self.payload) {
            (Status::Ok, Payload::Document(element)) => Some(element),
            _ => None,
        }
    }

    /// Decodes the document of a successful response.
    ///
    /// Failed responses pass their error through; a decoder error turns an OK
    /// response into a failed one, so callers always get exactly one outcome.
    pub fn decode<T, F>(self, decoder: F) -> Response<T>
    where
        F: FnOnce(&Element) -> Result<T, ResponseError>,
    {
        match self.document() {
            Some(document) => match decoder(document) {
                Ok(data) => Response::ok(data),
                Err(error) => {
                    tracing::warn!(error = %error, "response did not decode");
                    Response::failed(error)
                }
            },
            None => Response::failed(self.error.unwrap_or(ResponseError::MalformedResponse)),
        }
    }
}

/// Classifies a response body.
pub fn classify(body: &[u8]) -> RawResponse {
    let text = match std::str::from_utf8(body) {
        Ok(text) => text,
        Err(_) => {
            return RawResponse::failed(ResponseError::InvalidXml, Payload::Raw(body.to_vec()))
        }
    };

    if text.trim().is_empty() {
        return RawResponse::failed(ResponseError::EmptyResponse, Payload::Empty);
    }

    let root = match Element::parse(text) {
        Ok(root) => root,
        Err(err) => {
            tracing::debug!(%err, "response is not XML");
            return RawResponse::failed(ResponseError::InvalidXml, Payload::Raw(body.to_vec()));
        }
    };

    if root.name() != RESPONSE_ELEMENT {
        return RawResponse::failed(ResponseError::MalformedResponse, Payload::Document(root));
    }

    match root.child(ERROR_ELEMENT) {
        None => RawResponse::ok(root),
        Some(err) => {
            let error = match err.attribute("msg") {
                Some(message) => ResponseError::ServiceError {
                    code: err.attribute("code").unwrap_or_default().to_string(),
                    message: message.to_string(),
                },
                None => ResponseError::MalformedResponse,
            };
            RawResponse::failed(error, Payload::Document(root))
        }
    }
}

/// Typed result of a service operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    status: Status,
    error: Option<ResponseError>,
    data: Option<T>,
}

impl<T> Response<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: Status::Ok,
            error: None,
            data: Some(data),
        }
    }

    pub fn failed(error: ResponseError) -> Self {
        Self {
            status: Status::Failed,
            error: Some(error),
            data: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn error(&self) -> Option<&ResponseError> {
        self.error.as_ref()
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Response<U> {
        Response {
            status: self.status,
            error: self.error,
            data: self.data.map(f),
        }
    }

    pub fn into_result(self) -> Result<T, ResponseError> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (_, Some(error)) => Err(error),
            (None, None) => Err(ResponseError::MalformedResponse),
        }
    }
}
