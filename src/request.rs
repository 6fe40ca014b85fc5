//! One signed round trip to the service.

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::clock::{utc_timestamp, Clock};
use crate::error::ResponseError;
use crate::method::RequestMethod;
use crate::params::ParameterSet;
use crate::response::{classify, Payload, RawResponse, Response};
use crate::transport::Transport;
use crate::xml::Element;

pub const API_PATH: &str = "/api";

/// Library tag sent as `applib` on every call.
pub const APPLIB: &str = "net";

const EVENT_CAPACITY: usize = 16;

/// Notifications raised while classifying responses.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEvent {
    InvalidResponse { url: String, error: ResponseError },
}

pub fn event_channel() -> broadcast::Sender<ResponseEvent> {
    broadcast::channel(EVENT_CAPACITY).0
}

pub struct ServiceRequest<'a> {
    method: RequestMethod<'a>,
    clock: &'a dyn Clock,
    events: broadcast::Sender<ResponseEvent>,
}

impl<'a> ServiceRequest<'a> {
    pub fn new(method: RequestMethod<'a>, clock: &'a dyn Clock) -> Self {
        Self {
            method,
            clock,
            events: event_channel(),
        }
    }

    /// Publishes events on an existing channel instead of a private one.
    pub fn with_events(mut self, events: broadcast::Sender<ResponseEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ResponseEvent> {
        self.events.subscribe()
    }

    /// Full signed URL, including the required service parameters.
    pub fn request_url(&self) -> String {
        let configuration = self.method.configuration();
        format!("{}{}", configuration.service_url(), self.request_path())
    }

    fn request_path(&self) -> String {
        let configuration = self.method.configuration();
        let mut method = self.method.clone();
        method.add_parameters(
            &ParameterSet::new()
                .with("appid", configuration.app_id())
                .with("origin", configuration.origin())
                .with("ts", utc_timestamp(self.clock.now()))
                .with("applib", APPLIB),
        );
        format!("{}?{}", API_PATH, method.build_query_string())
    }

    /// Sends the request and classifies whatever comes back.
    ///
    /// Transport failures are folded into the returned value; this never
    /// errors.
    pub async fn submit(&self, transport: &dyn Transport) -> RawResponse {
        let url = self.request_url();
        self.fetch(&url, transport).await
    }

    /// Sends the request and decodes the document with `decoder`.
    ///
    /// Subscribers hear about every failed outcome, including OK documents
    /// that do not decode.
    pub async fn call<T, F>(&self, transport: &dyn Transport, decoder: F) -> Response<T>
    where
        F: FnOnce(&Element) -> Result<T, ResponseError>,
    {
        let url = self.request_url();
        let raw = self.fetch(&url, transport).await;
        if !raw.is_ok() {
            return raw.decode(decoder);
        }

        let response = raw.decode(decoder);
        if let Some(error) = response.error() {
            self.notify(url, error);
        }
        response
    }

    async fn fetch(&self, url: &str, transport: &dyn Transport) -> RawResponse {
        debug!(%url, "submitting service request");

        let raw = match transport.get(url).await {
            Ok(body) => classify(&body),
            Err(err) => RawResponse::failed(err.into(), Payload::Empty),
        };

        if let Some(error) = raw.error() {
            warn!(error = %error, "invalid response from service");
            self.notify(url.to_string(), error);
        }

        raw
    }

    fn notify(&self, url: String, error: &ResponseError) {
        // No subscribers is fine.
        let _ = self.events.send(ResponseEvent::InvalidResponse {
            url,
            error: error.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::Configuration;
    use crate::error::TransportError;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    struct CannedTransport(Result<&'static str, u16>);

    #[async_trait]
    impl Transport for CannedTransport {
        async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
            match self.0 {
                Ok(body) => Ok(body.as_bytes().to_vec()),
                Err(status) => Err(TransportError::Status {
                    status,
                    url: url.to_string(),
                }),
            }
        }
    }

    fn configuration() -> Configuration {
        Configuration::new("http://cloud.scorm.com", "appId", "secretKey", "nock")
    }

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2013, 5, 6, 7, 8, 9).unwrap())
    }

    fn query_keys(url: &str) -> Vec<String> {
        let (_, query) = url.split_once('?').unwrap();
        let mut keys: Vec<String> = query
            .split('&')
            .filter_map(|pair| pair.split_once('=').map(|(k, _)| k.to_string()))
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn adds_required_parameters() {
        let configuration = configuration();
        let clock = clock();
        let request = ServiceRequest::new(RequestMethod::new(&configuration), &clock);
        let url = request.request_url();

        assert!(url.starts_with("http://cloud.scorm.com/api?"));
        assert_eq!(query_keys(&url), vec!["appid", "applib", "origin", "sig", "ts"]);
        assert!(url.contains("ts=20130506070809"));
        assert!(url.contains("applib=net"));
    }

    #[test]
    fn keeps_user_parameters() {
        let configuration = configuration();
        let clock = clock();
        let method = RequestMethod::with_parameters(
            &configuration,
            &ParameterSet::new()
                .with("test", "something")
                .with("anotherTest", "somethingElse"),
        );
        let url = ServiceRequest::new(method, &clock).request_url();
        assert_eq!(
            query_keys(&url),
            vec!["anotherTest", "appid", "applib", "origin", "sig", "test", "ts"]
        );
    }

    #[test]
    fn url_is_stable_for_a_fixed_clock() {
        let configuration = configuration();
        let clock = clock();
        let request = ServiceRequest::new(RequestMethod::new(&configuration), &clock);
        assert_eq!(request.request_url(), request.request_url());
    }

    #[tokio::test]
    async fn invalid_response_is_broadcast() {
        let configuration = configuration();
        let clock = clock();
        let request = ServiceRequest::new(RequestMethod::new(&configuration), &clock);
        let mut events = request.subscribe();

        let raw = request.submit(&CannedTransport(Ok("<rsp><oops"))).await;
        assert_eq!(raw.error(), Some(&ResponseError::InvalidXml));

        match events.try_recv().unwrap() {
            ResponseEvent::InvalidResponse { error, url } => {
                assert_eq!(error, ResponseError::InvalidXml);
                assert!(url.starts_with("http://cloud.scorm.com/api?"));
            }
        }
    }

    #[tokio::test]
    async fn ok_response_raises_no_event() {
        let configuration = configuration();
        let clock = clock();
        let request = ServiceRequest::new(RequestMethod::new(&configuration), &clock);
        let mut events = request.subscribe();

        let raw = request
            .submit(&CannedTransport(Ok(r#"<rsp stat="ok"><success/></rsp>"#)))
            .await;
        assert!(raw.is_ok());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn undecodable_ok_document_is_broadcast_once() {
        let configuration = configuration();
        let clock = clock();
        let request = ServiceRequest::new(RequestMethod::new(&configuration), &clock);
        let mut events = request.subscribe();

        let response = request
            .call(&CannedTransport(Ok(r#"<rsp stat="ok"/>"#)), |rsp: &Element| {
                rsp.child("account")
                    .map(|_| ())
                    .ok_or(ResponseError::MalformedResponse)
            })
            .await;
        assert_eq!(response.error(), Some(&ResponseError::MalformedResponse));

        match events.try_recv().unwrap() {
            ResponseEvent::InvalidResponse { error, .. } => {
                assert_eq!(error, ResponseError::MalformedResponse)
            }
        }
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_call_is_not_broadcast_twice() {
        let configuration = configuration();
        let clock = clock();
        let request = ServiceRequest::new(RequestMethod::new(&configuration), &clock);
        let mut events = request.subscribe();

        let response = request
            .call(&CannedTransport(Err(500)), |_: &Element| Ok(()))
            .await;
        assert!(!response.is_ok());
        assert!(events.try_recv().is_ok());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn transport_failure_is_classified() {
        let configuration = configuration();
        let clock = clock();
        let request = ServiceRequest::new(RequestMethod::new(&configuration), &clock);

        let raw = request.submit(&CannedTransport(Err(503))).await;
        assert!(!raw.is_ok());
        assert_eq!(raw.error().map(ResponseError::kind), Some("Transport"));
    }

    #[tokio::test]
    async fn submit_without_subscribers_still_returns() {
        let configuration = configuration();
        let clock = clock();
        let request = ServiceRequest::new(RequestMethod::new(&configuration), &clock);
        let raw = request.submit(&CannedTransport(Ok(""))).await;
        assert_eq!(raw.error(), Some(&ResponseError::EmptyResponse));
    }
}
