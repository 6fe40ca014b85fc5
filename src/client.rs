//! Entry point tying configuration, transport and clock to the services.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::account::AccountService;
use crate::clock::{Clock, SystemClock};
use crate::config::Configuration;
use crate::error::{ResponseError, TransportError};
use crate::method::RequestMethod;
use crate::params::ParameterSet;
use crate::registration::RegistrationService;
use crate::request::{event_channel, ResponseEvent, ServiceRequest};
use crate::response::Response;
use crate::transport::{ReqwestTransport, Transport};
use crate::xml::Element;

/// Everything a service needs to issue calls. Cheap to clone.
#[derive(Clone)]
pub struct ServiceContext {
    configuration: Arc<Configuration>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<ResponseEvent>,
}

impl ServiceContext {
    pub fn new(
        configuration: Arc<Configuration>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            configuration,
            transport,
            clock,
            events: event_channel(),
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Invalid-response notifications for every call made through this context.
    pub fn subscribe(&self) -> broadcast::Receiver<ResponseEvent> {
        self.events.subscribe()
    }

    pub(crate) fn request(&self, parameters: &ParameterSet) -> ServiceRequest<'_> {
        let method = RequestMethod::with_parameters(&self.configuration, parameters);
        ServiceRequest::new(method, self.clock.as_ref()).with_events(self.events.clone())
    }

    pub(crate) async fn call<T, F>(&self, parameters: &ParameterSet, decoder: F) -> Response<T>
    where
        F: FnOnce(&Element) -> Result<T, ResponseError>,
    {
        self.request(parameters)
            .call(self.transport.as_ref(), decoder)
            .await
    }
}

/// A service handed out by [`ScormEngineService::service`].
pub enum Service {
    Account(AccountService),
    Registration(RegistrationService),
}

/// Registry of the services this client knows about.
pub struct ScormEngineService {
    context: ServiceContext,
}

impl ScormEngineService {
    pub const SERVICES: [&'static str; 2] = ["account", "registration"];

    /// Client over HTTP with the system clock.
    pub fn new(configuration: Configuration) -> Result<Self, TransportError> {
        Ok(Self::with_parts(
            Arc::new(configuration),
            Arc::new(ReqwestTransport::new()?),
            Arc::new(SystemClock),
        ))
    }

    pub fn with_parts(
        configuration: Arc<Configuration>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            context: ServiceContext::new(configuration, transport, clock),
        }
    }

    pub fn available_services(&self) -> &'static [&'static str] {
        &Self::SERVICES
    }

    pub fn service(&self, name: &str) -> Option<Service> {
        match name {
            "account" => Some(Service::Account(self.account())),
            "registration" => Some(Service::Registration(self.registration())),
            _ => None,
        }
    }

    pub fn account(&self) -> AccountService {
        AccountService::new(self.context.clone())
    }

    pub fn registration(&self) -> RegistrationService {
        RegistrationService::new(self.context.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ResponseEvent> {
        self.context.subscribe()
    }

    pub fn configuration(&self) -> &Configuration {
        self.context.configuration()
    }

    /// Current instant according to the engine's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.context.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct Unreachable;

    #[async_trait]
    impl Transport for Unreachable {
        async fn get(&self, _url: &str) -> Result<Vec<u8>, TransportError> {
            Err(TransportError::Http("unreachable".to_string()))
        }
    }

    fn engine() -> ScormEngineService {
        ScormEngineService::with_parts(
            Arc::new(Configuration::new("http://cloud.scorm.com", "app", "key", "test")),
            Arc::new(Unreachable),
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2013, 1, 1, 0, 0, 0).unwrap())),
        )
    }

    #[test]
    fn now_comes_from_the_injected_clock() {
        assert_eq!(engine().now(), Utc.with_ymd_and_hms(2013, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn lists_static_services() {
        assert_eq!(engine().available_services(), &["account", "registration"]);
    }

    #[test]
    fn resolves_services_by_name() {
        let engine = engine();
        assert!(matches!(engine.service("account"), Some(Service::Account(_))));
        assert!(matches!(engine.service("registration"), Some(Service::Registration(_))));
        assert!(engine.service("course").is_none());
    }

    #[tokio::test]
    async fn context_events_reach_engine_subscribers() {
        let engine = engine();
        let mut events = engine.subscribe();
        let response = engine.account().account_info().await;
        assert!(!response.is_ok());
        assert!(events.try_recv().is_ok());
    }
}
