//! Client for the SCORM Cloud reporting and registration API.
//!
//! Requests are signed query strings (`sig` is an MD5 over the security key
//! and the sorted parameters); responses are `<rsp>` XML documents that get
//! classified, decoded into registration records, and folded into reports.

pub mod account;
pub mod client;
pub mod clock;
pub mod cohort;
pub mod config;
pub mod decode;
pub mod detail;
pub mod error;
pub mod method;
pub mod models;
pub mod params;
pub mod registration;
pub mod report;
pub mod request;
pub mod response;
pub mod rollup;
pub mod signer;
pub mod transport;
pub mod xml;

pub use client::{ScormEngineService, Service, ServiceContext};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Configuration;
pub use error::{ConfigError, ResponseError, TransportError};
pub use method::RequestMethod;
pub use params::{canonicalize, ParamValue, ParameterSet};
pub use request::{ResponseEvent, ServiceRequest};
pub use response::{RawResponse, Response, Status};
pub use signer::generate_signature;
pub use transport::{ReqwestTransport, Transport};
