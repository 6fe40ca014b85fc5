//! Signed service method strings.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::Configuration;
use crate::params::{canonicalize, ParameterSet};
use crate::signer::generate_signature;

/// Characters left as-is in a query component, matching `encodeURIComponent`.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Parameters of one service call, signed with the configured security key.
///
/// Owns its own copy of the parameters; nothing the caller does to the set it
/// passed in afterwards leaks into the request.
#[derive(Debug, Clone)]
pub struct RequestMethod<'a> {
    configuration: &'a Configuration,
    parameters: ParameterSet,
}

impl<'a> RequestMethod<'a> {
    pub fn new(configuration: &'a Configuration) -> Self {
        Self {
            configuration,
            parameters: ParameterSet::new(),
        }
    }

    pub fn with_parameters(configuration: &'a Configuration, parameters: &ParameterSet) -> Self {
        Self {
            configuration,
            parameters: parameters.clone(),
        }
    }

    /// Destructive replace.
    pub fn set_parameters(&mut self, parameters: &ParameterSet) {
        self.parameters = parameters.clone();
    }

    /// Merges `parameters` in, replacing same-key entries.
    pub fn add_parameters(&mut self, parameters: &ParameterSet) {
        self.parameters.extend(parameters);
    }

    pub fn clear_parameters(&mut self) {
        self.parameters.clear();
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn configuration(&self) -> &'a Configuration {
        self.configuration
    }

    /// Canonical, signed and percent-encoded query string.
    pub fn build_query_string(&self) -> String {
        let canonical = canonicalize(&self.parameters);
        let sig = generate_signature(self.configuration.security_key(), canonical.iter());

        let mut pairs: Vec<String> = canonical
            .iter()
            .filter(|(key, _)| *key != "sig")
            .map(|(key, value)| format!("{}={}", encode(key), encode(&value.to_string())))
            .collect();
        pairs.push(format!("sig={sig}"));
        pairs.join("&")
    }
}

fn encode(component: &str) -> String {
    utf8_percent_encode(component, QUERY_COMPONENT).to_string()
}
