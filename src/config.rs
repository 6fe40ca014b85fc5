use crate::error::ConfigError;

pub const SERVICE_URL_VAR: &str = "SCORM_SERVICE_URL";
pub const APP_ID_VAR: &str = "SCORM_APP_ID";
pub const SECRET_KEY_VAR: &str = "SCORM_SECRET_KEY";
pub const ORIGIN_VAR: &str = "SCORM_ORIGIN";

/// Connection details shared by every request.
///
/// Built once at startup and handed to services behind an `Arc`; nothing
/// mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    service_url: String,
    app_id: String,
    security_key: String,
    origin: String,
}

impl Configuration {
    pub fn new(
        service_url: impl Into<String>,
        app_id: impl Into<String>,
        security_key: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        let service_url: String = service_url.into();
        Self {
            service_url: service_url.trim_end_matches('/').to_string(),
            app_id: app_id.into(),
            security_key: security_key.into(),
            origin: origin.into(),
        }
    }

    /// Reads the configuration from `SCORM_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::MissingVar(name))
        };

        let service_url = required(SERVICE_URL_VAR)?;
        if !service_url.starts_with("http://") && !service_url.starts_with("https://") {
            return Err(ConfigError::InvalidServiceUrl(service_url));
        }

        let origin = lookup(ORIGIN_VAR)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());

        Ok(Self::new(
            service_url,
            required(APP_ID_VAR)?,
            required(SECRET_KEY_VAR)?,
            origin,
        ))
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn security_key(&self) -> &str {
        &self.security_key
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn loads_all_variables() {
        let config = Configuration::from_lookup(lookup_from(&[
            (SERVICE_URL_VAR, "http://cloud.scorm.com/"),
            (APP_ID_VAR, "app"),
            (SECRET_KEY_VAR, "secret"),
            (ORIGIN_VAR, "acme"),
        ]))
        .unwrap();

        assert_eq!(config.service_url(), "http://cloud.scorm.com");
        assert_eq!(config.app_id(), "app");
        assert_eq!(config.security_key(), "secret");
        assert_eq!(config.origin(), "acme");
    }

    #[test]
    fn origin_defaults_to_package_name() {
        let config = Configuration::from_lookup(lookup_from(&[
            (SERVICE_URL_VAR, "https://cloud.scorm.com"),
            (APP_ID_VAR, "app"),
            (SECRET_KEY_VAR, "secret"),
        ]))
        .unwrap();
        assert_eq!(config.origin(), "scormcloud-reporting");
    }

    #[test]
    fn missing_secret_is_reported() {
        let err = Configuration::from_lookup(lookup_from(&[
            (SERVICE_URL_VAR, "https://cloud.scorm.com"),
            (APP_ID_VAR, "app"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(SECRET_KEY_VAR)));
    }

    #[test]
    fn rejects_relative_service_url() {
        let err = Configuration::from_lookup(lookup_from(&[
            (SERVICE_URL_VAR, "cloud.scorm.com"),
            (APP_ID_VAR, "app"),
            (SECRET_KEY_VAR, "secret"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidServiceUrl(_)));
    }
}
