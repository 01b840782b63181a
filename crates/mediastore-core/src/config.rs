//! Configuration module
//!
//! Storage connection settings loaded from the environment (and `.env` when
//! present). The bucket name and region are not configurable, see
//! [`crate::constants`].

use std::env;

use crate::storage_types::StorageBackend;

/// Connection settings for the media store.
#[derive(Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// `host[:port]` of the S3-compatible service, without scheme
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub use_ssl: bool,
}

// Keep secrets out of logs.
impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("use_ssl", &self.use_ssl)
            .finish()
    }
}

impl StorageConfig {
    /// S3 configuration with static credentials.
    pub fn s3(
        endpoint: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        use_ssl: bool,
    ) -> Self {
        Self {
            backend: StorageBackend::S3,
            endpoint: endpoint.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            use_ssl,
        }
    }

    /// In-process configuration; no endpoint or credentials involved.
    pub fn memory() -> Self {
        Self {
            backend: StorageBackend::Memory,
            endpoint: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            use_ssl: false,
        }
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match var("STORAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => StorageBackend::S3,
        };

        let use_ssl = match var("S3_USE_SSL") {
            Some(value) => parse_bool(&value)
                .ok_or_else(|| anyhow::anyhow!("S3_USE_SSL must be a boolean, got {:?}", value))?,
            None => true,
        };

        let config = StorageConfig {
            backend,
            endpoint: var("S3_ENDPOINT").unwrap_or_default().trim().to_string(),
            access_key_id: var("S3_ACCESS_KEY_ID")
                .or_else(|| var("AWS_ACCESS_KEY_ID"))
                .unwrap_or_default(),
            secret_access_key: var("S3_SECRET_ACCESS_KEY")
                .or_else(|| var("AWS_SECRET_ACCESS_KEY"))
                .unwrap_or_default(),
            use_ssl,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.backend == StorageBackend::Memory {
            return Ok(());
        }

        if self.endpoint.is_empty() {
            return Err(anyhow::anyhow!(
                "S3_ENDPOINT must be set when using S3 storage backend"
            ));
        }
        endpoint_url(&self.endpoint, self.use_ssl)?;

        if self.access_key_id.is_empty() != self.secret_access_key.is_empty() {
            return Err(anyhow::anyhow!(
                "S3_ACCESS_KEY_ID and S3_SECRET_ACCESS_KEY must be set together"
            ));
        }

        Ok(())
    }

    /// Whether explicit credentials were supplied.
    pub fn has_static_credentials(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
    }
}

/// Turn a bare `host[:port]` endpoint into a URL, picking the scheme from the
/// TLS flag.
pub fn endpoint_url(endpoint: &str, use_ssl: bool) -> Result<String, anyhow::Error> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(anyhow::anyhow!("endpoint is empty"));
    }
    if endpoint.contains("://") {
        return Err(anyhow::anyhow!(
            "endpoint {:?} must not include a scheme, use the TLS flag instead",
            endpoint
        ));
    }
    if endpoint.contains('/') || endpoint.contains('?') || endpoint.contains('#') {
        return Err(anyhow::anyhow!(
            "endpoint {:?} must be host[:port] without a path",
            endpoint
        ));
    }
    if endpoint.chars().any(char::is_whitespace) {
        return Err(anyhow::anyhow!("endpoint {:?} contains whitespace", endpoint));
    }

    let scheme = if use_ssl { "https" } else { "http" };
    Ok(format!("{}://{}", scheme, endpoint))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn loads_s3_settings() {
        let env = vars(&[
            ("S3_ENDPOINT", "localhost:9000"),
            ("S3_ACCESS_KEY_ID", "minio"),
            ("S3_SECRET_ACCESS_KEY", "minio123"),
            ("S3_USE_SSL", "false"),
        ]);
        let config = StorageConfig::from_vars(|k| env.get(k).cloned()).unwrap();

        assert_eq!(config.backend, StorageBackend::S3);
        assert_eq!(config.endpoint, "localhost:9000");
        assert_eq!(config.access_key_id, "minio");
        assert!(!config.use_ssl);
        assert!(config.has_static_credentials());
    }

    #[test]
    fn falls_back_to_aws_credential_names() {
        let env = vars(&[
            ("S3_ENDPOINT", "s3.amazonaws.com"),
            ("AWS_ACCESS_KEY_ID", "AKIA"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
        ]);
        let config = StorageConfig::from_vars(|k| env.get(k).cloned()).unwrap();

        assert_eq!(config.access_key_id, "AKIA");
        assert_eq!(config.secret_access_key, "secret");
        assert!(config.use_ssl);
    }

    #[test]
    fn s3_requires_endpoint() {
        let env = vars(&[("STORAGE_BACKEND", "s3")]);
        assert!(StorageConfig::from_vars(|k| env.get(k).cloned()).is_err());
    }

    #[test]
    fn memory_backend_needs_nothing_else() {
        let env = vars(&[("STORAGE_BACKEND", "memory")]);
        let config = StorageConfig::from_vars(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.backend, StorageBackend::Memory);
    }

    #[test]
    fn rejects_half_configured_credentials() {
        let env = vars(&[("S3_ENDPOINT", "localhost:9000"), ("S3_ACCESS_KEY_ID", "minio")]);
        assert!(StorageConfig::from_vars(|k| env.get(k).cloned()).is_err());
    }

    #[test]
    fn rejects_unparseable_ssl_flag() {
        let env = vars(&[("S3_ENDPOINT", "localhost:9000"), ("S3_USE_SSL", "maybe")]);
        assert!(StorageConfig::from_vars(|k| env.get(k).cloned()).is_err());
    }

    #[test]
    fn endpoint_url_uses_tls_flag() {
        assert_eq!(
            endpoint_url("localhost:9000", false).unwrap(),
            "http://localhost:9000"
        );
        assert_eq!(
            endpoint_url("play.min.io", true).unwrap(),
            "https://play.min.io"
        );
    }

    #[test]
    fn endpoint_url_rejects_scheme_and_path() {
        assert!(endpoint_url("http://localhost:9000", false).is_err());
        assert!(endpoint_url("localhost:9000/media", false).is_err());
        assert!(endpoint_url("", true).is_err());
        assert!(endpoint_url("local host", true).is_err());
    }

    #[test]
    fn debug_redacts_secret() {
        let config = StorageConfig::s3("localhost:9000", "minio", "hunter2", false);
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }
}
