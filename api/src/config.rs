//! API server configuration.

use serde::{Deserialize, Serialize};

/// Server configuration.
///
/// Loaded from an optional JSON file named by `CONSENTRY_CONFIG`, then
/// overridden field by field from the environment. Missing file means
/// defaults, which are tuned for local development.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiConfig {
    /// Listen address.
    pub bind_addr: String,
    /// Base domain requests are classified against. `admin.{base}` and
    /// the base itself are operator surfaces; `{slug}.{base}` is a
    /// tenant surface.
    pub base_domain: String,
    /// HMAC secret for bearer tokens.
    pub jwt_secret: String,
    /// Issued token lifetime in hours.
    pub token_ttl_hours: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".into(),
            base_domain: "localhost".into(),
            jwt_secret: "consentry-dev-secret".into(),
            token_ttl_hours: 8,
        }
    }
}

impl ApiConfig {
    /// Load the configuration for this process.
    pub fn load() -> Result<Self, std::io::Error> {
        let path = std::env::var("CONSENTRY_CONFIG").unwrap_or_else(|_| "consentry.json".into());
        let mut config = if std::path::Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Environment variables win over the file.
    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Ok(v) = std::env::var("BASE_DOMAIN") {
            self.base_domain = v;
        }
        if let Ok(v) = std::env::var("JWT_SECRET") {
            self.jwt_secret = v;
        }
    }

    /// True while running on the built-in development secret.
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == Self::default().jwt_secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.base_domain, "localhost");
        assert!(config.uses_default_secret());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: ApiConfig =
            serde_json::from_str(r#"{"baseDomain": "consentry.io"}"#).unwrap();
        assert_eq!(config.base_domain, "consentry.io");
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
    }
}
