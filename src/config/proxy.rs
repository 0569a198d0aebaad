//! Remote payment service configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::{hex_encode, RequestSigner};

/// Configuration for the remote payment service connection
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Base URL of the remote payment service
    pub base_url: String,

    /// API key identifying this storefront
    pub api_key: String,

    /// Shared HMAC secret, never logged or transmitted
    pub api_secret: SecretString,
}

impl ProxyConfig {
    /// Build the request signer from the configured credentials
    pub fn signer(&self) -> RequestSigner {
        RequestSigner::new(self.api_key.clone(), self.api_secret.clone())
    }

    /// Validate proxy configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("PROXY__BASE_URL"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidProxyUrl);
        }
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PROXY__API_KEY"));
        }
        if self.api_secret.expose_secret().len() < 32 {
            return Err(ValidationError::ApiSecretTooShort);
        }
        Ok(())
    }
}

/// Generate a fresh API secret suitable for pairing with the remote service.
///
/// 32 random bytes from the OS RNG, hex-encoded.
pub fn generate_api_secret() -> String {
    use rand::RngCore;

    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ProxyConfig {
        ProxyConfig {
            base_url: "https://proxy.example.com".to_string(),
            api_key: "key_test".to_string(),
            api_secret: SecretString::new(generate_api_secret()),
        }
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validation_missing_base_url() {
        let config = ProxyConfig {
            base_url: String::new(),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_non_http_base_url() {
        let config = ProxyConfig {
            base_url: "ftp://proxy.example.com".to_string(),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidProxyUrl)
        ));
    }

    #[test]
    fn test_validation_short_secret() {
        let config = ProxyConfig {
            api_secret: SecretString::new("short".to_string()),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::ApiSecretTooShort)
        ));
    }

    #[test]
    fn test_generated_secret_shape() {
        let secret = generate_api_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(secret, generate_api_secret());
    }

    #[test]
    fn test_signer_uses_configured_key() {
        let config = valid_config();
        assert_eq!(config.signer().api_key(), "key_test");
    }
}
