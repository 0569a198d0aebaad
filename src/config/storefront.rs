//! Storefront configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Storefront identity and shopper-facing URLs
#[derive(Debug, Clone, Deserialize)]
pub struct StorefrontConfig {
    /// Public URL of this storefront
    pub site_url: String,

    /// Store currency code (ISO 4217)
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl StorefrontConfig {
    fn base(&self) -> &str {
        self.site_url.trim_end_matches('/')
    }

    /// Cart page, destination after a cancelled payment
    pub fn cart_url(&self) -> String {
        format!("{}/cart", self.base())
    }

    /// Checkout page, destination after a failed payment
    pub fn checkout_url(&self) -> String {
        format!("{}/checkout", self.base())
    }

    /// Receipt page for a paid order
    pub fn receipt_url(&self, order_id: u64, order_key: &str) -> String {
        format!(
            "{}/checkout/order-received/{}?key={}",
            self.base(),
            order_id,
            order_key
        )
    }

    /// Redirect callback endpoint the remote service sends shoppers back to
    pub fn callback_url(&self) -> String {
        format!("{}/checkout/callback", self.base())
    }

    /// Validate storefront configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.site_url.is_empty() {
            return Err(ValidationError::MissingRequired("STOREFRONT__SITE_URL"));
        }
        if !self.site_url.starts_with("http://") && !self.site_url.starts_with("https://") {
            return Err(ValidationError::InvalidSiteUrl);
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrency);
        }
        Ok(())
    }
}

fn default_currency() -> String {
    "USD".to_string()
}
