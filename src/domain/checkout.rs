//! Checkout form model and conditional required-field validation.
//!
//! Which fields are required depends on the form's toggles: shipping fields
//! only when shipping to a different address, account fields only when an
//! account is being created. Validation is pure: it reports a message per
//! required-but-empty field and has no side effects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::order::Address;

/// A checkout field definition: submitted name, display label, required flag.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
}

const fn field(name: &'static str, label: &'static str, required: bool) -> FieldSpec {
    FieldSpec {
        name,
        label,
        required,
    }
}

/// Billing fields, always validated.
pub const BILLING_FIELDS: &[FieldSpec] = &[
    field("billing_first_name", "First name", true),
    field("billing_last_name", "Last name", true),
    field("billing_address_1", "Street address", true),
    field("billing_address_2", "Apartment, suite, etc.", false),
    field("billing_city", "Town / City", true),
    field("billing_state", "State / County", false),
    field("billing_postcode", "Postcode / ZIP", true),
    field("billing_country", "Country / Region", true),
    field("billing_email", "Email address", true),
    field("billing_phone", "Phone", true),
];

/// Shipping fields, validated only when shipping to a different address.
pub const SHIPPING_FIELDS: &[FieldSpec] = &[
    field("shipping_first_name", "First name", true),
    field("shipping_last_name", "Last name", true),
    field("shipping_address_1", "Street address", true),
    field("shipping_address_2", "Apartment, suite, etc.", false),
    field("shipping_city", "Town / City", true),
    field("shipping_state", "State / County", false),
    field("shipping_postcode", "Postcode / ZIP", true),
    field("shipping_country", "Country / Region", true),
];

/// Account fields, validated only when creating an account.
pub const ACCOUNT_FIELDS: &[FieldSpec] = &[field("account_password", "Account password", true)];

/// Submitted checkout form: flat field values plus the two toggles that
/// change the required-field set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub ship_to_different_address: bool,
    #[serde(default)]
    pub create_account: bool,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl CheckoutForm {
    pub fn get(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    fn get_owned(&self, name: &str) -> String {
        self.get(name).to_string()
    }

    fn get_optional(&self, name: &str) -> Option<String> {
        let value = self.get(name);
        if value.trim().is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    pub fn is_blank(&self, name: &str) -> bool {
        self.get(name).trim().is_empty()
    }

    /// Billing address snapshot built from the submitted fields.
    pub fn billing_address(&self) -> Address {
        Address {
            first_name: self.get_owned("billing_first_name"),
            last_name: self.get_owned("billing_last_name"),
            email: self.get_optional("billing_email"),
            phone: self.get_optional("billing_phone"),
            address_1: self.get_owned("billing_address_1"),
            address_2: self.get_owned("billing_address_2"),
            city: self.get_owned("billing_city"),
            state: self.get_owned("billing_state"),
            postcode: self.get_owned("billing_postcode"),
            country: self.get_owned("billing_country"),
        }
    }

    /// Shipping address snapshot.
    ///
    /// When not shipping to a different address this is a copy of billing.
    /// Otherwise each shipping field falls back to its billing counterpart
    /// when left empty, matching how partially filled forms are treated.
    pub fn shipping_address(&self) -> Address {
        let billing = self.billing_address();
        if !self.ship_to_different_address {
            return billing;
        }

        let pick = |shipping_name: &str, billing_value: &str| -> String {
            let value = self.get(shipping_name);
            if value.trim().is_empty() {
                billing_value.to_string()
            } else {
                value.to_string()
            }
        };

        Address {
            first_name: pick("shipping_first_name", &billing.first_name),
            last_name: pick("shipping_last_name", &billing.last_name),
            email: None,
            phone: None,
            address_1: pick("shipping_address_1", &billing.address_1),
            address_2: pick("shipping_address_2", &billing.address_2),
            city: pick("shipping_city", &billing.city),
            state: pick("shipping_state", &billing.state),
            postcode: pick("shipping_postcode", &billing.postcode),
            country: pick("shipping_country", &billing.country),
        }
    }
}

/// Result of required-field validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    /// Field name → user-facing message, for every required-but-empty field.
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
}

impl ValidationOutcome {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: BTreeMap::new(),
        }
    }
}

/// Validate the form against the conditional required-field set.
pub fn validate_required_fields(form: &CheckoutForm) -> ValidationOutcome {
    let mut errors = BTreeMap::new();

    let mut check = |specs: &[FieldSpec]| {
        for spec in specs {
            if spec.required && form.is_blank(spec.name) {
                errors.insert(
                    spec.name.to_string(),
                    format!("{} is a required field.", spec.label),
                );
            }
        }
    };

    check(BILLING_FIELDS);
    if form.ship_to_different_address {
        check(SHIPPING_FIELDS);
    }
    if form.create_account {
        check(ACCOUNT_FIELDS);
    }

    ValidationOutcome {
        valid: errors.is_empty(),
        errors,
    }
}
