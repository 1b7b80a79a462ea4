use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::utils::validation::{
    normalize_categories, validate_admin_password, validate_customer_password,
};

/// Which storefront surface an account belongs to.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Seller,
    Admin,
}

impl Role {
    /// Path segment of the role's login/register endpoints.
    pub fn auth_segment(&self) -> &'static str {
        match self {
            Role::Customer => "auth",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Seller => write!(f, "seller"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: String, password: String) -> Result<Self, ValidationErrors> {
        let request = Self {
            email: email.trim().to_string(),
            password,
        };
        request.validate()?;
        Ok(request)
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_register_request"))]
pub struct RegisterRequest {
    #[serde(skip)]
    pub role: Role,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_key: Option<String>,
}

impl RegisterRequest {
    pub fn customer(email: String, password: String) -> Result<Self, ValidationErrors> {
        Self::build(Role::Customer, email, password, None, None, None)
    }

    pub fn seller(
        email: String,
        password: String,
        store_name: String,
        registration_id: String,
    ) -> Result<Self, ValidationErrors> {
        Self::build(
            Role::Seller,
            email,
            password,
            Some(store_name),
            Some(registration_id),
            None,
        )
    }

    pub fn admin(email: String, password: String, admin_key: String) -> Result<Self, ValidationErrors> {
        Self::build(Role::Admin, email, password, None, None, Some(admin_key))
    }

    fn build(
        role: Role,
        email: String,
        password: String,
        store_name: Option<String>,
        registration_id: Option<String>,
        admin_key: Option<String>,
    ) -> Result<Self, ValidationErrors> {
        let request = Self {
            role,
            email: email.trim().to_string(),
            password,
            store_name: store_name.map(|s| s.trim().to_string()),
            registration_id: registration_id.map(|s| s.trim().to_string()),
            admin_key,
        };
        request.validate()?;
        Ok(request)
    }
}

fn validate_register_request(request: &RegisterRequest) -> Result<(), ValidationError> {
    let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());

    match request.role {
        Role::Customer => validate_customer_password(&request.password),
        Role::Seller => {
            if request.password.is_empty() {
                return Err(ValidationError::new("password_required"));
            }
            if !present(&request.store_name) || !present(&request.registration_id) {
                return Err(ValidationError::new("seller_fields_required"));
            }
            Ok(())
        }
        Role::Admin => {
            if !present(&request.admin_key) {
                return Err(ValidationError::new("admin_key_required"));
            }
            validate_admin_password(&request.password)
        }
    }
}

/// Body returned by every login/register endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub token: String,
}

/// Claims we read out of a bearer token. Identity may be a string or an
/// object depending on the role that issued it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<Value>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Session {
    pub role: Role,
    pub email: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_accessed: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct PreferencesRequest {
    #[validate(length(min = 3, message = "Select at least 3 categories"))]
    pub categories: Vec<String>,
}

impl PreferencesRequest {
    pub fn new(categories: Vec<String>) -> Result<Self, ValidationErrors> {
        let request = Self {
            categories: normalize_categories(categories),
        };
        request.validate()?;
        Ok(request)
    }
}

/// Seller account as the profile endpoint returns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SellerProfile {
    pub email: String,
    pub store_name: String,
    pub registration_id: String,
    pub business_address: String,
    pub contact_number: String,
    pub gstin: String,
    pub business_type: String,
}

/// Editable profile fields; email and registration id are fixed at signup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_profile_update"))]
pub struct SellerProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255, message = "Store name must be 1-255 characters"))]
    pub store_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gstin: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
}

impl SellerProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.store_name.is_none()
            && self.business_address.is_none()
            && self.contact_number.is_none()
            && self.gstin.is_none()
            && self.business_type.is_none()
    }

    /// Trimmed copy with blank entries dropped.
    pub fn normalized(&self) -> Self {
        let clean = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            store_name: clean(&self.store_name),
            business_address: clean(&self.business_address),
            contact_number: clean(&self.contact_number),
            gstin: clean(&self.gstin),
            business_type: clean(&self.business_type),
        }
    }

    pub fn apply_to(&self, profile: &mut SellerProfile) {
        let fields = [
            (&self.store_name, &mut profile.store_name),
            (&self.business_address, &mut profile.business_address),
            (&self.contact_number, &mut profile.contact_number),
            (&self.gstin, &mut profile.gstin),
            (&self.business_type, &mut profile.business_type),
        ];
        for (update, target) in fields {
            if let Some(value) = update {
                *target = value.clone();
            }
        }
    }
}

fn validate_profile_update(update: &SellerProfileUpdate) -> Result<(), ValidationError> {
    if update.is_empty() {
        return Err(ValidationError::new("no_fields"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_login_request_validation() {
        assert!(LoginRequest::new("a@b.com".to_string(), "x".to_string()).is_ok());
        assert!(LoginRequest::new("not-an-email".to_string(), "x".to_string()).is_err());
        assert!(LoginRequest::new("a@b.com".to_string(), String::new()).is_err());
    }

    #[test]
    fn test_customer_registration_password_rules() {
        assert!(RegisterRequest::customer("a@b.com".to_string(), "Secret#pw".to_string()).is_ok());
        assert!(RegisterRequest::customer("a@b.com".to_string(), "password".to_string()).is_err());
    }

    #[test]
    fn test_seller_registration_requires_store_fields() {
        let ok = RegisterRequest::seller(
            "s@b.com".to_string(),
            "pw".to_string(),
            "Shoe Hub".to_string(),
            "REG-1".to_string(),
        );
        assert!(ok.is_ok());

        let missing = RegisterRequest::seller(
            "s@b.com".to_string(),
            "pw".to_string(),
            " ".to_string(),
            "REG-1".to_string(),
        );
        assert!(missing.is_err());
    }

    #[test]
    fn test_admin_registration_requires_key() {
        assert!(RegisterRequest::admin(
            "a@b.com".to_string(),
            "Admin@123".to_string(),
            "key".to_string()
        )
        .is_ok());
        assert!(RegisterRequest::admin(
            "a@b.com".to_string(),
            "Admin@123".to_string(),
            String::new()
        )
        .is_err());
    }

    #[test]
    fn test_register_request_wire_shape() {
        let request = RegisterRequest::seller(
            "s@b.com".to_string(),
            "pw".to_string(),
            "Shoe Hub".to_string(),
            "REG-1".to_string(),
        )
        .unwrap();
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["storeName"], "Shoe Hub");
        assert_eq!(body["registrationId"], "REG-1");
        assert!(body.get("role").is_none());
        assert!(body.get("adminKey").is_none());
    }

    #[test]
    fn test_preferences_need_three_distinct_categories() {
        let request = PreferencesRequest::new(vec![
            "Shoes".to_string(),
            "shoes".to_string(),
            "Books".to_string(),
        ]);
        assert!(request.is_err());

        let request = PreferencesRequest::new(vec![
            "Shoes".to_string(),
            "Books".to_string(),
            "Gaming".to_string(),
        ])
        .unwrap();
        assert_eq!(request.categories.len(), 3);
    }

    #[test]
    fn test_profile_update_wire_shape_and_apply() {
        let update = SellerProfileUpdate {
            store_name: Some("  Shoe Hub  ".to_string()),
            gstin: Some("   ".to_string()),
            ..Default::default()
        }
        .normalized();
        assert!(update.validate().is_ok());

        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(body, serde_json::json!({ "storeName": "Shoe Hub" }));

        let mut profile = SellerProfile {
            email: "s@b.com".to_string(),
            store_name: "Old".to_string(),
            gstin: "GST1".to_string(),
            ..Default::default()
        };
        update.apply_to(&mut profile);
        assert_eq!(profile.store_name, "Shoe Hub");
        assert_eq!(profile.gstin, "GST1");

        assert!(SellerProfileUpdate::default().validate().is_err());
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let mut session = Session {
            role: Role::Customer,
            email: "a@b.com".to_string(),
            token: "t".to_string(),
            created_at: now,
            expires_at: None,
            last_accessed: now,
        };
        assert!(!session.is_expired(now));

        session.expires_at = Some(now - Duration::minutes(1));
        assert!(session.is_expired(now));
    }
}
