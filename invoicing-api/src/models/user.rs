use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub role: Role,
    pub is_active: bool,
    pub is_verified: bool,

    // Company settings
    pub company_address: String,
    pub company_phone: String,
    pub company_website: String,
    pub company_logo: String,

    // Invoice settings
    pub default_currency: String,
    pub default_tax_rate: Decimal,
    pub invoice_prefix: String,
    /// Next sequence value for invoice numbers. Allocated atomically with
    /// `$inc`, never read-modify-write.
    pub next_invoice_number: i64,

    // Payment settings
    pub stripe_enabled: bool,
    pub paypal_enabled: bool,

    // Localization settings
    pub preferred_language: String,
    pub timezone: String,

    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub company_address: String,
    pub company_phone: String,
    pub company_website: String,
    pub default_currency: String,
    pub default_tax_rate: Decimal,
    pub invoice_prefix: String,
}

impl User {
    pub fn new(fields: NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            username: fields.username,
            email: fields.email,
            password_hash: fields.password_hash,
            first_name: fields.first_name,
            last_name: fields.last_name,
            company_name: fields.company_name,
            role: Role::User,
            is_active: true,
            is_verified: false,
            company_address: fields.company_address,
            company_phone: fields.company_phone,
            company_website: fields.company_website,
            company_logo: String::new(),
            default_currency: fields.default_currency,
            default_tax_rate: fields.default_tax_rate,
            invoice_prefix: fields.invoice_prefix,
            next_invoice_number: 1,
            stripe_enabled: false,
            paypal_enabled: false,
            preferred_language: "en".to_string(),
            timezone: "UTC".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
