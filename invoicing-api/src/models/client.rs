use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub company_name: String,
    pub contact_person: String,
    pub email: String,
    pub phone: String,

    // Billing address
    pub billing_address: String,
    pub billing_city: String,
    pub billing_state: String,
    pub billing_zip_code: String,
    pub billing_country: String,

    // Shipping address, defaults to billing when not given
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_zip_code: String,
    pub shipping_country: String,

    pub tax_id: String,
    pub notes: String,
    pub tags: Vec<String>,

    /// Soft-delete flag. Deleted clients keep their invoices.
    pub is_active: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

pub struct NewClient {
    pub user_id: String,
    pub company_name: String,
    pub contact_person: String,
    pub email: String,
    pub phone: String,
    pub billing_address: String,
    pub billing_city: String,
    pub billing_state: String,
    pub billing_zip_code: String,
    pub billing_country: String,
    pub shipping_address: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_state: Option<String>,
    pub shipping_zip_code: Option<String>,
    pub shipping_country: Option<String>,
    pub tax_id: String,
    pub notes: String,
    pub tags: Vec<String>,
}

impl Client {
    pub fn new(fields: NewClient) -> Self {
        let now = Utc::now();
        let shipping_address = fields
            .shipping_address
            .unwrap_or_else(|| fields.billing_address.clone());
        let shipping_city = fields
            .shipping_city
            .unwrap_or_else(|| fields.billing_city.clone());
        let shipping_state = fields
            .shipping_state
            .unwrap_or_else(|| fields.billing_state.clone());
        let shipping_zip_code = fields
            .shipping_zip_code
            .unwrap_or_else(|| fields.billing_zip_code.clone());
        let shipping_country = fields
            .shipping_country
            .unwrap_or_else(|| fields.billing_country.clone());

        Self {
            id: Uuid::new_v4().to_string(),
            user_id: fields.user_id,
            company_name: fields.company_name,
            contact_person: fields.contact_person,
            email: fields.email,
            phone: fields.phone,
            billing_address: fields.billing_address,
            billing_city: fields.billing_city,
            billing_state: fields.billing_state,
            billing_zip_code: fields.billing_zip_code,
            billing_country: fields.billing_country,
            shipping_address,
            shipping_city,
            shipping_state,
            shipping_zip_code,
            shipping_country,
            tax_id: fields.tax_id,
            notes: fields.notes,
            tags: fields.tags,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_client_fields() -> NewClient {
        NewClient {
            user_id: "user-1".to_string(),
            company_name: "Acme GmbH".to_string(),
            contact_person: "Jo Doe".to_string(),
            email: "billing@acme.example".to_string(),
            phone: String::new(),
            billing_address: "Hauptstr. 1".to_string(),
            billing_city: "Berlin".to_string(),
            billing_state: String::new(),
            billing_zip_code: "10115".to_string(),
            billing_country: "Germany".to_string(),
            shipping_address: None,
            shipping_city: None,
            shipping_state: None,
            shipping_zip_code: None,
            shipping_country: None,
            tax_id: String::new(),
            notes: String::new(),
            tags: vec!["vip".to_string()],
        }
    }

    #[test]
    fn shipping_defaults_to_billing() {
        let client = Client::new(new_client_fields());
        assert_eq!(client.shipping_address, "Hauptstr. 1");
        assert_eq!(client.shipping_city, "Berlin");
        assert_eq!(client.shipping_country, "Germany");
        assert!(client.is_active);
    }

    #[test]
    fn explicit_shipping_is_kept() {
        let mut fields = new_client_fields();
        fields.shipping_address = Some("Warehouse 7".to_string());
        let client = Client::new(fields);
        assert_eq!(client.shipping_address, "Warehouse 7");
        assert_eq!(client.shipping_city, "Berlin");
    }
}
