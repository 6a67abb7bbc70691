//! Database-backed tests for invoice number allocation.
//!
//! These require a running MongoDB instance and are ignored by default.
//! Run with:
//!
//!   TEST_MONGODB_URL=mongodb://localhost:27017 cargo test -- --ignored

use std::collections::HashSet;

use invoicing_api::models::{NewUser, User};
use invoicing_api::services::numbering;
use invoicing_api::services::repository::{InvoiceRepository, UserRepository};
use mongodb::Client;
use rust_decimal::Decimal;
use uuid::Uuid;

async fn test_db() -> mongodb::Database {
    let url = std::env::var("TEST_MONGODB_URL")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let client = Client::with_uri_str(&url)
        .await
        .expect("MongoDB not reachable - set TEST_MONGODB_URL");
    client.database(&format!("invoicing_test_{}", Uuid::new_v4().simple()))
}

fn test_user() -> User {
    User::new(NewUser {
        username: format!("user_{}", Uuid::new_v4().simple()),
        email: format!("{}@example.com", Uuid::new_v4().simple()),
        password_hash: "not-a-real-hash".to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        company_name: "Test Co".to_string(),
        company_address: String::new(),
        company_phone: String::new(),
        company_website: String::new(),
        default_currency: "USD".to_string(),
        default_tax_rate: Decimal::ZERO,
        invoice_prefix: "INV".to_string(),
    })
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn concurrent_allocations_never_duplicate_numbers() {
    let db = test_db().await;
    let users = UserRepository::new(&db);
    let invoices = InvoiceRepository::new(&db);
    users.init_indexes().await.unwrap();
    invoices.init_indexes().await.unwrap();

    let user = test_user();
    let user_id = user.id.clone();
    users.create(user).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let users = users.clone();
        let invoices = invoices.clone();
        let user_id = user_id.clone();
        handles.push(tokio::spawn(async move {
            numbering::allocate_invoice_number(&users, &invoices, &user_id, "INV")
                .await
                .unwrap()
                .expect("user exists")
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        let number = handle.await.unwrap();
        assert!(seen.insert(number.clone()), "duplicate number {}", number);
    }
    assert_eq!(seen.len(), 20);

    db.drop(None).await.unwrap();
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn allocation_for_unknown_user_yields_none() {
    let db = test_db().await;
    let users = UserRepository::new(&db);
    let invoices = InvoiceRepository::new(&db);

    let number = numbering::allocate_invoice_number(&users, &invoices, "no-such-user", "INV")
        .await
        .unwrap();
    assert!(number.is_none());

    db.drop(None).await.unwrap();
}
