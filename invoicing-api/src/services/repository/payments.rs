use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{
    Collection, Database, IndexModel,
    bson::{self, doc},
};

use crate::models::Payment;

#[derive(Clone)]
pub struct PaymentRepository {
    collection: Collection<Payment>,
}

impl PaymentRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("payments"),
        }
    }

    pub async fn init_indexes(&self) -> Result<()> {
        let payment_id_index = IndexModel::builder()
            .keys(doc! { "payment_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("payment_provider_id_idx".to_string())
                    .build(),
            )
            .build();

        let invoice_index = IndexModel::builder()
            .keys(doc! { "invoice_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("payment_invoice_idx".to_string())
                    .build(),
            )
            .build();

        let user_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("payment_user_idx".to_string())
                    .build(),
            )
            .build();

        self.collection
            .create_indexes([payment_id_index, invoice_index, user_index], None)
            .await?;

        Ok(())
    }

    pub async fn create(&self, payment: Payment) -> Result<()> {
        self.collection.insert_one(payment, None).await?;
        Ok(())
    }

    pub async fn find_for_user(&self, user_id: &str, id: &str) -> Result<Option<Payment>> {
        let payment = self
            .collection
            .find_one(doc! { "_id": id, "user_id": user_id }, None)
            .await?;
        Ok(payment)
    }

    pub async fn list_for_invoice(&self, invoice_id: &str) -> Result<Vec<Payment>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        let cursor = self
            .collection
            .find(doc! { "invoice_id": invoice_id }, Some(options))
            .await?;
        let payments: Vec<Payment> = cursor.try_collect().await?;
        Ok(payments)
    }

    /// Payments created inside the window, for dashboard totals.
    pub async fn list_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Payment>> {
        let query = doc! {
            "user_id": user_id,
            "created_at": {
                "$gte": bson::DateTime::from_chrono(start),
                "$lte": bson::DateTime::from_chrono(end),
            }
        };

        let cursor = self.collection.find(query, None).await?;
        let payments: Vec<Payment> = cursor.try_collect().await?;
        Ok(payments)
    }

    pub async fn replace(&self, payment: &Payment) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &payment.id }, payment, None)
            .await?;
        Ok(())
    }
}
