use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{
    Collection, Database, IndexModel,
    bson::{self, Document, doc},
};

use crate::models::{Invoice, InvoiceStatus};

#[derive(Debug, Default)]
pub struct InvoiceListFilter {
    pub status: Option<InvoiceStatus>,
    pub client_id: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct InvoiceRepository {
    collection: Collection<Invoice>,
}

impl InvoiceRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("invoices"),
        }
    }

    pub async fn init_indexes(&self) -> Result<()> {
        // Unique number index backs the allocation retry loop
        let number_index = IndexModel::builder()
            .keys(doc! { "invoice_number": 1 })
            .options(
                IndexOptions::builder()
                    .name("invoice_number_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        let user_status_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("invoice_user_status_idx".to_string())
                    .build(),
            )
            .build();

        let user_issue_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "issue_date": 1 })
            .options(
                IndexOptions::builder()
                    .name("invoice_user_issue_idx".to_string())
                    .build(),
            )
            .build();

        let client_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "client_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("invoice_client_idx".to_string())
                    .build(),
            )
            .build();

        self.collection
            .create_indexes(
                [number_index, user_status_index, user_issue_index, client_index],
                None,
            )
            .await?;

        Ok(())
    }

    pub async fn create(&self, invoice: Invoice) -> Result<()> {
        self.collection.insert_one(invoice, None).await?;
        Ok(())
    }

    pub async fn find_for_user(&self, user_id: &str, id: &str) -> Result<Option<Invoice>> {
        let invoice = self
            .collection
            .find_one(doc! { "_id": id, "user_id": user_id }, None)
            .await?;
        Ok(invoice)
    }

    /// Unscoped lookup for webhook processing, where there is no
    /// authenticated user on the request.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Invoice>> {
        let invoice = self.collection.find_one(doc! { "_id": id }, None).await?;
        Ok(invoice)
    }

    pub async fn number_exists(&self, invoice_number: &str) -> Result<bool> {
        let count = self
            .collection
            .count_documents(doc! { "invoice_number": invoice_number }, None)
            .await?;
        Ok(count > 0)
    }

    pub async fn list_for_user(
        &self,
        user_id: &str,
        filter: &InvoiceListFilter,
        skip: u64,
        limit: i64,
    ) -> Result<(Vec<Invoice>, u64)> {
        let query = Self::build_filter(user_id, filter)?;

        let total = self.collection.count_documents(query.clone(), None).await?;

        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(skip)
            .limit(limit)
            .build();

        let cursor = self.collection.find(query, Some(options)).await?;
        let invoices: Vec<Invoice> = cursor.try_collect().await?;

        Ok((invoices, total))
    }

    /// All invoices issued in the window, oldest first. Used by reporting.
    pub async fn list_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Invoice>> {
        let query = doc! {
            "user_id": user_id,
            "issue_date": {
                "$gte": bson::DateTime::from_chrono(start),
                "$lte": bson::DateTime::from_chrono(end),
            }
        };

        let options = FindOptions::builder()
            .sort(doc! { "issue_date": 1 })
            .build();

        let cursor = self.collection.find(query, Some(options)).await?;
        let invoices: Vec<Invoice> = cursor.try_collect().await?;
        Ok(invoices)
    }

    pub async fn replace(&self, invoice: &Invoice) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &invoice.id }, invoice, None)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id, "user_id": user_id }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    fn build_filter(user_id: &str, filter: &InvoiceListFilter) -> Result<Document> {
        let mut query: Document = doc! { "user_id": user_id };

        if let Some(status) = filter.status {
            query.insert("status", bson::to_bson(&status)?);
        }
        if let Some(client_id) = &filter.client_id {
            query.insert("client_id", client_id);
        }

        let mut range = Document::new();
        if let Some(start) = filter.start_date {
            range.insert("$gte", bson::DateTime::from_chrono(start));
        }
        if let Some(end) = filter.end_date {
            range.insert("$lte", bson::DateTime::from_chrono(end));
        }
        if !range.is_empty() {
            query.insert("issue_date", range);
        }

        Ok(query)
    }
}
