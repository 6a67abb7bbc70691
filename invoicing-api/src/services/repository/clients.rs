use anyhow::Result;
use futures::TryStreamExt;
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Document, doc},
};

use crate::models::Client;

#[derive(Debug, Default)]
pub struct ClientListFilter {
    pub search: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Clone)]
pub struct ClientRepository {
    collection: Collection<Client>,
}

impl ClientRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("clients"),
        }
    }

    pub async fn init_indexes(&self) -> Result<()> {
        let user_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "is_active": 1 })
            .options(
                IndexOptions::builder()
                    .name("client_user_idx".to_string())
                    .build(),
            )
            .build();

        let name_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "company_name": 1 })
            .options(
                IndexOptions::builder()
                    .name("client_name_idx".to_string())
                    .build(),
            )
            .build();

        let tags_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "tags": 1 })
            .options(
                IndexOptions::builder()
                    .name("client_tags_idx".to_string())
                    .build(),
            )
            .build();

        self.collection
            .create_indexes([user_index, name_index, tags_index], None)
            .await?;

        Ok(())
    }

    pub async fn create(&self, client: Client) -> Result<()> {
        self.collection.insert_one(client, None).await?;
        Ok(())
    }

    pub async fn find_for_user(&self, user_id: &str, id: &str) -> Result<Option<Client>> {
        let client = self
            .collection
            .find_one(doc! { "_id": id, "user_id": user_id }, None)
            .await?;
        Ok(client)
    }

    /// Lists active clients, sorted by company name, with optional
    /// case-insensitive search across name/contact/email and tag filtering.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        filter: &ClientListFilter,
        skip: u64,
        limit: i64,
    ) -> Result<(Vec<Client>, u64)> {
        let mut query: Document = doc! { "user_id": user_id, "is_active": true };

        if let Some(search) = &filter.search {
            query.insert(
                "$or",
                vec![
                    doc! { "company_name": { "$regex": search, "$options": "i" } },
                    doc! { "contact_person": { "$regex": search, "$options": "i" } },
                    doc! { "email": { "$regex": search, "$options": "i" } },
                ],
            );
        }

        if !filter.tags.is_empty() {
            query.insert("tags", doc! { "$in": &filter.tags });
        }

        let total = self.collection.count_documents(query.clone(), None).await?;

        let options = FindOptions::builder()
            .sort(doc! { "company_name": 1 })
            .skip(skip)
            .limit(limit)
            .build();

        let cursor = self.collection.find(query, Some(options)).await?;
        let clients: Vec<Client> = cursor.try_collect().await?;

        Ok((clients, total))
    }

    pub async fn list_active_for_user(&self, user_id: &str) -> Result<Vec<Client>> {
        let cursor = self
            .collection
            .find(doc! { "user_id": user_id, "is_active": true }, None)
            .await?;
        let clients: Vec<Client> = cursor.try_collect().await?;
        Ok(clients)
    }

    pub async fn replace(&self, client: &Client) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &client.id }, client, None)
            .await?;
        Ok(())
    }

    /// Soft delete: the client disappears from listings but keeps its history.
    pub async fn deactivate(&self, user_id: &str, id: &str) -> Result<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": id, "user_id": user_id },
                doc! { "$set": {
                    "is_active": false,
                    "updated_at": mongodb::bson::DateTime::now()
                } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    /// Distinct tags across the user's active clients, sorted.
    pub async fn distinct_tags(&self, user_id: &str) -> Result<Vec<String>> {
        let values = self
            .collection
            .distinct(
                "tags",
                doc! { "user_id": user_id, "is_active": true },
                None,
            )
            .await?;

        let mut tags: Vec<String> = values
            .into_iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect();
        tags.sort();
        Ok(tags)
    }
}
