use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{
    Collection, Database, IndexModel,
    bson::{self, Document, doc},
};

use crate::models::Notification;

#[derive(Clone)]
pub struct NotificationRepository {
    collection: Collection<Notification>,
}

impl NotificationRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("notifications"),
        }
    }

    pub async fn init_indexes(&self) -> Result<()> {
        let user_read_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "is_read": 1 })
            .options(
                IndexOptions::builder()
                    .name("notification_user_read_idx".to_string())
                    .build(),
            )
            .build();

        let user_created_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("notification_user_created_idx".to_string())
                    .build(),
            )
            .build();

        self.collection
            .create_indexes([user_read_index, user_created_index], None)
            .await?;

        Ok(())
    }

    pub async fn create(&self, notification: Notification) -> Result<()> {
        self.collection.insert_one(notification, None).await?;
        Ok(())
    }

    pub async fn find_for_user(&self, user_id: &str, id: &str) -> Result<Option<Notification>> {
        let notification = self
            .collection
            .find_one(doc! { "_id": id, "user_id": user_id }, None)
            .await?;
        Ok(notification)
    }

    pub async fn list_for_user(
        &self,
        user_id: &str,
        unread_only: bool,
        skip: u64,
        limit: i64,
    ) -> Result<(Vec<Notification>, u64)> {
        let mut query: Document = doc! { "user_id": user_id };
        if unread_only {
            query.insert("is_read", false);
        }

        let total = self.collection.count_documents(query.clone(), None).await?;

        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(skip)
            .limit(limit)
            .build();

        let cursor = self.collection.find(query, Some(options)).await?;
        let notifications: Vec<Notification> = cursor.try_collect().await?;

        Ok((notifications, total))
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<u64> {
        let count = self
            .collection
            .count_documents(doc! { "user_id": user_id, "is_read": false }, None)
            .await?;
        Ok(count)
    }

    pub async fn replace(&self, notification: &Notification) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &notification.id }, notification, None)
            .await?;
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: &str) -> Result<u64> {
        let result = self
            .collection
            .update_many(
                doc! { "user_id": user_id, "is_read": false },
                doc! { "$set": {
                    "is_read": true,
                    "read_at": mongodb::bson::DateTime::now(),
                    "updated_at": mongodb::bson::DateTime::now()
                } },
                None,
            )
            .await?;
        Ok(result.modified_count)
    }

    pub async fn delete_for_user(&self, user_id: &str, id: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id, "user_id": user_id }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    /// Admin cleanup: removes notifications older than the cutoff, across
    /// all users.
    pub async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = self
            .collection
            .delete_many(
                doc! { "created_at": { "$lt": bson::DateTime::from_chrono(cutoff) } },
                None,
            )
            .await?;
        Ok(result.deleted_count)
    }
}
