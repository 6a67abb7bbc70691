use anyhow::Result;
use mongodb::options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument};
use mongodb::{Collection, Database, IndexModel, bson::doc};

use crate::models::User;

#[derive(Clone)]
pub struct UserRepository {
    collection: Collection<User>,
}

impl UserRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("users"),
        }
    }

    pub async fn init_indexes(&self) -> Result<()> {
        let username_index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(
                IndexOptions::builder()
                    .name("username_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .name("email_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.collection
            .create_indexes([username_index, email_index], None)
            .await?;

        Ok(())
    }

    pub async fn create(&self, user: User) -> Result<()> {
        self.collection.insert_one(user, None).await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = self.collection.find_one(doc! { "_id": id }, None).await?;
        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = self
            .collection
            .find_one(doc! { "username": username }, None)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .collection
            .find_one(doc! { "email": email }, None)
            .await?;
        Ok(user)
    }

    /// Login lookup: the identifier may be a username or an email address.
    pub async fn find_by_username_or_email(&self, identifier: &str) -> Result<Option<User>> {
        if let Some(user) = self.find_by_username(identifier).await? {
            return Ok(Some(user));
        }
        self.find_by_email(identifier).await
    }

    pub async fn replace(&self, user: &User) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &user.id }, user, None)
            .await?;
        Ok(())
    }

    /// Atomically claims the next invoice sequence value for a user.
    ///
    /// Returns the claimed value. Two concurrent callers always observe
    /// distinct values because the `$inc` happens server-side.
    pub async fn allocate_invoice_sequence(&self, user_id: &str) -> Result<Option<i64>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();

        let before = self
            .collection
            .find_one_and_update(
                doc! { "_id": user_id },
                doc! { "$inc": { "next_invoice_number": 1i64 } },
                options,
            )
            .await?;

        Ok(before.map(|user| user.next_invoice_number))
    }
}
