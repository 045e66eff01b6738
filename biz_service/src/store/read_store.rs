use async_trait::async_trait;
use mongodb::Database;
use mongodb::bson::doc;
use mongodb::bson::oid::ObjectId;
use mongodb::options::IndexOptions;

use common::errors::AppError;
use common::repository_util::{BaseRepository, Repository};

use crate::entitys::message_read_entity::MessageReadEntity;

/// 已读游标存储适配器，(chat_id, user_id) 一行，只 upsert 不删除
#[async_trait]
pub trait ReadStore: Send + Sync {
    async fn upsert(&self, chat_id: &str, user_id: &str, message_id: &str, read_at: i64) -> Result<(), AppError>;
    async fn find(&self, chat_id: &str, user_id: &str) -> Result<Option<MessageReadEntity>, AppError>;
}

#[derive(Debug)]
pub struct MongoReadStore {
    pub dao: BaseRepository<MessageReadEntity>,
}

impl MongoReadStore {
    pub fn new(db: &Database) -> Self {
        let collection = db.collection("message_reads");
        Self { dao: BaseRepository::new(collection) }
    }

    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let unique_cursor = mongodb::IndexModel::builder()
            .keys(doc! { "chat_id": 1, "user_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.dao.collection.create_index(unique_cursor).await?;
        Ok(())
    }
}

#[async_trait]
impl ReadStore for MongoReadStore {
    async fn upsert(&self, chat_id: &str, user_id: &str, message_id: &str, read_at: i64) -> Result<(), AppError> {
        self.dao
            .collection
            .update_one(
                doc! { "chat_id": chat_id, "user_id": user_id },
                doc! {
                    "$set": { "message_id": message_id, "read_at": read_at },
                    "$setOnInsert": { "_id": ObjectId::new().to_hex() },
                },
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn find(&self, chat_id: &str, user_id: &str) -> Result<Option<MessageReadEntity>, AppError> {
        self.dao.find_one(doc! { "chat_id": chat_id, "user_id": user_id }).await
    }
}
