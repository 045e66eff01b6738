use async_trait::async_trait;
use mongodb::Database;
use mongodb::bson::doc;
use mongodb::options::IndexOptions;

use common::errors::AppError;
use common::repository_util::{BaseRepository, Repository};

use crate::entitys::chat_join_entity::ChatJoinEntity;

/// 入群来源存储适配器
#[async_trait]
pub trait JoinStore: Send + Sync {
    async fn insert_many(&self, rows: &[ChatJoinEntity]) -> Result<(), AppError>;
    async fn find(&self, chat_id: &str, added_user_id: &str) -> Result<Option<ChatJoinEntity>, AppError>;
    async fn delete(&self, chat_id: &str, added_user_id: &str) -> Result<(), AppError>;
}

#[derive(Debug)]
pub struct MongoJoinStore {
    pub dao: BaseRepository<ChatJoinEntity>,
}

impl MongoJoinStore {
    pub fn new(db: &Database) -> Self {
        let collection = db.collection("chat_joins");
        Self { dao: BaseRepository::new(collection) }
    }

    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let unique_join = mongodb::IndexModel::builder()
            .keys(doc! { "chat_id": 1, "added_user_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.dao.collection.create_index(unique_join).await?;
        Ok(())
    }
}

#[async_trait]
impl JoinStore for MongoJoinStore {
    async fn insert_many(&self, rows: &[ChatJoinEntity]) -> Result<(), AppError> {
        if rows.is_empty() {
            return Ok(());
        }
        self.dao.collection.insert_many(rows).await?;
        Ok(())
    }

    async fn find(&self, chat_id: &str, added_user_id: &str) -> Result<Option<ChatJoinEntity>, AppError> {
        self.dao.find_one(doc! { "chat_id": chat_id, "added_user_id": added_user_id }).await
    }

    async fn delete(&self, chat_id: &str, added_user_id: &str) -> Result<(), AppError> {
        self.dao.delete(doc! { "chat_id": chat_id, "added_user_id": added_user_id }).await?;
        Ok(())
    }
}
