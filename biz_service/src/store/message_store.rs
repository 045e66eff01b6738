use async_trait::async_trait;
use mongodb::Database;
use mongodb::bson::doc;
use mongodb::options::FindOptions;

use common::errors::AppError;
use common::repository_util::{BaseRepository, Repository};
use common::util::date_util::now_millis;

use crate::entitys::message_entity::MessageEntity;

/// 消息文档存储适配器，消息日志是会话状态的事实来源
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert(&self, message: &MessageEntity) -> Result<(), AppError>;
    async fn find_by_id(&self, message_id: &str) -> Result<Option<MessageEntity>, AppError>;
    /// 修改文本内容并置 is_edited
    async fn update_content(&self, message_id: &str, content: &str) -> Result<(), AppError>;
    /// 墓碑删除，记录保留
    async fn soft_delete(&self, message_id: &str) -> Result<(), AppError>;
    /// 将所有回复快照指向 message_id 的消息的 is_reply_deleted 置位
    async fn mark_replies_deleted(&self, message_id: &str) -> Result<u64, AppError>;
    /// 按创建时间倒序分页取会话消息，可带 before 游标
    async fn find_by_chat(
        &self,
        chat_id: &str,
        before_created_at: Option<i64>,
        skip: u64,
        limit: i64,
    ) -> Result<(Vec<MessageEntity>, u64), AppError>;
    /// 无游标时的未读计数：统计他人发的全部消息
    async fn count_excluding_sender(&self, chat_id: &str, user_id: &str) -> Result<u64, AppError>;
    /// 有游标时的未读计数：统计游标时间之后他人发的消息
    async fn count_after_excluding_sender(&self, chat_id: &str, after: i64, user_id: &str) -> Result<u64, AppError>;
    /// 会话软删除级联
    async fn soft_delete_by_chat(&self, chat_id: &str) -> Result<u64, AppError>;
}

#[derive(Debug)]
pub struct MongoMessageStore {
    pub dao: BaseRepository<MessageEntity>,
}

impl MongoMessageStore {
    pub fn new(db: &Database) -> Self {
        let collection = db.collection("messages");
        Self { dao: BaseRepository::new(collection) }
    }

    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let by_chat = mongodb::IndexModel::builder().keys(doc! { "chat_id": 1, "created_at": -1 }).build();
        let by_reply = mongodb::IndexModel::builder().keys(doc! { "reply_to_message_id": 1 }).build();
        self.dao.collection.create_index(by_chat).await?;
        self.dao.collection.create_index(by_reply).await?;
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MongoMessageStore {
    async fn insert(&self, message: &MessageEntity) -> Result<(), AppError> {
        self.dao.insert(message).await
    }

    async fn find_by_id(&self, message_id: &str) -> Result<Option<MessageEntity>, AppError> {
        self.dao.find_by_id(message_id).await
    }

    async fn update_content(&self, message_id: &str, content: &str) -> Result<(), AppError> {
        self.dao
            .update_one(
                doc! { "_id": message_id },
                doc! { "$set": { "content": content, "is_edited": true, "updated_at": now_millis() } },
            )
            .await?;
        Ok(())
    }

    async fn soft_delete(&self, message_id: &str) -> Result<(), AppError> {
        self.dao
            .update_one(
                doc! { "_id": message_id },
                doc! { "$set": { "is_deleted": true, "updated_at": now_millis() } },
            )
            .await?;
        Ok(())
    }

    async fn mark_replies_deleted(&self, message_id: &str) -> Result<u64, AppError> {
        self.dao
            .update(
                doc! { "reply_to_message_id": message_id },
                doc! { "$set": { "is_reply_deleted": true } },
            )
            .await
    }

    async fn find_by_chat(
        &self,
        chat_id: &str,
        before_created_at: Option<i64>,
        skip: u64,
        limit: i64,
    ) -> Result<(Vec<MessageEntity>, u64), AppError> {
        let mut filter = doc! { "chat_id": chat_id };
        if let Some(before) = before_created_at {
            filter.insert("created_at", doc! { "$lt": before });
        }
        let total = self.dao.count(filter.clone()).await?;
        let options = FindOptions::builder().sort(doc! { "created_at": -1 }).skip(skip).limit(limit).build();
        let items = self.dao.query_with_options(filter, options).await?;
        Ok((items, total))
    }

    async fn count_excluding_sender(&self, chat_id: &str, user_id: &str) -> Result<u64, AppError> {
        self.dao.count(doc! { "chat_id": chat_id, "sender_id": { "$ne": user_id } }).await
    }

    async fn count_after_excluding_sender(&self, chat_id: &str, after: i64, user_id: &str) -> Result<u64, AppError> {
        self.dao
            .count(doc! {
                "chat_id": chat_id,
                "created_at": { "$gt": after },
                "sender_id": { "$ne": user_id },
            })
            .await
    }

    async fn soft_delete_by_chat(&self, chat_id: &str) -> Result<u64, AppError> {
        self.dao
            .update(
                doc! { "chat_id": chat_id },
                doc! { "$set": { "is_deleted": true, "updated_at": now_millis() } },
            )
            .await
    }
}
