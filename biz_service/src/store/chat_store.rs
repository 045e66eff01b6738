use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::Database;
use mongodb::bson::{Bson, Document, doc};
use mongodb::options::FindOptions;

use common::errors::AppError;
use common::repository_util::{BaseRepository, Repository};
use common::util::date_util::now_millis;

use crate::entitys::chat_entity::{ChatEntity, LastMessageSnapshot};

/// 会话文档存储适配器
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn insert(&self, chat: &ChatEntity) -> Result<(), AppError>;
    async fn find_by_id(&self, chat_id: &str) -> Result<Option<ChatEntity>, AppError>;
    /// 查找两人之间未删除的私聊
    async fn find_private_chat(&self, a: &str, b: &str) -> Result<Option<ChatEntity>, AppError>;
    /// 覆盖末条消息快照并清除墓碑标记
    async fn update_last_message(&self, chat_id: &str, snapshot: &LastMessageSnapshot) -> Result<(), AppError>;
    /// 仅当 message_id 仍是末条消息时刷新内容与时间（check-and-set，
    /// 防止并发新消息之后的过期刷新覆盖快照）
    async fn refresh_last_message_if_current(
        &self,
        chat_id: &str,
        message_id: &str,
        content: Option<String>,
        time: i64,
    ) -> Result<bool, AppError>;
    /// 仅当 message_id 仍是末条消息时打墓碑标记；过期内容字段原样保留
    async fn tombstone_last_message_if_current(&self, chat_id: &str, message_id: &str, time: i64) -> Result<bool, AppError>;
    async fn update_profile(&self, chat_id: &str, name: Option<String>, image_url: Option<String>) -> Result<(), AppError>;
    async fn add_participants(&self, chat_id: &str, user_ids: &[String]) -> Result<(), AppError>;
    /// 移出参与者（同时移出管理员列表）
    async fn remove_participant(&self, chat_id: &str, user_id: &str) -> Result<(), AppError>;
    async fn add_admin(&self, chat_id: &str, user_id: &str) -> Result<(), AppError>;
    async fn remove_admin(&self, chat_id: &str, user_id: &str) -> Result<(), AppError>;
    async fn soft_delete(&self, chat_id: &str, deleted_by: &str) -> Result<(), AppError>;
    /// 按活跃时间倒序分页取用户会话，可带 before 游标
    async fn find_for_user(
        &self,
        user_id: &str,
        before_updated_at: Option<i64>,
        skip: u64,
        limit: i64,
    ) -> Result<(Vec<ChatEntity>, u64), AppError>;
    /// 搜索用户会话：群名 / 末条消息内容 / 私聊对端昵称
    async fn search_for_user(&self, user_id: &str, query: &str, skip: u64, limit: i64) -> Result<(Vec<ChatEntity>, u64), AppError>;
}

#[derive(Debug)]
pub struct MongoChatStore {
    pub dao: BaseRepository<ChatEntity>,
}

impl MongoChatStore {
    pub fn new(db: &Database) -> Self {
        let collection = db.collection("chats");
        Self { dao: BaseRepository::new(collection) }
    }

    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let by_participant = mongodb::IndexModel::builder().keys(doc! { "participants": 1, "updated_at": -1 }).build();
        self.dao.collection.create_index(by_participant).await?;
        Ok(())
    }

    /// 搜索管道，供分页查询与计数复用
    fn search_pipeline(user_id: &str, query: &str) -> Vec<Document> {
        vec![
            doc! { "$match": { "participants": user_id, "is_deleted": false } },
            doc! { "$lookup": {
                "from": "users",
                "localField": "participants",
                "foreignField": "_id",
                "as": "participant_users",
            }},
            doc! { "$match": { "$or": [
                { "is_group_chat": true, "name": { "$regex": query, "$options": "i" } },
                { "is_group_chat": false, "participant_users": { "$elemMatch": {
                    "_id": { "$ne": user_id },
                    "full_name": { "$regex": query, "$options": "i" },
                }}},
                { "last_message_content": { "$regex": query, "$options": "i" } },
            ]}},
            doc! { "$unset": "participant_users" },
        ]
    }
}

#[async_trait]
impl ChatStore for MongoChatStore {
    async fn insert(&self, chat: &ChatEntity) -> Result<(), AppError> {
        self.dao.insert(chat).await
    }

    async fn find_by_id(&self, chat_id: &str) -> Result<Option<ChatEntity>, AppError> {
        self.dao.find_by_id(chat_id).await
    }

    async fn find_private_chat(&self, a: &str, b: &str) -> Result<Option<ChatEntity>, AppError> {
        self.dao
            .find_one(doc! {
                "is_group_chat": false,
                "is_deleted": false,
                "participants": { "$all": [a, b], "$size": 2 },
            })
            .await
    }

    async fn update_last_message(&self, chat_id: &str, snapshot: &LastMessageSnapshot) -> Result<(), AppError> {
        self.dao
            .update_one(
                doc! { "_id": chat_id },
                doc! { "$set": {
                    "last_message_id": snapshot.id.clone(),
                    "last_message_content": snapshot.content.clone(),
                    "last_message_sender_id": snapshot.sender_id.clone(),
                    "last_message_sender_name": snapshot.sender_name.clone(),
                    "last_message_type": snapshot.message_type.to_string(),
                    "last_message_media_url": snapshot.media_url.clone(),
                    "last_message_time": snapshot.time,
                    "is_last_message_deleted": false,
                    "updated_at": snapshot.time,
                }},
            )
            .await?;
        Ok(())
    }

    async fn refresh_last_message_if_current(
        &self,
        chat_id: &str,
        message_id: &str,
        content: Option<String>,
        time: i64,
    ) -> Result<bool, AppError> {
        let matched = self
            .dao
            .update_one(
                doc! { "_id": chat_id, "last_message_id": message_id },
                doc! { "$set": {
                    "last_message_content": content,
                    "last_message_time": time,
                    "updated_at": time,
                }},
            )
            .await?;
        Ok(matched > 0)
    }

    async fn tombstone_last_message_if_current(&self, chat_id: &str, message_id: &str, time: i64) -> Result<bool, AppError> {
        let matched = self
            .dao
            .update_one(
                doc! { "_id": chat_id, "last_message_id": message_id },
                doc! { "$set": {
                    "is_last_message_deleted": true,
                    "last_message_time": time,
                    "updated_at": time,
                }},
            )
            .await?;
        Ok(matched > 0)
    }

    async fn update_profile(&self, chat_id: &str, name: Option<String>, image_url: Option<String>) -> Result<(), AppError> {
        let mut set = doc! { "updated_at": now_millis() };
        if let Some(name) = name {
            set.insert("name", name);
        }
        if let Some(image_url) = image_url {
            set.insert("chat_image_url", image_url);
        }
        self.dao.update_one(doc! { "_id": chat_id }, doc! { "$set": set }).await?;
        Ok(())
    }

    async fn add_participants(&self, chat_id: &str, user_ids: &[String]) -> Result<(), AppError> {
        let members: Vec<Bson> = user_ids.iter().map(|u| Bson::String(u.clone())).collect();
        self.dao
            .update_one(
                doc! { "_id": chat_id },
                doc! {
                    "$addToSet": { "participants": { "$each": members } },
                    "$set": { "updated_at": now_millis() },
                },
            )
            .await?;
        Ok(())
    }

    async fn remove_participant(&self, chat_id: &str, user_id: &str) -> Result<(), AppError> {
        self.dao
            .update_one(
                doc! { "_id": chat_id },
                doc! {
                    "$pull": { "participants": user_id, "admins": user_id },
                    "$set": { "updated_at": now_millis() },
                },
            )
            .await?;
        Ok(())
    }

    async fn add_admin(&self, chat_id: &str, user_id: &str) -> Result<(), AppError> {
        self.dao
            .update_one(
                doc! { "_id": chat_id },
                doc! {
                    "$addToSet": { "admins": user_id },
                    "$set": { "updated_at": now_millis() },
                },
            )
            .await?;
        Ok(())
    }

    async fn remove_admin(&self, chat_id: &str, user_id: &str) -> Result<(), AppError> {
        self.dao
            .update_one(
                doc! { "_id": chat_id },
                doc! {
                    "$pull": { "admins": user_id },
                    "$set": { "updated_at": now_millis() },
                },
            )
            .await?;
        Ok(())
    }

    async fn soft_delete(&self, chat_id: &str, deleted_by: &str) -> Result<(), AppError> {
        self.dao
            .update_one(
                doc! { "_id": chat_id },
                doc! { "$set": {
                    "is_deleted": true,
                    "deleted_by": deleted_by,
                    "updated_at": now_millis(),
                }},
            )
            .await?;
        Ok(())
    }

    async fn find_for_user(
        &self,
        user_id: &str,
        before_updated_at: Option<i64>,
        skip: u64,
        limit: i64,
    ) -> Result<(Vec<ChatEntity>, u64), AppError> {
        let mut filter = doc! { "participants": user_id, "is_deleted": false };
        if let Some(before) = before_updated_at {
            filter.insert("updated_at", doc! { "$lt": before });
        }
        let total = self.dao.count(filter.clone()).await?;
        let options = FindOptions::builder().sort(doc! { "updated_at": -1 }).skip(skip).limit(limit).build();
        let items = self.dao.query_with_options(filter, options).await?;
        Ok((items, total))
    }

    async fn search_for_user(&self, user_id: &str, query: &str, skip: u64, limit: i64) -> Result<(Vec<ChatEntity>, u64), AppError> {
        let mut pipeline = Self::search_pipeline(user_id, query);
        pipeline.push(doc! { "$sort": { "last_message_time": -1 } });
        pipeline.push(doc! { "$skip": skip as i64 });
        pipeline.push(doc! { "$limit": limit });

        let mut cursor = self.dao.collection.aggregate(pipeline).await?;
        let mut items = vec![];
        while let Some(document) = cursor.try_next().await? {
            items.push(bson::from_document::<ChatEntity>(document)?);
        }

        let mut count_pipeline = Self::search_pipeline(user_id, query);
        count_pipeline.push(doc! { "$count": "total" });
        let mut count_cursor = self.dao.collection.aggregate(count_pipeline).await?;
        let total = match count_cursor.try_next().await? {
            Some(document) => match document.get("total") {
                Some(Bson::Int32(v)) => *v as u64,
                Some(Bson::Int64(v)) => *v as u64,
                _ => 0,
            },
            None => 0,
        };
        Ok((items, total))
    }
}
