use async_trait::async_trait;
use log::debug;
use mongodb::Database;
use mongodb::bson::doc;
use mongodb::options::{FindOptions, IndexOptions};

use common::errors::AppError;
use common::repository_util::{BaseRepository, Repository};

use crate::entitys::user_entity::UserEntity;

/// 用户文档存储适配器（users 集合由身份子系统写入，这里只读）
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserEntity>, AppError>;
    async fn find_by_ids(&self, user_ids: &[String]) -> Result<Vec<UserEntity>, AppError>;
    /// 按昵称搜索，排除给定 ID；优先全文索引，索引不可用时退化为正则匹配
    async fn search_by_name(
        &self,
        query: &str,
        exclude_ids: &[String],
        skip: u64,
        limit: i64,
    ) -> Result<(Vec<UserEntity>, u64), AppError>;
    /// 在给定 ID 集合内按昵称搜索
    async fn search_in_ids(&self, query: &str, ids: &[String]) -> Result<Vec<UserEntity>, AppError>;
}

#[derive(Debug)]
pub struct MongoUserStore {
    pub dao: BaseRepository<UserEntity>,
}

impl MongoUserStore {
    pub fn new(db: &Database) -> Self {
        let collection = db.collection("users");
        Self { dao: BaseRepository::new(collection) }
    }

    /// 全文索引创建失败只降级，不阻断启动
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let text_index = mongodb::IndexModel::builder()
            .keys(doc! { "full_name": "text" })
            .options(IndexOptions::builder().name("user_search_index".to_string()).build())
            .build();
        if let Err(e) = self.dao.collection.create_index(text_index).await {
            log::warn!("full-text index unavailable, name search falls back to regex: {}", e);
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserEntity>, AppError> {
        self.dao.find_by_id(user_id).await
    }

    async fn find_by_ids(&self, user_ids: &[String]) -> Result<Vec<UserEntity>, AppError> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }
        self.dao.query(doc! { "_id": { "$in": user_ids } }).await
    }

    async fn search_by_name(
        &self,
        query: &str,
        exclude_ids: &[String],
        skip: u64,
        limit: i64,
    ) -> Result<(Vec<UserEntity>, u64), AppError> {
        let options = FindOptions::builder().sort(doc! { "full_name": 1 }).skip(skip).limit(limit).build();

        let text_filter = doc! {
            "$text": { "$search": query },
            "_id": { "$nin": exclude_ids },
        };
        match self.dao.query_with_options(text_filter.clone(), options.clone()).await {
            Ok(items) => {
                let total = self.dao.count(text_filter).await?;
                Ok((items, total))
            }
            Err(e) => {
                debug!("full-text search failed, using regex fallback: {}", e);
                let regex_filter = doc! {
                    "full_name": { "$regex": query, "$options": "i" },
                    "_id": { "$nin": exclude_ids },
                };
                let items = self.dao.query_with_options(regex_filter.clone(), options).await?;
                let total = self.dao.count(regex_filter).await?;
                Ok((items, total))
            }
        }
    }

    async fn search_in_ids(&self, query: &str, ids: &[String]) -> Result<Vec<UserEntity>, AppError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        self.dao
            .query(doc! {
                "_id": { "$in": ids },
                "full_name": { "$regex": query, "$options": "i" },
            })
            .await
    }
}
