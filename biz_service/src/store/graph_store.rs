use async_trait::async_trait;
use mongodb::Database;
use mongodb::bson::doc;
use mongodb::bson::oid::ObjectId;
use mongodb::options::IndexOptions;
use mongodb::IndexModel;

use common::errors::AppError;
use common::repository_util::{BaseRepository, Repository};
use common::util::date_util::now_millis;

use crate::entitys::relation_edge::{RelationEdge, RelationKind, pair_key};
use crate::store::is_duplicate_key;

/// 关系图存储适配器
///
/// 每个无序用户对至多一条边，所有迁移都是单文档条件写。
/// 适配层只回答"写是否命中"，业务语义（Conflict/NotFound）由关系引擎决定。
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// 仅当该用户对之间不存在任何边时创建 PENDING_REQUEST(from→to)
    async fn create_pending(&self, from: &str, to: &str) -> Result<bool, AppError>;
    /// 删除 PENDING_REQUEST(from→to)，返回是否存在
    async fn delete_pending(&self, from: &str, to: &str) -> Result<bool, AppError>;
    /// 将 PENDING_REQUEST(from→to) 原子替换为 FRIEND，返回是否命中
    async fn promote_pending_to_friend(&self, from: &str, to: &str) -> Result<bool, AppError>;
    /// 删除 FRIEND 边，返回是否存在
    async fn delete_friend(&self, a: &str, b: &str) -> Result<bool, AppError>;
    /// 将用户对的边替换为 BLOCKED(from→to)（清掉 FRIEND 与两个方向的 PENDING）；
    /// 已存在 BLOCKED 边时不覆盖，返回 false
    async fn upsert_block(&self, from: &str, to: &str) -> Result<bool, AppError>;
    /// 删除 BLOCKED(from→to)，返回是否存在
    async fn delete_block(&self, from: &str, to: &str) -> Result<bool, AppError>;

    async fn friend_ids(&self, user_id: &str) -> Result<Vec<String>, AppError>;
    async fn incoming_request_ids(&self, user_id: &str) -> Result<Vec<String>, AppError>;
    async fn sent_request_ids(&self, user_id: &str) -> Result<Vec<String>, AppError>;
    async fn blocked_ids(&self, user_id: &str) -> Result<Vec<String>, AppError>;
    async fn blocked_by_ids(&self, user_id: &str) -> Result<Vec<String>, AppError>;
    async fn relation_between(&self, a: &str, b: &str) -> Result<Option<RelationEdge>, AppError>;
    /// 批量取当前用户与一组用户之间的边
    async fn relations_with(&self, user_id: &str, others: &[String]) -> Result<Vec<RelationEdge>, AppError>;
    async fn is_blocked_either_direction(&self, a: &str, b: &str) -> Result<bool, AppError>;
}

#[derive(Debug)]
pub struct MongoGraphStore {
    pub dao: BaseRepository<RelationEdge>,
}

impl MongoGraphStore {
    pub fn new(db: &Database) -> Self {
        let collection = db.collection("relation_edges");
        Self { dao: BaseRepository::new(collection) }
    }

    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let unique_pair = IndexModel::builder()
            .keys(doc! { "pair_key": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let by_from = IndexModel::builder().keys(doc! { "kind": 1, "from": 1 }).build();
        let by_to = IndexModel::builder().keys(doc! { "kind": 1, "to": 1 }).build();
        self.dao.collection.create_index(unique_pair).await?;
        self.dao.collection.create_index(by_from).await?;
        self.dao.collection.create_index(by_to).await?;
        Ok(())
    }

    fn other_ends(edges: Vec<RelationEdge>, user_id: &str) -> Vec<String> {
        edges.into_iter().map(|e| e.other_end(user_id).to_string()).collect()
    }
}

#[async_trait]
impl GraphStore for MongoGraphStore {
    async fn create_pending(&self, from: &str, to: &str) -> Result<bool, AppError> {
        let edge = RelationEdge {
            id: ObjectId::new().to_hex(),
            pair_key: pair_key(from, to),
            kind: RelationKind::PendingRequest,
            from: from.to_string(),
            to: to.to_string(),
            created_at: now_millis(),
        };
        match self.dao.collection.insert_one(&edge).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_pending(&self, from: &str, to: &str) -> Result<bool, AppError> {
        let deleted = self
            .dao
            .delete_one(doc! {
                "pair_key": pair_key(from, to),
                "kind": RelationKind::PendingRequest.to_string(),
                "from": from,
                "to": to,
            })
            .await?;
        Ok(deleted > 0)
    }

    async fn promote_pending_to_friend(&self, from: &str, to: &str) -> Result<bool, AppError> {
        let matched = self
            .dao
            .update_one(
                doc! {
                    "pair_key": pair_key(from, to),
                    "kind": RelationKind::PendingRequest.to_string(),
                    "from": from,
                    "to": to,
                },
                doc! { "$set": { "kind": RelationKind::Friend.to_string(), "created_at": now_millis() } },
            )
            .await?;
        Ok(matched > 0)
    }

    async fn delete_friend(&self, a: &str, b: &str) -> Result<bool, AppError> {
        let deleted = self
            .dao
            .delete_one(doc! {
                "pair_key": pair_key(a, b),
                "kind": RelationKind::Friend.to_string(),
            })
            .await?;
        Ok(deleted > 0)
    }

    async fn upsert_block(&self, from: &str, to: &str) -> Result<bool, AppError> {
        let pk = pair_key(from, to);
        let result = self
            .dao
            .collection
            .update_one(
                doc! { "pair_key": &pk, "kind": { "$ne": RelationKind::Blocked.to_string() } },
                doc! {
                    "$set": {
                        "kind": RelationKind::Blocked.to_string(),
                        "from": from,
                        "to": to,
                        "created_at": now_millis(),
                    },
                    "$setOnInsert": { "_id": ObjectId::new().to_hex() },
                },
            )
            .upsert(true)
            .await;
        match result {
            Ok(_) => Ok(true),
            // 唯一索引挡下：已有 BLOCKED 边占据该用户对
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_block(&self, from: &str, to: &str) -> Result<bool, AppError> {
        let deleted = self
            .dao
            .delete_one(doc! {
                "pair_key": pair_key(from, to),
                "kind": RelationKind::Blocked.to_string(),
                "from": from,
            })
            .await?;
        Ok(deleted > 0)
    }

    async fn friend_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let edges = self
            .dao
            .query(doc! {
                "kind": RelationKind::Friend.to_string(),
                "$or": [ { "from": user_id }, { "to": user_id } ],
            })
            .await?;
        Ok(Self::other_ends(edges, user_id))
    }

    async fn incoming_request_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let edges = self
            .dao
            .query(doc! { "kind": RelationKind::PendingRequest.to_string(), "to": user_id })
            .await?;
        Ok(edges.into_iter().map(|e| e.from).collect())
    }

    async fn sent_request_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let edges = self
            .dao
            .query(doc! { "kind": RelationKind::PendingRequest.to_string(), "from": user_id })
            .await?;
        Ok(edges.into_iter().map(|e| e.to).collect())
    }

    async fn blocked_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let edges = self
            .dao
            .query(doc! { "kind": RelationKind::Blocked.to_string(), "from": user_id })
            .await?;
        Ok(edges.into_iter().map(|e| e.to).collect())
    }

    async fn blocked_by_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let edges = self
            .dao
            .query(doc! { "kind": RelationKind::Blocked.to_string(), "to": user_id })
            .await?;
        Ok(edges.into_iter().map(|e| e.from).collect())
    }

    async fn relation_between(&self, a: &str, b: &str) -> Result<Option<RelationEdge>, AppError> {
        self.dao.find_one(doc! { "pair_key": pair_key(a, b) }).await
    }

    async fn relations_with(&self, user_id: &str, others: &[String]) -> Result<Vec<RelationEdge>, AppError> {
        if others.is_empty() {
            return Ok(vec![]);
        }
        let keys: Vec<String> = others.iter().map(|o| pair_key(user_id, o)).collect();
        self.dao.query(doc! { "pair_key": { "$in": keys } }).await
    }

    async fn is_blocked_either_direction(&self, a: &str, b: &str) -> Result<bool, AppError> {
        let edge = self
            .dao
            .find_one(doc! {
                "pair_key": pair_key(a, b),
                "kind": RelationKind::Blocked.to_string(),
            })
            .await?;
        Ok(edge.is_some())
    }
}
