use std::sync::Arc;

use once_cell::sync::OnceCell;

use common::errors::AppError;

use crate::biz_service::user_cache_service::UserCacheService;
use crate::entitys::model::RelationshipSummary;
use crate::entitys::relation_edge::RelationshipStatus;
use crate::store::graph_store::GraphStore;
use crate::store::user_store::UserStore;

/// 关系引擎
///
/// 状态机（按用户对收敛）：NONE ⇄ PENDING_REQUEST → FRIEND → NONE，
/// 任意状态 → BLOCKED → NONE。迁移由图存储的单文档条件写保证原子，
/// 并发竞争（如双方同时发请求）由先提交者胜出，后到者拿到 Conflict。
/// 每次成功变更都会异步失效两端用户的关系与搜索缓存；失效失败只记日志，
/// 不回滚变更，缓存残留由 TTL 兜底。
pub struct RelationService {
    graph: Arc<dyn GraphStore>,
    users: Arc<dyn UserStore>,
    cache_layer: Arc<UserCacheService>,
}

impl std::fmt::Debug for RelationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationService").finish_non_exhaustive()
    }
}

impl RelationService {
    pub fn new(graph: Arc<dyn GraphStore>, users: Arc<dyn UserStore>, cache_layer: Arc<UserCacheService>) -> Arc<Self> {
        Arc::new(Self { graph, users, cache_layer })
    }

    pub fn init(graph: Arc<dyn GraphStore>, users: Arc<dyn UserStore>, cache_layer: Arc<UserCacheService>) {
        let instance = Self::new(graph, users, cache_layer);
        INSTANCE.set(instance).expect("RelationService already initialized");
    }

    /// 获取单例
    pub fn get() -> Arc<Self> {
        INSTANCE.get().expect("RelationService is not initialized").clone()
    }

    /// 发送好友请求：双方之间不存在任何边时才允许
    pub async fn send_request(&self, current_user_id: &str, target_user_id: &str) -> Result<(), AppError> {
        check_distinct(current_user_id, target_user_id, "Cannot send friend request to yourself")?;
        self.require_user(target_user_id).await?;
        let created = self.graph.create_pending(current_user_id, target_user_id).await?;
        if !created {
            return Err(AppError::conflict("A relationship already exists between these users"));
        }
        self.on_relationship_change(current_user_id, target_user_id);
        Ok(())
    }

    /// 取消自己发出的好友请求
    pub async fn cancel_request(&self, current_user_id: &str, target_user_id: &str) -> Result<(), AppError> {
        check_distinct(current_user_id, target_user_id, "Cannot cancel a friend request to yourself")?;
        let deleted = self.graph.delete_pending(current_user_id, target_user_id).await?;
        if !deleted {
            return Err(AppError::not_found("Friend request not found"));
        }
        self.on_relationship_change(current_user_id, target_user_id);
        Ok(())
    }

    /// 接受对方的好友请求：删除 PENDING 并建立 FRIEND，同一次图写完成
    pub async fn accept_request(&self, current_user_id: &str, target_user_id: &str) -> Result<(), AppError> {
        check_distinct(current_user_id, target_user_id, "Cannot accept a friend request from yourself")?;
        let promoted = self.graph.promote_pending_to_friend(target_user_id, current_user_id).await?;
        if !promoted {
            return Err(AppError::not_found("Friend request not found"));
        }
        self.on_relationship_change(current_user_id, target_user_id);
        Ok(())
    }

    /// 拒绝对方的好友请求
    pub async fn reject_request(&self, current_user_id: &str, target_user_id: &str) -> Result<(), AppError> {
        check_distinct(current_user_id, target_user_id, "Cannot reject a friend request from yourself")?;
        let deleted = self.graph.delete_pending(target_user_id, current_user_id).await?;
        if !deleted {
            return Err(AppError::not_found("Friend request not found"));
        }
        self.on_relationship_change(current_user_id, target_user_id);
        Ok(())
    }

    pub async fn remove_friend(&self, current_user_id: &str, target_user_id: &str) -> Result<(), AppError> {
        check_distinct(current_user_id, target_user_id, "Cannot remove yourself")?;
        let deleted = self.graph.delete_friend(current_user_id, target_user_id).await?;
        if !deleted {
            return Err(AppError::not_found("Friend relationship not found"));
        }
        self.on_relationship_change(current_user_id, target_user_id);
        Ok(())
    }

    /// 拉黑：原子清掉 FRIEND 与两个方向的 PENDING，建立 BLOCKED(当前→目标)。
    /// 用户对已有 BLOCKED 边时返回 Conflict——可见性早已双向屏蔽。
    pub async fn block_user(&self, current_user_id: &str, target_user_id: &str) -> Result<(), AppError> {
        check_distinct(current_user_id, target_user_id, "Cannot block yourself")?;
        self.require_user(target_user_id).await?;
        let blocked = self.graph.upsert_block(current_user_id, target_user_id).await?;
        if !blocked {
            return Err(AppError::conflict("A block already exists between these users"));
        }
        self.on_relationship_change(current_user_id, target_user_id);
        Ok(())
    }

    /// 解除拉黑：只删 BLOCKED(当前→目标)，不恢复之前的关系
    pub async fn unblock_user(&self, current_user_id: &str, target_user_id: &str) -> Result<(), AppError> {
        check_distinct(current_user_id, target_user_id, "Cannot unblock yourself")?;
        let deleted = self.graph.delete_block(current_user_id, target_user_id).await?;
        if !deleted {
            return Err(AppError::not_found("Block not found"));
        }
        self.on_relationship_change(current_user_id, target_user_id);
        Ok(())
    }

    /// 当前用户视角的关系状态
    pub async fn relationship_status(&self, current_user_id: &str, target_user_id: &str) -> Result<RelationshipStatus, AppError> {
        let edge = self.graph.relation_between(current_user_id, target_user_id).await?;
        Ok(edge.map(|e| e.status_for(current_user_id)).unwrap_or_default())
    }

    pub async fn is_blocked_either_direction(&self, a: &str, b: &str) -> Result<bool, AppError> {
        self.graph.is_blocked_either_direction(a, b).await
    }

    /// 一次取回全部关系 ID
    pub async fn relationship_summary(&self, user_id: &str) -> Result<RelationshipSummary, AppError> {
        Ok(RelationshipSummary {
            friends: self.graph.friend_ids(user_id).await?,
            sent_requests: self.graph.sent_request_ids(user_id).await?,
            received_requests: self.graph.incoming_request_ids(user_id).await?,
            blocked: self.graph.blocked_ids(user_id).await?,
            blocked_by: self.graph.blocked_by_ids(user_id).await?,
        })
    }

    async fn require_user(&self, user_id: &str) -> Result<(), AppError> {
        match self.users.find_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::not_found("User not found")),
        }
    }

    fn on_relationship_change(&self, a: &str, b: &str) {
        self.cache_layer.request_invalidation(&[a, b]);
    }
}

fn check_distinct(current_user_id: &str, target_user_id: &str, msg: &str) -> Result<(), AppError> {
    if current_user_id == target_user_id {
        return Err(AppError::invalid(msg));
    }
    Ok(())
}

static INSTANCE: OnceCell<Arc<RelationService>> = OnceCell::new();
