use std::collections::HashMap;
use std::sync::Arc;

use log::warn;
use once_cell::sync::OnceCell;
use rand::Rng;
use tokio::sync::mpsc;

use common::errors::AppError;
use common::repository_util::{PageResponse, to_skip, validate_page};

use crate::biz_const::*;
use crate::entitys::model::UserSearchResponse;
use crate::entitys::relation_edge::RelationshipStatus;
use crate::entitys::user_entity::UserProfile;
use crate::store::cache_store::CacheStore;
use crate::store::graph_store::GraphStore;
use crate::store::user_store::UserStore;

/// 关系列表种类，决定图查询与缓存分层参数
#[derive(Debug, Clone, Copy)]
enum RelationList {
    Friends,
    Blocked,
    Incoming,
    Sent,
}

impl RelationList {
    fn cache_prefix(self) -> &'static str {
        match self {
            RelationList::Friends => FRIENDS_CACHE_PREFIX,
            RelationList::Blocked => BLOCKED_CACHE_PREFIX,
            RelationList::Incoming => INCOMING_REQUESTS_CACHE_PREFIX,
            RelationList::Sent => SENT_REQUESTS_CACHE_PREFIX,
        }
    }

    fn ttl_secs(self) -> u64 {
        match self {
            RelationList::Friends => FRIENDS_CACHE_TTL_SECS,
            RelationList::Blocked => BLOCKED_CACHE_TTL_SECS,
            RelationList::Incoming => INCOMING_REQUESTS_CACHE_TTL_SECS,
            RelationList::Sent => SENT_REQUESTS_CACHE_TTL_SECS,
        }
    }

    fn cache_ceiling(self) -> usize {
        match self {
            RelationList::Friends => MAX_FRIENDS_TO_CACHE,
            RelationList::Blocked => MAX_BLOCKED_USERS_TO_CACHE,
            RelationList::Incoming => MAX_INCOMING_REQUESTS_TO_CACHE,
            RelationList::Sent => MAX_SENT_REQUESTS_TO_CACHE,
        }
    }

    fn status(self) -> RelationshipStatus {
        match self {
            RelationList::Friends => RelationshipStatus::Friend,
            RelationList::Blocked => RelationshipStatus::Blocked,
            RelationList::Incoming => RelationshipStatus::FriendRequestReceived,
            RelationList::Sent => RelationshipStatus::FriendRequestSent,
        }
    }
}

/// 资料/搜索缓存层
///
/// 读路径：先查缓存，未命中回源图/文档存储，结果集小于上限才写缓存。
/// 缓存故障一律按未命中处理并记日志，绝不让瞬态缓存错误打断读路径。
/// 失效走有界队列异步执行，按前缀粗粒度删除（正确性优先于命中率），
/// 队列饱和时放弃任务，残留项由 TTL 兜底过期。
pub struct UserCacheService {
    graph: Arc<dyn GraphStore>,
    users: Arc<dyn UserStore>,
    cache: Arc<dyn CacheStore>,
    invalidate_tx: mpsc::Sender<String>,
}

impl std::fmt::Debug for UserCacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCacheService").finish_non_exhaustive()
    }
}

impl UserCacheService {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        users: Arc<dyn UserStore>,
        cache: Arc<dyn CacheStore>,
        queue_capacity: usize,
    ) -> Arc<Self> {
        let (tx, mut rx) = mpsc::channel::<String>(queue_capacity);
        let worker_cache = cache.clone();
        tokio::spawn(async move {
            while let Some(user_id) = rx.recv().await {
                invalidate_user_entries(worker_cache.as_ref(), &user_id).await;
            }
        });
        Arc::new(Self { graph, users, cache, invalidate_tx: tx })
    }

    pub fn init(
        graph: Arc<dyn GraphStore>,
        users: Arc<dyn UserStore>,
        cache: Arc<dyn CacheStore>,
        queue_capacity: usize,
    ) {
        let instance = Self::new(graph, users, cache, queue_capacity);
        INSTANCE.set(instance).expect("UserCacheService already initialized");
    }

    /// 获取单例
    pub fn get() -> Arc<Self> {
        INSTANCE.get().expect("UserCacheService is not initialized").clone()
    }

    /// 关系变更后调度两端用户的缓存失效（fire-and-forget）
    pub fn request_invalidation(&self, user_ids: &[&str]) {
        for user_id in user_ids {
            if self.invalidate_tx.try_send(user_id.to_string()).is_err() {
                warn!("invalidate queue saturated, cache for {} left to expire by TTL", user_id);
            }
        }
    }

    pub async fn get_friends(&self, user_id: &str, page_number: u64, page_size: u64) -> Result<PageResponse<UserSearchResponse>, AppError> {
        self.relation_page(user_id, RelationList::Friends, page_number, page_size).await
    }

    pub async fn get_blocked_users(&self, user_id: &str, page_number: u64, page_size: u64) -> Result<PageResponse<UserSearchResponse>, AppError> {
        self.relation_page(user_id, RelationList::Blocked, page_number, page_size).await
    }

    pub async fn get_incoming_requests(&self, user_id: &str, page_number: u64, page_size: u64) -> Result<PageResponse<UserSearchResponse>, AppError> {
        self.relation_page(user_id, RelationList::Incoming, page_number, page_size).await
    }

    pub async fn get_sent_requests(&self, user_id: &str, page_number: u64, page_size: u64) -> Result<PageResponse<UserSearchResponse>, AppError> {
        self.relation_page(user_id, RelationList::Sent, page_number, page_size).await
    }

    /// 全站用户搜索：双向拉黑与本人不可见，结果带关系状态，按键缓存整页
    pub async fn search_users(
        &self,
        user_id: &str,
        query: &str,
        page_number: u64,
        page_size: u64,
    ) -> Result<PageResponse<UserSearchResponse>, AppError> {
        validate_page(page_number, page_size)?;
        let normalized = query.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(AppError::invalid("Search query cannot be empty"));
        }

        let cache_key = format!("{}{}:{}:{}:{}", SEARCH_CACHE_PREFIX, user_id, normalized, page_number, page_size);
        if let Ok(Some(json)) = self.cache.get(&cache_key).await {
            if let Ok(page) = serde_json::from_str::<PageResponse<UserSearchResponse>>(&json) {
                return Ok(page);
            }
        }

        let mut exclude = self.graph.blocked_ids(user_id).await?;
        exclude.extend(self.graph.blocked_by_ids(user_id).await?);
        exclude.push(user_id.to_string());

        let skip = to_skip(page_number, page_size);
        let (users, total) = self.users.search_by_name(&normalized, &exclude, skip, page_size as i64).await?;

        let other_ids: Vec<String> = users.iter().map(|u| u.id.clone()).collect();
        let edges = self.graph.relations_with(user_id, &other_ids).await?;
        let status_map: HashMap<String, RelationshipStatus> = edges
            .iter()
            .map(|e| (e.other_end(user_id).to_string(), e.status_for(user_id)))
            .collect();

        let content: Vec<UserSearchResponse> = users
            .iter()
            .map(|u| UserSearchResponse {
                id: u.id.clone(),
                full_name: u.full_name.clone(),
                profile_image_url: u.profile_image_url.clone(),
                relationship_status: status_map.get(&u.id).copied().unwrap_or_default(),
            })
            .collect();

        let page = PageResponse::new(page_number, page_size, total, content);
        match serde_json::to_string(&page) {
            Ok(json) => {
                if let Err(e) = self.cache.set(&cache_key, &json, Some(SEARCH_CACHE_TTL_SECS)).await {
                    warn!("failed to cache search page {}: {}", cache_key, e);
                }
            }
            Err(e) => warn!("failed to encode search page {}: {}", cache_key, e),
        }
        Ok(page)
    }

    /// 好友内搜索：先取（可能缓存的）好友 ID 集，再按昵称过滤
    pub async fn search_friends(
        &self,
        user_id: &str,
        query: &str,
        page_number: u64,
        page_size: u64,
    ) -> Result<PageResponse<UserSearchResponse>, AppError> {
        validate_page(page_number, page_size)?;
        let normalized = query.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(AppError::invalid("Search query cannot be empty"));
        }

        let friend_ids = self.cached_relation_ids(user_id, RelationList::Friends).await?;
        if friend_ids.is_empty() {
            return Ok(PageResponse::empty(page_number, page_size));
        }

        let mut matched = self.users.search_in_ids(&normalized, &friend_ids).await?;
        matched.sort_by(|a, b| a.full_name.to_lowercase().cmp(&b.full_name.to_lowercase()));

        let total = matched.len() as u64;
        let from = (to_skip(page_number, page_size) as usize).min(matched.len());
        let to = (from + page_size as usize).min(matched.len());
        let content: Vec<UserSearchResponse> = matched[from..to]
            .iter()
            .map(|u| UserSearchResponse {
                id: u.id.clone(),
                full_name: u.full_name.clone(),
                profile_image_url: u.profile_image_url.clone(),
                relationship_status: RelationshipStatus::Friend,
            })
            .collect();
        Ok(PageResponse::new(page_number, page_size, total, content))
    }

    /// 批量取用户资料投影，读穿缓存；新写入的条目带随机抖动 TTL，
    /// 避免同批缓存同时过期
    pub async fn profiles_with_cache(&self, user_ids: &[String]) -> Result<Vec<UserProfile>, AppError> {
        let mut found: HashMap<String, UserProfile> = HashMap::new();
        let mut missing: Vec<String> = vec![];

        for user_id in user_ids {
            let key = format!("{}{}", PROFILE_KEY_PREFIX, user_id);
            match self.cache.get(&key).await {
                Ok(Some(json)) => match serde_json::from_str::<UserProfile>(&json) {
                    Ok(profile) => {
                        found.insert(user_id.clone(), profile);
                    }
                    Err(_) => missing.push(user_id.clone()),
                },
                Ok(None) => missing.push(user_id.clone()),
                Err(e) => {
                    warn!("profile cache read failed for {}: {}", user_id, e);
                    missing.push(user_id.clone());
                }
            }
        }

        if !missing.is_empty() {
            let users = self.users.find_by_ids(&missing).await?;
            for user in &users {
                let profile = UserProfile::from(user);
                let key = format!("{}{}", PROFILE_KEY_PREFIX, user.id);
                let ttl = PROFILE_CACHE_TTL_SECS + rand::rng().random_range(0..=PROFILE_CACHE_TTL_JITTER_SECS);
                match serde_json::to_string(&profile) {
                    Ok(json) => {
                        if let Err(e) = self.cache.set(&key, &json, Some(ttl)).await {
                            warn!("profile cache write failed for {}: {}", user.id, e);
                        }
                    }
                    Err(e) => warn!("failed to encode profile {}: {}", user.id, e),
                }
                found.insert(user.id.clone(), profile);
            }
        }

        // 保持输入顺序，缺失用户直接跳过
        Ok(user_ids.iter().filter_map(|id| found.get(id).cloned()).collect())
    }

    async fn relation_page(
        &self,
        user_id: &str,
        list: RelationList,
        page_number: u64,
        page_size: u64,
    ) -> Result<PageResponse<UserSearchResponse>, AppError> {
        validate_page(page_number, page_size)?;
        let ids = self.cached_relation_ids(user_id, list).await?;
        let total = ids.len() as u64;

        let from = (to_skip(page_number, page_size) as usize).min(ids.len());
        let to = (from + page_size as usize).min(ids.len());
        let profiles = self.profiles_with_cache(&ids[from..to]).await?;

        let content: Vec<UserSearchResponse> = profiles
            .into_iter()
            .map(|p| UserSearchResponse {
                id: p.id,
                full_name: p.full_name,
                profile_image_url: p.profile_image_url,
                relationship_status: list.status(),
            })
            .collect();
        Ok(PageResponse::new(page_number, page_size, total, content))
    }

    async fn cached_relation_ids(&self, user_id: &str, list: RelationList) -> Result<Vec<String>, AppError> {
        let key = format!("{}{}", list.cache_prefix(), user_id);
        match self.cache.smembers(&key).await {
            Ok(cached) if !cached.is_empty() => {
                let mut ids = cached;
                ids.sort();
                return Ok(ids);
            }
            Ok(_) => {}
            Err(e) => warn!("relation cache read failed for {}: {}", key, e),
        }

        let mut ids = match list {
            RelationList::Friends => self.graph.friend_ids(user_id).await?,
            RelationList::Blocked => self.graph.blocked_ids(user_id).await?,
            RelationList::Incoming => self.graph.incoming_request_ids(user_id).await?,
            RelationList::Sent => self.graph.sent_request_ids(user_id).await?,
        };
        ids.sort();
        ids.dedup();

        if !ids.is_empty() && ids.len() <= list.cache_ceiling() {
            if let Err(e) = self.cache.sadd(&key, &ids).await {
                warn!("relation cache write failed for {}: {}", key, e);
            } else if let Err(e) = self.cache.expire(&key, list.ttl_secs()).await {
                warn!("relation cache expire failed for {}: {}", key, e);
            }
        }
        Ok(ids)
    }
}

/// 删除某用户名下全部关系与搜索缓存（供失效 worker 与测试复用）
pub async fn invalidate_user_entries(cache: &dyn CacheStore, user_id: &str) {
    let prefixes = [
        FRIENDS_CACHE_PREFIX,
        BLOCKED_CACHE_PREFIX,
        INCOMING_REQUESTS_CACHE_PREFIX,
        SENT_REQUESTS_CACHE_PREFIX,
        SEARCH_CACHE_PREFIX,
    ];
    for prefix in prefixes {
        if let Err(e) = cache.delete_by_prefix(&format!("{}{}", prefix, user_id)).await {
            warn!("cache invalidation failed for {}{}: {}", prefix, user_id, e);
        }
    }
}

static INSTANCE: OnceCell<Arc<UserCacheService>> = OnceCell::new();

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use crate::biz_const::*;
    use crate::entitys::relation_edge::RelationshipStatus;
    use crate::store::cache_store::CacheStore;
    use crate::store::graph_store::GraphStore;
    use crate::test_support::TestContext;

    fn ctx() -> TestContext {
        TestContext::with_users(&[("a", "Alice Adams"), ("b", "Bob Brown"), ("c", "Carol Chen")])
    }

    async fn befriend(ctx: &TestContext, a: &str, b: &str) {
        ctx.graph.create_pending(a, b).await.unwrap();
        ctx.graph.promote_pending_to_friend(a, b).await.unwrap();
    }

    #[tokio::test]
    async fn friends_list_is_read_through_cached() {
        let ctx = ctx();
        befriend(&ctx, "a", "b").await;
        befriend(&ctx, "a", "c").await;

        let page = ctx.cache_layer.get_friends("a", 1, 20).await.unwrap();
        assert_eq!(page.total_elements, 2);
        assert_eq!(page.content[0].relationship_status, RelationshipStatus::Friend);
        assert!(ctx.cache.contains("friends:a"));
        assert_eq!(ctx.graph.friend_queries.load(Ordering::SeqCst), 1);

        // 第二次读命中缓存，不再回源图存储
        let page = ctx.cache_layer.get_friends("a", 1, 20).await.unwrap();
        assert_eq!(page.total_elements, 2);
        assert_eq!(ctx.graph.friend_queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn oversized_result_sets_are_not_cached() {
        let ctx = ctx();
        for i in 0..(MAX_BLOCKED_USERS_TO_CACHE + 1) {
            ctx.graph.upsert_block("hub", &format!("u{}", i)).await.unwrap();
        }

        let page = ctx.cache_layer.get_blocked_users("hub", 1, 50).await.unwrap();
        assert_eq!(page.total_elements, (MAX_BLOCKED_USERS_TO_CACHE + 1) as u64);
        assert!(!ctx.cache.contains("blocked:hub"));
    }

    #[tokio::test]
    async fn profile_cache_ttl_carries_jitter() {
        let ctx = ctx();
        befriend(&ctx, "a", "b").await;

        ctx.cache_layer.get_friends("a", 1, 20).await.unwrap();
        let ttl = *ctx.cache.ttls.get("profile:b").unwrap();
        assert!(ttl >= PROFILE_CACHE_TTL_SECS);
        assert!(ttl <= PROFILE_CACHE_TTL_SECS + PROFILE_CACHE_TTL_JITTER_SECS);
    }

    #[tokio::test]
    async fn search_results_are_cached_per_key() {
        let ctx = ctx();

        let first = ctx.cache_layer.search_users("a", "  Bob  ", 1, 20).await.unwrap();
        assert_eq!(first.total_elements, 1);
        assert_eq!(first.content[0].id, "b");
        assert!(ctx.cache.contains("search:a:bob:1:20"));

        // 命中缓存：即使底层数据变化，同一键窗口内结果不变
        ctx.graph.upsert_block("a", "b").await.unwrap();
        let cached = ctx.cache_layer.search_users("a", "bob", 1, 20).await.unwrap();
        assert_eq!(cached.total_elements, 1);
    }

    #[tokio::test]
    async fn search_suppresses_blocked_users_and_self() {
        let ctx = ctx();
        ctx.graph.upsert_block("b", "a").await.unwrap();

        // 被对方拉黑：双向不可见
        let page = ctx.cache_layer.search_users("a", "bob", 1, 20).await.unwrap();
        assert_eq!(page.total_elements, 0);

        let own = ctx.cache_layer.search_users("a", "alice", 1, 20).await.unwrap();
        assert_eq!(own.total_elements, 0);
    }

    #[tokio::test]
    async fn search_annotates_relationship_status() {
        let ctx = ctx();
        ctx.graph.create_pending("a", "b").await.unwrap();

        // "o" 同时命中 Bob Brown 与 Carol Chen
        let page = ctx.cache_layer.search_users("a", "o", 1, 20).await.unwrap();
        let bob = page.content.iter().find(|u| u.id == "b").unwrap();
        assert_eq!(bob.relationship_status, RelationshipStatus::FriendRequestSent);
        let carol = page.content.iter().find(|u| u.id == "c").unwrap();
        assert_eq!(carol.relationship_status, RelationshipStatus::None);
    }

    #[tokio::test]
    async fn search_friends_is_restricted_to_friend_set() {
        let ctx = ctx();
        befriend(&ctx, "a", "b").await;

        let hit = ctx.cache_layer.search_friends("a", "bob", 1, 20).await.unwrap();
        assert_eq!(hit.total_elements, 1);
        assert_eq!(hit.content[0].id, "b");

        // Carol 不是好友，搜不到
        let miss = ctx.cache_layer.search_friends("a", "carol", 1, 20).await.unwrap();
        assert_eq!(miss.total_elements, 0);
    }

    #[tokio::test]
    async fn invalidation_removes_relation_and_search_entries() {
        let ctx = ctx();
        ctx.cache.sadd("friends:a", &["b".to_string()]).await.unwrap();
        ctx.cache.sadd("incoming:a", &["c".to_string()]).await.unwrap();
        ctx.cache.set("search:a:bob:1:20", "{}", None).await.unwrap();
        ctx.cache.set("profile:a", "{}", None).await.unwrap();

        super::invalidate_user_entries(ctx.cache.as_ref(), "a").await;

        assert!(!ctx.cache.contains("friends:a"));
        assert!(!ctx.cache.contains("incoming:a"));
        assert!(!ctx.cache.contains("search:a:bob:1:20"));
        // 资料投影不随关系变更失效，靠 TTL 过期
        assert!(ctx.cache.contains("profile:a"));
    }

    #[tokio::test]
    async fn pagination_slices_sorted_ids() {
        let ctx = ctx();
        for (id, name) in [("u1", "N1"), ("u2", "N2"), ("u3", "N3")] {
            ctx.users.add_user(id, name);
            befriend(&ctx, "hub", id).await;
        }

        let first = ctx.cache_layer.get_friends("hub", 1, 2).await.unwrap();
        assert_eq!(first.total_elements, 3);
        assert_eq!(first.total_pages, 2);
        assert_eq!(first.content.len(), 2);

        let second = ctx.cache_layer.get_friends("hub", 2, 2).await.unwrap();
        assert_eq!(second.content.len(), 1);
    }
}
