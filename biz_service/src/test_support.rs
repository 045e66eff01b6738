//! 单元测试用的内存存储替身，与生产适配器遵守同一套契约。

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use mongodb::bson::oid::ObjectId;

use common::errors::AppError;
use common::util::date_util::now_millis;

use crate::biz_const::{INVALIDATE_QUEUE_CAPACITY, NOTIFY_QUEUE_CAPACITY};
use crate::biz_service::chat_service::ChatService;
use crate::biz_service::message_service::MessageService;
use crate::biz_service::notify_service::{EventPublisher, NotifyService};
use crate::biz_service::relation_service::RelationService;
use crate::biz_service::user_cache_service::UserCacheService;
use crate::entitys::chat_entity::{ChatEntity, LastMessageSnapshot};
use crate::entitys::chat_join_entity::ChatJoinEntity;
use crate::entitys::message_entity::MessageEntity;
use crate::entitys::message_read_entity::MessageReadEntity;
use crate::entitys::relation_edge::{RelationEdge, RelationKind, pair_key};
use crate::entitys::user_entity::UserEntity;
use crate::store::cache_store::CacheStore;
use crate::store::chat_store::ChatStore;
use crate::store::graph_store::GraphStore;
use crate::store::join_store::JoinStore;
use crate::store::message_store::MessageStore;
use crate::store::read_store::ReadStore;
use crate::store::user_store::UserStore;

#[derive(Default)]
pub struct MemGraphStore {
    edges: DashMap<String, RelationEdge>,
    pub friend_queries: AtomicUsize,
}

#[async_trait]
impl GraphStore for MemGraphStore {
    async fn create_pending(&self, from: &str, to: &str) -> Result<bool, AppError> {
        let pk = pair_key(from, to);
        match self.edges.entry(pk.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(false),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(RelationEdge {
                    id: ObjectId::new().to_hex(),
                    pair_key: pk,
                    kind: RelationKind::PendingRequest,
                    from: from.to_string(),
                    to: to.to_string(),
                    created_at: now_millis(),
                });
                Ok(true)
            }
        }
    }

    async fn delete_pending(&self, from: &str, to: &str) -> Result<bool, AppError> {
        let pk = pair_key(from, to);
        let matches = self
            .edges
            .get(&pk)
            .map(|e| e.kind == RelationKind::PendingRequest && e.from == from && e.to == to)
            .unwrap_or(false);
        if matches {
            self.edges.remove(&pk);
        }
        Ok(matches)
    }

    async fn promote_pending_to_friend(&self, from: &str, to: &str) -> Result<bool, AppError> {
        let pk = pair_key(from, to);
        match self.edges.get_mut(&pk) {
            Some(mut edge) if edge.kind == RelationKind::PendingRequest && edge.from == from && edge.to == to => {
                edge.kind = RelationKind::Friend;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_friend(&self, a: &str, b: &str) -> Result<bool, AppError> {
        let pk = pair_key(a, b);
        let matches = self.edges.get(&pk).map(|e| e.kind == RelationKind::Friend).unwrap_or(false);
        if matches {
            self.edges.remove(&pk);
        }
        Ok(matches)
    }

    async fn upsert_block(&self, from: &str, to: &str) -> Result<bool, AppError> {
        let pk = pair_key(from, to);
        if self.edges.get(&pk).map(|e| e.kind == RelationKind::Blocked).unwrap_or(false) {
            return Ok(false);
        }
        self.edges.insert(
            pk.clone(),
            RelationEdge {
                id: ObjectId::new().to_hex(),
                pair_key: pk,
                kind: RelationKind::Blocked,
                from: from.to_string(),
                to: to.to_string(),
                created_at: now_millis(),
            },
        );
        Ok(true)
    }

    async fn delete_block(&self, from: &str, to: &str) -> Result<bool, AppError> {
        let pk = pair_key(from, to);
        let matches = self
            .edges
            .get(&pk)
            .map(|e| e.kind == RelationKind::Blocked && e.from == from)
            .unwrap_or(false);
        if matches {
            self.edges.remove(&pk);
        }
        Ok(matches)
    }

    async fn friend_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        self.friend_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .edges
            .iter()
            .filter(|e| e.kind == RelationKind::Friend && (e.from == user_id || e.to == user_id))
            .map(|e| e.other_end(user_id).to_string())
            .collect())
    }

    async fn incoming_request_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        Ok(self
            .edges
            .iter()
            .filter(|e| e.kind == RelationKind::PendingRequest && e.to == user_id)
            .map(|e| e.from.clone())
            .collect())
    }

    async fn sent_request_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        Ok(self
            .edges
            .iter()
            .filter(|e| e.kind == RelationKind::PendingRequest && e.from == user_id)
            .map(|e| e.to.clone())
            .collect())
    }

    async fn blocked_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        Ok(self
            .edges
            .iter()
            .filter(|e| e.kind == RelationKind::Blocked && e.from == user_id)
            .map(|e| e.to.clone())
            .collect())
    }

    async fn blocked_by_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        Ok(self
            .edges
            .iter()
            .filter(|e| e.kind == RelationKind::Blocked && e.to == user_id)
            .map(|e| e.from.clone())
            .collect())
    }

    async fn relation_between(&self, a: &str, b: &str) -> Result<Option<RelationEdge>, AppError> {
        Ok(self.edges.get(&pair_key(a, b)).map(|e| e.clone()))
    }

    async fn relations_with(&self, user_id: &str, others: &[String]) -> Result<Vec<RelationEdge>, AppError> {
        Ok(others
            .iter()
            .filter_map(|other| self.edges.get(&pair_key(user_id, other)).map(|e| e.clone()))
            .collect())
    }

    async fn is_blocked_either_direction(&self, a: &str, b: &str) -> Result<bool, AppError> {
        Ok(self.edges.get(&pair_key(a, b)).map(|e| e.kind == RelationKind::Blocked).unwrap_or(false))
    }
}

#[derive(Default)]
pub struct MemChatStore {
    chats: DashMap<String, ChatEntity>,
}

impl MemChatStore {
    pub fn get_chat(&self, chat_id: &str) -> Option<ChatEntity> {
        self.chats.get(chat_id).map(|c| c.clone())
    }
}

#[async_trait]
impl ChatStore for MemChatStore {
    async fn insert(&self, chat: &ChatEntity) -> Result<(), AppError> {
        self.chats.insert(chat.id.clone(), chat.clone());
        Ok(())
    }

    async fn find_by_id(&self, chat_id: &str) -> Result<Option<ChatEntity>, AppError> {
        Ok(self.chats.get(chat_id).map(|c| c.clone()))
    }

    async fn find_private_chat(&self, a: &str, b: &str) -> Result<Option<ChatEntity>, AppError> {
        Ok(self
            .chats
            .iter()
            .find(|c| {
                !c.is_group_chat
                    && !c.is_deleted
                    && c.participants.len() == 2
                    && c.participants.iter().any(|p| p == a)
                    && c.participants.iter().any(|p| p == b)
            })
            .map(|c| c.clone()))
    }

    async fn update_last_message(&self, chat_id: &str, snapshot: &LastMessageSnapshot) -> Result<(), AppError> {
        if let Some(mut chat) = self.chats.get_mut(chat_id) {
            crate::biz_service::chat_service::apply_snapshot(&mut chat, snapshot);
        }
        Ok(())
    }

    async fn refresh_last_message_if_current(
        &self,
        chat_id: &str,
        message_id: &str,
        content: Option<String>,
        time: i64,
    ) -> Result<bool, AppError> {
        if let Some(mut chat) = self.chats.get_mut(chat_id) {
            if chat.last_message_id.as_deref() == Some(message_id) {
                chat.last_message_content = content;
                chat.last_message_time = Some(time);
                chat.updated_at = time;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn tombstone_last_message_if_current(&self, chat_id: &str, message_id: &str, time: i64) -> Result<bool, AppError> {
        if let Some(mut chat) = self.chats.get_mut(chat_id) {
            if chat.last_message_id.as_deref() == Some(message_id) {
                chat.is_last_message_deleted = true;
                chat.last_message_time = Some(time);
                chat.updated_at = time;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn update_profile(&self, chat_id: &str, name: Option<String>, image_url: Option<String>) -> Result<(), AppError> {
        if let Some(mut chat) = self.chats.get_mut(chat_id) {
            if let Some(name) = name {
                chat.name = Some(name);
            }
            if let Some(image_url) = image_url {
                chat.chat_image_url = Some(image_url);
            }
            chat.updated_at = now_millis();
        }
        Ok(())
    }

    async fn add_participants(&self, chat_id: &str, user_ids: &[String]) -> Result<(), AppError> {
        if let Some(mut chat) = self.chats.get_mut(chat_id) {
            for user_id in user_ids {
                if !chat.participants.contains(user_id) {
                    chat.participants.push(user_id.clone());
                }
            }
            chat.updated_at = now_millis();
        }
        Ok(())
    }

    async fn remove_participant(&self, chat_id: &str, user_id: &str) -> Result<(), AppError> {
        if let Some(mut chat) = self.chats.get_mut(chat_id) {
            chat.participants.retain(|p| p != user_id);
            chat.admins.retain(|a| a != user_id);
            chat.updated_at = now_millis();
        }
        Ok(())
    }

    async fn add_admin(&self, chat_id: &str, user_id: &str) -> Result<(), AppError> {
        if let Some(mut chat) = self.chats.get_mut(chat_id) {
            if !chat.admins.iter().any(|a| a == user_id) {
                chat.admins.push(user_id.to_string());
            }
            chat.updated_at = now_millis();
        }
        Ok(())
    }

    async fn remove_admin(&self, chat_id: &str, user_id: &str) -> Result<(), AppError> {
        if let Some(mut chat) = self.chats.get_mut(chat_id) {
            chat.admins.retain(|a| a != user_id);
            chat.updated_at = now_millis();
        }
        Ok(())
    }

    async fn soft_delete(&self, chat_id: &str, deleted_by: &str) -> Result<(), AppError> {
        if let Some(mut chat) = self.chats.get_mut(chat_id) {
            chat.is_deleted = true;
            chat.deleted_by = Some(deleted_by.to_string());
            chat.updated_at = now_millis();
        }
        Ok(())
    }

    async fn find_for_user(
        &self,
        user_id: &str,
        before_updated_at: Option<i64>,
        skip: u64,
        limit: i64,
    ) -> Result<(Vec<ChatEntity>, u64), AppError> {
        let mut matched: Vec<ChatEntity> = self
            .chats
            .iter()
            .filter(|c| {
                c.participants.iter().any(|p| p == user_id)
                    && !c.is_deleted
                    && before_updated_at.map(|before| c.updated_at < before).unwrap_or(true)
            })
            .map(|c| c.clone())
            .collect();
        matched.sort_by_key(|c| std::cmp::Reverse(c.updated_at));
        let total = matched.len() as u64;
        let items = matched.into_iter().skip(skip as usize).take(limit as usize).collect();
        Ok((items, total))
    }

    async fn search_for_user(&self, user_id: &str, query: &str, skip: u64, limit: i64) -> Result<(Vec<ChatEntity>, u64), AppError> {
        let needle = query.to_lowercase();
        let mut matched: Vec<ChatEntity> = self
            .chats
            .iter()
            .filter(|c| c.participants.iter().any(|p| p == user_id) && !c.is_deleted)
            .filter(|c| {
                let name_hit = c.is_group_chat
                    && c.name.as_ref().map(|n| n.to_lowercase().contains(&needle)).unwrap_or(false);
                let content_hit = c
                    .last_message_content
                    .as_ref()
                    .map(|content| content.to_lowercase().contains(&needle))
                    .unwrap_or(false);
                name_hit || content_hit
            })
            .map(|c| c.clone())
            .collect();
        matched.sort_by_key(|c| std::cmp::Reverse(c.last_message_time));
        let total = matched.len() as u64;
        let items = matched.into_iter().skip(skip as usize).take(limit as usize).collect();
        Ok((items, total))
    }
}

#[derive(Default)]
pub struct MemMessageStore {
    messages: DashMap<String, MessageEntity>,
}

impl MemMessageStore {
    pub fn get_message(&self, message_id: &str) -> Option<MessageEntity> {
        self.messages.get(message_id).map(|m| m.clone())
    }

    pub fn messages_in_chat(&self, chat_id: &str) -> Vec<MessageEntity> {
        let mut items: Vec<MessageEntity> =
            self.messages.iter().filter(|m| m.chat_id == chat_id).map(|m| m.clone()).collect();
        items.sort_by_key(|m| m.created_at);
        items
    }
}

#[async_trait]
impl MessageStore for MemMessageStore {
    async fn insert(&self, message: &MessageEntity) -> Result<(), AppError> {
        self.messages.insert(message.id.clone(), message.clone());
        Ok(())
    }

    async fn find_by_id(&self, message_id: &str) -> Result<Option<MessageEntity>, AppError> {
        Ok(self.messages.get(message_id).map(|m| m.clone()))
    }

    async fn update_content(&self, message_id: &str, content: &str) -> Result<(), AppError> {
        if let Some(mut message) = self.messages.get_mut(message_id) {
            message.content = Some(content.to_string());
            message.is_edited = true;
            message.updated_at = now_millis();
        }
        Ok(())
    }

    async fn soft_delete(&self, message_id: &str) -> Result<(), AppError> {
        if let Some(mut message) = self.messages.get_mut(message_id) {
            message.is_deleted = true;
            message.updated_at = now_millis();
        }
        Ok(())
    }

    async fn mark_replies_deleted(&self, message_id: &str) -> Result<u64, AppError> {
        let mut swept = 0;
        for mut message in self.messages.iter_mut() {
            if message.reply_to_message_id.as_deref() == Some(message_id) {
                message.is_reply_deleted = true;
                swept += 1;
            }
        }
        Ok(swept)
    }

    async fn find_by_chat(
        &self,
        chat_id: &str,
        before_created_at: Option<i64>,
        skip: u64,
        limit: i64,
    ) -> Result<(Vec<MessageEntity>, u64), AppError> {
        let mut matched: Vec<MessageEntity> = self
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id && before_created_at.map(|before| m.created_at < before).unwrap_or(true))
            .map(|m| m.clone())
            .collect();
        matched.sort_by_key(|m| std::cmp::Reverse(m.created_at));
        let total = matched.len() as u64;
        let items = matched.into_iter().skip(skip as usize).take(limit as usize).collect();
        Ok((items, total))
    }

    async fn count_excluding_sender(&self, chat_id: &str, user_id: &str) -> Result<u64, AppError> {
        Ok(self
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id && m.sender_id.as_deref() != Some(user_id))
            .count() as u64)
    }

    async fn count_after_excluding_sender(&self, chat_id: &str, after: i64, user_id: &str) -> Result<u64, AppError> {
        Ok(self
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id && m.created_at > after && m.sender_id.as_deref() != Some(user_id))
            .count() as u64)
    }

    async fn soft_delete_by_chat(&self, chat_id: &str) -> Result<u64, AppError> {
        let mut swept = 0;
        for mut message in self.messages.iter_mut() {
            if message.chat_id == chat_id {
                message.is_deleted = true;
                swept += 1;
            }
        }
        Ok(swept)
    }
}

#[derive(Default)]
pub struct MemReadStore {
    cursors: DashMap<(String, String), MessageReadEntity>,
}

#[async_trait]
impl ReadStore for MemReadStore {
    async fn upsert(&self, chat_id: &str, user_id: &str, message_id: &str, read_at: i64) -> Result<(), AppError> {
        self.cursors.insert(
            (chat_id.to_string(), user_id.to_string()),
            MessageReadEntity {
                id: ObjectId::new().to_hex(),
                chat_id: chat_id.to_string(),
                user_id: user_id.to_string(),
                message_id: message_id.to_string(),
                read_at,
            },
        );
        Ok(())
    }

    async fn find(&self, chat_id: &str, user_id: &str) -> Result<Option<MessageReadEntity>, AppError> {
        Ok(self.cursors.get(&(chat_id.to_string(), user_id.to_string())).map(|c| c.clone()))
    }
}

#[derive(Default)]
pub struct MemJoinStore {
    rows: DashMap<(String, String), ChatJoinEntity>,
}

#[async_trait]
impl JoinStore for MemJoinStore {
    async fn insert_many(&self, rows: &[ChatJoinEntity]) -> Result<(), AppError> {
        for row in rows {
            self.rows.insert((row.chat_id.clone(), row.added_user_id.clone()), row.clone());
        }
        Ok(())
    }

    async fn find(&self, chat_id: &str, added_user_id: &str) -> Result<Option<ChatJoinEntity>, AppError> {
        Ok(self.rows.get(&(chat_id.to_string(), added_user_id.to_string())).map(|r| r.clone()))
    }

    async fn delete(&self, chat_id: &str, added_user_id: &str) -> Result<(), AppError> {
        self.rows.remove(&(chat_id.to_string(), added_user_id.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemUserStore {
    users: DashMap<String, UserEntity>,
}

impl MemUserStore {
    pub fn add_user(&self, id: &str, full_name: &str) {
        self.users.insert(
            id.to_string(),
            UserEntity {
                id: id.to_string(),
                full_name: full_name.to_string(),
                ..Default::default()
            },
        );
    }
}

#[async_trait]
impl UserStore for MemUserStore {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserEntity>, AppError> {
        Ok(self.users.get(user_id).map(|u| u.clone()))
    }

    async fn find_by_ids(&self, user_ids: &[String]) -> Result<Vec<UserEntity>, AppError> {
        Ok(user_ids.iter().filter_map(|id| self.users.get(id).map(|u| u.clone())).collect())
    }

    async fn search_by_name(
        &self,
        query: &str,
        exclude_ids: &[String],
        skip: u64,
        limit: i64,
    ) -> Result<(Vec<UserEntity>, u64), AppError> {
        let needle = query.to_lowercase();
        let mut matched: Vec<UserEntity> = self
            .users
            .iter()
            .filter(|u| u.full_name.to_lowercase().contains(&needle) && !exclude_ids.contains(&u.id))
            .map(|u| u.clone())
            .collect();
        matched.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        let total = matched.len() as u64;
        let items = matched.into_iter().skip(skip as usize).take(limit as usize).collect();
        Ok((items, total))
    }

    async fn search_in_ids(&self, query: &str, ids: &[String]) -> Result<Vec<UserEntity>, AppError> {
        let needle = query.to_lowercase();
        Ok(self
            .users
            .iter()
            .filter(|u| ids.contains(&u.id) && u.full_name.to_lowercase().contains(&needle))
            .map(|u| u.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct MemCacheStore {
    values: DashMap<String, String>,
    sets: DashMap<String, Vec<String>>,
    pub ttls: DashMap<String, u64>,
}

impl MemCacheStore {
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key) || self.sets.contains_key(key)
    }
}

#[async_trait]
impl CacheStore for MemCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.values.get(key).map(|v| v.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<(), AppError> {
        self.values.insert(key.to_string(), value.to_string());
        if let Some(ttl) = ttl_secs {
            self.ttls.insert(key.to_string(), ttl);
        }
        Ok(())
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<(), AppError> {
        let mut entry = self.sets.entry(key.to_string()).or_default();
        for member in members {
            if !entry.contains(member) {
                entry.push(member.clone());
            }
        }
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, AppError> {
        Ok(self.sets.get(key).map(|s| s.clone()).unwrap_or_default())
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), AppError> {
        self.ttls.insert(key.to_string(), ttl_secs);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.values.remove(key);
        self.sets.remove(key);
        self.ttls.remove(key);
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, AppError> {
        let mut deleted = 0;
        let value_keys: Vec<String> =
            self.values.iter().map(|e| e.key().clone()).filter(|k| k.starts_with(prefix)).collect();
        for key in value_keys {
            self.values.remove(&key);
            deleted += 1;
        }
        let set_keys: Vec<String> =
            self.sets.iter().map(|e| e.key().clone()).filter(|k| k.starts_with(prefix)).collect();
        for key in set_keys {
            self.sets.remove(&key);
            deleted += 1;
        }
        Ok(deleted)
    }
}

/// 记录所有已发布事件的发布替身
#[derive(Default)]
pub struct MemPublisher {
    pub published: DashMap<u64, (String, String)>,
    seq: AtomicUsize,
}

impl MemPublisher {
    pub fn events(&self) -> Vec<(String, String)> {
        let mut keyed: Vec<(u64, (String, String))> =
            self.published.iter().map(|e| (*e.key(), e.value().clone())).collect();
        keyed.sort_by_key(|(k, _)| *k);
        keyed.into_iter().map(|(_, v)| v).collect()
    }
}

#[async_trait]
impl EventPublisher for MemPublisher {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), AppError> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) as u64;
        self.published.insert(seq, (channel.to_string(), payload.to_string()));
        Ok(())
    }
}

/// 全内存服务装配，供各服务的单元测试使用
pub struct TestContext {
    pub graph: Arc<MemGraphStore>,
    pub chats: Arc<MemChatStore>,
    pub messages: Arc<MemMessageStore>,
    pub reads: Arc<MemReadStore>,
    pub joins: Arc<MemJoinStore>,
    pub users: Arc<MemUserStore>,
    pub cache: Arc<MemCacheStore>,
    pub publisher: Arc<MemPublisher>,
    pub notify: Arc<NotifyService>,
    pub cache_layer: Arc<UserCacheService>,
    pub relation_service: Arc<RelationService>,
    pub chat_service: Arc<ChatService>,
    pub message_service: Arc<MessageService>,
}

impl TestContext {
    pub fn new() -> Self {
        let graph = Arc::new(MemGraphStore::default());
        let chats = Arc::new(MemChatStore::default());
        let messages = Arc::new(MemMessageStore::default());
        let reads = Arc::new(MemReadStore::default());
        let joins = Arc::new(MemJoinStore::default());
        let users = Arc::new(MemUserStore::default());
        let cache = Arc::new(MemCacheStore::default());
        let publisher = Arc::new(MemPublisher::default());

        let notify = NotifyService::new(publisher.clone(), NOTIFY_QUEUE_CAPACITY);
        let cache_layer =
            UserCacheService::new(graph.clone(), users.clone(), cache.clone(), INVALIDATE_QUEUE_CAPACITY);
        let relation_service = RelationService::new(graph.clone(), users.clone(), cache_layer.clone());
        let chat_service = ChatService::new(
            chats.clone(),
            messages.clone(),
            reads.clone(),
            joins.clone(),
            users.clone(),
            notify.clone(),
        );
        let message_service = MessageService::new(messages.clone(), chats.clone(), users.clone(), notify.clone());

        Self {
            graph,
            chats,
            messages,
            reads,
            joins,
            users,
            cache,
            publisher,
            notify,
            cache_layer,
            relation_service,
            chat_service,
            message_service,
        }
    }

    pub fn with_users(user_ids_and_names: &[(&str, &str)]) -> Self {
        let ctx = Self::new();
        for (id, name) in user_ids_and_names {
            ctx.users.add_user(id, name);
        }
        ctx
    }
}
