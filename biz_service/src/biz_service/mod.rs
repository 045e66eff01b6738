pub mod chat_service;
pub mod kafka_service;
pub mod message_service;
pub mod notify_service;
pub mod relation_service;
pub mod user_cache_service;

use std::sync::Arc;

use mongodb::Database;

use common::config::KafkaConfig;
use common::errors::AppError;
use common::redis::RedisPool;

use crate::biz_const::{INVALIDATE_QUEUE_CAPACITY, NOTIFY_QUEUE_CAPACITY};
use crate::biz_service::notify_service::EventPublisher;
use crate::store::{
    CacheStore, ChatStore, GraphStore, JoinStore, MessageStore, MongoChatStore, MongoGraphStore, MongoJoinStore,
    MongoMessageStore, MongoReadStore, MongoUserStore, ReadStore, RedisCacheStore, UserStore,
};

/// 初始化存储适配器与服务单例（程序启动时调用一次）
pub async fn init_service(db: Database, redis_pool: RedisPool, kafka_cfg: KafkaConfig) -> Result<(), AppError> {
    let graph = Arc::new(MongoGraphStore::new(&db));
    let chats = Arc::new(MongoChatStore::new(&db));
    let messages = Arc::new(MongoMessageStore::new(&db));
    let reads = Arc::new(MongoReadStore::new(&db));
    let joins = Arc::new(MongoJoinStore::new(&db));
    let users = Arc::new(MongoUserStore::new(&db));

    graph.ensure_indexes().await?;
    chats.ensure_indexes().await?;
    messages.ensure_indexes().await?;
    reads.ensure_indexes().await?;
    joins.ensure_indexes().await?;
    users.ensure_indexes().await?;

    let graph: Arc<dyn GraphStore> = graph;
    let chats: Arc<dyn ChatStore> = chats;
    let messages: Arc<dyn MessageStore> = messages;
    let reads: Arc<dyn ReadStore> = reads;
    let joins: Arc<dyn JoinStore> = joins;
    let users: Arc<dyn UserStore> = users;
    let cache: Arc<dyn CacheStore> = Arc::new(RedisCacheStore::new(redis_pool));
    let publisher: Arc<dyn EventPublisher> = Arc::new(kafka_service::KafkaService::new(kafka_cfg));

    notify_service::NotifyService::init(publisher, NOTIFY_QUEUE_CAPACITY);
    let notify = notify_service::NotifyService::get();

    user_cache_service::UserCacheService::init(graph.clone(), users.clone(), cache, INVALIDATE_QUEUE_CAPACITY);
    let cache_layer = user_cache_service::UserCacheService::get();

    relation_service::RelationService::init(graph, users.clone(), cache_layer);
    chat_service::ChatService::init(chats.clone(), messages.clone(), reads, joins, users.clone(), notify.clone());
    message_service::MessageService::init(messages, chats, users, notify);
    Ok(())
}
