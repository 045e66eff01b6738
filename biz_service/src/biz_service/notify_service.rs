use std::sync::Arc;

use async_trait::async_trait;
use log::{error, warn};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::sync::mpsc;

use common::errors::AppError;
use common::util::common_utils::build_id;
use common::util::date_util::now_millis;

use crate::biz_const::{CHAT_CHANNEL_PREFIX, USER_CHANNEL_PREFIX};
use crate::entitys::chat_entity::ChatEntity;

/// 发布能力抽象（生产环境为 Kafka）
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), AppError>;
}

/// 推送事件类型
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatEvent {
    NewChat,
    ChatUpdated,
    NewMessage,
    MessageEdited,
    MessageDeleted,
    ChatRead,
}

/// 推送封装：事件类型 + 负载
#[derive(Debug, Serialize)]
pub struct PushEvent {
    pub event: ChatEvent,
    pub event_id: String,
    pub data: serde_json::Value,
    pub ts: i64,
}

struct FanoutJob {
    channel: String,
    payload: String,
}

/// 扇出通知服务
///
/// 变更提交后异步投递：会话主题广播 + 各参与者私有通道。
/// 入队不阻塞调用方（队列满则丢弃并记日志），投递失败只记日志不重试，
/// 永远不会让通知失败影响已提交的变更。
pub struct NotifyService {
    tx: mpsc::Sender<FanoutJob>,
}

impl std::fmt::Debug for NotifyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyService").finish_non_exhaustive()
    }
}

impl NotifyService {
    pub fn new(publisher: Arc<dyn EventPublisher>, capacity: usize) -> Arc<Self> {
        let (tx, mut rx) = mpsc::channel::<FanoutJob>(capacity);
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                if let Err(e) = publisher.publish(&job.channel, &job.payload).await {
                    error!("fanout publish failed on {}: {}", job.channel, e);
                }
            }
        });
        Arc::new(Self { tx })
    }

    pub fn init(publisher: Arc<dyn EventPublisher>, capacity: usize) {
        let instance = Self::new(publisher, capacity);
        INSTANCE.set(instance).expect("NotifyService already initialized");
    }

    /// 获取单例
    pub fn get() -> Arc<Self> {
        INSTANCE.get().expect("NotifyService is not initialized").clone()
    }

    /// 会话主题广播 + 除操作者外所有参与者的私有通道通知
    pub fn fanout_chat<T: Serialize>(&self, event: ChatEvent, chat: &ChatEntity, actor_id: &str, data: &T) {
        let payload = match Self::build_payload(event, data) {
            Ok(payload) => payload,
            Err(e) => {
                error!("failed to encode push event {:?}: {}", event, e);
                return;
            }
        };
        self.dispatch(format!("{}{}", CHAT_CHANNEL_PREFIX, chat.id), payload.clone());
        for participant in &chat.participants {
            if participant != actor_id {
                self.dispatch(format!("{}{}", USER_CHANNEL_PREFIX, participant), payload.clone());
            }
        }
    }

    /// 仅会话主题广播
    pub fn broadcast<T: Serialize>(&self, event: ChatEvent, chat_id: &str, data: &T) {
        match Self::build_payload(event, data) {
            Ok(payload) => self.dispatch(format!("{}{}", CHAT_CHANNEL_PREFIX, chat_id), payload),
            Err(e) => error!("failed to encode push event {:?}: {}", event, e),
        }
    }

    fn build_payload<T: Serialize>(event: ChatEvent, data: &T) -> Result<String, AppError> {
        let push = PushEvent {
            event,
            event_id: build_id(),
            data: serde_json::to_value(data)?,
            ts: now_millis(),
        };
        Ok(serde_json::to_string(&push)?)
    }

    fn dispatch(&self, channel: String, payload: String) {
        if self.tx.try_send(FanoutJob { channel: channel.clone(), payload }).is_err() {
            warn!("notify queue saturated, dropping event for {}", channel);
        }
    }
}

static INSTANCE: OnceCell<Arc<NotifyService>> = OnceCell::new();
