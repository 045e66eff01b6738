use serde::{Deserialize, Serialize};

/// 已读游标（message_reads 集合），(chat_id, user_id) 唯一，只增不删
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MessageReadEntity {
    #[serde(rename = "_id")]
    pub id: String,
    pub chat_id: String,
    pub user_id: String,
    pub message_id: String,   // 最后确认已读的消息 ID
    pub read_at: i64,         // Unix 毫秒
}
