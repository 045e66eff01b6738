use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// 消息类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    #[default]
    Text,
    Media,
    TextWithMedia,
    System,
    Gif,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MessageEntity {
    #[serde(rename = "_id")]
    pub id: String,
    pub chat_id: String,
    pub sender_id: Option<String>,                    // 系统消息为 None
    pub content: Option<String>,
    pub message_type: MessageType,
    pub media_url: Option<String>,                    // 已上传媒体引用
    pub reply_to_message_id: Option<String>,          // 被回复消息 ID
    pub reply_to_message_content: Option<String>,     // 写入时捕获的被回复内容
    pub reply_to_message_sender_id: Option<String>,
    pub reply_to_message_sender_name: Option<String>,
    pub reply_to_message_type: Option<MessageType>,
    pub reply_to_message_media_url: Option<String>,
    pub is_reply_edited: bool,                        // 被回复消息是否已编辑
    pub is_reply_deleted: bool,                       // 被回复消息是否已删除（删除时回写）
    pub is_edited: bool,
    pub is_deleted: bool,                             // 墓碑标记，记录保留
    pub created_at: i64,                              // Unix 毫秒
    pub updated_at: i64,
}

/// 系统消息动作
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemMessageAction {
    CreatePrivateChat,
    CreateGroupChat,
    UpdateGroupChatName,
    UpdateGroupChatImage,
}

/// 系统消息载荷，序列化为 JSON 存入 content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMessage {
    pub actor_id: String,
    pub action: SystemMessageAction,
    pub metadata: HashMap<String, String>,
}

impl SystemMessage {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("Failed to serialize system message")
    }
}
