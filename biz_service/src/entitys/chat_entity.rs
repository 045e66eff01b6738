use serde::{Deserialize, Serialize};

use crate::entitys::message_entity::{MessageEntity, MessageType};

/// 会话实体（chats 集合）
///
/// last_message_* 为反范式快照，唯一写入口是 ChatStore 的快照更新方法，
/// 由 ChatService / MessageService 驱动，任何其他组件不得直接写这些字段。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChatEntity {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: Option<String>,                     // 群聊名称（私聊为 None，展示时取对端昵称）
    pub chat_image_url: Option<String>,           // 群头像引用
    pub is_group_chat: bool,
    pub participants: Vec<String>,                // 参与者 user_id 列表（去重）
    pub admins: Vec<String>,                      // 管理员列表（群聊非空，⊆ participants）
    pub last_message_id: Option<String>,
    pub last_message_content: Option<String>,
    pub last_message_sender_id: Option<String>,
    pub last_message_sender_name: Option<String>,
    pub last_message_type: Option<MessageType>,
    pub last_message_media_url: Option<String>,
    pub last_message_time: Option<i64>,           // Unix 毫秒
    pub is_last_message_deleted: bool,            // 末条消息墓碑标记，读取内容前必须检查
    pub is_deleted: bool,
    pub deleted_by: Option<String>,
    pub created_by: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ChatEntity {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.iter().any(|a| a == user_id)
    }
}

/// 末条消息快照，由消息实体派生
#[derive(Debug, Clone)]
pub struct LastMessageSnapshot {
    pub id: String,
    pub content: Option<String>,
    pub sender_id: Option<String>,
    pub sender_name: Option<String>,
    pub message_type: MessageType,
    pub media_url: Option<String>,
    pub time: i64,
}

impl LastMessageSnapshot {
    pub fn from_message(message: &MessageEntity, sender_name: Option<String>) -> Self {
        Self {
            id: message.id.clone(),
            content: message.content.clone(),
            sender_id: message.sender_id.clone(),
            sender_name,
            message_type: message.message_type,
            media_url: message.media_url.clone(),
            time: message.created_at,
        }
    }
}
