use serde::{Deserialize, Serialize};

use crate::entitys::chat_entity::ChatEntity;
use crate::entitys::message_entity::{MessageEntity, MessageType};
use crate::entitys::relation_edge::RelationshipStatus;

/// 会话参与者概要
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatParticipantInfo {
    pub id: String,
    pub full_name: String,
    pub profile_image_url: Option<String>,
}

/// 会话响应记录（纯数据，不含传输封装）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatResponse {
    pub id: String,
    pub name: Option<String>,
    pub chat_image_url: Option<String>,
    pub is_group_chat: bool,
    pub participants: Vec<String>,
    pub admins: Vec<String>,
    pub participants_info: Vec<ChatParticipantInfo>,
    pub last_message_id: Option<String>,
    pub last_message_content: Option<String>,
    pub last_message_sender_id: Option<String>,
    pub last_message_sender_name: Option<String>,
    pub last_message_type: Option<MessageType>,
    pub last_message_media_url: Option<String>,
    pub last_message_time: Option<i64>,
    pub is_last_message_deleted: bool,
    pub unread_message_count: Option<u64>,
    pub is_deleted: bool,
    pub deleted_by: Option<String>,
    pub created_by: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ChatResponse {
    /// 末条消息已删除时内容与媒体引用一律不外泄
    pub fn from_chat(chat: &ChatEntity) -> Self {
        let deleted = chat.is_last_message_deleted;
        Self {
            id: chat.id.clone(),
            name: chat.name.clone(),
            chat_image_url: chat.chat_image_url.clone(),
            is_group_chat: chat.is_group_chat,
            participants: chat.participants.clone(),
            admins: chat.admins.clone(),
            participants_info: vec![],
            last_message_id: chat.last_message_id.clone(),
            last_message_content: if deleted { None } else { chat.last_message_content.clone() },
            last_message_sender_id: chat.last_message_sender_id.clone(),
            last_message_sender_name: chat.last_message_sender_name.clone(),
            last_message_type: chat.last_message_type,
            last_message_media_url: if deleted { None } else { chat.last_message_media_url.clone() },
            last_message_time: chat.last_message_time,
            is_last_message_deleted: deleted,
            unread_message_count: None,
            is_deleted: chat.is_deleted,
            deleted_by: chat.deleted_by.clone(),
            created_by: chat.created_by.clone(),
            created_at: chat.created_at,
            updated_at: chat.updated_at,
        }
    }
}

/// 消息响应记录
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageResponse {
    pub id: String,
    pub chat_id: String,
    pub sender_id: Option<String>,
    pub sender_name: Option<String>,
    pub content: Option<String>,
    pub message_type: MessageType,
    pub media_url: Option<String>,
    pub reply_to_message_id: Option<String>,
    pub reply_to_message_content: Option<String>,
    pub reply_to_message_sender_id: Option<String>,
    pub reply_to_message_sender_name: Option<String>,
    pub reply_to_message_type: Option<MessageType>,
    pub reply_to_message_media_url: Option<String>,
    pub is_reply_edited: bool,
    pub is_reply_deleted: bool,
    pub is_edited: bool,
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl MessageResponse {
    /// 墓碑消息只保留元数据；被回复消息已删除时快照内容同样隐藏
    pub fn from_message(message: &MessageEntity) -> Self {
        let deleted = message.is_deleted;
        let reply_deleted = message.is_reply_deleted;
        Self {
            id: message.id.clone(),
            chat_id: message.chat_id.clone(),
            sender_id: message.sender_id.clone(),
            sender_name: None,
            content: if deleted { None } else { message.content.clone() },
            message_type: message.message_type,
            media_url: if deleted { None } else { message.media_url.clone() },
            reply_to_message_id: message.reply_to_message_id.clone(),
            reply_to_message_content: if reply_deleted { None } else { message.reply_to_message_content.clone() },
            reply_to_message_sender_id: message.reply_to_message_sender_id.clone(),
            reply_to_message_sender_name: message.reply_to_message_sender_name.clone(),
            reply_to_message_type: message.reply_to_message_type,
            reply_to_message_media_url: if reply_deleted { None } else { message.reply_to_message_media_url.clone() },
            is_reply_edited: message.is_reply_edited,
            is_reply_deleted: reply_deleted,
            is_edited: message.is_edited,
            is_deleted: deleted,
            created_at: message.created_at,
            updated_at: message.updated_at,
        }
    }

    pub fn with_sender_name(mut self, sender_name: Option<String>) -> Self {
        self.sender_name = sender_name;
        self
    }
}

/// 用户搜索/关系列表条目
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserSearchResponse {
    pub id: String,
    pub full_name: String,
    pub profile_image_url: Option<String>,
    pub relationship_status: RelationshipStatus,
}

/// 一次取回某用户全部关系 ID 的汇总
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RelationshipSummary {
    pub friends: Vec<String>,
    pub sent_requests: Vec<String>,
    pub received_requests: Vec<String>,
    pub blocked: Vec<String>,
    pub blocked_by: Vec<String>,
}

/// 已读回执
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageReadInfoResponse {
    pub chat_id: String,
    pub user_id: String,
    pub message_id: String,
    pub read_at: i64,
}
