use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use once_cell::sync::OnceCell;

use common::errors::AppError;
use common::util::date_util::now_millis;

use crate::biz_service::notify_service::{ChatEvent, NotifyService};
use crate::entitys::chat_entity::{ChatEntity, LastMessageSnapshot};
use crate::entitys::message_entity::{MessageEntity, MessageType};
use crate::entitys::model::MessageResponse;
use crate::store::chat_store::ChatStore;
use crate::store::message_store::MessageStore;
use crate::store::user_store::UserStore;

/// 发送消息入参；media_url 为已上传的媒体引用，gif_url 为外部 GIF 引用
#[derive(Debug, Clone, Default)]
pub struct SendMessageCommand {
    pub chat_id: String,
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub gif_url: Option<String>,
    pub reply_to_message_id: Option<String>,
}

/// 消息生命周期：发送 / 编辑 / 墓碑删除
///
/// 每次变更同步维护会话末条消息快照；编辑与删除用 check-and-set 形式
/// 刷新快照，确保不会覆盖并发新消息写入的快照。
pub struct MessageService {
    messages: Arc<dyn MessageStore>,
    chats: Arc<dyn ChatStore>,
    users: Arc<dyn UserStore>,
    notify: Arc<NotifyService>,
}

impl std::fmt::Debug for MessageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageService").finish_non_exhaustive()
    }
}

impl MessageService {
    pub fn new(
        messages: Arc<dyn MessageStore>,
        chats: Arc<dyn ChatStore>,
        users: Arc<dyn UserStore>,
        notify: Arc<NotifyService>,
    ) -> Arc<Self> {
        Arc::new(Self { messages, chats, users, notify })
    }

    pub fn init(
        messages: Arc<dyn MessageStore>,
        chats: Arc<dyn ChatStore>,
        users: Arc<dyn UserStore>,
        notify: Arc<NotifyService>,
    ) {
        let instance = Self::new(messages, chats, users, notify);
        INSTANCE.set(instance).expect("MessageService already initialized");
    }

    /// 获取单例
    pub fn get() -> Arc<Self> {
        INSTANCE.get().expect("MessageService is not initialized").clone()
    }

    /// 发送消息：参与者校验 → 回复快照捕获 → 写消息 → 刷新会话快照 → 扇出
    pub async fn send_message(&self, current_user_id: &str, command: SendMessageCommand) -> Result<MessageResponse, AppError> {
        let chat = self.find_chat(&command.chat_id).await?;
        if chat.is_deleted {
            return Err(AppError::invalid("Cannot send messages to a deleted chat"));
        }
        if !chat.is_participant(current_user_id) {
            return Err(AppError::no_permission("You are not a participant of this chat"));
        }

        let content = command.content.as_ref().map(|c| c.trim()).filter(|c| !c.is_empty()).map(|c| c.to_string());
        let message_type = derive_message_type(&content, &command.media_url, &command.gif_url)?;
        let media_url = command.media_url.clone().or(command.gif_url.clone());

        let mut message = MessageEntity {
            id: ObjectId::new().to_hex(),
            chat_id: command.chat_id.clone(),
            sender_id: Some(current_user_id.to_string()),
            content,
            message_type,
            media_url,
            created_at: now_millis(),
            updated_at: now_millis(),
            ..Default::default()
        };

        if let Some(reply_to_id) = &command.reply_to_message_id {
            let replied = match self.messages.find_by_id(reply_to_id).await? {
                Some(replied) => replied,
                None => return Err(AppError::not_found("Replied message not found")),
            };
            if replied.chat_id != command.chat_id {
                return Err(AppError::invalid("Replied message is not from this chat"));
            }
            // 写入时捕获被回复消息的内容与状态快照
            message.reply_to_message_id = Some(replied.id.clone());
            message.reply_to_message_content = replied.content.clone();
            message.reply_to_message_sender_id = replied.sender_id.clone();
            message.reply_to_message_sender_name = match &replied.sender_id {
                Some(sender_id) => self.users.find_by_id(sender_id).await?.map(|u| u.full_name),
                None => None,
            };
            message.reply_to_message_type = Some(replied.message_type);
            message.reply_to_message_media_url = replied.media_url.clone();
            message.is_reply_edited = replied.is_edited;
            message.is_reply_deleted = replied.is_deleted;
        }

        self.messages.insert(&message).await?;

        let sender_name = self.users.find_by_id(current_user_id).await?.map(|u| u.full_name);
        let snapshot = LastMessageSnapshot::from_message(&message, sender_name.clone());
        self.chats.update_last_message(&chat.id, &snapshot).await?;

        let response = MessageResponse::from_message(&message).with_sender_name(sender_name);
        self.notify.fanout_chat(ChatEvent::NewMessage, &chat, current_user_id, &response);
        Ok(response)
    }

    /// 编辑消息：仅 TEXT、仅发送者本人、未删除。若该消息仍是会话末条，
    /// 条件刷新快照内容；指向它的回复快照不在此处变动。
    pub async fn edit_message(&self, current_user_id: &str, message_id: &str, new_content: &str) -> Result<MessageResponse, AppError> {
        let mut message = self.find_message(message_id).await?;
        let chat = self.find_chat(&message.chat_id).await?;

        if !chat.is_participant(current_user_id) {
            return Err(AppError::no_permission("You are not a participant of this chat"));
        }
        if message.message_type != MessageType::Text {
            return Err(AppError::invalid("Only text messages can be updated"));
        }
        if message.sender_id.as_deref() != Some(current_user_id) {
            return Err(AppError::no_permission("You can only update your own messages"));
        }
        if message.is_deleted {
            return Err(AppError::invalid("Cannot update a deleted message"));
        }
        let new_content = new_content.trim();
        if new_content.is_empty() {
            return Err(AppError::invalid("Message content cannot be empty"));
        }

        self.messages.update_content(&message.id, new_content).await?;
        let now = now_millis();
        message.content = Some(new_content.to_string());
        message.is_edited = true;
        message.updated_at = now;

        self.chats
            .refresh_last_message_if_current(&chat.id, &message.id, message.content.clone(), now)
            .await?;

        let sender_name = self.users.find_by_id(current_user_id).await?.map(|u| u.full_name);
        let response = MessageResponse::from_message(&message).with_sender_name(sender_name);
        self.notify.fanout_chat(ChatEvent::MessageEdited, &chat, current_user_id, &response);
        Ok(response)
    }

    /// 删除消息：墓碑化，回写所有引用它的回复快照；若它是会话末条，
    /// 置墓碑标记并刷新时间，过期内容字段保留（读取方必须先看标记）。
    pub async fn delete_message(&self, current_user_id: &str, message_id: &str) -> Result<(), AppError> {
        let mut message = self.find_message(message_id).await?;
        if message.sender_id.as_deref() != Some(current_user_id) {
            return Err(AppError::no_permission("You can only delete your own messages"));
        }
        if message.is_deleted {
            return Err(AppError::invalid("Message is already deleted"));
        }

        self.messages.soft_delete(&message.id).await?;
        self.messages.mark_replies_deleted(&message.id).await?;

        let now = now_millis();
        message.is_deleted = true;
        message.updated_at = now;

        let chat = self.find_chat(&message.chat_id).await?;
        self.chats.tombstone_last_message_if_current(&chat.id, &message.id, now).await?;

        let response = MessageResponse::from_message(&message);
        self.notify.fanout_chat(ChatEvent::MessageDeleted, &chat, current_user_id, &response);
        Ok(())
    }

    async fn find_chat(&self, chat_id: &str) -> Result<ChatEntity, AppError> {
        match self.chats.find_by_id(chat_id).await? {
            Some(chat) => Ok(chat),
            None => Err(AppError::not_found("Chat not found")),
        }
    }

    async fn find_message(&self, message_id: &str) -> Result<MessageEntity, AppError> {
        match self.messages.find_by_id(message_id).await? {
            Some(message) => Ok(message),
            None => Err(AppError::not_found("Message not found")),
        }
    }
}

/// 由内容/媒体/GIF 组合推导消息类型
fn derive_message_type(
    content: &Option<String>,
    media_url: &Option<String>,
    gif_url: &Option<String>,
) -> Result<MessageType, AppError> {
    if media_url.is_some() {
        if content.is_some() {
            Ok(MessageType::TextWithMedia)
        } else {
            Ok(MessageType::Media)
        }
    } else if gif_url.is_some() {
        Ok(MessageType::Gif)
    } else if content.is_some() {
        Ok(MessageType::Text)
    } else {
        Err(AppError::invalid("Message must have content or media"))
    }
}

static INSTANCE: OnceCell<Arc<MessageService>> = OnceCell::new();
