use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use once_cell::sync::OnceCell;

use common::errors::AppError;
use common::repository_util::{PageResponse, to_skip, validate_page};
use common::util::date_util::now_millis;

use crate::biz_const::*;
use crate::biz_service::notify_service::{ChatEvent, NotifyService};
use crate::entitys::chat_entity::{ChatEntity, LastMessageSnapshot};
use crate::entitys::chat_join_entity::ChatJoinEntity;
use crate::entitys::message_entity::{MessageEntity, MessageType, SystemMessage, SystemMessageAction};
use crate::entitys::model::{ChatParticipantInfo, ChatResponse, MessageReadInfoResponse, MessageResponse};
use crate::entitys::user_entity::UserEntity;
use crate::store::chat_store::ChatStore;
use crate::store::join_store::JoinStore;
use crate::store::message_store::MessageStore;
use crate::store::read_store::ReadStore;
use crate::store::user_store::UserStore;

/// 会话状态管理
///
/// 会话文档上的 last_message_* 快照是刻意的物化视图，这里是它唯一的
/// 写入口；成员/管理员变更同样只经由本服务。每次变更都落一条 SYSTEM
/// 消息并重新反范式化，提交后再异步扇出通知。
pub struct ChatService {
    chats: Arc<dyn ChatStore>,
    messages: Arc<dyn MessageStore>,
    reads: Arc<dyn ReadStore>,
    joins: Arc<dyn JoinStore>,
    users: Arc<dyn UserStore>,
    notify: Arc<NotifyService>,
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService").finish_non_exhaustive()
    }
}

impl ChatService {
    pub fn new(
        chats: Arc<dyn ChatStore>,
        messages: Arc<dyn MessageStore>,
        reads: Arc<dyn ReadStore>,
        joins: Arc<dyn JoinStore>,
        users: Arc<dyn UserStore>,
        notify: Arc<NotifyService>,
    ) -> Arc<Self> {
        Arc::new(Self { chats, messages, reads, joins, users, notify })
    }

    pub fn init(
        chats: Arc<dyn ChatStore>,
        messages: Arc<dyn MessageStore>,
        reads: Arc<dyn ReadStore>,
        joins: Arc<dyn JoinStore>,
        users: Arc<dyn UserStore>,
        notify: Arc<NotifyService>,
    ) {
        let instance = Self::new(chats, messages, reads, joins, users, notify);
        INSTANCE.set(instance).expect("ChatService already initialized");
    }

    /// 获取单例
    pub fn get() -> Arc<Self> {
        INSTANCE.get().expect("ChatService is not initialized").clone()
    }

    /// 创建私聊：同一无序用户对已存在未删除私聊时幂等返回
    pub async fn create_private_chat(&self, current_user_id: &str, participant_ids: Vec<String>) -> Result<ChatResponse, AppError> {
        if participant_ids.len() != PRIVATE_CHAT_PARTICIPANTS {
            return Err(AppError::invalid(format!(
                "A private chat must have exactly {} participants",
                PRIVATE_CHAT_PARTICIPANTS
            )));
        }
        if participant_ids[0] == participant_ids[1] {
            return Err(AppError::conflict("Participants list contains duplicates"));
        }
        if !participant_ids.iter().any(|p| p == current_user_id) {
            return Err(AppError::invalid("You must be a participant of the chat"));
        }

        if let Some(existing) = self.chats.find_private_chat(&participant_ids[0], &participant_ids[1]).await? {
            return self.to_chat_response(current_user_id, &existing).await;
        }

        let actor = self.require_user(current_user_id).await?;
        let now = now_millis();
        let mut chat = ChatEntity {
            id: ObjectId::new().to_hex(),
            is_group_chat: false,
            participants: participant_ids.clone(),
            created_by: Some(current_user_id.to_string()),
            created_at: now,
            updated_at: now,
            ..Default::default()
        };
        self.chats.insert(&chat).await?;

        let system_message = SystemMessage {
            actor_id: current_user_id.to_string(),
            action: SystemMessageAction::CreatePrivateChat,
            metadata: HashMap::from([("newPrivateChat".to_string(), "Private chat initialized".to_string())]),
        };
        self.append_system_message(&mut chat, &actor, system_message.to_json()).await?;

        self.save_chat_join_info(&chat, current_user_id, &participant_ids).await?;

        let response = self.to_chat_response(current_user_id, &chat).await?;
        self.notify.fanout_chat(ChatEvent::NewChat, &chat, current_user_id, &response);
        Ok(response)
    }

    /// 创建群聊：创建者隐式入群，3..=100 去重参与者，管理员非空且为参与者子集
    pub async fn create_group_chat(
        &self,
        current_user_id: &str,
        name: String,
        mut participant_ids: Vec<String>,
        admin_ids: Vec<String>,
        chat_image_url: Option<String>,
    ) -> Result<ChatResponse, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::invalid("A group chat must have a name"));
        }
        if !participant_ids.iter().any(|p| p == current_user_id) {
            participant_ids.push(current_user_id.to_string());
        }
        let unique: HashSet<&String> = participant_ids.iter().collect();
        if unique.len() != participant_ids.len() {
            return Err(AppError::conflict("Participants list contains duplicates"));
        }
        if participant_ids.len() < MIN_GROUP_CHAT_PARTICIPANTS {
            return Err(AppError::invalid(format!(
                "A group chat must have at least {} participants",
                MIN_GROUP_CHAT_PARTICIPANTS
            )));
        }
        if participant_ids.len() > MAX_GROUP_CHAT_PARTICIPANTS {
            return Err(AppError::invalid(format!(
                "A chat cannot have more than {} participants",
                MAX_GROUP_CHAT_PARTICIPANTS
            )));
        }
        if admin_ids.len() < MIN_GROUP_CHAT_ADMINS {
            return Err(AppError::invalid(format!(
                "A group chat must have at least {} admin",
                MIN_GROUP_CHAT_ADMINS
            )));
        }
        let unique_admins: HashSet<&String> = admin_ids.iter().collect();
        if unique_admins.len() != admin_ids.len() {
            return Err(AppError::conflict("Admins list contains duplicates"));
        }
        if admin_ids.iter().any(|a| !participant_ids.contains(a)) {
            return Err(AppError::invalid("Admins must be participants of the chat"));
        }

        let actor = self.require_user(current_user_id).await?;
        let now = now_millis();
        let mut chat = ChatEntity {
            id: ObjectId::new().to_hex(),
            name: Some(name.clone()),
            chat_image_url,
            is_group_chat: true,
            participants: participant_ids.clone(),
            admins: admin_ids,
            created_by: Some(current_user_id.to_string()),
            created_at: now,
            updated_at: now,
            ..Default::default()
        };
        self.chats.insert(&chat).await?;

        let system_message = SystemMessage {
            actor_id: current_user_id.to_string(),
            action: SystemMessageAction::CreateGroupChat,
            metadata: HashMap::from([("newGroupChat".to_string(), name)]),
        };
        self.append_system_message(&mut chat, &actor, system_message.to_json()).await?;

        self.save_chat_join_info(&chat, current_user_id, &participant_ids).await?;

        let response = self.to_chat_response(current_user_id, &chat).await?;
        self.notify.fanout_chat(ChatEvent::NewChat, &chat, current_user_id, &response);
        Ok(response)
    }

    /// 修改群名/群头像，每个变化落一条 SYSTEM 消息并刷新快照
    pub async fn update_chat(
        &self,
        current_user_id: &str,
        chat_id: &str,
        new_name: Option<String>,
        new_image_url: Option<String>,
    ) -> Result<ChatResponse, AppError> {
        let mut chat = self.find_active_chat(chat_id).await?;
        if !chat.is_group_chat {
            return Err(AppError::invalid("You cannot update a private chat directly"));
        }
        if !chat.is_participant(current_user_id) {
            return Err(AppError::no_permission("You do not have permission to update this chat"));
        }
        let actor = self.require_user(current_user_id).await?;

        let name_change = match new_name {
            Some(name) if !name.trim().is_empty() && Some(&name) != chat.name.as_ref() => Some(name),
            _ => None,
        };

        if let Some(name) = &name_change {
            self.chats.update_profile(chat_id, Some(name.clone()), None).await?;
            chat.name = Some(name.clone());
            let system_message = SystemMessage {
                actor_id: current_user_id.to_string(),
                action: SystemMessageAction::UpdateGroupChatName,
                metadata: HashMap::from([("newGroupChatName".to_string(), name.clone())]),
            };
            let message = self.append_system_message(&mut chat, &actor, system_message.to_json()).await?;
            self.notify.broadcast(ChatEvent::NewMessage, chat_id, &MessageResponse::from_message(&message));
        }

        if let Some(image_url) = new_image_url {
            self.chats.update_profile(chat_id, None, Some(image_url.clone())).await?;
            chat.chat_image_url = Some(image_url);
            let system_message = SystemMessage {
                actor_id: current_user_id.to_string(),
                action: SystemMessageAction::UpdateGroupChatImage,
                metadata: HashMap::from([("newGroupChatImage".to_string(), "Chat image updated".to_string())]),
            };
            let message = self.append_system_message(&mut chat, &actor, system_message.to_json()).await?;
            self.notify.broadcast(ChatEvent::NewMessage, chat_id, &MessageResponse::from_message(&message));
        }

        let response = self.to_chat_response(current_user_id, &chat).await?;
        self.notify.fanout_chat(ChatEvent::ChatUpdated, &chat, current_user_id, &response);
        Ok(response)
    }

    /// 软删除会话并级联软删除成员消息；记录永不硬删
    pub async fn delete_chat(&self, current_user_id: &str, chat_id: &str) -> Result<(), AppError> {
        let chat = self.find_active_chat(chat_id).await?;

        if chat.is_group_chat {
            if !chat.is_admin(current_user_id) {
                return Err(AppError::no_permission("You are not an admin of this group chat"));
            }
        } else if !chat.is_participant(current_user_id) {
            return Err(AppError::no_permission("You do not have permission to delete this private chat"));
        }

        self.chats.soft_delete(chat_id, current_user_id).await?;
        self.messages.soft_delete_by_chat(chat_id).await?;

        let mut deleted = chat.clone();
        deleted.is_deleted = true;
        deleted.deleted_by = Some(current_user_id.to_string());
        let response = ChatResponse::from_chat(&deleted);
        self.notify.fanout_chat(ChatEvent::ChatUpdated, &deleted, current_user_id, &response);
        Ok(())
    }

    /// 拉人入群，记录入群来源
    pub async fn add_participants(&self, current_user_id: &str, chat_id: &str, user_ids: Vec<String>) -> Result<(), AppError> {
        let mut chat = self.find_active_chat(chat_id).await?;
        if !chat.is_group_chat {
            return Err(AppError::invalid("You cannot add participants to a private chat"));
        }
        if !chat.is_participant(current_user_id) {
            return Err(AppError::no_permission("You do not have permission to add participants to this group chat"));
        }
        let actor = self.require_user(current_user_id).await?;

        let mut new_participants: Vec<String> = vec![];
        for user_id in user_ids {
            if !chat.is_participant(&user_id) && !new_participants.contains(&user_id) {
                new_participants.push(user_id);
            }
        }
        if new_participants.is_empty() {
            return Err(AppError::conflict("All specified users are already participants in the chat"));
        }
        if chat.participants.len() + new_participants.len() > MAX_GROUP_CHAT_PARTICIPANTS {
            return Err(AppError::invalid(format!(
                "Cannot add participants: Group chat cannot exceed {} participants",
                MAX_GROUP_CHAT_PARTICIPANTS
            )));
        }

        let users = self.users.find_by_ids(&new_participants).await?;
        if users.len() != new_participants.len() {
            return Err(AppError::not_found("User not found"));
        }

        self.chats.add_participants(chat_id, &new_participants).await?;
        chat.participants.extend(new_participants.iter().cloned());

        let names = users.iter().map(|u| u.full_name.as_str()).filter(|n| !n.trim().is_empty()).collect::<Vec<_>>().join(", ");
        let content = format!("{} added {} new participants: {}", actor.full_name, new_participants.len(), names);
        let message = self.append_system_message(&mut chat, &actor, content).await?;

        self.save_chat_join_info(&chat, current_user_id, &new_participants).await?;

        self.notify.broadcast(ChatEvent::NewMessage, chat_id, &MessageResponse::from_message(&message));
        let response = self.to_chat_response(current_user_id, &chat).await?;
        self.notify.fanout_chat(ChatEvent::ChatUpdated, &chat, current_user_id, &response);
        Ok(())
    }

    /// 移出成员。管理员可移除任何人；普通成员只能移除自己拉进来的
    /// 非管理员成员（依据入群来源记录）。
    pub async fn remove_participant(&self, current_user_id: &str, chat_id: &str, target_user_id: &str) -> Result<(), AppError> {
        let mut chat = self.find_active_chat(chat_id).await?;
        if !chat.is_group_chat {
            return Err(AppError::invalid("You cannot remove participants from a private chat"));
        }
        if !chat.is_participant(current_user_id) {
            return Err(AppError::no_permission("You do not have permission to remove participants from this group chat"));
        }
        let actor = self.require_user(current_user_id).await?;
        let target = self.require_user(target_user_id).await?;
        if !chat.is_participant(target_user_id) {
            return Err(AppError::invalid(format!("User {} is not a participant of this chat", target.full_name)));
        }

        let target_is_admin = chat.is_admin(target_user_id);
        let is_admin = chat.is_admin(current_user_id);
        let is_adder = match self.joins.find(chat_id, target_user_id).await? {
            Some(info) => info.added_by == current_user_id,
            None => false,
        };
        let can_remove = is_admin || (is_adder && !target_is_admin);
        if !can_remove {
            return Err(AppError::no_permission(format!("You do not have permission to remove user: {}", target.full_name)));
        }
        if target_is_admin && chat.admins.len() == MIN_GROUP_CHAT_ADMINS {
            return Err(AppError::invalid(format!(
                "Cannot remove participant: Group chat must have at least {} admin",
                MIN_GROUP_CHAT_ADMINS
            )));
        }

        self.chats.remove_participant(chat_id, target_user_id).await?;
        chat.participants.retain(|p| p != target_user_id);
        chat.admins.retain(|a| a != target_user_id);

        let content = format!("{} removed {}", actor.full_name, target.full_name);
        let message = self.append_system_message(&mut chat, &actor, content).await?;

        self.joins.delete(chat_id, target_user_id).await?;

        self.notify.broadcast(ChatEvent::NewMessage, chat_id, &MessageResponse::from_message(&message));
        let response = self.to_chat_response(current_user_id, &chat).await?;
        self.notify.fanout_chat(ChatEvent::ChatUpdated, &chat, current_user_id, &response);
        Ok(())
    }

    /// 提升为管理员（仅管理员可操作）
    pub async fn promote_admin(&self, current_user_id: &str, chat_id: &str, target_user_id: &str) -> Result<(), AppError> {
        let mut chat = self.find_active_chat(chat_id).await?;
        if !chat.is_group_chat {
            return Err(AppError::invalid("You cannot promote participants to admin in a private chat"));
        }
        if !chat.is_admin(current_user_id) {
            return Err(AppError::no_permission("You do not have permission to promote participants to admin in this group chat"));
        }
        let actor = self.require_user(current_user_id).await?;
        let target = self.require_user(target_user_id).await?;
        if !chat.is_participant(target_user_id) {
            return Err(AppError::invalid(format!("User {} is not a participant of this chat", target.full_name)));
        }
        if chat.is_admin(target_user_id) {
            return Err(AppError::conflict(format!("User {} is already an admin", target.full_name)));
        }

        self.chats.add_admin(chat_id, target_user_id).await?;
        chat.admins.push(target_user_id.to_string());

        let content = format!("{} promoted {} to admin", actor.full_name, target.full_name);
        let message = self.append_system_message(&mut chat, &actor, content).await?;

        self.notify.broadcast(ChatEvent::NewMessage, chat_id, &MessageResponse::from_message(&message));
        let response = self.to_chat_response(current_user_id, &chat).await?;
        self.notify.fanout_chat(ChatEvent::ChatUpdated, &chat, current_user_id, &response);
        Ok(())
    }

    /// 降级为普通成员；群聊必须保留至少一名管理员
    pub async fn demote_admin(&self, current_user_id: &str, chat_id: &str, target_user_id: &str) -> Result<(), AppError> {
        let mut chat = self.find_active_chat(chat_id).await?;
        if !chat.is_group_chat {
            return Err(AppError::invalid("You cannot demote admins to participants in a private chat"));
        }
        if !chat.is_admin(current_user_id) {
            return Err(AppError::no_permission("You do not have permission to demote admins to participants in this group chat"));
        }
        let actor = self.require_user(current_user_id).await?;
        let target = self.require_user(target_user_id).await?;
        if !chat.is_participant(target_user_id) {
            return Err(AppError::invalid(format!("User {} is not a participant of this chat", target.full_name)));
        }
        if !chat.is_admin(target_user_id) {
            return Err(AppError::conflict(format!("User {} is not an admin", target.full_name)));
        }
        if chat.admins.len() == MIN_GROUP_CHAT_ADMINS {
            return Err(AppError::invalid(format!(
                "Cannot demote admin: Group chat must have at least {} admin",
                MIN_GROUP_CHAT_ADMINS
            )));
        }

        self.chats.remove_admin(chat_id, target_user_id).await?;
        chat.admins.retain(|a| a != target_user_id);

        let content = format!("{} demoted {} to participant", actor.full_name, target.full_name);
        let message = self.append_system_message(&mut chat, &actor, content).await?;

        self.notify.broadcast(ChatEvent::NewMessage, chat_id, &MessageResponse::from_message(&message));
        let response = self.to_chat_response(current_user_id, &chat).await?;
        self.notify.fanout_chat(ChatEvent::ChatUpdated, &chat, current_user_id, &response);
        Ok(())
    }

    pub async fn get_chat(&self, current_user_id: &str, chat_id: &str) -> Result<ChatResponse, AppError> {
        let chat = self.find_chat(chat_id).await?;
        self.to_chat_response(current_user_id, &chat).await
    }

    /// 概要视图：私聊显示对端昵称/头像，带派生未读数
    pub async fn get_chat_overview(&self, current_user_id: &str, chat_id: &str) -> Result<ChatResponse, AppError> {
        let chat = self.find_chat(chat_id).await?;
        self.to_overview_response(current_user_id, &chat).await
    }

    /// 我的会话列表，按活跃时间倒序，支持 before 游标翻页
    pub async fn get_my_chats(
        &self,
        current_user_id: &str,
        page_number: u64,
        page_size: u64,
        before_chat_id: Option<&str>,
    ) -> Result<PageResponse<ChatResponse>, AppError> {
        validate_page(page_number, page_size)?;
        let before_updated_at = match before_chat_id {
            Some(chat_id) => Some(self.find_chat(chat_id).await?.updated_at),
            None => None,
        };
        let skip = to_skip(page_number, page_size);
        let (chats, total) = self.chats.find_for_user(current_user_id, before_updated_at, skip, page_size as i64).await?;

        let mut content = Vec::with_capacity(chats.len());
        for chat in &chats {
            content.push(self.to_overview_response(current_user_id, chat).await?);
        }
        Ok(PageResponse::new(page_number, page_size, total, content))
    }

    /// 搜索我的会话：群名 / 末条消息内容 / 私聊对端昵称
    pub async fn search_my_chats(
        &self,
        current_user_id: &str,
        query: &str,
        page_number: u64,
        page_size: u64,
    ) -> Result<PageResponse<ChatResponse>, AppError> {
        validate_page(page_number, page_size)?;
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::invalid("Search query cannot be empty"));
        }
        let skip = to_skip(page_number, page_size);
        let (chats, total) = self.chats.search_for_user(current_user_id, query, skip, page_size as i64).await?;

        let mut content = Vec::with_capacity(chats.len());
        for chat in &chats {
            content.push(self.to_overview_response(current_user_id, chat).await?);
        }
        Ok(PageResponse::new(page_number, page_size, total, content))
    }

    /// 会话消息分页，页内按时间正序返回
    pub async fn get_chat_messages(
        &self,
        current_user_id: &str,
        chat_id: &str,
        page_number: u64,
        page_size: u64,
        before_message_id: Option<&str>,
    ) -> Result<PageResponse<MessageResponse>, AppError> {
        let chat = self.find_chat(chat_id).await?;
        if !chat.is_participant(current_user_id) {
            return Err(AppError::no_permission("You do not have permission to view messages in this chat"));
        }
        validate_page(page_number, page_size)?;

        let before_created_at = match before_message_id {
            Some(message_id) => match self.messages.find_by_id(message_id).await? {
                Some(reference) => Some(reference.created_at),
                None => return Err(AppError::not_found("Reference message not found")),
            },
            None => None,
        };

        let skip = to_skip(page_number, page_size);
        let (mut items, total) = self.messages.find_by_chat(chat_id, before_created_at, skip, page_size as i64).await?;
        items.reverse();

        let sender_ids: Vec<String> = items.iter().filter_map(|m| m.sender_id.clone()).collect();
        let senders: HashMap<String, String> =
            self.users.find_by_ids(&sender_ids).await?.into_iter().map(|u| (u.id, u.full_name)).collect();

        let content: Vec<MessageResponse> = items
            .iter()
            .map(|m| {
                let sender_name = m.sender_id.as_ref().and_then(|id| senders.get(id).cloned());
                MessageResponse::from_message(m).with_sender_name(sender_name)
            })
            .collect();
        Ok(PageResponse::new(page_number, page_size, total, content))
    }

    /// 推进已读游标到会话当前末条消息；游标已指向该消息时幂等返回
    pub async fn mark_read(&self, current_user_id: &str, chat_id: &str) -> Result<(), AppError> {
        let chat = self.find_chat(chat_id).await?;
        if !chat.is_participant(current_user_id) {
            return Err(AppError::no_permission("You are not a participant of this chat"));
        }
        let last_message_id = match &chat.last_message_id {
            Some(id) => id.clone(),
            None => return Ok(()),
        };

        if let Some(cursor) = self.reads.find(chat_id, current_user_id).await? {
            if cursor.message_id == last_message_id {
                return Ok(());
            }
        }

        let read_at = now_millis();
        self.reads.upsert(chat_id, current_user_id, &last_message_id, read_at).await?;

        let receipt = MessageReadInfoResponse {
            chat_id: chat_id.to_string(),
            user_id: current_user_id.to_string(),
            message_id: last_message_id,
            read_at,
        };
        self.notify.broadcast(ChatEvent::ChatRead, chat_id, &receipt);
        Ok(())
    }

    /// 未读数推导：无游标时统计他人全部消息，有游标时统计游标时间之后
    /// 他人发的消息。基于时间戳的近似值（时钟偏差/同毫秒竞争可能差一），
    /// 仅供展示，不作为投递保证。
    pub async fn unread_count(&self, chat_id: &str, user_id: &str) -> Result<u64, AppError> {
        match self.reads.find(chat_id, user_id).await? {
            Some(cursor) => self.messages.count_after_excluding_sender(chat_id, cursor.read_at, user_id).await,
            None => self.messages.count_excluding_sender(chat_id, user_id).await,
        }
    }

    // ==== 内部工具 ====

    async fn find_chat(&self, chat_id: &str) -> Result<ChatEntity, AppError> {
        match self.chats.find_by_id(chat_id).await? {
            Some(chat) => Ok(chat),
            None => Err(AppError::not_found("Chat not found")),
        }
    }

    async fn find_active_chat(&self, chat_id: &str) -> Result<ChatEntity, AppError> {
        let chat = self.find_chat(chat_id).await?;
        if chat.is_deleted {
            return Err(AppError::not_found("Chat not found"));
        }
        Ok(chat)
    }

    async fn require_user(&self, user_id: &str) -> Result<UserEntity, AppError> {
        match self.users.find_by_id(user_id).await? {
            Some(user) => Ok(user),
            None => Err(AppError::not_found("User not found")),
        }
    }

    /// 落一条 SYSTEM 消息并把它反范式化为末条消息快照。
    /// SYSTEM 消息本身无发送者，快照上的发送者记操作者。
    async fn append_system_message(
        &self,
        chat: &mut ChatEntity,
        actor: &UserEntity,
        content: String,
    ) -> Result<MessageEntity, AppError> {
        let now = now_millis();
        let message = MessageEntity {
            id: ObjectId::new().to_hex(),
            chat_id: chat.id.clone(),
            message_type: MessageType::System,
            content: Some(content),
            created_at: now,
            updated_at: now,
            ..Default::default()
        };
        self.messages.insert(&message).await?;

        let mut snapshot = LastMessageSnapshot::from_message(&message, Some(actor.full_name.clone()));
        snapshot.sender_id = Some(actor.id.clone());
        self.chats.update_last_message(&chat.id, &snapshot).await?;
        apply_snapshot(chat, &snapshot);
        Ok(message)
    }

    async fn save_chat_join_info(&self, chat: &ChatEntity, added_by: &str, participant_ids: &[String]) -> Result<(), AppError> {
        let now = now_millis();
        let rows: Vec<ChatJoinEntity> = participant_ids
            .iter()
            .filter(|p| p.as_str() != added_by)
            .map(|p| ChatJoinEntity {
                id: ObjectId::new().to_hex(),
                chat_id: chat.id.clone(),
                added_user_id: p.clone(),
                added_by: added_by.to_string(),
                created_at: now,
            })
            .collect();
        self.joins.insert_many(&rows).await
    }

    /// 完整视图：私聊取对端昵称/头像并附双方资料，群聊附全部参与者资料
    async fn to_chat_response(&self, current_user_id: &str, chat: &ChatEntity) -> Result<ChatResponse, AppError> {
        let mut response = ChatResponse::from_chat(chat);
        if chat.is_group_chat {
            let users = self.users.find_by_ids(&chat.participants).await?;
            response.participants_info = users.iter().map(participant_info).collect();
        } else if let Some(other_id) = chat.participants.iter().find(|p| p.as_str() != current_user_id) {
            let other = match self.users.find_by_id(other_id).await? {
                Some(user) => user,
                None => return Err(AppError::not_found(format!("User not found: {}", other_id))),
            };
            response.name = Some(other.full_name.clone());
            response.chat_image_url = other.profile_image_url.clone();
            let mut info = vec![];
            if let Some(current) = self.users.find_by_id(current_user_id).await? {
                info.push(participant_info(&current));
            }
            info.push(participant_info(&other));
            response.participants_info = info;
        }
        Ok(response)
    }

    /// 概要视图：不带参与者明细，带未读数
    async fn to_overview_response(&self, current_user_id: &str, chat: &ChatEntity) -> Result<ChatResponse, AppError> {
        let mut response = ChatResponse::from_chat(chat);
        if !chat.is_group_chat {
            if let Some(other_id) = chat.participants.iter().find(|p| p.as_str() != current_user_id) {
                let other = match self.users.find_by_id(other_id).await? {
                    Some(user) => user,
                    None => return Err(AppError::not_found(format!("User not found: {}", other_id))),
                };
                response.name = Some(other.full_name.clone());
                response.chat_image_url = other.profile_image_url.clone();
            }
        }
        response.unread_message_count = Some(self.unread_count(&chat.id, current_user_id).await?);
        Ok(response)
    }
}

fn participant_info(user: &UserEntity) -> ChatParticipantInfo {
    ChatParticipantInfo {
        id: user.id.clone(),
        full_name: user.full_name.clone(),
        profile_image_url: user.profile_image_url.clone(),
    }
}

/// 把快照同步回内存中的会话实体，与存储写保持一致
pub(crate) fn apply_snapshot(chat: &mut ChatEntity, snapshot: &LastMessageSnapshot) {
    chat.last_message_id = Some(snapshot.id.clone());
    chat.last_message_content = snapshot.content.clone();
    chat.last_message_sender_id = snapshot.sender_id.clone();
    chat.last_message_sender_name = snapshot.sender_name.clone();
    chat.last_message_type = Some(snapshot.message_type);
    chat.last_message_media_url = snapshot.media_url.clone();
    chat.last_message_time = Some(snapshot.time);
    chat.is_last_message_deleted = false;
    chat.updated_at = snapshot.time;
}

static INSTANCE: OnceCell<Arc<ChatService>> = OnceCell::new();
