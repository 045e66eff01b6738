use serde::{Deserialize, Serialize};

/// 入群来源记录（chat_joins 集合）：谁把谁拉进了会话
///
/// 非管理员只能移除自己拉进来的普通成员，授权判定依赖这条记录。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChatJoinEntity {
    #[serde(rename = "_id")]
    pub id: String,
    pub chat_id: String,
    pub added_user_id: String,
    pub added_by: String,
    pub created_at: i64,
}
