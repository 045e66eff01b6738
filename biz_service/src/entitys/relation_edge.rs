use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// 关系边类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationKind {
    Friend,
    PendingRequest,
    Blocked,
}

/// 关系边（relation_edges 集合），每个无序用户对至多一条记录
///
/// pair_key 上有唯一索引：任意一对用户之间 FRIEND / PENDING_REQUEST / BLOCKED
/// 至多存在一种，所有状态迁移都是对该文档的单文档条件写，天然原子。
/// FRIEND 为对称关系，from/to 仅对 PENDING_REQUEST 与 BLOCKED 有方向语义。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationEdge {
    #[serde(rename = "_id")]
    pub id: String,
    pub pair_key: String,
    pub kind: RelationKind,
    pub from: String,
    pub to: String,
    pub created_at: i64,
}

/// 无序对键："<较小 id>:<较大 id>"
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b { format!("{}:{}", a, b) } else { format!("{}:{}", b, a) }
}

/// 从某个用户视角看到的关系状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipStatus {
    Friend,
    FriendRequestSent,
    FriendRequestReceived,
    Blocked,
    #[default]
    None,
}

impl RelationEdge {
    /// 以 user_id 为当前用户解释这条边
    pub fn status_for(&self, user_id: &str) -> RelationshipStatus {
        match self.kind {
            RelationKind::Friend => RelationshipStatus::Friend,
            RelationKind::PendingRequest => {
                if self.from == user_id {
                    RelationshipStatus::FriendRequestSent
                } else {
                    RelationshipStatus::FriendRequestReceived
                }
            }
            RelationKind::Blocked => RelationshipStatus::Blocked,
        }
    }

    /// 返回相对 user_id 的另一端
    pub fn other_end(&self, user_id: &str) -> &str {
        if self.from == user_id { &self.to } else { &self.from }
    }
}
