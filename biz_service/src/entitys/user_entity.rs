use serde::{Deserialize, Serialize};

/// 用户实体（users 集合），由身份子系统维护，这里只读
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UserEntity {
    #[serde(rename = "_id")]
    pub id: String,
    pub full_name: String,
    pub profile_image_url: Option<String>,
    pub bio: Option<String>,
    pub is_verified: bool,
    pub role: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// 扁平化的用户资料投影，缓存与列表响应使用
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserProfile {
    pub id: String,
    pub full_name: String,
    pub profile_image_url: Option<String>,
}

impl From<&UserEntity> for UserProfile {
    fn from(user: &UserEntity) -> Self {
        Self {
            id: user.id.clone(),
            full_name: user.full_name.clone(),
            profile_image_url: user.profile_image_url.clone(),
        }
    }
}
