use uuid::Uuid;

/// 生成不带连字符的随机 ID（事件 ID 等非持久化标识）
pub fn build_id() -> String {
    let uuid = Uuid::new_v4().simple();
    format!("{}", uuid)
}
