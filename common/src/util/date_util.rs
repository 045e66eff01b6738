use chrono::DateTime;

/// 当前 Unix 秒时间戳
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// 当前 Unix 毫秒时间戳（消息/已读游标使用毫秒精度）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn time_to_str(time: i64) -> String {
    let t = DateTime::from_timestamp(time, 0).expect("非法的时间戳");
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}
