/// 缓存键前缀
pub const PROFILE_KEY_PREFIX: &str = "profile:";
pub const FRIENDS_CACHE_PREFIX: &str = "friends:";
pub const SENT_REQUESTS_CACHE_PREFIX: &str = "sent:";
pub const INCOMING_REQUESTS_CACHE_PREFIX: &str = "incoming:";
pub const BLOCKED_CACHE_PREFIX: &str = "blocked:";
pub const SEARCH_CACHE_PREFIX: &str = "search:";

/// 缓存 TTL（秒），按关系变更频率分层：好友列表最久，收到的请求最短
pub const PROFILE_CACHE_TTL_SECS: u64 = 24 * 3600;
pub const PROFILE_CACHE_TTL_JITTER_SECS: u64 = 300;
pub const FRIENDS_CACHE_TTL_SECS: u64 = 12 * 3600;
pub const SENT_REQUESTS_CACHE_TTL_SECS: u64 = 3600;
pub const INCOMING_REQUESTS_CACHE_TTL_SECS: u64 = 30 * 60;
pub const BLOCKED_CACHE_TTL_SECS: u64 = 24 * 3600;
pub const SEARCH_CACHE_TTL_SECS: u64 = 5 * 60;

/// 结果集超过上限时不写缓存，避免缓存异常大的关系列表
pub const MAX_FRIENDS_TO_CACHE: usize = 5000;
pub const MAX_INCOMING_REQUESTS_TO_CACHE: usize = 5000;
pub const MAX_SENT_REQUESTS_TO_CACHE: usize = 3000;
pub const MAX_BLOCKED_USERS_TO_CACHE: usize = 1000;

/// 会话规模约束
pub const PRIVATE_CHAT_PARTICIPANTS: usize = 2;
pub const MIN_GROUP_CHAT_PARTICIPANTS: usize = 3;
pub const MAX_GROUP_CHAT_PARTICIPANTS: usize = 100;
pub const MIN_GROUP_CHAT_ADMINS: usize = 1;

/// 推送通道前缀：会话广播 + 用户私有通道
pub const CHAT_CHANNEL_PREFIX: &str = "chat:";
pub const USER_CHANNEL_PREFIX: &str = "user:";

/// 异步侧效应队列容量（满则拒绝新任务并记录日志）
pub const NOTIFY_QUEUE_CAPACITY: usize = 4096;
pub const INVALIDATE_QUEUE_CAPACITY: usize = 1024;
