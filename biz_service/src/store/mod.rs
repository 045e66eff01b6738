pub mod cache_store;
pub mod chat_store;
pub mod graph_store;
pub mod join_store;
pub mod message_store;
pub mod read_store;
pub mod user_store;

pub use cache_store::{CacheStore, RedisCacheStore};
pub use chat_store::{ChatStore, MongoChatStore};
pub use graph_store::{GraphStore, MongoGraphStore};
pub use join_store::{JoinStore, MongoJoinStore};
pub use message_store::{MessageStore, MongoMessageStore};
pub use read_store::{MongoReadStore, ReadStore};
pub use user_store::{MongoUserStore, UserStore};

/// Mongo 唯一索引冲突（并发写竞争时由先提交者胜出，后到者据此返回冲突）
pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000
    )
}
