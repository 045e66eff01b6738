use deadpool_redis::PoolError;
use deadpool_redis::redis::RedisError;
use mongodb::error::Error as MongoError;
use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    // ==== 常规业务错误 ====
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("No permission: {0}")]
    NoPermission(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // ==== 系统错误（瞬态） ====
    #[error("Redis pool error: {0}")]
    RedisPool(#[from] PoolError),
    #[error("MongoDB error: {0}")]
    Mongo(#[from] MongoError),
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("BSON error: {0}")]
    Bson(#[from] mongodb::bson::de::Error),
    #[error("Publish error: {0}")]
    Publish(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }
    pub fn no_permission(msg: impl Into<String>) -> Self {
        AppError::NoPermission(msg.into())
    }
    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::InvalidOperation(msg.into())
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    /// 瞬态错误：适配层故障，可由调用方决定吞掉还是上抛
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::RedisPool(_)
                | AppError::Mongo(_)
                | AppError::Redis(_)
                | AppError::Json(_)
                | AppError::Bson(_)
                | AppError::Publish(_)
        )
    }
}
