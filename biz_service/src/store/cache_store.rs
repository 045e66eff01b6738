use async_trait::async_trait;
use deadpool_redis::redis::cmd;

use common::errors::AppError;
use common::redis::RedisPool;

/// 缓存存储适配器：键值 + 集合，带 TTL 与前缀删除
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<(), AppError>;
    async fn sadd(&self, key: &str, members: &[String]) -> Result<(), AppError>;
    async fn smembers(&self, key: &str) -> Result<Vec<String>, AppError>;
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
    /// SCAN + UNLINK 按前缀批量删除，返回删除数量
    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, AppError>;
}

#[derive(Debug, Clone)]
pub struct RedisCacheStore {
    pub pool: RedisPool,
}

impl RedisCacheStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.pool.get().await?;
        let val: Option<String> = cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(val)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<(), AppError> {
        let mut conn = self.pool.get().await?;
        match ttl_secs {
            Some(ttl) => {
                let _: () = cmd("SETEX").arg(key).arg(ttl).arg(value).query_async(&mut conn).await?;
            }
            None => {
                let _: () = cmd("SET").arg(key).arg(value).query_async(&mut conn).await?;
            }
        }
        Ok(())
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<(), AppError> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.pool.get().await?;
        let _: () = cmd("SADD").arg(key).arg(members).query_async(&mut conn).await?;
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, AppError> {
        let mut conn = self.pool.get().await?;
        let members: Vec<String> = cmd("SMEMBERS").arg(key).query_async(&mut conn).await?;
        Ok(members)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), AppError> {
        let mut conn = self.pool.get().await?;
        let _: i64 = cmd("EXPIRE").arg(key).arg(ttl_secs).query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let mut conn = self.pool.get().await?;
        let _: i64 = cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, AppError> {
        let mut conn = self.pool.get().await?;
        let pattern = format!("{}*", prefix);
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;
            if !keys.is_empty() {
                let removed: i64 = cmd("UNLINK").arg(&keys).query_async(&mut conn).await?;
                deleted += removed as u64;
            }
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(deleted)
    }
}
