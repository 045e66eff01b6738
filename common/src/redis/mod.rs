mod redis_pool;

pub use redis_pool::*;

pub type RedisPool = deadpool_redis::Pool;
