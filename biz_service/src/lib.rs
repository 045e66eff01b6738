use mongodb::Database;

use common::config::KafkaConfig;
use common::errors::AppError;
use common::redis::RedisPool;

pub mod biz_const;
pub mod biz_service;
pub mod entitys;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub async fn init_service(db: Database, redis_pool: RedisPool, kafka_cfg: KafkaConfig) -> Result<(), AppError> {
    biz_service::init_service(db, redis_pool, kafka_cfg).await
}
