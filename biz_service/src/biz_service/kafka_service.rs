use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};

use common::config::KafkaConfig;
use common::errors::AppError;

use crate::biz_const::USER_CHANNEL_PREFIX;
use crate::biz_service::notify_service::EventPublisher;

/// Kafka 发布实现：按通道前缀路由到事件/通知 topic，通道名作分区键
#[derive(Clone)]
pub struct KafkaService {
    producer: FutureProducer,
    config: KafkaConfig,
}

impl fmt::Debug for KafkaService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaService").field("config", &self.config).finish()
    }
}

impl KafkaService {
    pub fn new(cfg: KafkaConfig) -> Self {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", &cfg.brokers)
            .create()
            .expect("Kafka producer init failed");
        KafkaService { producer, config: cfg }
    }
}

#[async_trait]
impl EventPublisher for KafkaService {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), AppError> {
        let topic = if channel.starts_with(USER_CHANNEL_PREFIX) {
            &self.config.topic_user_notify
        } else {
            &self.config.topic_chat_events
        };
        let record = FutureRecord::to(topic).payload(payload).key(channel);

        // 有界发送超时，发布方不允许无限阻塞
        let timeout = Duration::from_millis(50);

        match self.producer.send(record, timeout).await {
            Ok(rdkafka::producer::future_producer::Delivery { partition, offset, .. }) => {
                log::debug!("Kafka OK => topic={}, partition={}, offset={}", topic, partition, offset);
                Ok(())
            }
            Err((err, _)) => Err(AppError::Publish(err.to_string())),
        }
    }
}
