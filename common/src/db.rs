use std::time::Duration;

use mongodb::{Client, Database, options::ClientOptions};

use crate::config::DatabaseConfig;

/// 初始化 MongoDB 连接（所有存储调用都带有界超时）
pub async fn init_db(cfg: &DatabaseConfig) -> mongodb::error::Result<Database> {
    let mut options = ClientOptions::parse(&cfg.url).await?;
    options.connect_timeout = Some(Duration::from_millis(cfg.connect_timeout_ms.unwrap_or(5_000)));
    options.server_selection_timeout = Some(Duration::from_millis(cfg.server_selection_timeout_ms.unwrap_or(5_000)));
    let client = Client::with_options(options)?;
    Ok(client.database(&cfg.db_name))
}
