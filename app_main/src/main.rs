use log::{info, warn};

use common::config::AppConfig;
use common::db::init_db;
use common::redis::{get_redis_pool, init_redis_pool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    AppConfig::init("main-config.toml");
    // 读取配置文件
    let app_cfg = AppConfig::get();

    let log_level = app_cfg.get_sys().log_level;
    let log_level = if log_level.is_empty() { "info".to_string() } else { log_level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&log_level)).init();

    let db_cfg = app_cfg.get_database();
    let db = init_db(&db_cfg).await?;
    info!("MongoDB connected: {}", db_cfg.db_name);

    init_redis_pool(&app_cfg.get_redis().url)?;
    let redis_pool = get_redis_pool();
    info!("Redis pool ready");

    biz_service::init_service(db, redis_pool.as_ref().clone(), app_cfg.get_kafka()).await?;
    info!("chat core services initialized");

    // 无对外传输层，驻留运行后台 worker（扇出 / 缓存失效），等待退出信号
    tokio::signal::ctrl_c().await?;
    warn!("shutdown signal received, exiting");
    Ok(())
}
