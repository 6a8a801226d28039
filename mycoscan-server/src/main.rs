//! MycoScan服务器主程序

use clap::Parser;
use mycoscan_core::{MycoscanError, Result};
use mycoscan_database::{DatabasePool, DatabaseQueries};
use mycoscan_storage::StorageManager;
use mycoscan_web::{AppState, WebServer};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::AppConfig;

/// MycoScan服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "mycoscan-server")]
#[command(about = "MycoScan 诊所管理服务器")]
struct Args {
    /// 监听主机
    #[arg(long)]
    host: Option<String>,

    /// 监听端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 数据库连接串
    #[arg(short, long)]
    database_url: Option<String>,

    /// 静态文件目录
    #[arg(short, long)]
    static_dir: Option<String>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别
    #[arg(short, long)]
    log_level: Option<String>,
}

/// 命令行参数覆盖配置文件
fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(database_url) = &args.database_url {
        config.database.url = database_url.clone();
    }
    if let Some(static_dir) = &args.static_dir {
        config.storage.static_dir = static_dir.clone();
    }
    if let Some(log_level) = &args.log_level {
        config.logging.level = log_level.clone();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    apply_overrides(&mut config, &args);

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.level))
        .init();

    info!("启动MycoScan服务器...");
    info!("  监听地址: {}:{}", config.server.host, config.server.port);
    info!("  静态目录: {}", config.storage.static_dir);

    // 数据库连接与建表
    let pool = DatabasePool::connect(&config.database.url, config.database.max_connections).await?;
    DatabaseQueries::new(&pool).create_tables().await?;

    // 上传目录位于静态目录下的固定位置
    let upload_dir = Path::new(&config.storage.static_dir)
        .join("uploads")
        .join("scans");
    let storage = StorageManager::new(upload_dir);
    storage.ensure_upload_dir().await?;

    let state = Arc::new(AppState { db: pool, storage });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| MycoscanError::Config(format!("invalid listen address: {}", e)))?;

    let server = WebServer::new(addr, config.storage.static_dir.as_str(), state);
    if let Err(e) = server.run().await {
        error!("服务器启动失败: {}", e);
        return Err(e);
    }

    Ok(())
}
