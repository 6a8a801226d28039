//! Web服务器

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use mycoscan_core::{MycoscanError, Result};
use mycoscan_database::DatabasePool;
use mycoscan_storage::StorageManager;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;

use crate::handlers::{
    api_root, create_medication, create_patient, create_scan, delete_medication, delete_patient,
    health, list_medications, list_patients, list_scans, update_medication, update_patient,
    upload_medication_image,
};

/// 请求体大小上限
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// 共享应用状态
pub struct AppState {
    pub db: DatabasePool,
    pub storage: StorageManager,
}

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, static_dir: impl Into<PathBuf>, state: Arc<AppState>) -> Self {
        let app = Self::create_app(static_dir.into(), state);

        Self { addr, app }
    }

    fn create_app(static_dir: PathBuf, state: Arc<AppState>) -> Router {
        Router::new()
            // 根路径
            .route("/", get(api_root))

            // 健康检查
            .route("/health", get(health))

            // API路由
            .nest("/api", api_routes())

            // 静态文件服务（上传图片经由 /static/uploads/scans 访问）
            .nest_service("/static", ServeDir::new(static_dir))

            // 全局中间件
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(
                        CorsLayer::new()
                            .allow_origin(Any)
                            .allow_methods(Any)
                            .allow_headers(Any),
                    )
                    .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
            )
            .with_state(state)
    }

    pub async fn run(self) -> Result<()> {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app)
            .await
            .map_err(|e| MycoscanError::Internal(format!("web server failed: {}", e)))?;

        Ok(())
    }
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route("/patients/:id", put(update_patient).delete(delete_patient))
        .route("/medications", get(list_medications).post(create_medication))
        .route("/medications/:id", put(update_medication).delete(delete_medication))
        .route("/medications/:id/image", post(upload_medication_image))
        .route("/scans", get(list_scans).post(create_scan))
}
