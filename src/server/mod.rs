// HTTP 服务 - Alexa webhook 与仪表盘

mod alexa;
mod dashboard;

use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::info;

use crate::alexa::SkillDispatcher;
use crate::config::AppConfig;
use crate::logger::LogBuffer;
use crate::storage::{CachedRepository, CleaningRepository};

/// 正常运行时的服务组件
pub struct Services {
    /// 语音路径使用的存储（不缓存）
    pub repo: Arc<dyn CleaningRepository>,
    /// 仪表盘使用的带缓存存储
    pub dashboard: Arc<CachedRepository>,
    pub dispatcher: SkillDispatcher,
}

/// 后端状态：配置错误时服务仍然启动，但所有业务请求返回错误提示
pub enum Backend {
    Ready(Services),
    Misconfigured(String),
}

type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    backend: Arc<Backend>,
    config: Arc<AppConfig>,
    logs: Arc<LogBuffer>,
    clock: Clock,
}

impl AppState {
    pub fn new(backend: Backend, config: AppConfig, logs: Arc<LogBuffer>) -> Self {
        let config = Arc::new(config);
        let clock_config = config.clone();
        Self {
            backend: Arc::new(backend),
            config,
            logs,
            clock: Arc::new(move || clock_config.now()),
        }
    }

    /// 替换时钟（测试用）
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }
}

/// 构建路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/alexa", post(alexa::alexa_webhook))
        .route("/", get(dashboard::index))
        .route("/api/overdue", get(dashboard::overdue))
        .route("/api/stats", get(dashboard::stats))
        .route("/api/records", get(dashboard::records))
        .route("/api/calendar", get(dashboard::calendar))
        .route("/api/settings", get(dashboard::settings))
        .route("/api/logs", get(dashboard::logs))
        .with_state(state)
}

/// 启动服务，Ctrl+C 时优雅退出
pub async fn serve(state: AppState, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    info!("🚀 掃除管理サーバー起動: http://{}", local_addr);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("收到 Ctrl+C，正在关闭服务...");
            }
        })
        .await?;
    Ok(())
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let (configured, backend) = match state.backend.as_ref() {
        Backend::Ready(services) => (true, services.repo.backend_name().to_string()),
        Backend::Misconfigured(_) => (false, "misconfigured".to_string()),
    };
    Json(serde_json::json!({
        "status": "ok",
        "configured": configured,
        "backend": backend,
    }))
}
