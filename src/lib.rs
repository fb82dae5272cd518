// 掃除管理システム - 主库
//
// 语音（Alexa）记录掃除并查询逾期情况，数据保存在 Google Sheets，另有仪表盘。

// 声明模块
pub mod alexa;
pub mod config;
pub mod domains;
pub mod logger;
pub mod models;
pub mod server;
pub mod sheets;
pub mod storage;

use std::sync::Arc;
use tracing::{error, info, warn};

use alexa::SkillDispatcher;
use config::AppConfig;
use models::CleaningTypeSetting;
use server::{Backend, Services};
use sheets::{ServiceAccountAuth, SheetsClient};
use storage::{CachedRepository, CleaningRepository, MemoryRepository, SheetsRepository};

/// 打开存储
///
/// `use_memory` 为 true 时使用内存存储（本地试用），否则连接 Google Sheets。
/// 同时返回默认掃除種別，新建设置表时写入。
pub async fn open_repository(
    config: &AppConfig,
    use_memory: bool,
) -> anyhow::Result<(Arc<dyn CleaningRepository>, Vec<CleaningTypeSetting>)> {
    config.validate_offset()?;
    let defaults = config.load_default_settings().await;

    if use_memory {
        info!("使用内存存储（数据不会持久化）");
        return Ok((Arc::new(MemoryRepository::new(defaults.clone())), defaults));
    }

    config.validate()?;
    let key = config.service_account_key()?;
    let auth = ServiceAccountAuth::new(key)?;
    let client = SheetsClient::new(
        config.sheets_api_base.clone(),
        config.spreadsheet_id()?,
        Arc::new(auth),
    )?;

    // 连接测试失败不阻止启动，首次读写时会再次报错
    match client.spreadsheet_title().await {
        Ok(title) => info!("✅ Google Sheets 连接成功: {}", title),
        Err(e) => warn!("⚠️ Google Sheets 连接测试失败: {}", e),
    }
    let repo = SheetsRepository::new(client, defaults.clone());
    Ok((Arc::new(repo), defaults))
}

/// 构建 HTTP 服务的后端，失败时进入配置错误模式而不是退出
pub async fn build_backend(config: &AppConfig, use_memory: bool) -> Backend {
    let (repo, defaults) = match open_repository(config, use_memory).await {
        Ok(opened) => opened,
        Err(e) => {
            error!("❌ 初始化失败，以配置错误模式启动: {:#}", e);
            return Backend::Misconfigured(e.to_string());
        }
    };

    let dashboard = Arc::new(CachedRepository::new(repo.clone(), config.cache_ttl()));
    let dispatcher = SkillDispatcher::new(defaults.into_iter().map(|s| s.name).collect());

    Backend::Ready(Services {
        repo,
        dashboard,
        dispatcher,
    })
}
