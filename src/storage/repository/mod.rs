// Repository 抽象层 - 定义存储操作接口

pub mod memory;
pub mod sheets;

use crate::models::{CleaningRecord, CleaningTypeSetting};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

/// 确保工作表存在的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetStatus {
    /// 已存在
    Found,
    /// 新建（设置表会同时写入默认掃除種別）
    Created,
}

/// 存储操作接口 - 所有存储实现必须实现此 trait
///
/// 读写操作会先确保对应的工作表存在。
#[async_trait]
pub trait CleaningRepository: Send + Sync {
    // ========== 工作表 ==========

    /// 确保掃除記録シート存在
    async fn ensure_records_sheet(&self) -> Result<SheetStatus>;

    /// 确保掃除種別設定シート存在，新建时写入默认设置
    async fn ensure_settings_sheet(&self) -> Result<SheetStatus>;

    // ========== 掃除種別設定 ==========

    /// 获取所有掃除種別設定（无法解析的行被跳过）
    async fn list_settings(&self) -> Result<Vec<CleaningTypeSetting>>;

    /// 写回最终实施日和次回予定日（按名称匹配第一行）
    async fn save_schedule(&self, setting: &CleaningTypeSetting) -> Result<()>;

    // ========== 掃除記録 ==========

    /// 追加一条记录
    async fn append_record(&self, record: &CleaningRecord) -> Result<()>;

    /// 获取所有记录（插入顺序）
    async fn list_records(&self) -> Result<Vec<CleaningRecord>>;

    /// 存储类型标识
    fn backend_name(&self) -> &str;
}
