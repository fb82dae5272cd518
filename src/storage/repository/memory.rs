// 内存存储实现 - 用于测试和本地试用

use super::{CleaningRepository, SheetStatus};
use crate::domains::completion::CompletionError;
use crate::models::{CleaningRecord, CleaningTypeSetting};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

/// 内存中的两张“工作表”，None 表示工作表不存在
pub struct MemoryRepository {
    defaults: Vec<CleaningTypeSetting>,
    settings: RwLock<Option<Vec<CleaningTypeSetting>>>,
    records: RwLock<Option<Vec<CleaningRecord>>>,
}

impl MemoryRepository {
    /// 创建空存储，首次访问设置表时写入 `defaults`
    pub fn new(defaults: Vec<CleaningTypeSetting>) -> Self {
        Self {
            defaults,
            settings: RwLock::new(None),
            records: RwLock::new(None),
        }
    }

    /// 创建已有设置表的存储
    pub fn with_settings(settings: Vec<CleaningTypeSetting>) -> Self {
        Self {
            defaults: Vec::new(),
            settings: RwLock::new(Some(settings)),
            records: RwLock::new(None),
        }
    }
}

#[async_trait]
impl CleaningRepository for MemoryRepository {
    async fn ensure_records_sheet(&self) -> Result<SheetStatus> {
        let mut records = self.records.write().await;
        if records.is_some() {
            return Ok(SheetStatus::Found);
        }
        *records = Some(Vec::new());
        info!("掃除記録シートを新規作成しました（memory）");
        Ok(SheetStatus::Created)
    }

    async fn ensure_settings_sheet(&self) -> Result<SheetStatus> {
        let mut settings = self.settings.write().await;
        if settings.is_some() {
            return Ok(SheetStatus::Found);
        }
        *settings = Some(self.defaults.clone());
        info!(
            "掃除種別設定シートを新規作成しました（memory），默认设置 {} 行",
            self.defaults.len()
        );
        Ok(SheetStatus::Created)
    }

    async fn list_settings(&self) -> Result<Vec<CleaningTypeSetting>> {
        self.ensure_settings_sheet().await?;
        Ok(self.settings.read().await.clone().unwrap_or_default())
    }

    async fn save_schedule(&self, setting: &CleaningTypeSetting) -> Result<()> {
        self.ensure_settings_sheet().await?;
        let mut guard = self.settings.write().await;
        let rows = guard.get_or_insert_with(Vec::new);

        let row = rows
            .iter_mut()
            .find(|row| row.name == setting.name)
            .ok_or_else(|| CompletionError::NotFound {
                name: setting.name.clone(),
            })?;
        row.last_done = setting.last_done.clone();
        row.next_due = setting.next_due.clone();
        Ok(())
    }

    async fn append_record(&self, record: &CleaningRecord) -> Result<()> {
        self.ensure_records_sheet().await?;
        self.records
            .write()
            .await
            .get_or_insert_with(Vec::new)
            .push(record.clone());
        Ok(())
    }

    async fn list_records(&self) -> Result<Vec<CleaningRecord>> {
        self.ensure_records_sheet().await?;
        Ok(self.records.read().await.clone().unwrap_or_default())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{default_cleaning_settings, DateCell, Priority};
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_ensure_seeds_defaults_once() {
        let repo = MemoryRepository::new(default_cleaning_settings());

        assert_eq!(repo.ensure_settings_sheet().await.unwrap(), SheetStatus::Created);
        assert_eq!(repo.ensure_settings_sheet().await.unwrap(), SheetStatus::Found);
        assert_eq!(repo.list_settings().await.unwrap().len(), 6);

        assert_eq!(repo.ensure_records_sheet().await.unwrap(), SheetStatus::Created);
        assert!(repo.list_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_schedule_updates_first_match() {
        let repo = MemoryRepository::with_settings(vec![
            CleaningTypeSetting::new("床掃除", 7, Priority::Medium),
            CleaningTypeSetting::new("床掃除", 7, Priority::Medium),
        ]);
        let done = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let updated = CleaningTypeSetting::new("床掃除", 7, Priority::Medium).with_last_done(done);

        repo.save_schedule(&updated).await.unwrap();

        let settings = repo.list_settings().await.unwrap();
        assert_eq!(settings[0].last_done, DateCell::Date(done));
        assert_eq!(settings[1].last_done, DateCell::Empty);
    }

    #[tokio::test]
    async fn test_save_schedule_unknown_type() {
        let repo = MemoryRepository::new(default_cleaning_settings());
        let unknown = CleaningTypeSetting::new("庭掃除", 30, Priority::Low);
        let err = repo.save_schedule(&unknown).await.unwrap_err();
        assert!(err.downcast_ref::<CompletionError>().is_some());
    }
}
