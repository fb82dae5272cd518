// Google Sheets 存储实现

use super::{CleaningRepository, SheetStatus};
use crate::domains::completion::CompletionError;
use crate::models::{
    CleaningRecord, CleaningTypeSetting, RECORDS_HEADERS, RECORDS_SHEET, SETTINGS_HEADERS,
    SETTINGS_SHEET,
};
use crate::sheets::{a1_range, SheetsClient};
use crate::storage::models::{decode_records, decode_settings, parse_setting_row};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;
use tracing::{info, warn};

const RECORDS_SHEET_ROWS: u32 = 1000;
const SETTINGS_SHEET_ROWS: u32 = 100;
const SHEET_COLUMNS: u32 = 10;

fn header_row(headers: &[&str]) -> Vec<String> {
    headers.iter().map(|h| h.to_string()).collect()
}

/// 以 Google 电子表格作为存储
pub struct SheetsRepository {
    client: SheetsClient,
    defaults: Vec<CleaningTypeSetting>,
    /// 已确认存在的工作表
    known_sheets: RwLock<HashSet<String>>,
}

impl SheetsRepository {
    pub fn new(client: SheetsClient, defaults: Vec<CleaningTypeSetting>) -> Self {
        Self {
            client,
            defaults,
            known_sheets: RwLock::new(HashSet::new()),
        }
    }

    /// 先检查是否存在，不存在时新建并写入初始行
    async fn ensure_sheet(
        &self,
        title: &str,
        rows: u32,
        initial_rows: Vec<Vec<String>>,
    ) -> Result<SheetStatus> {
        if self.known_sheets.read().await.contains(title) {
            return Ok(SheetStatus::Found);
        }

        let titles = self.client.sheet_titles().await?;
        if titles.iter().any(|t| t == title) {
            self.known_sheets.write().await.insert(title.to_string());
            return Ok(SheetStatus::Found);
        }

        info!("工作表 {} 不存在，正在新建...", title);
        self.client.add_sheet(title, rows, SHEET_COLUMNS).await?;

        let width = initial_rows.iter().map(Vec::len).max().unwrap_or(1).clamp(1, 26);
        let last_column = char::from(b'A' + width as u8 - 1);
        let range = a1_range(title, &format!("A1:{}{}", last_column, initial_rows.len()));
        self.client.update_values(&range, &initial_rows).await?;

        self.known_sheets.write().await.insert(title.to_string());
        info!("工作表 {} 新建完成，写入 {} 行", title, initial_rows.len());
        Ok(SheetStatus::Created)
    }

    /// 查找名称匹配的第一条有效行的行号（1 起算，含表头）
    ///
    /// 与读取时一致，无法解析的行不参与匹配。
    async fn find_setting_row(&self, name: &str) -> Result<Option<usize>> {
        let rows = self.client.get_values(&a1_range(SETTINGS_SHEET, "A:E")).await?;
        Ok(rows
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, row)| parse_setting_row(row).is_some_and(|s| s.name == name))
            .map(|(index, _)| index + 1))
    }

    /// append 失败时的后备方案：计算下一个空行并直接写入
    async fn write_record_at_end(&self, row: Vec<String>) -> Result<()> {
        let existing = self.client.get_values(&a1_range(RECORDS_SHEET, "A:A")).await?;
        let next_row = existing.len() + 1;
        let range = a1_range(RECORDS_SHEET, &format!("A{}:D{}", next_row, next_row));
        self.client.update_values(&range, &[row]).await?;
        info!("掃除記録已写入第 {} 行（手动指定范围）", next_row);
        Ok(())
    }
}

#[async_trait]
impl CleaningRepository for SheetsRepository {
    async fn ensure_records_sheet(&self) -> Result<SheetStatus> {
        self.ensure_sheet(
            RECORDS_SHEET,
            RECORDS_SHEET_ROWS,
            vec![header_row(&RECORDS_HEADERS)],
        )
        .await
    }

    async fn ensure_settings_sheet(&self) -> Result<SheetStatus> {
        let mut rows = vec![header_row(&SETTINGS_HEADERS)];
        rows.extend(self.defaults.iter().map(CleaningTypeSetting::to_row));
        self.ensure_sheet(SETTINGS_SHEET, SETTINGS_SHEET_ROWS, rows)
            .await
    }

    async fn list_settings(&self) -> Result<Vec<CleaningTypeSetting>> {
        self.ensure_settings_sheet().await?;
        let rows = self.client.get_values(&a1_range(SETTINGS_SHEET, "A:E")).await?;
        let settings = decode_settings(&rows);
        info!("掃除種別設定取得成功: {}件", settings.len());
        Ok(settings)
    }

    async fn save_schedule(&self, setting: &CleaningTypeSetting) -> Result<()> {
        self.ensure_settings_sheet().await?;
        let row = self
            .find_setting_row(&setting.name)
            .await?
            .ok_or_else(|| CompletionError::NotFound {
                name: setting.name.clone(),
            })?;

        let range = a1_range(SETTINGS_SHEET, &format!("C{}:D{}", row, row));
        self.client
            .update_values(
                &range,
                &[vec![setting.last_done.to_cell(), setting.next_due.to_cell()]],
            )
            .await?;
        info!(
            "最終実施日更新完了: {} -> {} (次回: {})",
            setting.name,
            setting.last_done.to_cell(),
            setting.next_due.to_cell()
        );
        Ok(())
    }

    async fn append_record(&self, record: &CleaningRecord) -> Result<()> {
        self.ensure_records_sheet().await?;
        let row = record.to_row();

        match self
            .client
            .append_values(&a1_range(RECORDS_SHEET, "A:D"), &[row.clone()])
            .await
        {
            Ok(written_row) => {
                info!(
                    "掃除記録追加成功: {} (行: {:?})",
                    record.cleaning_type, written_row
                );
                Ok(())
            }
            Err(e) => {
                warn!("append 失败，改为手动查找下一行: {}", e);
                self.write_record_at_end(row).await
            }
        }
    }

    async fn list_records(&self) -> Result<Vec<CleaningRecord>> {
        self.ensure_records_sheet().await?;
        let rows = self.client.get_values(&a1_range(RECORDS_SHEET, "A:D")).await?;
        let records = decode_records(&rows);
        info!("掃除記録取得成功: {}件", records.len());
        Ok(records)
    }

    fn backend_name(&self) -> &str {
        "google-sheets"
    }
}
