// 掃除記録の書き込み
//
// 两次独立写入：先追加记录，再更新设置表的日期。两者之间没有事务，
// 第二步失败时记录仍然保留，结果中分别报告。

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{error, info, warn};

use super::completion::{complete_by_name, CompletionError};
use crate::models::CleaningRecord;
use crate::storage::CleaningRepository;

/// 设置表更新结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScheduleUpdate {
    Updated { last_done: NaiveDate, next_due: Option<NaiveDate> },
    /// 设置表中没有该掃除種別
    NotFound,
    Failed { reason: String },
}

/// 一次掃除記録的结果（记录已保存）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    pub record: CleaningRecord,
    pub schedule: ScheduleUpdate,
}

/// 记录一次掃除
///
/// 记录追加失败时返回错误；设置更新失败只反映在 `schedule` 中。
pub async fn record_cleaning(
    repo: &dyn CleaningRepository,
    cleaning_type: &str,
    note: Option<String>,
    now: NaiveDateTime,
) -> anyhow::Result<RecordOutcome> {
    let record = CleaningRecord::voice(cleaning_type, now).with_note(note);

    repo.append_record(&record).await?;
    info!("✅ 掃除記録成功: {}", cleaning_type);

    let schedule = update_schedule(repo, cleaning_type, now).await;
    Ok(RecordOutcome { record, schedule })
}

async fn update_schedule(
    repo: &dyn CleaningRepository,
    cleaning_type: &str,
    now: NaiveDateTime,
) -> ScheduleUpdate {
    let settings = match repo.list_settings().await {
        Ok(settings) => settings,
        Err(e) => {
            error!("读取掃除種別設定失败: {:#}", e);
            return ScheduleUpdate::Failed {
                reason: e.to_string(),
            };
        }
    };

    let updated = match complete_by_name(&settings, cleaning_type, now) {
        Ok(updated) => updated,
        Err(CompletionError::NotFound { name }) => {
            warn!("⚠️ 掃除種別'{}'が設定シートに見つかりません", name);
            return ScheduleUpdate::NotFound;
        }
    };

    match repo.save_schedule(&updated).await {
        Ok(()) => ScheduleUpdate::Updated {
            last_done: now.date(),
            next_due: updated.next_due.date(),
        },
        Err(e) if e.downcast_ref::<CompletionError>().is_some() => {
            warn!("保存时未找到掃除種別'{}'", cleaning_type);
            ScheduleUpdate::NotFound
        }
        Err(e) => {
            error!("❌ 最終実施日更新エラー: {:#}", e);
            ScheduleUpdate::Failed {
                reason: e.to_string(),
            }
        }
    }
}
