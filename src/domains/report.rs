// 逾期列表的展示格式 - 语音文本和仪表盘表格

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{OverdueEntry, DATE_FORMAT};

/// 语音播报的最大条目数
pub const VOICE_DISPLAY_LIMIT: usize = 5;

/// 状况确认的语音文本
///
/// 最多列出 `limit` 条；超出部分以「、他K件」结尾。
pub fn status_speech(entries: &[OverdueEntry], limit: usize) -> String {
    if entries.is_empty() {
        return "素晴らしいです！現在、期限切れの掃除はありません。".to_string();
    }

    let details: Vec<String> = entries.iter().take(limit).map(describe_entry).collect();

    let mut speech = format!("現在、{}件の掃除が期限切れです。", entries.len());
    speech.push_str(" 詳細は、");
    speech.push_str(&details.join("、"));
    if entries.len() > limit {
        speech.push_str(&format!("、他{}件", entries.len() - limit));
    }
    speech.push_str("です。");
    speech
}

fn describe_entry(entry: &OverdueEntry) -> String {
    if entry.days_overdue == 0 {
        format!(
            "{}（本日が期限、優先度{}）",
            entry.type_name,
            entry.priority.label()
        )
    } else {
        format!(
            "{}（{}日遅れ、優先度{}）",
            entry.type_name,
            entry.days_overdue,
            entry.priority.label()
        )
    }
}

/// 启动时的问候语
pub fn launch_speech(overdue_count: usize) -> String {
    const HINT: &str = "掃除をした場合は「トイレ掃除をしました」のように話しかけてください。";
    if overdue_count > 0 {
        format!(
            "掃除管理システムを開始します。現在、{}件の掃除が期限切れです。 {}",
            overdue_count, HINT
        )
    } else {
        format!(
            "掃除管理システムを開始します。現在、期限切れの掃除はありません。素晴らしいですね！ {}",
            HINT
        )
    }
}

/// 仪表盘表格的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverdueRow {
    #[serde(rename = "掃除種別")]
    pub cleaning_type: String,
    #[serde(rename = "前回実施日")]
    pub last_done: String,
    #[serde(rename = "次回実施予定日")]
    pub next_due: String,
    #[serde(rename = "遅延日数")]
    pub days_overdue: u32,
    #[serde(rename = "優先度")]
    pub priority: String,
}

/// 转换为表格，不截断
pub fn overdue_table(entries: &[OverdueEntry]) -> Vec<OverdueRow> {
    entries
        .iter()
        .map(|entry| OverdueRow {
            cleaning_type: entry.type_name.clone(),
            last_done: entry
                .last_done
                .map(format_date)
                .unwrap_or_else(|| "未実施".to_string()),
            next_due: format_date(entry.next_due),
            days_overdue: entry.days_overdue,
            priority: entry.priority.label().to_string(),
        })
        .collect()
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
