// 完成处理 - 更新最终实施日和次回予定日

use chrono::{Days, NaiveDateTime};

use crate::models::{CleaningTypeSetting, DateCell};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CompletionError {
    /// 设置表中没有同名的掃除種別
    #[error("掃除種別が設定シートに見つかりません: {name}")]
    NotFound { name: String },
}

/// 应用一次完成事件，返回更新后的副本
///
/// `last_done = completed_at.date()`，`next_due = last_done + frequency_days`。
pub fn apply_completion(
    setting: &CleaningTypeSetting,
    completed_at: NaiveDateTime,
) -> CleaningTypeSetting {
    let last_done = completed_at.date();
    let next_due = last_done
        .checked_add_days(Days::new(u64::from(setting.frequency_days)))
        .map(DateCell::Date)
        .unwrap_or_default();

    CleaningTypeSetting {
        last_done: DateCell::Date(last_done),
        next_due,
        ..setting.clone()
    }
}

/// 按名称（完全一致、区分大小写）查找设置并应用完成事件
///
/// 存在重名时使用第一行。
pub fn complete_by_name(
    settings: &[CleaningTypeSetting],
    name: &str,
    completed_at: NaiveDateTime,
) -> Result<CleaningTypeSetting, CompletionError> {
    settings
        .iter()
        .find(|s| s.name == name)
        .map(|s| apply_completion(s, completed_at))
        .ok_or_else(|| CompletionError::NotFound {
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{default_cleaning_settings, Priority};
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 15, 0)
            .unwrap()
    }

    #[test]
    fn test_apply_completion_sets_both_dates() {
        let setting = CleaningTypeSetting::new("風呂掃除", 7, Priority::High);
        let updated = apply_completion(&setting, at(2024, 2, 25, 23));

        assert_eq!(updated.last_done, DateCell::Date(NaiveDate::from_ymd_opt(2024, 2, 25).unwrap()));
        assert_eq!(updated.next_due, DateCell::Date(NaiveDate::from_ymd_opt(2024, 3, 3).unwrap()));
        assert_eq!(updated.name, setting.name);
        assert_eq!(updated.priority, setting.priority);
        assert_eq!(updated.frequency_days, 7);
    }

    #[test]
    fn test_apply_completion_overwrites_malformed_cells() {
        let mut setting = CleaningTypeSetting::new("床掃除", 7, Priority::Medium);
        setting.last_done = DateCell::Malformed("???".to_string());
        let updated = apply_completion(&setting, at(2024, 1, 1, 9));
        assert!(!updated.last_done.is_malformed());
        assert!(!updated.next_due.is_malformed());
    }

    #[test]
    fn test_complete_by_name() {
        let settings = default_cleaning_settings();
        let updated = complete_by_name(&settings, "窓掃除", at(2024, 5, 1, 10)).unwrap();
        assert_eq!(updated.next_due.date(), NaiveDate::from_ymd_opt(2024, 5, 15));
    }

    #[test]
    fn test_complete_by_name_is_exact_match() {
        let settings = default_cleaning_settings();
        let err = complete_by_name(&settings, "トイレ", at(2024, 5, 1, 10)).unwrap_err();
        assert_eq!(
            err,
            CompletionError::NotFound {
                name: "トイレ".to_string()
            }
        );
    }
}
