// 仪表盘 - HTML 页面与 JSON 接口
//
// 读取都经过 CachedRepository；逾期判定与语音路径使用同一个 compute_overdue。

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::{AppState, Backend, Services};
use crate::domains::report::{overdue_table, OverdueRow};
use crate::domains::stats::{cleaning_stats, contribution_calendar, recent_records};
use crate::domains::compute_overdue;
use crate::storage::CleaningRepository;

const DASHBOARD_HTML: &str = include_str!("dashboard.html");

const DEFAULT_RECORD_LIMIT: usize = 10;
const MAX_RECORD_LIMIT: usize = 500;
const DEFAULT_CALENDAR_DAYS: u64 = 90;
const MAX_CALENDAR_DAYS: u64 = 366;
const DEFAULT_LOG_LIMIT: usize = 100;

/// 接口错误，统一返回 503 和日文提示
pub(super) enum ApiError {
    Misconfigured(String),
    Storage(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self {
            ApiError::Misconfigured(reason) => json!({
                "error": "申し訳ございません。システムの設定に問題があります。",
                "detail": reason,
            }),
            ApiError::Storage(e) => {
                error!("❌ 仪表盘数据读取失败: {:#}", e);
                json!({ "error": "申し訳ございません。データの取得中にエラーが発生しました。" })
            }
        };
        (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Storage(e)
    }
}

fn services(state: &AppState) -> Result<&Services, ApiError> {
    match state.backend.as_ref() {
        Backend::Ready(services) => Ok(services),
        Backend::Misconfigured(reason) => Err(ApiError::Misconfigured(reason.clone())),
    }
}

pub(super) async fn index() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

pub(super) async fn overdue(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let services = services(&state)?;
    let today = state.now().date();
    let settings = services.dashboard.list_settings().await?;
    let rows: Vec<OverdueRow> = overdue_table(&compute_overdue(&settings, today));

    Ok(Json(json!({
        "reference_date": today,
        "count": rows.len(),
        "overdue": rows,
    })))
}

pub(super) async fn stats(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let services = services(&state)?;
    let now = state.now();
    let settings = services.dashboard.list_settings().await?;
    let records = services.dashboard.list_records().await?;

    let overdue_count = compute_overdue(&settings, now.date()).len();
    Ok(Json(json!(cleaning_stats(&records, overdue_count, now))))
}

#[derive(Debug, Deserialize)]
pub(super) struct LimitQuery {
    limit: Option<usize>,
}

pub(super) async fn records(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let services = services(&state)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECORD_LIMIT)
        .clamp(1, MAX_RECORD_LIMIT);
    let records = services.dashboard.list_records().await?;

    Ok(Json(json!({ "records": recent_records(&records, limit) })))
}

#[derive(Debug, Deserialize)]
pub(super) struct CalendarQuery {
    days: Option<u64>,
}

/// 以 `end` 为最后一天、共 `days` 天的起始日期
fn window_start(end: NaiveDate, days: u64) -> NaiveDate {
    end.checked_sub_days(Days::new(days.saturating_sub(1)))
        .unwrap_or(end)
}

pub(super) async fn calendar(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let services = services(&state)?;
    let days = query
        .days
        .unwrap_or(DEFAULT_CALENDAR_DAYS)
        .clamp(1, MAX_CALENDAR_DAYS);
    let today = state.now().date();
    let records = services.dashboard.list_records().await?;

    Ok(Json(json!(contribution_calendar(
        &records,
        window_start(today, days),
        today
    ))))
}

pub(super) async fn settings(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let services = services(&state)?;
    let settings = services.dashboard.list_settings().await?;
    Ok(Json(json!({
        "backend": services.dashboard.backend_name(),
        "settings": settings,
    })))
}

/// 最近日志，配置错误时也可查看
pub(super) async fn logs(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<serde_json::Value> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    Json(json!({ "logs": state.logs.recent(limit) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_start() {
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert_eq!(window_start(end, 1), end);
        assert_eq!(
            window_start(end, 90),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }
}
