// Alexa webhook

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};

use super::{AppState, Backend};
use crate::alexa::{catch_all, RequestEnvelope, ResponseEnvelope, SkillResponse, RECORD_INTENT};

const MISCONFIGURED_SPEECH: &str =
    "申し訳ございません。システムエラーが発生しました。設定を確認してください。";

pub(super) async fn alexa_webhook(
    State(state): State<AppState>,
    payload: Result<Json<RequestEnvelope>, JsonRejection>,
) -> Response {
    // 无法解析的请求体也按 Alexa 格式回复
    let envelope = match payload {
        Ok(Json(envelope)) => envelope,
        Err(rejection) => {
            warn!("无法解析 Alexa 请求: {}", rejection.body_text());
            return Json(ResponseEnvelope::from(catch_all())).into_response();
        }
    };

    if let Some(expected) = state.config.alexa_skill_id.as_deref() {
        if envelope.application_id() != Some(expected) {
            warn!(
                "拒绝来自未知技能的请求: {:?}",
                envelope.application_id()
            );
            return (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({ "error": "invalid application id" })),
            )
                .into_response();
        }
    }

    let response = match state.backend.as_ref() {
        Backend::Misconfigured(reason) => {
            error!("❌ 配置错误，无法处理语音请求: {}", reason);
            SkillResponse::new().speak(MISCONFIGURED_SPEECH).end_session(true)
        }
        Backend::Ready(services) => {
            let response = services
                .dispatcher
                .dispatch(&envelope, services.repo.as_ref(), state.now())
                .await;
            // 记录后仪表盘数据已过期
            if envelope.intent_name() == Some(RECORD_INTENT) {
                services.dashboard.invalidate().await;
            }
            response
        }
    };

    Json(ResponseEnvelope::from(response)).into_response()
}
