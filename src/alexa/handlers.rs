// 语音请求处理器
//
// 每个处理器负责一种请求；存储和当前时间通过 HandlerInput 注入。

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::{error, info};

use super::models::{Request, RequestEnvelope, SkillResponse};
use crate::domains::report::{launch_speech, status_speech, VOICE_DISPLAY_LIMIT};
use crate::domains::{compute_overdue, record_cleaning, ScheduleUpdate};
use crate::storage::CleaningRepository;

pub const RECORD_INTENT: &str = "RecordCleaningIntent";
pub const STATUS_INTENT: &str = "CheckCleaningStatusIntent";
pub const CLEANING_TYPE_SLOT: &str = "CleaningType";

const HELP_INTENT: &str = "AMAZON.HelpIntent";
const CANCEL_INTENT: &str = "AMAZON.CancelIntent";
const STOP_INTENT: &str = "AMAZON.StopIntent";
const FALLBACK_INTENT: &str = "AMAZON.FallbackIntent";

pub const CATCH_ALL_SPEECH: &str = "申し訳ございません。予期しないエラーが発生しました。";

/// 处理器的输入
pub struct HandlerInput<'a> {
    pub envelope: &'a RequestEnvelope,
    pub repo: &'a dyn CleaningRepository,
    pub now: NaiveDateTime,
}

/// 请求处理器
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// 处理器名称（日志用）
    fn name(&self) -> &'static str;

    fn can_handle(&self, envelope: &RequestEnvelope) -> bool;

    async fn handle(&self, input: &HandlerInput<'_>) -> anyhow::Result<SkillResponse>;

    /// `handle` 返回错误时的语音
    fn apology(&self) -> &'static str {
        CATCH_ALL_SPEECH
    }
}

fn is_intent(envelope: &RequestEnvelope, names: &[&str]) -> bool {
    envelope
        .intent_name()
        .map(|name| names.contains(&name))
        .unwrap_or(false)
}

// ==================== LaunchRequest ====================

pub struct LaunchHandler;

#[async_trait]
impl RequestHandler for LaunchHandler {
    fn name(&self) -> &'static str {
        "LaunchRequest"
    }

    fn can_handle(&self, envelope: &RequestEnvelope) -> bool {
        matches!(envelope.request, Request::LaunchRequest(_))
    }

    async fn handle(&self, input: &HandlerInput<'_>) -> anyhow::Result<SkillResponse> {
        input.repo.ensure_records_sheet().await?;
        let settings = input.repo.list_settings().await?;
        let overdue = compute_overdue(&settings, input.now.date());

        let speech = launch_speech(overdue.len());
        Ok(SkillResponse::new()
            .speak(speech.clone())
            .simple_card("掃除管理システム", speech)
            .end_session(false))
    }

    fn apology(&self) -> &'static str {
        "申し訳ございません。システムの初期化中にエラーが発生しました。"
    }
}

// ==================== RecordCleaningIntent ====================

pub struct RecordCleaningHandler;

#[async_trait]
impl RequestHandler for RecordCleaningHandler {
    fn name(&self) -> &'static str {
        RECORD_INTENT
    }

    fn can_handle(&self, envelope: &RequestEnvelope) -> bool {
        is_intent(envelope, &[RECORD_INTENT])
    }

    async fn handle(&self, input: &HandlerInput<'_>) -> anyhow::Result<SkillResponse> {
        let Some(cleaning_type) = input.envelope.slot_value(CLEANING_TYPE_SLOT) else {
            return Ok(SkillResponse::new()
                .speak("掃除の種類が聞き取れませんでした。もう一度お話しください。")
                .end_session(false));
        };

        let speech = match record_cleaning(input.repo, cleaning_type, None, input.now).await {
            Ok(outcome) => record_speech(cleaning_type, &outcome.schedule),
            Err(e) => {
                error!("❌ 掃除記録エラー: {:#}", e);
                "記録の保存中にエラーが発生しました。もう一度お試しください。".to_string()
            }
        };

        Ok(SkillResponse::new()
            .speak(speech.clone())
            .simple_card("掃除記録", speech)
            .end_session(true))
    }

    fn apology(&self) -> &'static str {
        "申し訳ございません。掃除記録中にエラーが発生しました。"
    }
}

/// 记录已保存时的语音，按设置表更新结果区分
fn record_speech(cleaning_type: &str, schedule: &ScheduleUpdate) -> String {
    let saved = format!("{}の記録を保存しました。", cleaning_type);
    match schedule {
        ScheduleUpdate::Updated { .. } => format!("{}お疲れさまでした！", saved),
        ScheduleUpdate::NotFound => format!(
            "{}ただし、{}は掃除種別設定に登録されていないため、次回予定日は更新されませんでした。",
            saved, cleaning_type
        ),
        ScheduleUpdate::Failed { .. } => format!(
            "{}ただし、次回予定日の更新に失敗しました。時間をおいて確認してください。",
            saved
        ),
    }
}

// ==================== CheckCleaningStatusIntent ====================

pub struct CheckStatusHandler;

#[async_trait]
impl RequestHandler for CheckStatusHandler {
    fn name(&self) -> &'static str {
        STATUS_INTENT
    }

    fn can_handle(&self, envelope: &RequestEnvelope) -> bool {
        is_intent(envelope, &[STATUS_INTENT])
    }

    async fn handle(&self, input: &HandlerInput<'_>) -> anyhow::Result<SkillResponse> {
        let settings = input.repo.list_settings().await?;
        let overdue = compute_overdue(&settings, input.now.date());
        info!("期限切れ掃除: {}件", overdue.len());

        let speech = status_speech(&overdue, VOICE_DISPLAY_LIMIT);
        Ok(SkillResponse::new()
            .speak(speech.clone())
            .simple_card("掃除状況", speech)
            .end_session(true))
    }

    fn apology(&self) -> &'static str {
        "申し訳ございません。状況確認中にエラーが発生しました。"
    }
}

// ==================== AMAZON.HelpIntent ====================

pub struct HelpHandler {
    type_names: Vec<String>,
}

impl HelpHandler {
    pub fn new(type_names: Vec<String>) -> Self {
        Self { type_names }
    }

    fn speech(&self) -> String {
        let mut speech = String::from(
            "掃除管理システムの使い方をご説明します。\
             掃除をした時は「トイレ掃除をしました」「風呂掃除をしました」のように話しかけてください。\
             掃除の状況を確認したい時は「掃除の状況を教えて」と話しかけてください。",
        );
        if !self.type_names.is_empty() {
            speech.push_str(&format!(
                "記録できる掃除の種類は、{}です。",
                self.type_names.join("、")
            ));
        }
        speech
    }
}

#[async_trait]
impl RequestHandler for HelpHandler {
    fn name(&self) -> &'static str {
        HELP_INTENT
    }

    fn can_handle(&self, envelope: &RequestEnvelope) -> bool {
        is_intent(envelope, &[HELP_INTENT])
    }

    async fn handle(&self, _input: &HandlerInput<'_>) -> anyhow::Result<SkillResponse> {
        let speech = self.speech();
        Ok(SkillResponse::new()
            .speak(speech.clone())
            .simple_card("ヘルプ", speech)
            .end_session(false))
    }
}

// ==================== AMAZON.CancelIntent / StopIntent ====================

pub struct CancelStopHandler;

#[async_trait]
impl RequestHandler for CancelStopHandler {
    fn name(&self) -> &'static str {
        "CancelOrStop"
    }

    fn can_handle(&self, envelope: &RequestEnvelope) -> bool {
        is_intent(envelope, &[CANCEL_INTENT, STOP_INTENT])
    }

    async fn handle(&self, _input: &HandlerInput<'_>) -> anyhow::Result<SkillResponse> {
        let speech = "掃除管理システムを終了します。お疲れさまでした！";
        Ok(SkillResponse::new()
            .speak(speech)
            .simple_card("終了", speech)
            .end_session(true))
    }
}

// ==================== AMAZON.FallbackIntent ====================

pub struct FallbackHandler;

#[async_trait]
impl RequestHandler for FallbackHandler {
    fn name(&self) -> &'static str {
        FALLBACK_INTENT
    }

    fn can_handle(&self, envelope: &RequestEnvelope) -> bool {
        is_intent(envelope, &[FALLBACK_INTENT])
    }

    async fn handle(&self, _input: &HandlerInput<'_>) -> anyhow::Result<SkillResponse> {
        let speech = "すみません、よく分かりませんでした。\
                      掃除をした時は「トイレ掃除をしました」のように話しかけてください。\
                      ヘルプが必要な場合は「ヘルプ」と言ってください。";
        Ok(SkillResponse::new()
            .speak(speech)
            .simple_card("理解できませんでした", speech)
            .end_session(false))
    }
}

// ==================== SessionEndedRequest ====================

pub struct SessionEndedHandler;

#[async_trait]
impl RequestHandler for SessionEndedHandler {
    fn name(&self) -> &'static str {
        "SessionEndedRequest"
    }

    fn can_handle(&self, envelope: &RequestEnvelope) -> bool {
        matches!(envelope.request, Request::SessionEndedRequest(_))
    }

    async fn handle(&self, input: &HandlerInput<'_>) -> anyhow::Result<SkillResponse> {
        if let Request::SessionEndedRequest(req) = &input.envelope.request {
            info!("会话结束: {:?}", req.reason);
        }
        Ok(SkillResponse::new())
    }
}
