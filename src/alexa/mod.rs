// Alexa 技能模块
// 请求信封解析、处理器和分发器

pub mod handlers;
pub mod models;

pub use handlers::{HandlerInput, RequestHandler, CATCH_ALL_SPEECH, RECORD_INTENT};
pub use models::{RequestEnvelope, ResponseEnvelope, SkillResponse};

use chrono::NaiveDateTime;
use tracing::{error, info};

use crate::storage::CleaningRepository;
use handlers::{
    CancelStopHandler, CheckStatusHandler, FallbackHandler, HelpHandler, LaunchHandler,
    RecordCleaningHandler, SessionEndedHandler,
};

/// 技能分发器：按顺序尝试处理器，第一个匹配的处理请求
pub struct SkillDispatcher {
    handlers: Vec<Box<dyn RequestHandler>>,
}

impl SkillDispatcher {
    /// `type_names` 用于帮助语音中列出可记录的掃除種別
    pub fn new(type_names: Vec<String>) -> Self {
        Self {
            handlers: vec![
                Box::new(LaunchHandler),
                Box::new(RecordCleaningHandler),
                Box::new(CheckStatusHandler),
                Box::new(HelpHandler::new(type_names)),
                Box::new(CancelStopHandler),
                Box::new(FallbackHandler),
                Box::new(SessionEndedHandler),
            ],
        }
    }

    /// 处理一次请求，始终返回可播报的响应
    pub async fn dispatch(
        &self,
        envelope: &RequestEnvelope,
        repo: &dyn CleaningRepository,
        now: NaiveDateTime,
    ) -> SkillResponse {
        let Some(handler) = self.handlers.iter().find(|h| h.can_handle(envelope)) else {
            error!(
                "没有可处理的请求: request_id={}, intent={:?}",
                envelope.request_id(),
                envelope.intent_name()
            );
            return catch_all();
        };

        info!("处理请求: {} ({})", handler.name(), envelope.request_id());
        let input = HandlerInput {
            envelope,
            repo,
            now,
        };

        match handler.handle(&input).await {
            Ok(response) => response,
            Err(e) => {
                error!("❌ {} 处理失败: {:#}", handler.name(), e);
                SkillResponse::new().speak(handler.apology())
            }
        }
    }
}

/// 兜底响应
pub fn catch_all() -> SkillResponse {
    SkillResponse::new()
        .speak(CATCH_ALL_SPEECH)
        .simple_card("エラー", CATCH_ALL_SPEECH)
}
