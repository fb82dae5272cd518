// Alexa 请求/响应信封（只包含本技能用到的字段）

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub session: Option<Session>,
    #[serde(default)]
    pub context: Option<Context>,
    pub request: Request,
}

impl RequestEnvelope {
    /// 意图名称（非 IntentRequest 时为 None）
    pub fn intent_name(&self) -> Option<&str> {
        match &self.request {
            Request::IntentRequest(req) => Some(req.intent.name.as_str()),
            _ => None,
        }
    }

    /// 槽位值（空字符串视为未填写）
    pub fn slot_value(&self, slot: &str) -> Option<&str> {
        match &self.request {
            Request::IntentRequest(req) => req
                .intent
                .slots
                .get(slot)
                .and_then(|s| s.value.as_deref())
                .filter(|v| !v.trim().is_empty()),
            _ => None,
        }
    }

    /// 技能 ID，优先取 context.System.application
    pub fn application_id(&self) -> Option<&str> {
        self.context
            .as_ref()
            .and_then(|c| c.system.as_ref())
            .and_then(|s| s.application.as_ref())
            .or_else(|| self.session.as_ref().and_then(|s| s.application.as_ref()))
            .map(|a| a.application_id.as_str())
    }

    pub fn request_id(&self) -> &str {
        match &self.request {
            Request::LaunchRequest(meta) => &meta.request_id,
            Request::IntentRequest(req) => &req.request_id,
            Request::SessionEndedRequest(req) => &req.request_id,
            Request::Unknown => "",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub application: Option<Application>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Context {
    #[serde(rename = "System", default)]
    pub system: Option<SystemState>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemState {
    #[serde(default)]
    pub application: Option<Application>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub application_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    LaunchRequest(RequestMeta),
    IntentRequest(IntentRequest),
    SessionEndedRequest(SessionEndedRequest),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMeta {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRequest {
    #[serde(default)]
    pub request_id: String,
    pub intent: Intent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Intent {
    pub name: String,
    #[serde(default)]
    pub slots: HashMap<String, Slot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Slot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEndedRequest {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

// ==================== 响应 ====================

#[derive(Debug, Clone, Serialize)]
pub struct ResponseEnvelope {
    pub version: String,
    pub response: SkillResponse,
}

impl From<SkillResponse> for ResponseEnvelope {
    fn from(response: SkillResponse) -> Self {
        Self {
            version: "1.0".to_string(),
            response,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum OutputSpeech {
    PlainText { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Card {
    Simple { title: String, content: String },
}

/// 技能响应（链式构建）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_speech: Option<OutputSpeech>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_end_session: Option<bool>,
}

impl SkillResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speak(mut self, text: impl Into<String>) -> Self {
        self.output_speech = Some(OutputSpeech::PlainText { text: text.into() });
        self
    }

    pub fn simple_card(mut self, title: impl Into<String>, content: impl Into<String>) -> Self {
        self.card = Some(Card::Simple {
            title: title.into(),
            content: content.into(),
        });
        self
    }

    pub fn end_session(mut self, end: bool) -> Self {
        self.should_end_session = Some(end);
        self
    }

    #[cfg(test)]
    pub fn speech_text(&self) -> Option<&str> {
        match &self.output_speech {
            Some(OutputSpeech::PlainText { text }) => Some(text),
            None => None,
        }
    }

    #[cfg(test)]
    pub fn card_title(&self) -> Option<&str> {
        match &self.card {
            Some(Card::Simple { title, .. }) => Some(title),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_intent_request() {
        let envelope: RequestEnvelope = serde_json::from_value(json!({
            "version": "1.0",
            "session": {
                "new": true,
                "sessionId": "amzn1.echo-api.session.1",
                "application": { "applicationId": "amzn1.ask.skill.session" }
            },
            "context": {
                "System": { "application": { "applicationId": "amzn1.ask.skill.ctx" } }
            },
            "request": {
                "type": "IntentRequest",
                "requestId": "req-1",
                "locale": "ja-JP",
                "intent": {
                    "name": "RecordCleaningIntent",
                    "confirmationStatus": "NONE",
                    "slots": { "CleaningType": { "name": "CleaningType", "value": "風呂掃除" } }
                }
            }
        }))
        .unwrap();

        assert_eq!(envelope.intent_name(), Some("RecordCleaningIntent"));
        assert_eq!(envelope.slot_value("CleaningType"), Some("風呂掃除"));
        assert_eq!(envelope.application_id(), Some("amzn1.ask.skill.ctx"));
        assert_eq!(envelope.request_id(), "req-1");
    }

    #[test]
    fn test_parse_unknown_request_type() {
        let envelope: RequestEnvelope = serde_json::from_value(json!({
            "request": { "type": "AudioPlayer.PlaybackStarted", "requestId": "x" }
        }))
        .unwrap();
        assert!(matches!(envelope.request, Request::Unknown));
        assert_eq!(envelope.intent_name(), None);
    }

    #[test]
    fn test_empty_slot_value() {
        let envelope: RequestEnvelope = serde_json::from_value(json!({
            "request": {
                "type": "IntentRequest",
                "intent": { "name": "RecordCleaningIntent", "slots": { "CleaningType": { "name": "CleaningType", "value": " " } } }
            }
        }))
        .unwrap();
        assert_eq!(envelope.slot_value("CleaningType"), None);
    }

    #[test]
    fn test_serialize_response() {
        let response: ResponseEnvelope = SkillResponse::new()
            .speak("こんにちは")
            .simple_card("ヘルプ", "こんにちは")
            .end_session(false)
            .into();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "version": "1.0",
                "response": {
                    "outputSpeech": { "type": "PlainText", "text": "こんにちは" },
                    "card": { "type": "Simple", "title": "ヘルプ", "content": "こんにちは" },
                    "shouldEndSession": false
                }
            })
        );
    }

    #[test]
    fn test_empty_response_serializes_without_fields() {
        let value = serde_json::to_value(ResponseEnvelope::from(SkillResponse::new())).unwrap();
        assert_eq!(value, json!({ "version": "1.0", "response": {} }));
    }
}
