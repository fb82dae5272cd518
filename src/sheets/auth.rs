// 服务账号认证 - 使用 JWT Bearer 授权换取访问令牌

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use super::SheetsError;

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// 令牌到期前提前刷新的秒数
const REFRESH_MARGIN_SECS: u64 = 60;

/// 访问令牌提供者
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, SheetsError>;
}

/// 固定令牌（测试或外部已获取令牌时使用）
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, SheetsError> {
        Ok(self.0.clone())
    }
}

/// 服务账号密钥 JSON 中需要的字段
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// 解析 GOOGLE_SERVICE_ACCOUNT_KEY 的内容
    pub fn from_json(raw: &str) -> Result<Self, SheetsError> {
        let key: Self = serde_json::from_str(raw)
            .map_err(|e| SheetsError::Auth(format!("服务账号密钥 JSON 无效: {}", e)))?;
        if key.client_email.trim().is_empty() {
            return Err(SheetsError::Auth("服务账号密钥缺少 client_email".to_string()));
        }
        Ok(key)
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// 服务账号认证，令牌在有效期内复用
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    http: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(key: ServiceAccountKey) -> Result<Self, SheetsError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| SheetsError::Auth(format!("私钥无效: {}", e)))?;

        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            key,
            encoding_key,
            http,
            cached: Mutex::new(None),
        })
    }

    fn signed_assertion(&self) -> Result<String, SheetsError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| SheetsError::Auth(format!("JWT 签名失败: {}", e)))
    }

    async fn fetch_token(&self) -> Result<TokenResponse, SheetsError> {
        let assertion = self.signed_assertion()?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SheetsError::Auth(format!("令牌请求失败 ({}): {}", status, body)));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| SheetsError::InvalidResponse(format!("令牌响应无效: {}", e)))
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountAuth {
    async fn access_token(&self) -> Result<String, SheetsError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.token.clone());
            }
            debug!("访问令牌即将过期，重新获取");
        }

        let response = self.fetch_token().await?;
        let lifetime = response.expires_in.saturating_sub(REFRESH_MARGIN_SECS);
        *cached = Some(CachedToken {
            token: response.access_token.clone(),
            refresh_at: Instant::now() + Duration::from_secs(lifetime),
        });
        info!("已获取 Google 访问令牌: {}", self.key.client_email);
        Ok(response.access_token)
    }
}
