// Google Sheets 集成模块
// 提供 Sheets REST API 客户端和服务账号认证

pub mod auth;
pub mod client;

pub use auth::{ServiceAccountAuth, ServiceAccountKey, StaticToken, TokenProvider};
pub use client::{a1_range, SheetsClient};

/// Sheets API 调用错误
#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    /// API 返回非 2xx 状态码
    #[error("Google Sheets API 错误 ({status}): {message}")]
    Api { status: u16, message: String },

    /// 网络请求失败（包括超时）
    #[error("网络请求失败: {0}")]
    Transport(#[from] reqwest::Error),

    /// 服务账号认证失败
    #[error("认证失败: {0}")]
    Auth(String),

    /// 响应无法解析
    #[error("响应格式无效: {0}")]
    InvalidResponse(String),
}

