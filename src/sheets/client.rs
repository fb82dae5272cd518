// Google Sheets API 客户端模块
// 负责与 Sheets REST API v4 交互：读取/写入/追加单元格、列出和新建工作表

use regex::Regex;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, error};

use super::{SheetsError, TokenProvider};

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4";

/// 生成 A1 记法的范围，工作表名带引号（支持日文名称）
pub fn a1_range(sheet: &str, cells: &str) -> String {
    format!("'{}'!{}", sheet.replace('\'', "''"), cells)
}

static A1_START_ROW: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"![A-Z]+(\d+)").ok());

/// 从 `'掃除記録'!A5:D5` 之类的范围中取出起始行号
fn first_row_of(range: &str) -> Option<u32> {
    A1_START_ROW
        .as_ref()?
        .captures(range)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Sheets API 客户端
#[derive(Clone)]
pub struct SheetsClient {
    http: Client,
    base_url: String,
    spreadsheet_id: String,
    auth: Arc<dyn TokenProvider>,
}

impl SheetsClient {
    /// 创建新的客户端
    pub fn new(
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        auth: Arc<dyn TokenProvider>,
    ) -> Result<Self, SheetsError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            auth,
        })
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/spreadsheets/{}", self.base_url, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(range)
        )
    }

    /// 附加令牌、发送请求并检查状态码
    async fn send(&self, request: RequestBuilder) -> Result<Value, SheetsError> {
        let token = self.auth.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(body);
            error!("Sheets API 请求失败 ({}): {}", status.as_u16(), message);
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| SheetsError::InvalidResponse(e.to_string()))
    }

    /// 获取电子表格标题（用于测试连接）
    pub async fn spreadsheet_title(&self) -> Result<String, SheetsError> {
        let request = self
            .http
            .get(self.spreadsheet_url())
            .query(&[("fields", "properties.title")]);
        let body = self.send(request).await?;

        body["properties"]["title"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SheetsError::InvalidResponse("缺少 properties.title".to_string()))
    }

    /// 列出所有工作表名称
    pub async fn sheet_titles(&self) -> Result<Vec<String>, SheetsError> {
        let request = self
            .http
            .get(self.spreadsheet_url())
            .query(&[("fields", "sheets.properties.title")]);
        let body = self.send(request).await?;

        let titles = body["sheets"]
            .as_array()
            .map(|sheets| {
                sheets
                    .iter()
                    .filter_map(|s| s["properties"]["title"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(titles)
    }

    /// 新建工作表
    pub async fn add_sheet(&self, title: &str, rows: u32, columns: u32) -> Result<(), SheetsError> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        let payload = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": { "rowCount": rows, "columnCount": columns }
                    }
                }
            }]
        });
        self.send(self.http.post(url).json(&payload)).await?;
        debug!("已新建工作表: {}", title);
        Ok(())
    }

    /// 读取范围内的单元格（全部转换为字符串，空表返回空列表）
    pub async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let body = self.send(self.http.get(self.values_url(range))).await?;

        let rows = body["values"]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row.as_array()
                            .map(|cells| cells.iter().map(cell_to_string).collect())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }

    /// 覆盖写入指定范围
    pub async fn update_values(&self, range: &str, rows: &[Vec<String>]) -> Result<(), SheetsError> {
        let payload = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": rows,
        });
        let request = self
            .http
            .put(self.values_url(range))
            .query(&[("valueInputOption", "RAW")])
            .json(&payload);
        self.send(request).await?;
        Ok(())
    }

    /// 在表格末尾追加行，返回写入的起始行号（API 未返回时为 None）
    pub async fn append_values(
        &self,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<Option<u32>, SheetsError> {
        let url = format!("{}:append", self.values_url(range));
        let payload = json!({
            "majorDimension": "ROWS",
            "values": rows,
        });
        let request = self
            .http
            .post(url)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&payload);
        let body = self.send(request).await?;

        Ok(body["updates"]["updatedRange"]
            .as_str()
            .and_then(first_row_of))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::StaticToken;

    #[test]
    fn test_a1_range_quotes_sheet_name() {
        assert_eq!(a1_range("掃除記録", "A:D"), "'掃除記録'!A:D");
        assert_eq!(a1_range("Bob's", "A1"), "'Bob''s'!A1");
    }

    #[test]
    fn test_first_row_of() {
        assert_eq!(first_row_of("'掃除記録'!A5:D5"), Some(5));
        assert_eq!(first_row_of("Sheet1!B12"), Some(12));
        assert_eq!(first_row_of("Sheet1"), None);
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&json!("3")), "3");
        assert_eq!(cell_to_string(&json!(14)), "14");
        assert_eq!(cell_to_string(&Value::Null), "");
    }

    #[test]
    fn test_client_trims_base_url() {
        let client = SheetsClient::new(
            "https://sheets.example.com/v4/",
            "abc",
            Arc::new(StaticToken::new("t")),
        )
        .unwrap();
        assert_eq!(client.spreadsheet_url(), "https://sheets.example.com/v4/spreadsheets/abc");
    }
}
