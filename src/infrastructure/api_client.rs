// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::folder::{
    Folder, FolderPatch, FolderWithSites, NewFolder, NewSite, Site, SitePatch,
};
use crate::domain::models::queue::{ExecuteResponse, PurgeReport, QueueSnapshot};
use crate::domain::repositories::{ApiError, QueueRepository, ScheduleRepository};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;
use uuid::Uuid;

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// 后端错误响应体，`detail` 优先于 `error`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// 把说明字段展开为文本
///
/// 字符串原样返回；校验错误列表取每一项的 `msg` 拼接
fn describe(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(map) => map.get("msg").and_then(Value::as_str).map(str::to_string),
                    Value::String(text) => Some(text.clone()),
                    _ => None,
                })
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        other => Some(other.to_string()),
    }
}

pub(crate) fn error_from_body(status: u16, body: &str) -> ApiError {
    let detail = serde_json::from_str::<ErrorBody>(body).ok().and_then(|parsed| {
        parsed
            .detail
            .as_ref()
            .and_then(describe)
            .or_else(|| parsed.error.as_ref().and_then(describe))
    });

    match detail {
        Some(detail) => ApiError::Rejected { status, detail },
        None => ApiError::Status(status),
    }
}

/// 后端HTTP客户端
///
/// 同时实现调度仓库和队列仓库。传输层只设置超时，不做重试。
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApiClient {
    /// 创建新的客户端
    ///
    /// # 参数
    ///
    /// * `base_url` - 后端基础地址，例如 `http://localhost:8000`
    /// * `timeout` - 单个请求的超时时间
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url).with_context(|| format!("Invalid API base URL: {}", base_url))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "API request");
        self.client.request(method, url)
    }

    async fn send(builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_from_body(status.as_u16(), &body))
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
        let response = Self::send(builder).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ScheduleRepository for HttpApiClient {
    async fn fetch_folders(&self) -> Result<Vec<FolderWithSites>, ApiError> {
        Self::send_json(self.request(Method::GET, "/crawl/folders")).await
    }

    async fn create_folder(&self, folder: &NewFolder) -> Result<Folder, ApiError> {
        Self::send_json(self.request(Method::POST, "/crawl/folders").json(folder)).await
    }

    async fn update_folder(&self, id: Uuid, patch: &FolderPatch) -> Result<Folder, ApiError> {
        let path = format!("/crawl/folders/{}", id);
        Self::send_json(self.request(Method::PATCH, &path).json(patch)).await
    }

    async fn delete_folder(&self, id: Uuid) -> Result<(), ApiError> {
        let path = format!("/crawl/folders/{}", id);
        Self::send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    async fn create_site(&self, folder_id: Uuid, site: &NewSite) -> Result<Site, ApiError> {
        let path = format!("/crawl/folders/{}/sites", folder_id);
        Self::send_json(self.request(Method::POST, &path).json(site)).await
    }

    async fn update_site(&self, id: Uuid, patch: &SitePatch) -> Result<Site, ApiError> {
        let path = format!("/crawl/sites/{}", id);
        Self::send_json(self.request(Method::PATCH, &path).json(patch)).await
    }

    async fn delete_site(&self, id: Uuid) -> Result<(), ApiError> {
        let path = format!("/crawl/sites/{}", id);
        Self::send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    async fn execute_folder(&self, id: Uuid) -> Result<String, ApiError> {
        let path = format!("/crawl/folders/{}/execute", id);
        let response: ExecuteResponse = Self::send_json(self.request(Method::POST, &path)).await?;
        Ok(response.task_id)
    }
}

#[async_trait]
impl QueueRepository for HttpApiClient {
    async fn fetch_status(&self) -> Result<QueueSnapshot, ApiError> {
        Self::send_json(self.request(Method::GET, "/crawl/queue/status")).await
    }

    async fn purge(&self) -> Result<PurgeReport, ApiError> {
        Self::send_json(self.request(Method::POST, "/crawl/queue/purge")).await
    }
}

#[cfg(test)]
#[path = "api_client_test.rs"]
mod tests;
