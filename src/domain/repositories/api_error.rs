// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

/// 远程接口错误类型
///
/// 区分后端带有可读说明的拒绝与纯粹的传输失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// 后端拒绝请求并给出了说明（校验失败、冲突、未找到等）
    #[error("Request rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },
    /// 非成功状态码且没有可用说明
    #[error("Unexpected status: {0}")]
    Status(u16),
    /// 网络或传输层失败
    #[error("Transport error: {0}")]
    Transport(String),
    /// 响应体无法解析
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// 后端给出的说明文本，可原样展示给操作员
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { detail, .. } => Some(detail.as_str()),
            _ => None,
        }
    }

    /// 面向操作员的信息：优先使用后端说明，否则使用给定的通用文本
    pub fn user_message(&self, fallback: &str) -> String {
        self.detail().unwrap_or(fallback).to_string()
    }
}
