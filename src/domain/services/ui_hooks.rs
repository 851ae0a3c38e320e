// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 同步核心与界面之间的接缝
//!
//! 存储和轮询器只通过这里的特质与界面交互，便于在任何界面运行时中
//! 实现，也便于在测试中记录调用。

use std::fmt;
use tracing::{error, info};

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

/// 面向操作员的通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.level {
            NoticeLevel::Success => write!(f, "[ok] {}", self.message),
            NoticeLevel::Error => write!(f, "[error] {}", self.message),
            NoticeLevel::Info => write!(f, "[info] {}", self.message),
        }
    }
}

/// 通知接收者特质
///
/// 存储的每一次失败操作都会产生一条通知
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// 把通知写入日志的默认实现
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => error!(message = %notice.message, "Operator notice"),
            _ => info!(message = %notice.message, "Operator notice"),
        }
    }
}

/// 视口位置，例如页面滚动偏移
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportPosition {
    pub offset: f64,
}

/// 提交前后的视口钩子
///
/// 乐观更新在同一个事务中执行 `capture` → 状态提交 → `restore`，
/// 保证翻转和回滚过程中视口保持不动。
pub trait ViewportHook: Send + Sync {
    fn capture(&self) -> ViewportPosition;
    fn restore(&self, position: ViewportPosition);
}

/// 没有视口的环境（例如终端）使用的空实现
#[derive(Debug, Default, Clone, Copy)]
pub struct NoViewport;

impl ViewportHook for NoViewport {
    fn capture(&self) -> ViewportPosition {
        ViewportPosition::default()
    }

    fn restore(&self, _position: ViewportPosition) {}
}
