// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// 控制台配置设置
///
/// 包含后端API和队列轮询器的所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 后端API配置
    pub api: ApiSettings,
    /// 队列轮询配置
    pub poller: PollerSettings,
}

/// 后端API配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    /// API基础地址，例如 `http://localhost:8000`
    pub base_url: String,
    /// 单个请求的传输层超时时间（秒）
    pub request_timeout_secs: u64,
}

/// 队列轮询配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct PollerSettings {
    /// 有待处理工作时的轮询周期（毫秒）
    pub interval_ms: u64,
    /// 清空队列后确认性拉取的延迟（毫秒）
    pub purge_confirm_delay_ms: u64,
}

impl ApiSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PollerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn purge_confirm_delay(&self) -> Duration {
        Duration::from_millis(self.purge_confirm_delay_ms)
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次加载默认值、配置文件和 `CRAWLSYNC__*` 环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Backend defaults
            .set_default("api.base_url", "http://localhost:8000")?
            .set_default("api.request_timeout_secs", 30)?
            // Poller defaults
            .set_default("poller.interval_ms", 2000)?
            .set_default("poller.purge_confirm_delay_ms", 1000)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("CRAWLSYNC")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}
