//! 统一配置中心
//!
//! 提供中枢服务的全局配置管理，包括：
//! - 监听地址与 CORS
//! - 中枢行为（私聊回显、重连去重范围、命令队列容量）
//! - 指标采样间隔
//! - 可选的 JWT 身份校验
//!
//! 加载顺序：默认值 → 可选配置文件（`APP_CONFIG_FILE`，toml / yaml / json）→ 环境变量（`APP_*`，以 `__` 分隔层级）。

use std::time::Duration;

use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 全局应用配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// 服务配置
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,
    /// 中枢配置
    #[serde(default)]
    #[validate(nested)]
    pub hub: HubConfig,
    /// 指标配置
    #[serde(default)]
    #[validate(nested)]
    pub metrics: MetricsConfig,
    /// 认证配置
    #[serde(default)]
    #[validate(nested)]
    pub auth: AuthConfig,
}

/// 服务器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            cors_origins: vec!["*".into()],
        }
    }
}

/// 重连去重的作用范围
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupScope {
    /// 加入房间时，逐出同一用户在该房间内的旧会话
    #[default]
    Room,
    /// 注册新会话时，逐出同一用户其它会话的全部房间成员身份
    Global,
}

/// 中枢配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct HubConfig {
    /// 私聊是否回显给发送者的其它会话
    #[serde(default)]
    pub echo_direct_to_sender: bool,
    #[serde(default)]
    pub reconnect_dedup: DedupScope,
    /// 连接任务到中枢任务的命令队列容量
    #[validate(range(min = 1))]
    pub command_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            echo_direct_to_sender: false,
            reconnect_dedup: DedupScope::Room,
            command_buffer: 1024,
        }
    }
}

/// 指标配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MetricsConfig {
    /// 发布 server_stats 的间隔
    #[validate(range(min = 1))]
    pub publish_interval_ms: u64,
    /// 吞吐计数清零的间隔，与发布间隔相同即统一为一个窗口
    #[validate(range(min = 1))]
    pub reset_interval_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            publish_interval_ms: 2000,
            reset_interval_ms: 1000,
        }
    }
}

impl MetricsConfig {
    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms)
    }

    pub fn reset_interval(&self) -> Duration {
        Duration::from_millis(self.reset_interval_ms)
    }
}

/// 认证配置；未设置密钥时直接信任客户端声明的 user_id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct AuthConfig {
    #[serde(default)]
    #[validate(length(min = 32))]
    pub jwt_secret: Option<String>,
}

impl AppConfig {
    /// 默认值 + 配置文件 + 环境变量
    pub fn figment() -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));
        if let Ok(path) = std::env::var("APP_CONFIG_FILE") {
            if path.ends_with(".yml") || path.ends_with(".yaml") {
                figment = figment.merge(Yaml::file(path));
            } else if path.ends_with(".json") {
                figment = figment.merge(Json::file(path));
            } else {
                figment = figment.merge(Toml::file(path));
            }
        }
        figment.merge(Env::prefixed("APP_").split("__"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: AppConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// 日志用的脱敏表示
    pub fn sanitize(&self) -> String {
        let mut redacted = self.clone();
        if redacted.auth.jwt_secret.is_some() {
            redacted.auth.jwt_secret = Some("[REDACTED]".into());
        }
        format!("{:?}", redacted)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}
