//! 观察器配置
//!
//! 提供 YAML 配置的加载、保存与校验

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// 支持的日志级别
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 是否启用日志输出
    pub enabled: bool,
    /// 日志级别
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
        }
    }
}

/// 观察器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// 是否递归观察整棵子树
    pub recursive: bool,
    /// 创建后是否立即分发事件
    pub start_active: bool,
    /// 广播通道容量
    pub broadcast_capacity: usize,
    /// 日志配置
    pub logging: LoggingConfig,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            start_active: true,
            broadcast_capacity: 256,
            logging: LoggingConfig::default(),
        }
    }
}

impl ObserverConfig {
    /// 从文件加载配置
    ///
    /// 如果文件不存在，返回默认配置
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("[ObserverConfig] 配置文件不存在，使用默认配置: {:?}", path);
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// 解析 YAML 并校验
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 序列化为 YAML
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// 保存配置到文件
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let content = self.to_yaml()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write(e.to_string()))?;
            }
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write(e.to_string()))?;

        tracing::info!("[ObserverConfig] 配置已保存: {:?}", path);
        Ok(())
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::Validation(
                "broadcast_capacity 必须大于 0".to_string(),
            ));
        }

        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "未知日志级别: {}",
                self.logging.level
            )));
        }

        Ok(())
    }
}
