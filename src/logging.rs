//! 日志初始化

use tracing::Level;

use crate::config::LoggingConfig;

/// 解析日志级别，未知级别回退到 INFO
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// 安装全局 fmt 订阅器
///
/// 已安装过订阅器时返回 false。
pub fn init(config: &LoggingConfig) -> bool {
    if !config.enabled {
        return false;
    }

    let installed = tracing_subscriber::fmt()
        .with_max_level(parse_level(&config.level))
        .with_target(false)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("[Logging] 日志已初始化: level={}", config.level);
    }
    installed
}
