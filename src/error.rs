//! 错误类型定义
//!
//! ## 功能
//! - 参考宿主树错误
//! - 配置加载 / 保存错误
//! - 观察器错误

use thiserror::Error;

use crate::host::NodeId;

/// 宿主树错误类型
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// 节点不存在
    #[error("节点不存在: {0}")]
    NodeNotFound(NodeId),

    /// 挂载会形成环
    #[error("无法将 {node} 挂载到 {parent} 下: 会形成环")]
    Cycle { node: NodeId, parent: NodeId },
}

/// 配置错误类型
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("配置读取错误: {0}")]
    Read(String),

    /// 文件写入错误
    #[error("配置写入错误: {0}")]
    Write(String),

    /// YAML 解析错误
    #[error("YAML 解析错误: {0}")]
    Parse(String),

    /// YAML 序列化错误
    #[error("YAML 序列化错误: {0}")]
    Serialize(String),

    /// 配置验证错误
    #[error("配置验证错误: {0}")]
    Validation(String),
}

/// 观察器错误类型
#[derive(Debug, Error)]
pub enum WatchError {
    /// 观察器已销毁
    #[error("观察器已销毁")]
    Destroyed,

    /// 配置错误
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<WatchError> for String {
    fn from(err: WatchError) -> Self {
        err.to_string()
    }
}
