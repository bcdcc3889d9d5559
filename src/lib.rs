//! SceneWatch - 场景树变更观察器
//!
//! 监听宿主节点树的结构与属性变化，输出 Added / Removed / Changed 三类规范事件，
//! 支持只观察直接子节点或递归观察整棵子树。

// 核心模块
pub mod config;
pub mod error;
pub mod handle;
pub mod host;
pub mod logging;
pub mod observer;
pub mod signal;

// 重新导出常用类型
pub use config::{LoggingConfig, ObserverConfig};
pub use error::{ConfigError, TreeError, WatchError};
pub use handle::ListenerHandle;
pub use host::{HostTree, MemoryTree, NodeId};
pub use observer::{
    ChangeEvent, ChangeKind, ChangeObserver, FnObserver, LoggingObserver, ObserverMode,
    TreeObserver,
};
pub use signal::Signal;
