//! 变更事件类型
//!
//! 定义规范事件 [`ChangeEvent`] 以及宿主树原始事件 [`RawTreeEvent`]。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 输出通道名称常量
pub const EVENT_ADDED: &str = "node-added";
pub const EVENT_REMOVED: &str = "node-removed";
pub const EVENT_CHANGED: &str = "node-changed";
pub const EVENT_ANY: &str = "node-event";

/// 变更类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Removed,
    Changed,
}

impl ChangeKind {
    /// 对应的专用输出通道名称
    pub fn channel_name(&self) -> &'static str {
        match self {
            ChangeKind::Added => EVENT_ADDED,
            ChangeKind::Removed => EVENT_REMOVED,
            ChangeKind::Changed => EVENT_CHANGED,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "Added"),
            ChangeKind::Removed => write!(f, "Removed"),
            ChangeKind::Changed => write!(f, "Changed"),
        }
    }
}

/// 观察模式（每个实例固定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObserverMode {
    /// 只观察根节点的直接子节点
    NonRecursive,
    /// 观察根节点的整棵子树
    Recursive,
}

impl ObserverMode {
    pub fn is_recursive(&self) -> bool {
        matches!(self, ObserverMode::Recursive)
    }
}

impl From<bool> for ObserverMode {
    fn from(recursive: bool) -> Self {
        if recursive {
            ObserverMode::Recursive
        } else {
            ObserverMode::NonRecursive
        }
    }
}

impl fmt::Display for ObserverMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObserverMode::NonRecursive => write!(f, "NonRecursive"),
            ObserverMode::Recursive => write!(f, "Recursive"),
        }
    }
}

/// 规范变更事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent<N> {
    /// 发生变化的节点
    pub node: N,
    /// 变更类型
    pub kind: ChangeKind,
    /// 节点离开的直接父节点（仅 Removed）
    pub parent: Option<N>,
    /// 事件时间戳（毫秒）
    pub timestamp_ms: i64,
}

impl<N> ChangeEvent<N> {
    pub fn added(node: N) -> Self {
        Self::new(node, ChangeKind::Added, None)
    }

    pub fn removed(node: N, parent: N) -> Self {
        Self::new(node, ChangeKind::Removed, Some(parent))
    }

    pub fn changed(node: N) -> Self {
        Self::new(node, ChangeKind::Changed, None)
    }

    fn new(node: N, kind: ChangeKind, parent: Option<N>) -> Self {
        Self {
            node,
            kind,
            parent,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// 获取事件类型名称
    pub fn event_type(&self) -> &'static str {
        match self.kind {
            ChangeKind::Added => "Added",
            ChangeKind::Removed => "Removed",
            ChangeKind::Changed => "Changed",
        }
    }
}

/// 宿主树原始事件
///
/// 每个变体对应观察器订阅的一种宿主信号。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawTreeEvent<N> {
    /// `parent` 的 child_added 信号
    ChildAdded { parent: N, child: N },
    /// `ancestor` 的 descendant_added 信号
    DescendantAdded { ancestor: N, node: N },
    /// `parent` 的 child_removed 信号
    ChildRemoved { parent: N, child: N },
    /// `node` 的属性变更信号
    PropertyChanged { node: N },
}

impl<N> RawTreeEvent<N> {
    /// 归一化为规范事件
    pub fn normalize(self) -> ChangeEvent<N> {
        match self {
            RawTreeEvent::ChildAdded { child, .. } => ChangeEvent::added(child),
            RawTreeEvent::DescendantAdded { node, .. } => ChangeEvent::added(node),
            RawTreeEvent::ChildRemoved { parent, child } => ChangeEvent::removed(child, parent),
            RawTreeEvent::PropertyChanged { node } => ChangeEvent::changed(node),
        }
    }
}
