//! 订阅注册表
//!
//! 维护“被观察节点 → 监听句柄”的映射，句柄的生命周期归注册表所有。
//! 条目存在当且仅当节点处于观察范围内。

use indexmap::IndexMap;
use std::hash::Hash;

use crate::handle::ListenerHandle;

/// 单个节点持有的订阅
#[derive(Debug)]
pub struct Subscription {
    /// 属性变更监听
    pub changed: ListenerHandle,
    /// 作为父节点的子节点移除监听（仅递归模式）
    pub child_removed: Option<ListenerHandle>,
}

impl Subscription {
    pub fn new(changed: ListenerHandle) -> Self {
        Self {
            changed,
            child_removed: None,
        }
    }

    pub fn with_child_removed(mut self, handle: ListenerHandle) -> Self {
        self.child_removed = Some(handle);
        self
    }

    /// 句柄数量
    pub fn handle_count(&self) -> usize {
        1 + usize::from(self.child_removed.is_some())
    }

    fn dispose(self) {
        self.changed.dispose();
        if let Some(handle) = self.child_removed {
            handle.dispose();
        }
    }
}

/// 订阅注册表
pub struct SubscriptionRegistry<N> {
    entries: IndexMap<N, Subscription>,
}

impl<N: Clone + Eq + Hash> SubscriptionRegistry<N> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// 跟踪节点
    ///
    /// 仅在节点尚未跟踪时调用 `acquire` 获取句柄，返回是否新增。
    pub fn track<F>(&mut self, node: &N, acquire: F) -> bool
    where
        F: FnOnce(&N) -> Subscription,
    {
        if self.entries.contains_key(node) {
            return false;
        }
        let subscription = acquire(node);
        self.entries.insert(node.clone(), subscription);
        true
    }

    /// 批量跟踪，返回新增数量
    pub fn track_all<I, F>(&mut self, nodes: I, mut acquire: F) -> usize
    where
        I: IntoIterator<Item = N>,
        F: FnMut(&N) -> Subscription,
    {
        nodes
            .into_iter()
            .filter(|node| self.track(node, &mut acquire))
            .count()
    }

    /// 取消跟踪并释放句柄，节点不存在时为空操作
    pub fn untrack(&mut self, node: &N) -> bool {
        match self.entries.shift_remove(node) {
            Some(subscription) => {
                subscription.dispose();
                true
            }
            None => false,
        }
    }

    /// 释放全部句柄并清空，返回释放的条目数
    pub fn clear(&mut self) -> usize {
        let entries = std::mem::take(&mut self.entries);
        let count = entries.len();
        for (_, subscription) in entries {
            subscription.dispose();
        }
        count
    }

    pub fn is_tracked(&self, node: &N) -> bool {
        self.entries.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按跟踪顺序返回节点
    pub fn nodes(&self) -> Vec<N> {
        self.entries.keys().cloned().collect()
    }

    /// 存活句柄总数
    pub fn handle_count(&self) -> usize {
        self.entries.values().map(Subscription::handle_count).sum()
    }
}

impl<N: Clone + Eq + Hash> Default for SubscriptionRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}
