//! 变更观察者 Trait 定义
//!
//! 命名的事件消费者，按优先级接收路由器分发的事件

use std::fmt::Debug;
use std::marker::PhantomData;

use super::events::{ChangeEvent, ChangeKind};

/// 变更观察者 Trait
///
/// 实现此 Trait 的组件可以订阅节点变更通知
pub trait ChangeObserver<N>: Send + Sync {
    /// 观察者名称（用于日志和注销）
    fn name(&self) -> &str;

    /// 处理变更事件
    ///
    /// # Returns
    /// * `Ok(())` - 处理成功
    /// * `Err(String)` - 处理失败，仅记录日志，不影响其他观察者
    fn on_change(&self, event: &ChangeEvent<N>) -> Result<(), String>;

    /// 是否对特定事件感兴趣
    ///
    /// 默认实现对所有事件感兴趣
    fn is_interested_in(&self, _event: &ChangeEvent<N>) -> bool {
        true
    }

    /// 观察者优先级（数字越小优先级越高）
    ///
    /// 默认优先级为 100
    fn priority(&self) -> i32 {
        100
    }
}

/// 函数式观察者（用于简单的回调场景）
pub struct FnObserver<N, F>
where
    F: Fn(&ChangeEvent<N>) -> Result<(), String> + Send + Sync,
{
    name: String,
    priority: i32,
    kinds: Option<Vec<ChangeKind>>,
    handler: F,
    _node: PhantomData<fn(&N)>,
}

impl<N, F> FnObserver<N, F>
where
    F: Fn(&ChangeEvent<N>) -> Result<(), String> + Send + Sync,
{
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            priority: 100,
            kinds: None,
            handler,
            _node: PhantomData,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 只接收指定类型的事件
    pub fn only(mut self, kinds: &[ChangeKind]) -> Self {
        self.kinds = Some(kinds.to_vec());
        self
    }
}

impl<N, F> ChangeObserver<N> for FnObserver<N, F>
where
    F: Fn(&ChangeEvent<N>) -> Result<(), String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_change(&self, event: &ChangeEvent<N>) -> Result<(), String> {
        (self.handler)(event)
    }

    fn is_interested_in(&self, event: &ChangeEvent<N>) -> bool {
        match &self.kinds {
            Some(kinds) => kinds.contains(&event.kind),
            None => true,
        }
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// 日志观察者
///
/// 以 debug 级别记录每个事件
pub struct LoggingObserver;

impl<N: Debug> ChangeObserver<N> for LoggingObserver {
    fn name(&self) -> &str {
        "LoggingObserver"
    }

    fn priority(&self) -> i32 {
        1000 // 最低优先级
    }

    fn on_change(&self, event: &ChangeEvent<N>) -> Result<(), String> {
        match &event.parent {
            Some(parent) => tracing::debug!(
                "[LoggingObserver] {} {:?} (parent: {:?})",
                event.kind,
                event.node,
                parent
            ),
            None => tracing::debug!("[LoggingObserver] {} {:?}", event.kind, event.node),
        }
        Ok(())
    }
}
