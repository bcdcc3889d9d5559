//! 事件路由器
//!
//! 将规范事件分发到所有输出通道：四个信号、已注册的观察者、广播通道。
//! 活动标记为 false 时跳过分发，注册表的记账由调用方照常完成。

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use super::events::{ChangeEvent, ChangeKind, EVENT_ANY};
use super::traits::ChangeObserver;
use crate::signal::Signal;

/// 事件路由器
pub struct EventRouter<N> {
    active: AtomicBool,
    closed: AtomicBool,
    on_added: Signal<ChangeEvent<N>>,
    on_removed: Signal<ChangeEvent<N>>,
    on_changed: Signal<ChangeEvent<N>>,
    on_any: Signal<ChangeEvent<N>>,
    /// 观察者列表（按优先级排序）
    observers: RwLock<BTreeMap<i32, Vec<Arc<dyn ChangeObserver<N>>>>>,
    /// 事件广播通道
    event_tx: broadcast::Sender<ChangeEvent<N>>,
}

impl<N> EventRouter<N>
where
    N: Clone + Debug + Send + Sync + 'static,
{
    pub fn new(active: bool, broadcast_capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(broadcast_capacity.max(1));

        Self {
            active: AtomicBool::new(active),
            closed: AtomicBool::new(false),
            on_added: Signal::new(),
            on_removed: Signal::new(),
            on_changed: Signal::new(),
            on_any: Signal::new(),
            observers: RwLock::new(BTreeMap::new()),
            event_tx,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    pub fn on_added(&self) -> &Signal<ChangeEvent<N>> {
        &self.on_added
    }

    pub fn on_removed(&self) -> &Signal<ChangeEvent<N>> {
        &self.on_removed
    }

    pub fn on_changed(&self) -> &Signal<ChangeEvent<N>> {
        &self.on_changed
    }

    pub fn on_any(&self) -> &Signal<ChangeEvent<N>> {
        &self.on_any
    }

    /// 订阅事件广播
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent<N>> {
        self.event_tx.subscribe()
    }

    /// 注册观察者
    pub fn register(&self, observer: Arc<dyn ChangeObserver<N>>) {
        let priority = observer.priority();
        let name = observer.name().to_string();

        self.observers
            .write()
            .entry(priority)
            .or_default()
            .push(observer);

        tracing::info!("[EventRouter] 注册观察者: {} (优先级: {})", name, priority);
    }

    /// 注销观察者（按名称）
    pub fn unregister(&self, name: &str) {
        let mut observers = self.observers.write();
        for entries in observers.values_mut() {
            entries.retain(|o| o.name() != name);
        }
        // 清理空的优先级组
        observers.retain(|_, v| !v.is_empty());

        tracing::info!("[EventRouter] 注销观察者: {}", name);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().values().map(|v| v.len()).sum()
    }

    pub fn observer_names(&self) -> Vec<String> {
        self.observers
            .read()
            .values()
            .flatten()
            .map(|o| o.name().to_string())
            .collect()
    }

    /// 分发事件
    ///
    /// 返回是否实际分发（非活动状态下返回 false）。
    pub fn dispatch(&self, event: ChangeEvent<N>) -> bool {
        if !self.is_active() {
            tracing::trace!("[EventRouter] 非活动状态，跳过事件: {}", event.event_type());
            return false;
        }

        tracing::trace!(
            "[EventRouter] 分发 {:?} -> {} / {}",
            event.node,
            EVENT_ANY,
            event.kind.channel_name()
        );

        self.on_any.fire(&event);
        match event.kind {
            ChangeKind::Added => self.on_added.fire(&event),
            ChangeKind::Removed => self.on_removed.fire(&event),
            ChangeKind::Changed => self.on_changed.fire(&event),
        }

        // 消费者在回调中销毁了观察器
        if self.is_closed() {
            return true;
        }
        self.notify_observers(&event);

        // 没有接收者时发送失败，忽略
        let _ = self.event_tx.send(event);
        true
    }

    /// 通知所有感兴趣的观察者
    fn notify_observers(&self, event: &ChangeEvent<N>) {
        let observers: Vec<Arc<dyn ChangeObserver<N>>> = {
            let observers = self.observers.read();
            observers
                .values()
                .flatten()
                .filter(|o| o.is_interested_in(event))
                .cloned()
                .collect()
        };

        // 按优先级顺序通知（BTreeMap 已排序）
        for observer in observers {
            if self.is_closed() {
                break;
            }
            if let Err(e) = observer.on_change(event) {
                tracing::error!("[EventRouter] 观察者 {} 处理失败: {}", observer.name(), e);
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// 关闭全部输出通道
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.on_added.close();
        self.on_removed.close();
        self.on_changed.close();
        self.on_any.close();

        let observers = std::mem::take(&mut *self.observers.write());
        drop(observers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::traits::FnObserver;
    use parking_lot::Mutex;

    #[test]
    fn test_dispatch_routes_by_kind() {
        let router: EventRouter<u32> = EventRouter::new(true, 16);
        let log = Arc::new(Mutex::new(Vec::new()));

        let l = log.clone();
        let _any = router.on_any().connect(move |e| l.lock().push(format!("any {}", e.kind)));
        let l = log.clone();
        let _removed = router
            .on_removed()
            .connect(move |e| l.lock().push(format!("removed {}", e.node)));

        assert!(router.dispatch(ChangeEvent::removed(2, 1)));
        assert!(router.dispatch(ChangeEvent::added(3)));

        assert_eq!(
            *log.lock(),
            vec!["any Removed", "removed 2", "any Added"]
        );
    }

    #[test]
    fn test_inactive_router_suppresses_everything() {
        let router: EventRouter<u32> = EventRouter::new(false, 16);
        let mut rx = router.subscribe();
        let log = Arc::new(Mutex::new(0usize));
        let l = log.clone();
        let _any = router.on_any().connect(move |_| *l.lock() += 1);

        assert!(!router.dispatch(ChangeEvent::changed(1)));
        assert_eq!(*log.lock(), 0);
        assert!(rx.try_recv().is_err());

        router.set_active(true);
        assert!(router.dispatch(ChangeEvent::changed(1)));
        assert_eq!(*log.lock(), 1);
        assert_eq!(rx.try_recv().map(|e| e.node).ok(), Some(1));
    }

    #[test]
    fn test_observer_priority_order_and_failure_isolation() {
        let router: EventRouter<u32> = EventRouter::new(true, 16);
        let order = Arc::new(Mutex::new(Vec::new()));

        for (name, priority) in [("low", 100), ("high", 10), ("medium", 50)] {
            let o = order.clone();
            router.register(Arc::new(
                FnObserver::new(name, move |_e: &ChangeEvent<u32>| {
                    o.lock().push(name);
                    if name == "high" {
                        Err("boom".to_string())
                    } else {
                        Ok(())
                    }
                })
                .with_priority(priority),
            ));
        }

        router.dispatch(ChangeEvent::added(1));
        assert_eq!(*order.lock(), vec!["high", "medium", "low"]);

        router.unregister("medium");
        assert_eq!(router.observer_count(), 2);
        assert_eq!(router.observer_names(), vec!["high", "low"]);
    }

    #[test]
    fn test_close_disconnects_channels() {
        let router: EventRouter<u32> = EventRouter::new(true, 16);
        let handle = router.on_any().connect(|_| {});
        router.register(Arc::new(FnObserver::new("x", |_e: &ChangeEvent<u32>| Ok(()))));

        router.close();
        assert!(router.is_closed());
        assert!(router.on_any().is_closed());
        assert_eq!(router.on_any().listener_count(), 0);
        assert_eq!(router.observer_count(), 0);
        handle.dispose();
    }
}
