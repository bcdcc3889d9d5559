//! 树观察器
//!
//! 对外暴露的观察器：组合订阅注册表、挂载控制器、事件路由器与生命周期守卫。
//!
//! ## 单次宿主事件的处理顺序
//! 1. 已销毁则直接忽略
//! 2. 更新订阅注册表（加入时先订阅新节点，移除时先释放句柄）
//! 3. 活动状态下分发规范事件
//!
//! 注册表在分发前已反映变更后的状态，消费者在回调中查询 `is_tracked` 得到的是最新结果。

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::attach::{AttachmentController, RawEventSink};
use super::events::{ChangeEvent, ObserverMode, RawTreeEvent};
use super::lifecycle::LifecycleGuard;
use super::registry::SubscriptionRegistry;
use super::router::EventRouter;
use super::traits::ChangeObserver;
use crate::config::ObserverConfig;
use crate::error::WatchError;
use crate::host::HostTree;
use crate::signal::Signal;

/// 观察器内部共享状态
///
/// 宿主回调只持有它的弱引用。
struct Shared<H: HostTree> {
    id: String,
    this: Weak<Shared<H>>,
    controller: AttachmentController<H>,
    registry: Mutex<SubscriptionRegistry<H::Node>>,
    router: EventRouter<H::Node>,
    guard: LifecycleGuard,
}

impl<H: HostTree> Shared<H> {
    /// 挂载根节点监听、登记清理项并扫描已有节点
    fn initialize(&self) {
        let teardown = self.guard.teardown();

        // 清理顺序：根节点结构监听 → 注册表 → 输出通道
        for handle in self.controller.attach_root(&self.this) {
            teardown.give_listener(handle);
        }

        let this = self.this.clone();
        teardown.give_task(move || {
            if let Some(shared) = this.upgrade() {
                let released = shared.registry.lock().clear();
                tracing::debug!("[TreeObserver] {} 释放 {} 个节点订阅", shared.id, released);
            }
        });

        let this = self.this.clone();
        teardown.give_task(move || {
            if let Some(shared) = this.upgrade() {
                shared.router.close();
            }
        });

        let scope = self.controller.initial_scope();
        let tracked = self
            .registry
            .lock()
            .track_all(scope, |node| self.controller.acquire(node, &self.this));

        tracing::info!(
            "[TreeObserver] {} 初始化完成: mode={}, root={:?}, 已跟踪 {} 个节点",
            self.id,
            self.controller.mode(),
            self.controller.root(),
            tracked
        );
    }

    /// 节点进入观察范围，返回是否新增
    fn enter_scope(&self, node: &H::Node) -> bool {
        let added = self
            .registry
            .lock()
            .track(node, |n| self.controller.acquire(n, &self.this));
        if added {
            tracing::debug!("[TreeObserver] {} 开始跟踪 {:?}", self.id, node);
        }
        added
    }

    /// 节点离开观察范围，返回节点本身此前是否被跟踪
    fn leave_scope(&self, node: &H::Node) -> bool {
        // 宿主查询放在注册表锁之外
        let departing = self.controller.departing_scope(node);

        let mut registry = self.registry.lock();
        let was_tracked = registry.untrack(node);
        let nested = departing
            .iter()
            .skip(1)
            .filter(|descendant| registry.untrack(descendant))
            .count();
        drop(registry);

        if was_tracked {
            tracing::debug!(
                "[TreeObserver] {} 停止跟踪 {:?} (连带 {} 个后代)",
                self.id,
                node,
                nested
            );
        }
        was_tracked
    }
}

impl<H: HostTree> RawEventSink<H::Node> for Shared<H> {
    fn handle_raw(&self, event: RawTreeEvent<H::Node>) {
        if self.guard.is_destroyed() {
            return;
        }

        let dispatch = match &event {
            RawTreeEvent::ChildAdded { child, .. } => self.enter_scope(child),
            RawTreeEvent::DescendantAdded { node, .. } => self.enter_scope(node),
            RawTreeEvent::ChildRemoved { child, .. } => self.leave_scope(child),
            RawTreeEvent::PropertyChanged { node } => self.registry.lock().is_tracked(node),
        };

        if dispatch && !self.guard.is_destroyed() {
            self.router.dispatch(event.normalize());
        }
    }
}

/// 树观察器
///
/// 析构时自动销毁。
pub struct TreeObserver<H: HostTree> {
    shared: Arc<Shared<H>>,
}

impl<H: HostTree> TreeObserver<H> {
    /// 以默认配置创建观察器
    pub fn new(host: H, root: H::Node, recursive: bool) -> Self {
        let config = ObserverConfig {
            recursive,
            ..ObserverConfig::default()
        };
        Self::build(host, root, &config)
    }

    /// 按配置创建观察器，配置无效时返回错误
    pub fn with_config(
        host: H,
        root: H::Node,
        config: &ObserverConfig,
    ) -> Result<Self, WatchError> {
        config.validate()?;
        Ok(Self::build(host, root, config))
    }

    fn build(host: H, root: H::Node, config: &ObserverConfig) -> Self {
        let mode = ObserverMode::from(config.recursive);
        let shared = Arc::new_cyclic(|this| Shared {
            id: Uuid::new_v4().to_string(),
            this: this.clone(),
            controller: AttachmentController::new(host, root, mode),
            registry: Mutex::new(SubscriptionRegistry::new()),
            router: EventRouter::new(config.start_active, config.broadcast_capacity),
            guard: LifecycleGuard::new(),
        });
        shared.initialize();

        Self { shared }
    }

    /// 实例 ID（用于日志）
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    pub fn mode(&self) -> ObserverMode {
        self.shared.controller.mode()
    }

    pub fn root(&self) -> &H::Node {
        self.shared.controller.root()
    }

    /// 节点加入事件
    pub fn on_added(&self) -> &Signal<ChangeEvent<H::Node>> {
        self.shared.router.on_added()
    }

    /// 节点移除事件（携带直接父节点）
    pub fn on_removed(&self) -> &Signal<ChangeEvent<H::Node>> {
        self.shared.router.on_removed()
    }

    /// 节点属性变更事件
    pub fn on_changed(&self) -> &Signal<ChangeEvent<H::Node>> {
        self.shared.router.on_changed()
    }

    /// 全部事件
    pub fn on_any(&self) -> &Signal<ChangeEvent<H::Node>> {
        self.shared.router.on_any()
    }

    /// 订阅事件广播
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent<H::Node>> {
        self.shared.router.subscribe()
    }

    /// 注册命名观察者
    pub fn register(&self, observer: Arc<dyn ChangeObserver<H::Node>>) -> Result<(), WatchError> {
        if self.is_destroyed() {
            return Err(WatchError::Destroyed);
        }
        self.shared.router.register(observer);
        Ok(())
    }

    /// 注销命名观察者
    pub fn unregister(&self, name: &str) {
        self.shared.router.unregister(name);
    }

    pub fn observer_count(&self) -> usize {
        self.shared.router.observer_count()
    }

    pub fn observer_names(&self) -> Vec<String> {
        self.shared.router.observer_names()
    }

    /// 开启 / 暂停事件分发，注册表记账不受影响
    pub fn set_active(&self, active: bool) {
        self.shared.router.set_active(active);
        tracing::debug!("[TreeObserver] {} active={}", self.shared.id, active);
    }

    pub fn is_active(&self) -> bool {
        self.shared.router.is_active()
    }

    /// 节点当前是否在观察范围内
    pub fn is_tracked(&self, node: &H::Node) -> bool {
        self.shared.registry.lock().is_tracked(node)
    }

    pub fn tracked_count(&self) -> usize {
        self.shared.registry.lock().len()
    }

    pub fn tracked_nodes(&self) -> Vec<H::Node> {
        self.shared.registry.lock().nodes()
    }

    /// 注册表持有的存活句柄数（不含根节点结构监听）
    pub fn handle_count(&self) -> usize {
        self.shared.registry.lock().handle_count()
    }

    /// 销毁观察器，可重复调用
    pub fn destroy(&self) {
        if self.shared.guard.destroy() {
            tracing::info!("[TreeObserver] {} 已销毁", self.shared.id);
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.guard.is_destroyed()
    }
}

impl<H: HostTree> Drop for TreeObserver<H> {
    fn drop(&mut self) {
        self.destroy();
    }
}
