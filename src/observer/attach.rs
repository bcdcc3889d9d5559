//! 挂载控制器
//!
//! 根据观察模式决定每个节点进入 / 离开观察范围时需要获取或释放哪些监听。
//!
//! | 模式 | 根节点结构监听 | 被跟踪节点的监听 |
//! |------|----------------|------------------|
//! | NonRecursive | child_added + child_removed | property_changed |
//! | Recursive | descendant_added + child_removed | property_changed + child_removed |
//!
//! 递归模式下每个被跟踪节点同时作为潜在父节点挂载 child_removed，
//! 因此移除事件总能带上节点离开的直接父节点。

use std::sync::Weak;

use super::events::{ObserverMode, RawTreeEvent};
use super::registry::Subscription;
use crate::handle::ListenerHandle;
use crate::host::HostTree;

/// 原始事件接收方
pub trait RawEventSink<N>: Send + Sync {
    fn handle_raw(&self, event: RawTreeEvent<N>);
}

/// 挂载控制器
pub struct AttachmentController<H: HostTree> {
    host: H,
    root: H::Node,
    mode: ObserverMode,
}

impl<H: HostTree> AttachmentController<H> {
    pub fn new(host: H, root: H::Node, mode: ObserverMode) -> Self {
        Self { host, root, mode }
    }

    pub fn root(&self) -> &H::Node {
        &self.root
    }

    pub fn mode(&self) -> ObserverMode {
        self.mode
    }

    /// 在根节点上挂载结构监听
    pub fn attach_root<S>(&self, sink: &Weak<S>) -> Vec<ListenerHandle>
    where
        S: RawEventSink<H::Node> + 'static,
    {
        let mut handles = Vec::with_capacity(2);

        match self.mode {
            ObserverMode::NonRecursive => {
                let weak = sink.clone();
                let parent = self.root.clone();
                handles.push(self.host.on_child_added(
                    &self.root,
                    Box::new(move |child: &H::Node| {
                        forward(
                            &weak,
                            RawTreeEvent::ChildAdded {
                                parent: parent.clone(),
                                child: child.clone(),
                            },
                        )
                    }),
                ));
            }
            ObserverMode::Recursive => {
                let weak = sink.clone();
                let ancestor = self.root.clone();
                handles.push(self.host.on_descendant_added(
                    &self.root,
                    Box::new(move |node: &H::Node| {
                        forward(
                            &weak,
                            RawTreeEvent::DescendantAdded {
                                ancestor: ancestor.clone(),
                                node: node.clone(),
                            },
                        )
                    }),
                ));
            }
        }

        handles.push(self.child_removed_listener(&self.root, sink));
        handles
    }

    /// 构造时已存在于观察范围内的节点
    pub fn initial_scope(&self) -> Vec<H::Node> {
        match self.mode {
            ObserverMode::NonRecursive => self.host.children(&self.root),
            ObserverMode::Recursive => self.host.descendants(&self.root),
        }
    }

    /// 为进入观察范围的节点获取监听
    pub fn acquire<S>(&self, node: &H::Node, sink: &Weak<S>) -> Subscription
    where
        S: RawEventSink<H::Node> + 'static,
    {
        let weak = sink.clone();
        let watched = node.clone();
        let changed = self.host.on_property_changed(
            node,
            Box::new(move || {
                forward(
                    &weak,
                    RawTreeEvent::PropertyChanged {
                        node: watched.clone(),
                    },
                )
            }),
        );

        let subscription = Subscription::new(changed);
        match self.mode {
            ObserverMode::NonRecursive => subscription,
            ObserverMode::Recursive => {
                subscription.with_child_removed(self.child_removed_listener(node, sink))
            }
        }
    }

    /// 离开观察范围的节点集合
    ///
    /// 递归模式下包括被移除节点的整棵子树；宿主在触发 child_removed 时子树仍然完整。
    pub fn departing_scope(&self, node: &H::Node) -> Vec<H::Node> {
        let mut departing = vec![node.clone()];
        if self.mode.is_recursive() {
            departing.extend(self.host.descendants(node));
        }
        departing
    }

    fn child_removed_listener<S>(&self, parent: &H::Node, sink: &Weak<S>) -> ListenerHandle
    where
        S: RawEventSink<H::Node> + 'static,
    {
        let weak = sink.clone();
        let former_parent = parent.clone();
        self.host.on_child_removed(
            parent,
            Box::new(move |child: &H::Node| {
                forward(
                    &weak,
                    RawTreeEvent::ChildRemoved {
                        parent: former_parent.clone(),
                        child: child.clone(),
                    },
                )
            }),
        )
    }
}

/// 观察器已释放时丢弃事件
fn forward<N, S>(sink: &Weak<S>, event: RawTreeEvent<N>)
where
    S: RawEventSink<N>,
{
    if let Some(sink) = sink.upgrade() {
        sink.handle_raw(event);
    }
}
