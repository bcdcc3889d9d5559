//! 内存宿主树
//!
//! [`HostTree`] 的参考实现，供测试与演示程序使用。
//!
//! ## 信号语义
//! - 改变父节点时依次触发：旧父节点 `child_removed`、新父节点 `child_added`、
//!   新父节点及其所有祖先对被移动节点及其每个已有后代的 `descendant_added`
//! - 属性值实际变化时才触发 `changed`
//! - 所有信号都在释放树锁之后触发；批内某个回调再次修改了树时，
//!   已不成立的后续信号（如节点已被移走后的 `descendant_added`）直接丢弃

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use super::{ChangeHandler, HostTree, NodeHandler};
use crate::error::TreeError;
use crate::handle::ListenerHandle;
use crate::signal::Signal;

/// 名称属性键
pub const NAME_PROPERTY: &str = "Name";

/// 节点 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 节点信号
#[derive(Clone, Default)]
struct NodeSignals {
    child_added: Signal<NodeId>,
    child_removed: Signal<NodeId>,
    descendant_added: Signal<NodeId>,
    changed: Signal<()>,
}

impl NodeSignals {
    fn listener_count(&self) -> usize {
        self.child_added.listener_count()
            + self.child_removed.listener_count()
            + self.descendant_added.listener_count()
            + self.changed.listener_count()
    }
}

/// 内部节点数据
struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    properties: BTreeMap<String, String>,
    signals: NodeSignals,
}

#[derive(Default)]
struct TreeState {
    nodes: HashMap<NodeId, NodeData>,
    next_id: u64,
}

impl TreeState {
    fn node(&self, id: NodeId) -> Result<&NodeData, TreeError> {
        self.nodes.get(&id).ok_or(TreeError::NodeNotFound(id))
    }

    /// 前序遍历后代（不含自身）
    fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(&id) {
            Some(data) => data.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(data) = self.nodes.get(&current) {
                stack.extend(data.children.iter().rev().copied());
            }
        }
        out
    }

    /// 自身及所有祖先，由近到远
    fn ancestry(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = self.nodes.get(&id).and_then(|d| d.parent);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.nodes.get(&parent).and_then(|d| d.parent);
        }
        chain
    }
}

/// 待触发的结构信号
///
/// 同一批信号中前面的回调可能已经再次修改了树，触发前按当前状态重新确认。
enum Pending {
    ChildRemoved {
        signal: Signal<NodeId>,
        parent: NodeId,
        child: NodeId,
    },
    ChildAdded {
        signal: Signal<NodeId>,
        parent: NodeId,
        child: NodeId,
    },
    DescendantAdded {
        signal: Signal<NodeId>,
        ancestor: NodeId,
        node: NodeId,
    },
}

impl Pending {
    /// 信号描述的关系在当前树上是否仍然成立
    fn is_live(&self, state: &TreeState) -> bool {
        let parent_of = |node: &NodeId| state.nodes.get(node).and_then(|d| d.parent);
        match self {
            Pending::ChildRemoved { parent, child, .. } => parent_of(child) != Some(*parent),
            Pending::ChildAdded { parent, child, .. } => parent_of(child) == Some(*parent),
            Pending::DescendantAdded { ancestor, node, .. } => {
                state.ancestry(*node).iter().skip(1).any(|a| a == ancestor)
            }
        }
    }

    fn fire(self) {
        match self {
            Pending::ChildRemoved { signal, child, .. } => signal.fire(&child),
            Pending::ChildAdded { signal, child, .. } => signal.fire(&child),
            Pending::DescendantAdded { signal, node, .. } => signal.fire(&node),
        }
    }
}

/// 内存宿主树
///
/// 克隆得到的是同一棵树的另一个引用。
#[derive(Clone, Default)]
pub struct MemoryTree {
    state: Arc<RwLock<TreeState>>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建一个未挂载的节点
    pub fn create(&self, name: impl Into<String>) -> NodeId {
        let mut state = self.state.write();
        let id = NodeId(state.next_id);
        state.next_id += 1;

        let mut properties = BTreeMap::new();
        properties.insert(NAME_PROPERTY.to_string(), name.into());
        state.nodes.insert(
            id,
            NodeData {
                parent: None,
                children: Vec::new(),
                properties,
                signals: NodeSignals::default(),
            },
        );
        id
    }

    /// 创建节点并挂载到 `parent` 下
    pub fn create_child(&self, parent: NodeId, name: impl Into<String>) -> Result<NodeId, TreeError> {
        self.state.read().node(parent)?;
        let id = self.create(name);
        self.set_parent(id, Some(parent))?;
        Ok(id)
    }

    /// 将 `child` 挂载到 `parent` 下
    pub fn add_child(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.set_parent(child, Some(parent))
    }

    /// 将节点从父节点上移除
    pub fn detach(&self, node: NodeId) -> Result<(), TreeError> {
        self.set_parent(node, None)
    }

    /// 修改父节点
    pub fn set_parent(&self, node: NodeId, parent: Option<NodeId>) -> Result<(), TreeError> {
        let pending = {
            let mut state = self.state.write();
            let old_parent = state.node(node)?.parent;

            if let Some(parent) = parent {
                state.node(parent)?;
                if state.ancestry(parent).contains(&node) {
                    return Err(TreeError::Cycle { node, parent });
                }
            }
            if old_parent == parent {
                return Ok(());
            }

            let mut pending = Vec::new();

            if let Some(old) = old_parent {
                if let Some(data) = state.nodes.get_mut(&old) {
                    data.children.retain(|c| *c != node);
                    pending.push(Pending::ChildRemoved {
                        signal: data.signals.child_removed.clone(),
                        parent: old,
                        child: node,
                    });
                }
            }

            if let Some(data) = state.nodes.get_mut(&node) {
                data.parent = parent;
            }

            if let Some(new_parent) = parent {
                if let Some(data) = state.nodes.get_mut(&new_parent) {
                    data.children.push(node);
                    pending.push(Pending::ChildAdded {
                        signal: data.signals.child_added.clone(),
                        parent: new_parent,
                        child: node,
                    });
                }

                let mut subtree = vec![node];
                subtree.extend(state.descendants(node));
                let ancestry = state.ancestry(new_parent);
                for moved in subtree {
                    for ancestor in &ancestry {
                        if let Some(data) = state.nodes.get(ancestor) {
                            pending.push(Pending::DescendantAdded {
                                signal: data.signals.descendant_added.clone(),
                                ancestor: *ancestor,
                                node: moved,
                            });
                        }
                    }
                }
            }

            pending
        };

        tracing::trace!("[MemoryTree] {} 父节点变更为 {:?}", node, parent);

        for signal in pending {
            // 前面的回调可能已把节点移走
            let live = signal.is_live(&self.state.read());
            if live {
                signal.fire();
            }
        }
        Ok(())
    }

    /// 设置属性，值发生变化时触发 `changed`
    pub fn set_property(
        &self,
        node: NodeId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), TreeError> {
        let key = key.into();
        let value = value.into();
        let signal = {
            let mut state = self.state.write();
            let data = state
                .nodes
                .get_mut(&node)
                .ok_or(TreeError::NodeNotFound(node))?;
            if data.properties.get(&key) == Some(&value) {
                return Ok(());
            }
            data.properties.insert(key, value);
            data.signals.changed.clone()
        };

        signal.fire(&());
        Ok(())
    }

    /// 重命名节点
    pub fn rename(&self, node: NodeId, name: impl Into<String>) -> Result<(), TreeError> {
        self.set_property(node, NAME_PROPERTY, name)
    }

    pub fn property(&self, node: NodeId, key: &str) -> Option<String> {
        self.state
            .read()
            .nodes
            .get(&node)
            .and_then(|d| d.properties.get(key).cloned())
    }

    pub fn name(&self, node: NodeId) -> Option<String> {
        self.property(node, NAME_PROPERTY)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.state.read().nodes.get(&node).and_then(|d| d.parent)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.state.read().nodes.contains_key(&node)
    }

    /// 节点上的存活监听者数量
    pub fn listener_count(&self, node: NodeId) -> usize {
        let signals = self
            .state
            .read()
            .nodes
            .get(&node)
            .map(|d| d.signals.clone());
        signals.map(|s| s.listener_count()).unwrap_or(0)
    }

    /// 整棵树上的存活监听者数量
    pub fn total_listener_count(&self) -> usize {
        let signals: Vec<NodeSignals> = self
            .state
            .read()
            .nodes
            .values()
            .map(|d| d.signals.clone())
            .collect();
        signals.iter().map(NodeSignals::listener_count).sum()
    }

    fn signals(&self, node: NodeId) -> Option<NodeSignals> {
        self.state.read().nodes.get(&node).map(|d| d.signals.clone())
    }

    fn connect_node(
        &self,
        node: NodeId,
        pick: fn(&NodeSignals) -> &Signal<NodeId>,
        handler: NodeHandler<NodeId>,
    ) -> ListenerHandle {
        match self.signals(node) {
            Some(signals) => pick(&signals).connect(move |child| handler(child)),
            None => {
                tracing::warn!("[MemoryTree] 订阅不存在的节点: {}", node);
                ListenerHandle::noop()
            }
        }
    }
}

impl HostTree for MemoryTree {
    type Node = NodeId;

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.state
            .read()
            .nodes
            .get(node)
            .map(|d| d.children.clone())
            .unwrap_or_default()
    }

    fn descendants(&self, node: &NodeId) -> Vec<NodeId> {
        self.state.read().descendants(*node)
    }

    fn on_child_added(&self, node: &NodeId, handler: NodeHandler<NodeId>) -> ListenerHandle {
        self.connect_node(*node, |s| &s.child_added, handler)
    }

    fn on_child_removed(&self, node: &NodeId, handler: NodeHandler<NodeId>) -> ListenerHandle {
        self.connect_node(*node, |s| &s.child_removed, handler)
    }

    fn on_descendant_added(&self, node: &NodeId, handler: NodeHandler<NodeId>) -> ListenerHandle {
        self.connect_node(*node, |s| &s.descendant_added, handler)
    }

    fn on_property_changed(&self, node: &NodeId, handler: ChangeHandler) -> ListenerHandle {
        match self.signals(*node) {
            Some(signals) => signals.changed.connect(move |_| handler()),
            None => {
                tracing::warn!("[MemoryTree] 订阅不存在的节点: {}", node);
                ListenerHandle::noop()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn record(tree: &MemoryTree, node: NodeId) -> (Arc<Mutex<Vec<String>>>, Vec<ListenerHandle>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();

        let l = log.clone();
        handles.push(tree.on_child_added(&node, Box::new(move |c: &NodeId| l.lock().push(format!("added {}", c)))));
        let l = log.clone();
        handles.push(tree.on_child_removed(&node, Box::new(move |c: &NodeId| l.lock().push(format!("removed {}", c)))));
        let l = log.clone();
        handles.push(tree.on_descendant_added(&node, Box::new(move |c: &NodeId| l.lock().push(format!("descendant {}", c)))));
        let l = log.clone();
        handles.push(tree.on_property_changed(&node, Box::new(move || l.lock().push("changed".to_string()))));

        (log, handles)
    }

    #[test]
    fn test_children_and_descendants() {
        let tree = MemoryTree::new();
        let root = tree.create("root");
        let a = tree.create_child(root, "a").unwrap();
        let b = tree.create_child(a, "b").unwrap();
        let c = tree.create_child(root, "c").unwrap();

        assert_eq!(tree.children(&root), vec![a, c]);
        assert_eq!(tree.descendants(&root), vec![a, b, c]);
        assert_eq!(tree.parent(b), Some(a));
        assert_eq!(tree.name(b).as_deref(), Some("b"));
    }

    #[test]
    fn test_reparent_signal_order() {
        let tree = MemoryTree::new();
        let root = tree.create("root");
        let old = tree.create_child(root, "old").unwrap();
        let new = tree.create_child(root, "new").unwrap();
        let moved = tree.create_child(old, "moved").unwrap();
        let leaf = tree.create_child(moved, "leaf").unwrap();

        let (old_log, _old_handles) = record(&tree, old);
        let (new_log, _new_handles) = record(&tree, new);
        let (root_log, _root_handles) = record(&tree, root);

        tree.add_child(new, moved).unwrap();

        assert_eq!(*old_log.lock(), vec![format!("removed {}", moved)]);
        assert_eq!(
            *new_log.lock(),
            vec![
                format!("added {}", moved),
                format!("descendant {}", moved),
                format!("descendant {}", leaf),
            ]
        );
        assert_eq!(
            *root_log.lock(),
            vec![format!("descendant {}", moved), format!("descendant {}", leaf)]
        );
    }

    #[test]
    fn test_cycle_rejected() {
        let tree = MemoryTree::new();
        let root = tree.create("root");
        let child = tree.create_child(root, "child").unwrap();

        assert_eq!(
            tree.add_child(child, root),
            Err(TreeError::Cycle {
                node: root,
                parent: child
            })
        );
        assert_eq!(
            tree.add_child(root, root),
            Err(TreeError::Cycle {
                node: root,
                parent: root
            })
        );
    }

    #[test]
    fn test_unknown_node() {
        let tree = MemoryTree::new();
        let ghost = NodeId::from_raw(42);
        assert_eq!(tree.detach(ghost), Err(TreeError::NodeNotFound(ghost)));
        assert!(tree.children(&ghost).is_empty());
        assert!(tree.on_property_changed(&ghost, Box::new(|| {})).is_disposed());
    }

    #[test]
    fn test_property_change_fires_only_on_difference() {
        let tree = MemoryTree::new();
        let node = tree.create("node");
        let (log, _handles) = record(&tree, node);

        tree.set_property(node, "Color", "red").unwrap();
        tree.set_property(node, "Color", "red").unwrap();
        tree.rename(node, "renamed").unwrap();

        assert_eq!(log.lock().len(), 2);
        assert_eq!(tree.property(node, "Color").as_deref(), Some("red"));
    }

    #[test]
    fn test_listener_count_tracks_handles() {
        let tree = MemoryTree::new();
        let node = tree.create("node");
        let (_log, handles) = record(&tree, node);
        assert_eq!(tree.listener_count(node), 4);
        assert_eq!(tree.total_listener_count(), 4);

        drop(handles);
        assert_eq!(tree.listener_count(node), 0);
    }

    #[test]
    fn test_handler_may_reenter_tree() {
        let tree = MemoryTree::new();
        let root = tree.create("root");
        let child = tree.create("child");

        let t = tree.clone();
        let _handle = tree.on_child_added(
            &root,
            Box::new(move |c: &NodeId| {
                t.detach(*c).unwrap();
            }),
        );

        tree.add_child(root, child).unwrap();
        assert_eq!(tree.parent(child), None);
        assert!(tree.children(&root).is_empty());
    }

    #[test]
    fn test_stale_descendant_signals_dropped_after_reentrant_detach() {
        let tree = MemoryTree::new();
        let root = tree.create("root");
        let moved = tree.create("moved");
        let leaf = tree.create_child(moved, "leaf").unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let t = tree.clone();
        let _handle = tree.on_descendant_added(
            &root,
            Box::new(move |n: &NodeId| {
                s.lock().push(*n);
                if *n == moved {
                    t.detach(moved).unwrap();
                }
            }),
        );

        tree.add_child(root, moved).unwrap();

        // leaf 已随 moved 离开 root，不应再收到它的 descendant_added
        assert_eq!(*seen.lock(), vec![moved]);
        assert_eq!(tree.parent(leaf), Some(moved));
        assert!(tree.descendants(&root).is_empty());
    }
}
