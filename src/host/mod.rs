//! 宿主树接口
//!
//! 观察器只通过 [`HostTree`] 访问节点树：读取子节点 / 后代快照，订阅结构与属性信号。
//! 节点的创建、父子存储与信号机制都由宿主负责。

mod memory;

use std::fmt::Debug;
use std::hash::Hash;

use crate::handle::ListenerHandle;

pub use memory::{MemoryTree, NodeId, NAME_PROPERTY};

/// 节点回调（参数为子节点或后代节点）
pub type NodeHandler<N> = Box<dyn Fn(&N) + Send + Sync>;

/// 属性变更回调
pub type ChangeHandler = Box<dyn Fn() + Send + Sync>;

/// 宿主树
///
/// 实现方负责在释放内部锁之后再回调监听者，以允许回调中重入宿主树。
pub trait HostTree: Clone + Send + Sync + 'static {
    /// 节点句柄，按身份比较
    type Node: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// 直接子节点（调用时刻快照）
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// 全部后代（调用时刻快照，顺序不限）
    fn descendants(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// 订阅“子节点加入”
    fn on_child_added(&self, node: &Self::Node, handler: NodeHandler<Self::Node>)
        -> ListenerHandle;

    /// 订阅“子节点移除”
    fn on_child_removed(
        &self,
        node: &Self::Node,
        handler: NodeHandler<Self::Node>,
    ) -> ListenerHandle;

    /// 订阅“后代加入”（子树任意位置）
    fn on_descendant_added(
        &self,
        node: &Self::Node,
        handler: NodeHandler<Self::Node>,
    ) -> ListenerHandle;

    /// 订阅“属性变更”
    fn on_property_changed(&self, node: &Self::Node, handler: ChangeHandler) -> ListenerHandle;
}
