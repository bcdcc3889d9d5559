//! 树观察器模块
//!
//! 监听宿主树的结构与属性信号，维护节点订阅并输出规范变更事件

mod attach;
mod events;
mod lifecycle;
mod registry;
mod router;
mod traits;
mod watcher;


pub use attach::{AttachmentController, RawEventSink};
pub use events::{
    ChangeEvent, ChangeKind, ObserverMode, RawTreeEvent, EVENT_ADDED, EVENT_ANY, EVENT_CHANGED,
    EVENT_REMOVED,
};
pub use lifecycle::{LifecycleGuard, TeardownList};
pub use registry::{Subscription, SubscriptionRegistry};
pub use router::EventRouter;
pub use traits::{ChangeObserver, FnObserver, LoggingObserver};
pub use watcher::TreeObserver;
