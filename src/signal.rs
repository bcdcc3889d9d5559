//! 同步发布 / 订阅信号
//!
//! 宿主树的结构 / 属性信号与观察器的四个输出通道共用此实现。
//! 触发时先在锁内快照监听者列表，释放锁后再逐个回调，回调中可以再次
//! 连接、断开或触发同一个信号。

use indexmap::IndexMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::handle::ListenerHandle;

type Slot<A> = Arc<dyn Fn(&A) + Send + Sync>;

struct SignalInner<A> {
    slots: IndexMap<u64, Slot<A>>,
    next_slot: u64,
    closed: bool,
}

/// 信号
///
/// 克隆得到的是同一个信号的另一个引用。
pub struct Signal<A> {
    inner: Arc<Mutex<SignalInner<A>>>,
}

impl<A: 'static> Signal<A> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SignalInner {
                slots: IndexMap::new(),
                next_slot: 0,
                closed: false,
            })),
        }
    }

    /// 连接监听者
    ///
    /// 信号已关闭时返回已释放的句柄。
    pub fn connect<F>(&self, handler: F) -> ListenerHandle
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let id = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return ListenerHandle::noop();
            }
            let id = inner.next_slot;
            inner.next_slot += 1;
            inner.slots.insert(id, Arc::new(handler));
            id
        };

        let weak: Weak<Mutex<SignalInner<A>>> = Arc::downgrade(&self.inner);
        ListenerHandle::new(move || {
            if let Some(inner) = weak.upgrade() {
                // 闭包在锁外析构
                let removed = inner.lock().slots.shift_remove(&id);
                drop(removed);
            }
        })
    }

    /// 触发信号
    ///
    /// 只回调触发时刻已连接的监听者；回调期间断开的监听者仍会收到本次触发，
    /// 回调期间关闭信号则剩余监听者不再收到。
    pub fn fire(&self, arg: &A) {
        let slots: Vec<Slot<A>> = {
            let inner = self.inner.lock();
            if inner.closed {
                return;
            }
            inner.slots.values().cloned().collect()
        };

        for slot in slots {
            // 回调中关闭信号后立即停止
            if self.is_closed() {
                break;
            }
            slot(arg);
        }
    }

    /// 关闭信号并断开所有监听者，之后的连接与触发均为空操作
    pub fn close(&self) {
        let slots = {
            let mut inner = self.inner.lock();
            inner.closed = true;
            std::mem::take(&mut inner.slots)
        };
        drop(slots);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// 当前监听者数量
    pub fn listener_count(&self) -> usize {
        self.inner.lock().slots.len()
    }
}

impl<A: 'static> Default for Signal<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for Signal<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A> fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Signal")
            .field("listeners", &inner.slots.len())
            .field("closed", &inner.closed)
            .finish()
    }
}
