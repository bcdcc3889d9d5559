//! 生命周期守卫
//!
//! 所有获取到的资源在获取时登记到同一份清理列表，销毁时按登记顺序逐个释放一次。

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::handle::ListenerHandle;

/// 清理项
enum Teardown {
    Listener(ListenerHandle),
    Task(Box<dyn FnOnce() + Send>),
}

/// 清理列表
#[derive(Default)]
pub struct TeardownList {
    items: Mutex<Vec<Teardown>>,
}

impl TeardownList {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记监听句柄
    pub fn give_listener(&self, handle: ListenerHandle) {
        self.items.lock().push(Teardown::Listener(handle));
    }

    /// 登记清理任务
    pub fn give_task(&self, task: impl FnOnce() + Send + 'static) {
        self.items.lock().push(Teardown::Task(Box::new(task)));
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// 执行全部清理项并清空列表，返回执行数量
    pub fn run(&self) -> usize {
        // 取出后在锁外执行，清理项可能回调到本列表
        let items = std::mem::take(&mut *self.items.lock());
        let count = items.len();
        for item in items {
            match item {
                Teardown::Listener(handle) => handle.dispose(),
                Teardown::Task(task) => task(),
            }
        }
        count
    }
}

/// 生命周期守卫
///
/// 销毁标记单调地由 false 变为 true。
#[derive(Default)]
pub struct LifecycleGuard {
    destroyed: AtomicBool,
    teardown: TeardownList,
}

impl LifecycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn teardown(&self) -> &TeardownList {
        &self.teardown
    }

    /// 销毁，仅第一次调用执行清理列表
    ///
    /// 返回本次是否执行了清理。
    pub fn destroy(&self) -> bool {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.teardown.run();
        true
    }
}
