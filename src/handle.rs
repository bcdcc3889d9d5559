//! 监听句柄
//!
//! 每个句柄代表一次对宿主信号的订阅，释放恰好发生一次：
//! 显式 `dispose()`、`Drop` 或信号关闭，重复释放为空操作。

use parking_lot::Mutex;
use std::fmt;

type Release = Box<dyn FnOnce() + Send>;

/// 可释放的订阅句柄
pub struct ListenerHandle {
    release: Mutex<Option<Release>>,
}

impl ListenerHandle {
    /// 创建句柄，`release` 在首次释放时执行
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    /// 创建一个已释放的句柄（订阅失败或信号已关闭时返回）
    pub fn noop() -> Self {
        Self {
            release: Mutex::new(None),
        }
    }

    /// 释放订阅，可重复调用
    pub fn dispose(&self) {
        // 先取出再执行，避免持锁回调
        let release = self.release.lock().take();
        if let Some(release) = release {
            release();
        }
    }

    /// 是否已释放
    pub fn is_disposed(&self) -> bool {
        self.release.lock().is_none()
    }

    /// 放弃句柄但保留订阅，订阅随信号关闭而结束
    pub fn detach(self) {
        self.release.lock().take();
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
