// ==========================================
// 仓储运营后台 - 命名锁管理器
// ==========================================
// 进程级互斥原语: 同一 key 至多一个持有者, 持有者丢失 (guard Drop) 自动释放。
// 两种用法:
// - 横持充当: "alloc:{仓库}:{商品}" + 有界超时 (默认约1秒)
// - 批处理防重入 (withoutOverlapping): "job:{处理名}" + 零超时, 竞争即跳过
// ==========================================

use crate::engine::error::{EngineError, EngineResult};
use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

struct LockState {
    held: Mutex<HashSet<String>>,
    cvar: Condvar,
}

// ==========================================
// NamedLockManager - 命名锁管理器
// ==========================================
#[derive(Clone)]
pub struct NamedLockManager {
    state: Arc<LockState>,
}

impl NamedLockManager {
    /// 创建新的 NamedLockManager 实例
    pub fn new() -> Self {
        Self {
            state: Arc::new(LockState {
                held: Mutex::new(HashSet::new()),
                cvar: Condvar::new(),
            }),
        }
    }

    /// 尝试获取命名锁, 最多等待 timeout
    ///
    /// # 返回
    /// - `Ok(NamedLockGuard)`: 获取成功; guard Drop 时自动释放
    /// - `Err(EngineError::LockContended)`: 超时仍未获取 (调用方可退避重试)
    pub fn try_acquire(&self, key: &str, timeout: Duration) -> EngineResult<NamedLockGuard> {
        let deadline = Instant::now() + timeout;

        let mut held = self
            .state
            .held
            .lock()
            .map_err(|e| EngineError::Internal(format!("锁状态获取失败: {}", e)))?;

        while held.contains(key) {
            let now = Instant::now();
            if now >= deadline {
                return Err(EngineError::LockContended {
                    key: key.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }

            let (guard, wait_result) = self
                .state
                .cvar
                .wait_timeout(held, deadline - now)
                .map_err(|e| EngineError::Internal(format!("锁等待失败: {}", e)))?;
            held = guard;

            if wait_result.timed_out() && held.contains(key) {
                return Err(EngineError::LockContended {
                    key: key.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        }

        held.insert(key.to_string());

        Ok(NamedLockGuard {
            state: Arc::clone(&self.state),
            key: key.to_string(),
        })
    }

    /// 某 key 当前是否被持有 (监视用)
    pub fn is_held(&self, key: &str) -> bool {
        self.state
            .held
            .lock()
            .map(|held| held.contains(key))
            .unwrap_or(false)
    }
}

impl Default for NamedLockManager {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// NamedLockGuard - 命名锁持有凭证
// ==========================================
// Drop 即释放: 无论临界区成功/部分成功/出错, 释放总会执行
pub struct NamedLockGuard {
    state: Arc<LockState>,
    key: String,
}

impl NamedLockGuard {
    /// 持有的 key
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for NamedLockGuard {
    fn drop(&mut self) {
        let mut held = self
            .state
            .held
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        held.remove(&self.key);
        self.state.cvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_acquire_and_release() {
        let manager = NamedLockManager::new();

        {
            let guard = manager
                .try_acquire("alloc:W1:I1", Duration::from_millis(100))
                .unwrap();
            assert_eq!(guard.key(), "alloc:W1:I1");
            assert!(manager.is_held("alloc:W1:I1"));
        }

        // guard Drop 后可再次获取
        assert!(!manager.is_held("alloc:W1:I1"));
        let _guard = manager
            .try_acquire("alloc:W1:I1", Duration::from_millis(100))
            .unwrap();
    }

    #[test]
    fn test_contended_within_timeout() {
        let manager = NamedLockManager::new();
        let _guard = manager
            .try_acquire("alloc:W1:I1", Duration::from_millis(100))
            .unwrap();

        // 同 key 再次获取: 超时后返回 LockContended
        let result = manager.try_acquire("alloc:W1:I1", Duration::from_millis(50));
        match result {
            Err(EngineError::LockContended { key, .. }) => assert_eq!(key, "alloc:W1:I1"),
            other => panic!("应返回 LockContended, 实际: {:?}", other.map(|g| g.key().to_string())),
        }
    }

    #[test]
    fn test_different_keys_do_not_contend() {
        let manager = NamedLockManager::new();
        let _g1 = manager
            .try_acquire("alloc:W1:I1", Duration::from_millis(50))
            .unwrap();
        let _g2 = manager
            .try_acquire("alloc:W2:I1", Duration::from_millis(50))
            .unwrap();
    }

    #[test]
    fn test_zero_timeout_skip_semantics() {
        let manager = NamedLockManager::new();
        let _guard = manager.try_acquire("job:CALC", Duration::ZERO).unwrap();

        // 零超时: 竞争立即失败 (withoutOverlapping)
        assert!(manager.try_acquire("job:CALC", Duration::ZERO).is_err());
    }

    #[test]
    fn test_waiter_wakes_after_release() {
        let manager = NamedLockManager::new();
        let guard = manager
            .try_acquire("alloc:W1:I1", Duration::from_millis(100))
            .unwrap();

        let m2 = manager.clone();
        let handle = thread::spawn(move || {
            // 足够长的超时, 等待主线程释放
            m2.try_acquire("alloc:W1:I1", Duration::from_secs(2)).is_ok()
        });

        thread::sleep(Duration::from_millis(50));
        drop(guard);

        assert!(handle.join().unwrap(), "释放后等待方应获取成功");
    }
}
