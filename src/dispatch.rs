//! 到期任务分发
//!
//! 每个到期任务的回调在独立的 tokio 任务中执行，panic 在该任务边界内被捕获，
//! 转换为 [`CallbackFailure`] 交给 [`FailureHook`] 报告后丢弃，
//! 既不影响同一槽位的其他任务，也不会传播到控制循环。

use crate::task::TimerTask;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// 回调执行失败的信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackFailure {
    /// 失败任务的键（不可寻址任务为 `None`）
    pub key: Option<String>,
    /// panic 消息
    pub message: String,
}

/// 回调失败报告钩子
///
/// 钩子在执行回调的 tokio 任务中被调用，不应阻塞。
pub trait FailureHook: Send + Sync + 'static {
    fn report(&self, failure: CallbackFailure);
}

impl<F> FailureHook for F
where
    F: Fn(CallbackFailure) + Send + Sync + 'static,
{
    fn report(&self, failure: CallbackFailure) {
        self(failure)
    }
}

/// 默认钩子：通过 tracing 记录错误日志
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFailureHook;

impl FailureHook for LogFailureHook {
    fn report(&self, failure: CallbackFailure) {
        tracing::error!(
            key = failure.key.as_deref().unwrap_or(""),
            message = %failure.message,
            "timer callback panicked"
        );
    }
}

/// 分发器
#[derive(Clone)]
pub(crate) struct Dispatcher {
    hook: Arc<dyn FailureHook>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Arc::new(LogFailureHook))
    }
}

impl Dispatcher {
    pub(crate) fn new(hook: Arc<dyn FailureHook>) -> Self {
        Self { hook }
    }

    /// 按顺序为每个到期任务启动独立的执行单元，立即返回
    pub(crate) fn dispatch(&self, tasks: Vec<TimerTask>) {
        for task in tasks {
            let TimerTask { key, callback, .. } = task;
            let hook = Arc::clone(&self.hook);

            // 回调本身也在 async 块内调用，同步阶段的 panic 同样被捕获
            let run = AssertUnwindSafe(async move { callback.call().await });
            tokio::spawn(async move {
                if let Err(payload) = run.catch_unwind().await {
                    hook.report(CallbackFailure {
                        key,
                        message: panic_message(payload.as_ref()),
                    });
                }
            });
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn recording_dispatcher() -> (Dispatcher, Arc<Mutex<Vec<CallbackFailure>>>) {
        let failures = Arc::new(Mutex::new(Vec::new()));
        let failures_clone = Arc::clone(&failures);
        let dispatcher = Dispatcher::new(Arc::new(move |failure: CallbackFailure| {
            failures_clone.lock().push(failure);
        }));
        (dispatcher, failures)
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(payload.as_ref()), "owned boom");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }

    #[tokio::test]
    async fn test_dispatch_runs_all_tasks() {
        let (dispatcher, failures) = recording_dispatcher();
        let counter = Arc::new(AtomicU32::new(0));

        let tasks = (0..5)
            .map(|i| {
                let counter = Arc::clone(&counter);
                TimerTask::new(
                    format!("task-{}", i),
                    Box::new(move || async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }),
                )
            })
            .collect();
        dispatcher.dispatch(tasks);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert!(failures.lock().is_empty());
    }

    #[tokio::test]
    async fn test_panicking_callback_is_isolated_and_reported() {
        let (dispatcher, failures) = recording_dispatcher();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_before = Arc::clone(&counter);
        let counter_after = Arc::clone(&counter);

        let tasks = vec![
            TimerTask::new(
                "",
                Box::new(move || async move {
                    counter_before.fetch_add(1, Ordering::SeqCst);
                }),
            ),
            TimerTask::new("bad", Box::new(|| async { panic!("callback exploded") })),
            TimerTask::new(
                "",
                Box::new(move || async move {
                    counter_after.fetch_add(1, Ordering::SeqCst);
                }),
            ),
        ];
        dispatcher.dispatch(tasks);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        let failures = failures.lock();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].key.as_deref(), Some("bad"));
        assert_eq!(failures[0].message, "callback exploded");
    }

    #[tokio::test]
    async fn test_panic_before_future_is_caught() {
        let (dispatcher, failures) = recording_dispatcher();

        let callback = || -> futures::future::Ready<()> { panic!("sync part failed") };
        dispatcher.dispatch(vec![TimerTask::new("sync", Box::new(callback))]);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let failures = failures.lock();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].message, "sync part failed");
    }

    #[tokio::test]
    async fn test_slow_callback_does_not_block_dispatch() {
        let dispatcher = Dispatcher::default();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let tasks = vec![
            TimerTask::new(
                "slow",
                Box::new(|| async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                }),
            ),
            TimerTask::new(
                "fast",
                Box::new(move || async move {
                    counter_clone.fetch_add(1, Ordering::SeqCst);
                }),
            ),
        ];
        dispatcher.dispatch(tasks);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
