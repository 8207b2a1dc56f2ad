use crate::slot::EntryHandle;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;

/// 定时器回调 trait
///
/// 回调在任务到期时被调用恰好一次，调用后所有权即交给执行它的 tokio 任务。
///
/// # 示例
///
/// ```
/// use timewheel::TimerCallback;
/// use futures::future::BoxFuture;
///
/// struct MyCallback;
///
/// impl TimerCallback for MyCallback {
///     fn call(self: Box<Self>) -> BoxFuture<'static, ()> {
///         Box::pin(async {
///             println!("Timer callback executed!");
///         })
///     }
/// }
/// ```
pub trait TimerCallback: Send + 'static {
    /// 执行回调，返回一个 Future
    fn call(self: Box<Self>) -> BoxFuture<'static, ()>;
}

/// 为闭包实现 TimerCallback trait
/// 支持 FnOnce() -> Future 类型的闭包（一次性任务只会被调用一次）
impl<F, Fut> TimerCallback for F
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(self: Box<Self>) -> BoxFuture<'static, ()> {
        Box::pin((*self)())
    }
}

/// 回调包装器类型
pub type CallbackWrapper = Box<dyn TimerCallback>;

/// 定时器任务
pub struct TimerTask {
    /// 任务键；`None` 表示不可寻址的任务（不能按键取消或覆盖）
    pub key: Option<String>,

    /// 剩余轮次（用于超出时间轮一整圈的延迟）
    pub rounds: u64,

    /// 异步回调函数
    pub callback: CallbackWrapper,
}

impl TimerTask {
    /// 创建定时器任务
    ///
    /// 空字符串键视为不可寻址。
    pub fn new(key: impl Into<String>, callback: CallbackWrapper) -> Self {
        let key = key.into();
        Self {
            key: if key.is_empty() { None } else { Some(key) },
            rounds: 0,
            callback,
        }
    }

    /// 是否为可寻址任务
    #[allow(dead_code)]
    pub fn is_keyed(&self) -> bool {
        self.key.is_some()
    }
}

impl fmt::Debug for TimerTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerTask")
            .field("key", &self.key)
            .field("rounds", &self.rounds)
            .finish_non_exhaustive()
    }
}

/// 任务位置信息，用于 O(1) 取消和覆盖
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskLocation {
    pub slot_index: usize,
    /// 任务在槽位链表中的句柄
    pub handle: EntryHandle,
}

impl TaskLocation {
    pub fn new(slot_index: usize, handle: EntryHandle) -> Self {
        Self { slot_index, handle }
    }
}
