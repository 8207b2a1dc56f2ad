use crate::config::{TimerConfig, WheelConfig};
use crate::control::{Command, ControlLoop};
use crate::dispatch::{Dispatcher, FailureHook};
use crate::error::TimerError;
use crate::task::{CallbackWrapper, TimerCallback, TimerTask};
use crate::wheel::Wheel;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// 控制循环的生命周期
enum LoopState {
    /// 已创建但尚未启动，命令在通道中缓冲
    Pending(ControlLoop),
    /// 已在 tokio 运行时中执行
    Running(JoinHandle<()>),
    /// 已停止
    Finished,
}

/// 时间轮定时器
///
/// 所有操作都作为命令发送给后台控制循环，时间轮状态不与调用方共享。
/// 多个调用方共享同一个实例时可以包在 `Arc` 中。
pub struct TimerWheel {
    config: TimerConfig,

    /// 命令发送端
    command_tx: mpsc::Sender<Command>,

    /// 控制循环状态；启动和停止都在同一把锁下切换
    state: Mutex<LoopState>,

    started: AtomicBool,
    stopped: AtomicBool,
}

impl TimerWheel {
    /// 创建新的定时器
    ///
    /// # 参数
    /// - `interval`: 每个槽位的时间长度
    /// - `slot_count`: 槽位数量
    ///
    /// # 返回
    /// - `Err(TimerError)`: interval 为 0 或 slot_count 为 0
    ///
    /// # 示例
    /// ```no_run
    /// use timewheel::TimerWheel;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let timer = TimerWheel::new(Duration::from_secs(1), 60).unwrap();
    ///     timer.start().unwrap();
    /// }
    /// ```
    pub fn new(interval: Duration, slot_count: usize) -> Result<Self, TimerError> {
        let wheel = WheelConfig::new(interval, slot_count)?;
        Ok(Self::from_config(TimerConfig {
            wheel,
            ..TimerConfig::default()
        }))
    }

    /// 创建带默认配置的定时器
    /// - 槽位间隔: 10ms
    /// - 槽位数量: 512
    pub fn with_defaults() -> Self {
        Self::from_config(TimerConfig::default())
    }

    /// 使用完整配置创建定时器
    ///
    /// # 返回
    /// - `Err(TimerError)`: 配置中任一字段不满足构建器的验证规则
    pub fn with_config(config: TimerConfig) -> Result<Self, TimerError> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: TimerConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(config.control.command_channel_capacity);
        let control = ControlLoop::new(
            Wheel::new(&config.wheel),
            Dispatcher::default(),
            command_rx,
            &config.control,
        );

        Self {
            config,
            command_tx,
            state: Mutex::new(LoopState::Pending(control)),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// 设置回调失败报告钩子（需在 `start()` 之前调用）
    ///
    /// 默认钩子通过 tracing 记录错误日志。启动之后设置的钩子会被忽略并记录警告。
    pub fn with_failure_hook<H>(self, hook: H) -> Self
    where
        H: FailureHook,
    {
        {
            let mut state = self.state.lock();
            match &mut *state {
                LoopState::Pending(control) => {
                    control.set_dispatcher(Dispatcher::new(Arc::new(hook)));
                }
                _ => tracing::warn!("failure hook ignored: timing wheel already started"),
            }
        }
        self
    }

    /// 启动时钟和控制循环
    ///
    /// 必须在 tokio 运行时中调用，每个实例只能启动一次。
    pub fn start(&self) -> Result<(), TimerError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(TimerError::Stopped);
        }

        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, LoopState::Finished) {
            LoopState::Pending(control) => {
                *state = LoopState::Running(tokio::spawn(control.run()));
                self.started.store(true, Ordering::Release);
                Ok(())
            }
            running @ LoopState::Running(_) => {
                *state = running;
                Err(TimerError::AlreadyStarted)
            }
            LoopState::Finished => Err(TimerError::Stopped),
        }
    }

    /// 停止时间轮
    ///
    /// 停止时钟并结束控制循环，尚未触发的任务被丢弃，已经分发的回调继续执行。
    /// 可以被任意多个调用方并发调用，只有第一次调用会等待控制循环退出，
    /// 之后的调用立即返回。
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }

        let previous = std::mem::replace(&mut *self.state.lock(), LoopState::Finished);
        match previous {
            // 从未启动：直接丢弃控制循环，缓冲的请求一并丢弃
            LoopState::Pending(_) => tracing::debug!("timing wheel stopped before start"),
            LoopState::Running(handle) => {
                let _ = self.command_tx.send(Command::Stop).await;
                let _ = handle.await;
            }
            LoopState::Finished => {}
        }
    }

    /// 调度任务
    ///
    /// # 参数
    /// - `delay`: 延迟时间，小于一个槽位间隔的延迟在下一次 tick 触发
    /// - `key`: 任务键；空字符串表示不可寻址（只能触发，不能取消或覆盖），
    ///   非空时重复提交同一个键会取消旧任务
    /// - `callback`: 实现了 TimerCallback trait 的回调对象
    ///
    /// # 返回
    /// - `Err(TimerError::Stopped)`: 时间轮已停止
    ///
    /// # 示例
    /// ```no_run
    /// use timewheel::TimerWheel;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let timer = TimerWheel::with_defaults();
    ///     timer.start().unwrap();
    ///
    ///     timer.add_job(Duration::from_secs(1), "session-42", || async {
    ///         println!("session expired");
    ///     }).await.unwrap();
    ///
    ///     tokio::time::sleep(Duration::from_secs(2)).await;
    /// }
    /// ```
    pub async fn add_job<C>(
        &self,
        delay: Duration,
        key: impl Into<String>,
        callback: C,
    ) -> Result<(), TimerError>
    where
        C: TimerCallback,
    {
        let task = TimerTask::new(key, Box::new(callback) as CallbackWrapper);
        self.send(Command::Add { delay, task }).await
    }

    /// 调度不可寻址的一次性任务
    pub async fn schedule_once<C>(&self, delay: Duration, callback: C) -> Result<(), TimerError>
    where
        C: TimerCallback,
    {
        self.add_job(delay, String::new(), callback).await
    }

    /// 按截止时间调度任务
    ///
    /// # 返回
    /// - `Err(TimerError::NegativeDelay)`: 截止时间已经过去，任务不会入队
    pub async fn add_job_at<C>(
        &self,
        deadline: Instant,
        key: impl Into<String>,
        callback: C,
    ) -> Result<(), TimerError>
    where
        C: TimerCallback,
    {
        let delay = deadline
            .checked_duration_since(Instant::now())
            .ok_or(TimerError::NegativeDelay)?;
        self.add_job(delay, key, callback).await
    }

    /// 批量调度任务
    ///
    /// 整批作为一个命令按顺序处理，批内重复的键同样遵循覆盖语义。
    pub async fn add_jobs<K, C>(&self, jobs: Vec<(Duration, K, C)>) -> Result<(), TimerError>
    where
        K: Into<String>,
        C: TimerCallback,
    {
        if jobs.is_empty() {
            return Ok(());
        }

        let tasks = jobs
            .into_iter()
            .map(|(delay, key, callback)| {
                (delay, TimerTask::new(key, Box::new(callback) as CallbackWrapper))
            })
            .collect();
        self.send(Command::AddBatch(tasks)).await
    }

    /// 按键取消任务
    ///
    /// 未知键、空键或已经触发的键都是无操作。
    pub async fn remove_job(&self, key: &str) -> Result<(), TimerError> {
        if key.is_empty() {
            return self.ensure_running();
        }
        self.send(Command::Remove(key.to_string())).await
    }

    /// 时间轮中尚未触发的任务数量
    ///
    /// # 返回
    /// - `Err(TimerError::NotStarted)`: 控制循环尚未启动，无法应答
    /// - `Err(TimerError::Stopped)`: 时间轮已停止
    pub async fn pending_count(&self) -> Result<usize, TimerError> {
        self.ensure_started()?;
        let (reply, rx) = oneshot::channel();
        self.send(Command::Len(reply)).await?;
        rx.await.map_err(|_| TimerError::Stopped)
    }

    /// 键对应的任务是否仍在等待触发
    ///
    /// 与 [`pending_count`](Self::pending_count) 一样需要控制循环已经启动。
    pub async fn contains_job(&self, key: &str) -> Result<bool, TimerError> {
        self.ensure_started()?;
        if key.is_empty() {
            return Ok(false);
        }

        let (reply, rx) = oneshot::channel();
        self.send(Command::Contains {
            key: key.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| TimerError::Stopped)
    }

    pub fn interval(&self) -> Duration {
        self.config.wheel.interval
    }

    pub fn slot_count(&self) -> usize {
        self.config.wheel.slot_count
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn ensure_running(&self) -> Result<(), TimerError> {
        if self.is_stopped() {
            Err(TimerError::Stopped)
        } else {
            Ok(())
        }
    }

    /// 需要应答的查询只有在控制循环运行时才能完成
    fn ensure_started(&self) -> Result<(), TimerError> {
        self.ensure_running()?;
        match *self.state.lock() {
            LoopState::Pending(_) => Err(TimerError::NotStarted),
            LoopState::Running(_) => Ok(()),
            LoopState::Finished => Err(TimerError::Stopped),
        }
    }

    async fn send(&self, command: Command) -> Result<(), TimerError> {
        self.ensure_running()?;
        self.command_tx
            .send(command)
            .await
            .map_err(|_| TimerError::Stopped)
    }
}

impl Drop for TimerWheel {
    fn drop(&mut self) {
        if let LoopState::Running(handle) = self.state.get_mut() {
            handle.abort();
        }
    }
}
