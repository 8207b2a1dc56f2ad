use crate::config::LoopConfig;
use crate::dispatch::Dispatcher;
use crate::task::TimerTask;
use crate::wheel::Wheel;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};

/// 控制循环命令类型
pub(crate) enum Command {
    /// 添加任务（带键时覆盖旧任务）
    Add { delay: Duration, task: TimerTask },
    /// 批量添加任务，按顺序处理
    AddBatch(Vec<(Duration, TimerTask)>),
    /// 按键取消任务
    Remove(String),
    /// 查询尚未触发的任务数量
    Len(oneshot::Sender<usize>),
    /// 查询键是否仍在等待
    Contains {
        key: String,
        reply: oneshot::Sender<bool>,
    },
    /// 停止时间轮
    Stop,
}

/// ControlLoop - 时间轮唯一的所有者
///
/// tick、添加、取消和停止都从同一个 `select!` 中逐个取出处理，
/// 时间轮状态只在这里被读写。
pub(crate) struct ControlLoop {
    wheel: Wheel,
    dispatcher: Dispatcher,
    command_rx: mpsc::Receiver<Command>,
    missed_tick_behavior: MissedTickBehavior,
}

impl ControlLoop {
    pub(crate) fn new(
        wheel: Wheel,
        dispatcher: Dispatcher,
        command_rx: mpsc::Receiver<Command>,
        config: &LoopConfig,
    ) -> Self {
        Self {
            wheel,
            dispatcher,
            command_rx,
            missed_tick_behavior: config.missed_tick_behavior,
        }
    }

    pub(crate) fn set_dispatcher(&mut self, dispatcher: Dispatcher) {
        self.dispatcher = dispatcher;
    }

    pub(crate) async fn run(mut self) {
        // 与 ticker 语义一致：第一次 tick 在一个间隔之后
        let interval = self.wheel.interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(self.missed_tick_behavior);

        tracing::debug!(
            interval = ?interval,
            slot_count = self.wheel.slot_count(),
            "timing wheel started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.on_tick();
                }

                command = self.command_rx.recv() => {
                    let Some(command) = command else {
                        // 所有发送端都已释放
                        break;
                    };
                    if self.on_command(command).is_break() {
                        break;
                    }
                }
            }
        }

        let dropped = self.wheel.clear();
        tracing::debug!(dropped, "timing wheel stopped");
    }

    fn on_tick(&mut self) {
        let slot = self.wheel.current_slot();
        let expired = self.wheel.advance();
        if !expired.is_empty() {
            tracing::trace!(slot, fired = expired.len(), "tick");
            self.dispatcher.dispatch(expired);
        }
    }

    fn on_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Add { delay, task } => self.add(delay, task),
            Command::AddBatch(tasks) => {
                for (delay, task) in tasks {
                    self.add(delay, task);
                }
            }
            Command::Remove(key) => {
                if self.wheel.remove(&key) {
                    tracing::debug!(key = %key, "timer task removed");
                }
            }
            Command::Len(reply) => {
                let _ = reply.send(self.wheel.len());
            }
            Command::Contains { key, reply } => {
                let _ = reply.send(self.wheel.contains_key(&key));
            }
            Command::Stop => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn add(&mut self, delay: Duration, task: TimerTask) {
        let (location, replaced) = self.wheel.insert(delay, task);
        if replaced {
            tracing::debug!(slot = location.slot_index, "timer task overwritten");
        }
    }
}
