//! # 哈希时间轮调度器
//!
//! 基于哈希时间轮（Hashed Timing Wheel）算法实现的延迟任务调度器，支持 tokio 运行时。
//! 适合作为作业调度、RPC 超时管理、会话过期等子系统的底层组件。
//!
//! ## 特性
//!
//! - **O(1) 操作**: 插入、按键取消和每次 tick 推进的均摊复杂度为 O(1)
//! - **按键寻址**: 带键的任务可以取消，重复提交同一个键会覆盖旧任务
//! - **单一所有者**: 时间轮状态只由一个控制循环持有，所有操作通过命令通道串行化
//! - **失败隔离**: 每个回调在独立的 tokio 任务中执行，panic 被捕获并报告
//!
//! ## 快速开始
//!
//! ```no_run
//! use timewheel::TimerWheel;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 1 秒一个槽位，60 个槽位
//!     let timer = TimerWheel::new(Duration::from_secs(1), 60)?;
//!     timer.start()?;
//!
//!     timer.add_job(Duration::from_secs(3), "session-42", || async {
//!         println!("session expired");
//!     }).await?;
//!
//!     // 续期：同一个键重新提交会覆盖旧任务
//!     timer.add_job(Duration::from_secs(5), "session-42", || async {
//!         println!("session expired after renewal");
//!     }).await?;
//!
//!     tokio::time::sleep(Duration::from_secs(7)).await;
//!     timer.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## 架构说明
//!
//! ### 时间轮算法
//!
//! 时间轮是一个环形数组，每个槽位按插入顺序存储一组任务。控制循环按固定间隔 tick，
//! 每次 tick 先把指针推进一格，再处理刚刚离开的槽位。
//!
//! - **槽位位置**: `(当前槽位 + floor(延迟 / 间隔)) mod 槽位数量`
//! - **轮次机制**: 超过一整圈的延迟记录 `floor(槽位数 / 槽位数量)` 轮，
//!   每次经过该槽位递减一次，减到 0 时触发
//! - **触发时机**: 延迟为 `s` 个槽位的任务在第 `s + 1` 次 tick 触发，
//!   小于一个间隔的延迟（包括 0）在下一次 tick 触发
//!
//! ### 并发模型
//!
//! - 时钟、添加、取消、停止四类事件在同一个 `tokio::select!` 中逐个处理
//! - 槽位存储和任务索引只被控制循环读写，不需要锁
//! - 到期回调被分发到独立的 tokio 任务，慢回调不会拖慢 tick
//! - 回调 panic 通过 [`FailureHook`] 报告，默认由 [`LogFailureHook`] 写 tracing 日志

mod config;
mod control;
mod dispatch;
mod error;
mod index;
mod slot;
mod task;
mod timer;
mod wheel;

// 重新导出公共 API
pub use config::{
    LoopConfig, LoopConfigBuilder,
    TimerConfig, TimerConfigBuilder,
    WheelConfig, WheelConfigBuilder,
};
pub use dispatch::{CallbackFailure, FailureHook, LogFailureHook};
pub use error::TimerError;
pub use task::{CallbackWrapper, TimerCallback};
pub use timer::TimerWheel;
