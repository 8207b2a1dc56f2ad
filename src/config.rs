//! 定时器配置模块
//!
//! 提供分层的配置结构和 Builder 模式，用于配置时间轮和控制循环的行为。

use crate::error::TimerError;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// 时间轮配置
///
/// 用于配置时间轮的基本参数，包括槽位间隔和槽位数量。
///
/// # 示例
/// ```no_run
/// use timewheel::WheelConfig;
/// use std::time::Duration;
///
/// // 使用默认配置
/// let config = WheelConfig::default();
///
/// // 使用 Builder 自定义配置
/// let config = WheelConfig::builder()
///     .interval(Duration::from_secs(1))
///     .slot_count(60)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelConfig {
    /// 每个槽位代表的时间长度（tick 间隔）
    pub interval: Duration,
    /// 槽位数量（构造后不可变）
    pub slot_count: usize,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(10),
            slot_count: 512,
        }
    }
}

impl WheelConfig {
    /// 创建配置构建器
    pub fn builder() -> WheelConfigBuilder {
        WheelConfigBuilder::default()
    }

    /// 直接由参数创建并验证配置
    pub fn new(interval: Duration, slot_count: usize) -> Result<Self, TimerError> {
        Self::builder()
            .interval(interval)
            .slot_count(slot_count)
            .build()
    }

    /// 时间轮转动一整圈所需的时间
    pub fn revolution(&self) -> Duration {
        let slots = u32::try_from(self.slot_count).unwrap_or(u32::MAX);
        self.interval.saturating_mul(slots)
    }
}

/// 时间轮配置构建器
#[derive(Debug, Clone)]
pub struct WheelConfigBuilder {
    interval: Duration,
    slot_count: usize,
}

impl Default for WheelConfigBuilder {
    fn default() -> Self {
        let config = WheelConfig::default();
        Self {
            interval: config.interval,
            slot_count: config.slot_count,
        }
    }
}

impl WheelConfigBuilder {
    /// 设置槽位间隔
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// 设置槽位数量
    pub fn slot_count(mut self, count: usize) -> Self {
        self.slot_count = count;
        self
    }

    /// 构建配置并进行验证
    ///
    /// # 验证规则
    /// - interval 必须大于 0
    /// - slot_count 必须大于 0
    pub fn build(self) -> Result<WheelConfig, TimerError> {
        if self.interval.is_zero() {
            return Err(TimerError::InvalidConfiguration {
                field: "interval",
                reason: "槽位间隔必须大于 0".to_string(),
            });
        }

        if self.slot_count == 0 {
            return Err(TimerError::InvalidSlotCount {
                slot_count: self.slot_count,
                reason: "槽位数量必须大于 0",
            });
        }

        Ok(WheelConfig {
            interval: self.interval,
            slot_count: self.slot_count,
        })
    }
}

/// 控制循环配置
///
/// 配置命令通道容量以及时钟错过 tick 时的补偿策略。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    /// 命令通道容量
    pub command_channel_capacity: usize,
    /// 时钟错过 tick 时的行为
    pub missed_tick_behavior: MissedTickBehavior,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            command_channel_capacity: 512,
            missed_tick_behavior: MissedTickBehavior::Skip,
        }
    }
}

impl LoopConfig {
    /// 创建配置构建器
    pub fn builder() -> LoopConfigBuilder {
        LoopConfigBuilder::default()
    }
}

/// 控制循环配置构建器
#[derive(Debug, Clone)]
pub struct LoopConfigBuilder {
    command_channel_capacity: usize,
    missed_tick_behavior: MissedTickBehavior,
}

impl Default for LoopConfigBuilder {
    fn default() -> Self {
        let config = LoopConfig::default();
        Self {
            command_channel_capacity: config.command_channel_capacity,
            missed_tick_behavior: config.missed_tick_behavior,
        }
    }
}

impl LoopConfigBuilder {
    /// 设置命令通道容量
    pub fn command_channel_capacity(mut self, capacity: usize) -> Self {
        self.command_channel_capacity = capacity;
        self
    }

    /// 设置错过 tick 时的行为
    pub fn missed_tick_behavior(mut self, behavior: MissedTickBehavior) -> Self {
        self.missed_tick_behavior = behavior;
        self
    }

    /// 构建配置并进行验证
    ///
    /// # 验证规则
    /// - 命令通道容量必须大于 0
    pub fn build(self) -> Result<LoopConfig, TimerError> {
        if self.command_channel_capacity == 0 {
            return Err(TimerError::InvalidConfiguration {
                field: "command_channel_capacity",
                reason: "命令通道容量必须大于 0".to_string(),
            });
        }

        Ok(LoopConfig {
            command_channel_capacity: self.command_channel_capacity,
            missed_tick_behavior: self.missed_tick_behavior,
        })
    }
}

/// 顶层定时器配置
///
/// # 示例
/// ```no_run
/// use timewheel::TimerConfig;
/// use std::time::Duration;
///
/// let config = TimerConfig::builder()
///     .interval(Duration::from_millis(20))
///     .slot_count(1024)
///     .command_channel_capacity(1024)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerConfig {
    /// 时间轮配置
    pub wheel: WheelConfig,
    /// 控制循环配置
    pub control: LoopConfig,
}

impl TimerConfig {
    /// 创建配置构建器
    pub fn builder() -> TimerConfigBuilder {
        TimerConfigBuilder::default()
    }

    /// 按构建器的规则重新验证配置
    ///
    /// 字段是公开的，直接构造的配置在使用前需要经过这里。
    pub fn validate(&self) -> Result<(), TimerError> {
        WheelConfig::new(self.wheel.interval, self.wheel.slot_count)?;
        LoopConfig::builder()
            .command_channel_capacity(self.control.command_channel_capacity)
            .missed_tick_behavior(self.control.missed_tick_behavior)
            .build()?;
        Ok(())
    }
}

/// 顶层定时器配置构建器
#[derive(Debug, Default)]
pub struct TimerConfigBuilder {
    wheel_builder: WheelConfigBuilder,
    loop_builder: LoopConfigBuilder,
}

impl TimerConfigBuilder {
    /// 设置槽位间隔
    pub fn interval(mut self, interval: Duration) -> Self {
        self.wheel_builder = self.wheel_builder.interval(interval);
        self
    }

    /// 设置槽位数量
    pub fn slot_count(mut self, count: usize) -> Self {
        self.wheel_builder = self.wheel_builder.slot_count(count);
        self
    }

    /// 设置命令通道容量
    pub fn command_channel_capacity(mut self, capacity: usize) -> Self {
        self.loop_builder = self.loop_builder.command_channel_capacity(capacity);
        self
    }

    /// 设置错过 tick 时的行为
    pub fn missed_tick_behavior(mut self, behavior: MissedTickBehavior) -> Self {
        self.loop_builder = self.loop_builder.missed_tick_behavior(behavior);
        self
    }

    /// 构建配置并进行验证
    pub fn build(self) -> Result<TimerConfig, TimerError> {
        Ok(TimerConfig {
            wheel: self.wheel_builder.build()?,
            control: self.loop_builder.build()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wheel_config_default() {
        let config = WheelConfig::default();
        assert_eq!(config.interval, Duration::from_millis(10));
        assert_eq!(config.slot_count, 512);
    }

    #[test]
    fn test_wheel_config_builder() {
        let config = WheelConfig::builder()
            .interval(Duration::from_secs(1))
            .slot_count(60)
            .build()
            .unwrap();

        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.slot_count, 60);
        assert_eq!(config.revolution(), Duration::from_secs(60));
    }

    #[test]
    fn test_wheel_config_validation_zero_interval() {
        let result = WheelConfig::new(Duration::ZERO, 60);
        assert!(matches!(
            result,
            Err(TimerError::InvalidConfiguration { field: "interval", .. })
        ));
    }

    #[test]
    fn test_wheel_config_validation_zero_slot_count() {
        let result = WheelConfig::new(Duration::from_secs(1), 0);
        assert_eq!(
            result,
            Err(TimerError::InvalidSlotCount {
                slot_count: 0,
                reason: "槽位数量必须大于 0",
            })
        );
    }

    #[test]
    fn test_wheel_config_accepts_non_power_of_two() {
        // 取模运算不依赖 2 的幂次方
        let config = WheelConfig::new(Duration::from_millis(500), 10).unwrap();
        assert_eq!(config.slot_count, 10);
    }

    #[test]
    fn test_loop_config_default() {
        let config = LoopConfig::default();
        assert_eq!(config.command_channel_capacity, 512);
        assert_eq!(config.missed_tick_behavior, MissedTickBehavior::Skip);
    }

    #[test]
    fn test_loop_config_zero_capacity() {
        let result = LoopConfig::builder().command_channel_capacity(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_timer_config_builder() {
        let config = TimerConfig::builder()
            .interval(Duration::from_millis(20))
            .slot_count(1024)
            .command_channel_capacity(64)
            .missed_tick_behavior(MissedTickBehavior::Burst)
            .build()
            .unwrap();

        assert_eq!(config.wheel.interval, Duration::from_millis(20));
        assert_eq!(config.wheel.slot_count, 1024);
        assert_eq!(config.control.command_channel_capacity, 64);
        assert_eq!(config.control.missed_tick_behavior, MissedTickBehavior::Burst);
    }

    #[test]
    fn test_timer_config_validate() {
        assert!(TimerConfig::default().validate().is_ok());

        let mut config = TimerConfig::default();
        config.wheel.slot_count = 0;
        assert!(matches!(
            config.validate(),
            Err(TimerError::InvalidSlotCount { slot_count: 0, .. })
        ));

        let mut config = TimerConfig::default();
        config.wheel.interval = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(TimerError::InvalidConfiguration { field: "interval", .. })
        ));

        let mut config = TimerConfig::default();
        config.control.command_channel_capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(TimerError::InvalidConfiguration {
                field: "command_channel_capacity",
                ..
            })
        ));
    }

    #[test]
    fn test_timer_config_propagates_wheel_error() {
        let result = TimerConfig::builder().slot_count(0).build();
        assert!(matches!(result, Err(TimerError::InvalidSlotCount { .. })));
    }
}
