use thiserror::Error;

/// 定时器错误类型
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    /// 槽位数量无效（必须大于 0）
    #[error("无效的槽位数量 {slot_count}: {reason}")]
    InvalidSlotCount {
        slot_count: usize,
        reason: &'static str,
    },

    /// 配置字段无效
    #[error("无效的配置 {field}: {reason}")]
    InvalidConfiguration {
        field: &'static str,
        reason: String,
    },

    /// 截止时间已过，对应的延迟为负数
    #[error("延迟时间不能为负数")]
    NegativeDelay,

    /// 时间轮已经启动过
    #[error("时间轮已启动")]
    AlreadyStarted,

    /// 控制循环尚未启动，需要应答的查询无法完成
    #[error("时间轮尚未启动")]
    NotStarted,

    /// 时间轮已停止，内部通信通道已关闭
    #[error("时间轮已停止")]
    Stopped,
}
