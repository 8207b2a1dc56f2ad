use crate::config::WheelConfig;
use crate::index::TaskIndex;
use crate::slot::SlotStore;
use crate::task::{TaskLocation, TimerTask};
use std::time::Duration;

/// 时间轮数据结构
///
/// 只由控制循环持有和修改，因此内部不需要任何锁。
pub struct Wheel {
    /// 槽位数组，每个槽位存储一组按插入顺序排列的定时器任务
    slots: SlotStore<TimerTask>,

    /// 任务索引，用于按键快速取消和覆盖任务
    index: TaskIndex,

    /// 当前指针（时钟最近一次转到的槽位）
    current_slot: usize,

    /// 槽位数量
    slot_count: usize,

    /// 每个槽位的时间长度
    interval: Duration,
}

impl Wheel {
    /// 创建新的时间轮
    ///
    /// 配置参数已在 `WheelConfig::builder().build()` 中验证，因此此方法不会失败。
    pub fn new(config: &WheelConfig) -> Self {
        Self {
            slots: SlotStore::new(config.slot_count),
            index: TaskIndex::new(),
            current_slot: 0,
            slot_count: config.slot_count,
            interval: config.interval,
        }
    }

    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    pub fn slot_count(&self) -> usize {
        self.slots.slot_count()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 时间轮中尚未触发的任务数量
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains(key)
    }

    /// 计算延迟对应的槽位和轮次
    ///
    /// - `slots_ahead = floor(delay / interval)`
    /// - `position = (current_slot + slots_ahead) mod slot_count`
    /// - `rounds = floor(slots_ahead / slot_count)`
    ///
    /// 小于一个间隔的延迟（包括 0）落在当前槽位、0 轮，在紧接着的下一次 tick 触发。
    pub fn position_and_circle(&self, delay: Duration) -> (usize, u64) {
        let slots_ahead = delay.as_nanos() / self.interval.as_nanos();
        let slot_count = self.slot_count as u128;

        let offset = (slots_ahead % slot_count) as usize;
        let position = (self.current_slot + offset) % self.slot_count;
        let rounds = u64::try_from(slots_ahead / slot_count).unwrap_or(u64::MAX);
        (position, rounds)
    }

    /// 插入定时器任务
    ///
    /// 如果任务带键且该键已有未触发的任务，先取消旧任务再插入（覆盖而非重复）。
    ///
    /// # 返回
    /// 新任务的位置，以及是否覆盖了旧任务
    pub fn insert(&mut self, delay: Duration, mut task: TimerTask) -> (TaskLocation, bool) {
        let (position, rounds) = self.position_and_circle(delay);
        task.rounds = rounds;

        let replaced = match task.key.as_deref() {
            Some(key) => self.remove(key),
            None => false,
        };

        let key = task.key.clone();
        let handle = self.slots.push_back(position, task);
        let location = TaskLocation::new(position, handle);

        if let Some(key) = key {
            self.index.put(key, location);
        }

        (location, replaced)
    }

    /// 按键取消任务
    ///
    /// # 返回
    /// 任务存在且被移除返回 true；未知键或已触发的键返回 false
    pub fn remove(&mut self, key: &str) -> bool {
        match self.index.remove(key) {
            Some(location) => self
                .slots
                .remove(location.slot_index, location.handle)
                .is_some(),
            None => false,
        }
    }

    /// 推进时间轮一个槽位，返回离开的槽位中所有到期的任务
    ///
    /// 先推进指针，再扫描推进前的槽位：轮次大于 0 的任务递减后留在原位，
    /// 轮次为 0 的任务按插入顺序移出槽位和索引。
    pub fn advance(&mut self) -> Vec<TimerTask> {
        let leaving = self.current_slot;
        self.current_slot = (self.current_slot + 1) % self.slot_count;

        let expired = self.slots.extract_if(leaving, |task| {
            if task.rounds > 0 {
                task.rounds -= 1;
                false
            } else {
                true
            }
        });

        let mut tasks = Vec::with_capacity(expired.len());
        for (handle, task) in expired {
            if let Some(key) = task.key.as_deref() {
                self.index.remove_if_points_to(key, handle);
            }
            tasks.push(task);
        }
        tasks
    }

    /// 清空时间轮，返回被丢弃的任务数量
    pub fn clear(&mut self) -> usize {
        self.index.clear();
        self.slots.drain_all().len()
    }
}
