use crate::slot::EntryHandle;
use crate::task::TaskLocation;
use rustc_hash::FxHashMap;

/// 任务索引：键 -> 任务位置
///
/// 仅记录可寻址任务。索引只是查找辅助，任务本身归槽位所有；
/// 覆盖语义由时间轮在插入前先执行取消来保证，这里每个键至多一条记录。
#[derive(Debug, Default)]
pub struct TaskIndex {
    locations: FxHashMap<String, TaskLocation>,
}

impl TaskIndex {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn get(&self, key: &str) -> Option<TaskLocation> {
        self.locations.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.locations.contains_key(key)
    }

    /// 记录键的位置，返回被替换的旧位置
    pub fn put(&mut self, key: String, location: TaskLocation) -> Option<TaskLocation> {
        self.locations.insert(key, location)
    }

    pub fn remove(&mut self, key: &str) -> Option<TaskLocation> {
        self.locations.remove(key)
    }

    /// 仅当记录仍指向 `handle` 时移除
    pub fn remove_if_points_to(&mut self, key: &str, handle: EntryHandle) -> bool {
        match self.locations.get(key) {
            Some(location) if location.handle == handle => {
                self.locations.remove(key);
                true
            }
            _ => false,
        }
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn clear(&mut self) {
        self.locations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::SlotStore;

    #[test]
    fn test_put_get_remove() {
        let mut store = SlotStore::new(4);
        let handle = store.push_back(3, ());
        let mut index = TaskIndex::new();

        assert!(index.put("a".to_string(), TaskLocation::new(3, handle)).is_none());
        assert_eq!(index.get("a"), Some(TaskLocation::new(3, handle)));
        assert!(index.contains("a"));
        assert_eq!(index.len(), 1);

        assert_eq!(index.remove("a"), Some(TaskLocation::new(3, handle)));
        assert_eq!(index.remove("a"), None);
        assert!(index.is_empty());
    }

    #[test]
    fn test_remove_if_points_to() {
        let mut store = SlotStore::new(2);
        let first = store.push_back(0, ());
        let second = store.push_back(1, ());
        let mut index = TaskIndex::new();

        index.put("k".to_string(), TaskLocation::new(1, second));
        assert!(!index.remove_if_points_to("k", first));
        assert!(index.contains("k"));
        assert!(index.remove_if_points_to("k", second));
        assert!(!index.contains("k"));
    }
}
