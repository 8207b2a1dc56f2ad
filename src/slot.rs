//! 槽位存储
//!
//! 固定数量的有序链表，所有节点共用一个 arena。每次插入返回一个 [`EntryHandle`]，
//! 凭句柄可以在 O(1) 时间内从链表中摘除节点，同时保持槽内插入顺序（FIFO）。

/// 槽位内节点句柄
///
/// `generation` 在每次插入时递增，节点复用后旧句柄自动失效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryHandle {
    index: usize,
    generation: u64,
}

struct Node<T> {
    value: Option<T>,
    slot: usize,
    generation: u64,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default)]
struct SlotList {
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

/// 槽位存储，构造后槽位数量不可变
pub struct SlotStore<T> {
    lists: Vec<SlotList>,
    nodes: Vec<Node<T>>,
    free: Vec<usize>,
    next_generation: u64,
    len: usize,
}

impl<T> SlotStore<T> {
    /// 创建包含 `slot_count` 个空槽位的存储
    pub fn new(slot_count: usize) -> Self {
        Self {
            lists: vec![SlotList::default(); slot_count],
            nodes: Vec::new(),
            free: Vec::new(),
            next_generation: 0,
            len: 0,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.lists.len()
    }

    /// 所有槽位中的元素总数
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 指定槽位中的元素数量
    #[allow(dead_code)]
    pub fn slot_len(&self, slot: usize) -> usize {
        self.check_slot(slot);
        self.lists[slot].len
    }

    /// 追加到槽位尾部
    ///
    /// # Panics
    /// 槽位越界时 panic（时间轮内部不会产生越界索引）
    pub fn push_back(&mut self, slot: usize, value: T) -> EntryHandle {
        self.check_slot(slot);

        let generation = self.next_generation;
        self.next_generation += 1;

        let tail = self.lists[slot].tail;
        let node = Node {
            value: Some(value),
            slot,
            generation,
            prev: tail,
            next: None,
        };

        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };

        match tail {
            Some(tail) => self.nodes[tail].next = Some(index),
            None => self.lists[slot].head = Some(index),
        }
        let list = &mut self.lists[slot];
        list.tail = Some(index);
        list.len += 1;
        self.len += 1;

        EntryHandle { index, generation }
    }

    /// 按句柄从槽位中移除元素
    ///
    /// 句柄已失效或不属于该槽位时返回 `None`。
    pub fn remove(&mut self, slot: usize, handle: EntryHandle) -> Option<T> {
        self.check_slot(slot);
        if !self.is_live(slot, handle) {
            return None;
        }
        Some(self.unlink(handle.index))
    }

    /// 获取元素的可变引用
    #[allow(dead_code)]
    pub fn get_mut(&mut self, handle: EntryHandle) -> Option<&mut T> {
        let node = self.nodes.get_mut(handle.index)?;
        if node.generation != handle.generation {
            return None;
        }
        node.value.as_mut()
    }

    /// 从前向后遍历槽位
    #[allow(dead_code)]
    pub fn iter(&self, slot: usize) -> SlotIter<'_, T> {
        self.check_slot(slot);
        SlotIter {
            store: self,
            cursor: self.lists[slot].head,
        }
    }

    /// 从前向后扫描槽位，移除 `is_due` 返回 true 的元素并按原顺序返回
    ///
    /// `is_due` 可以修改元素（例如递减轮次）。
    pub fn extract_if<F>(&mut self, slot: usize, mut is_due: F) -> Vec<(EntryHandle, T)>
    where
        F: FnMut(&mut T) -> bool,
    {
        self.check_slot(slot);

        let mut extracted = Vec::new();
        let mut cursor = self.lists[slot].head;
        while let Some(index) = cursor {
            cursor = self.nodes[index].next;
            let due = match self.nodes[index].value.as_mut() {
                Some(value) => is_due(value),
                None => false,
            };
            if due {
                let handle = EntryHandle {
                    index,
                    generation: self.nodes[index].generation,
                };
                extracted.push((handle, self.unlink(index)));
            }
        }
        extracted
    }

    /// 清空所有槽位并返回全部元素
    pub fn drain_all(&mut self) -> Vec<T> {
        let mut values = Vec::with_capacity(self.len);
        for slot in 0..self.lists.len() {
            while let Some(head) = self.lists[slot].head {
                values.push(self.unlink(head));
            }
        }
        values
    }

    fn is_live(&self, slot: usize, handle: EntryHandle) -> bool {
        match self.nodes.get(handle.index) {
            Some(node) => {
                node.generation == handle.generation && node.slot == slot && node.value.is_some()
            }
            None => false,
        }
    }

    fn unlink(&mut self, index: usize) -> T {
        let (slot, prev, next) = {
            let node = &self.nodes[index];
            (node.slot, node.prev, node.next)
        };

        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => self.lists[slot].head = next,
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => self.lists[slot].tail = prev,
        }

        let node = &mut self.nodes[index];
        node.prev = None;
        node.next = None;
        let value = node
            .value
            .take()
            .unwrap_or_else(|| unreachable!("linked node {index} has no value"));

        self.lists[slot].len -= 1;
        self.len -= 1;
        self.free.push(index);
        value
    }

    fn check_slot(&self, slot: usize) {
        assert!(
            slot < self.lists.len(),
            "slot index {slot} out of range (slot count {})",
            self.lists.len()
        );
    }
}

/// 槽位迭代器
#[allow(dead_code)]
pub struct SlotIter<'a, T> {
    store: &'a SlotStore<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for SlotIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let node = &self.store.nodes[index];
        self.cursor = node.next;
        node.value.as_ref()
    }
}
