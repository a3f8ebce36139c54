//! Task identifiers and the generation-checked slot arena of a worker.
//!
//! 任务标识符以及工作线程中带代数检查的槽位池。

use std::fmt;

/// Identifies one fetch task: the worker that owns it, the slot it occupies,
/// and the generation of that slot when the task started.
///
/// A slot is reused by later tasks with a higher generation, so an id held
/// after `stop` never resolves to somebody else's task.
///
/// 标识一个抓取任务：拥有它的工作线程、它占用的槽位，以及任务启动时该槽位的代数。
///
/// 槽位会被之后代数更高的任务复用，因此 `stop` 之后持有的 id 永远不会解析到其他任务。
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    worker: usize,
    slot: usize,
    generation: u32,
}

impl TaskId {
    pub(crate) fn new(worker: usize, slot: usize, generation: u32) -> Self {
        Self {
            worker,
            slot,
            generation,
        }
    }

    /// Index of the owning worker.
    pub fn worker(&self) -> usize {
        self.worker
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}#{}", self.worker, self.slot, self.generation)
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({self})")
    }
}

#[derive(Debug)]
struct Entry<T> {
    generation: u32,
    active: bool,
    value: T,
}

/// A fixed set of preallocated slots owned by one worker.
///
/// 一个工作线程拥有的固定数量的预分配槽位。
#[derive(Debug)]
pub(crate) struct TaskArena<T> {
    worker: usize,
    entries: Vec<Entry<T>>,
    n_active: usize,
}

impl<T> TaskArena<T> {
    pub(crate) fn new(worker: usize, values: Vec<T>) -> Self {
        Self {
            worker,
            entries: values
                .into_iter()
                .map(|value| Entry {
                    generation: 0,
                    active: false,
                    value,
                })
                .collect(),
            n_active: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn n_active(&self) -> usize {
        self.n_active
    }

    /// Claims a free slot under a new generation.
    ///
    /// 以新的代数占用一个空闲槽位。
    pub(crate) fn acquire(&mut self) -> Option<(TaskId, &mut T)> {
        let worker = self.worker;
        let (slot, entry) = self
            .entries
            .iter_mut()
            .enumerate()
            .find(|(_, entry)| !entry.active)?;
        entry.generation = entry.generation.wrapping_add(1);
        entry.active = true;
        self.n_active += 1;
        Some((TaskId::new(worker, slot, entry.generation), &mut entry.value))
    }

    fn entry_mut(&mut self, id: TaskId) -> Option<&mut Entry<T>> {
        if id.worker != self.worker {
            return None;
        }
        self.entries
            .get_mut(id.slot)
            .filter(|entry| entry.active && entry.generation == id.generation)
    }

    /// Resolves a live task.
    ///
    /// 解析一个存活的任务。
    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut T> {
        self.entry_mut(id).map(|entry| &mut entry.value)
    }

    /// Marks the slot of a live task free. The value stays in place for reuse.
    ///
    /// 将存活任务的槽位标记为空闲。值保留在原处以便复用。
    pub(crate) fn release(&mut self, id: TaskId) -> Option<&mut T> {
        self.entry_mut(id)?;
        self.n_active -= 1;
        let entry = &mut self.entries[id.slot];
        entry.active = false;
        Some(&mut entry.value)
    }

    /// Iterates over live tasks.
    pub(crate) fn iter_active_mut(&mut self) -> impl Iterator<Item = (TaskId, &mut T)> {
        let worker = self.worker;
        self.entries
            .iter_mut()
            .enumerate()
            .filter(|(_, entry)| entry.active)
            .map(move |(slot, entry)| (TaskId::new(worker, slot, entry.generation), &mut entry.value))
    }

    pub(crate) fn active_ids(&self) -> Vec<TaskId> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.active)
            .map(|(slot, entry)| TaskId::new(self.worker, slot, entry.generation))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_until_full() {
        let mut arena = TaskArena::new(3, vec!['a', 'b']);
        assert_eq!(arena.capacity(), 2);

        let (id0, v0) = arena.acquire().unwrap();
        assert_eq!(*v0, 'a');
        let (id1, _) = arena.acquire().unwrap();
        assert!(arena.acquire().is_none());
        assert_eq!(arena.n_active(), 2);

        assert_eq!(id0.worker(), 3);
        assert_ne!(id0.slot(), id1.slot());
        assert_eq!(id0.to_string(), "3.0#1");
    }

    #[test]
    fn test_stale_id_rejected_after_reuse() {
        let mut arena = TaskArena::new(0, vec![0u32]);
        let (old, _) = arena.acquire().unwrap();
        *arena.get_mut(old).unwrap() = 42;

        assert_eq!(arena.release(old), Some(&mut 42));
        assert!(arena.get_mut(old).is_none());
        assert!(arena.release(old).is_none());

        let (new, value) = arena.acquire().unwrap();
        assert_eq!(*value, 42);
        assert_eq!(new.slot(), old.slot());
        assert_eq!(new.generation(), old.generation() + 1);
        assert!(arena.get_mut(old).is_none());
        assert!(arena.get_mut(new).is_some());
    }

    #[test]
    fn test_foreign_worker_rejected() {
        let mut arena = TaskArena::new(0, vec![()]);
        let (id, _) = arena.acquire().unwrap();
        let foreign = TaskId::new(1, id.slot(), id.generation());
        assert!(arena.get_mut(foreign).is_none());
    }

    #[test]
    fn test_iter_active() {
        let mut arena = TaskArena::new(0, vec![1, 2, 3]);
        let (a, _) = arena.acquire().unwrap();
        let (b, _) = arena.acquire().unwrap();
        arena.release(a);

        let ids: Vec<_> = arena.iter_active_mut().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![b]);
        assert_eq!(arena.active_ids(), vec![b]);
    }
}
