//! Bounded linear undo/redo history.

/// Default maximum number of history entries.
pub const MAX_HISTORY_SIZE: usize = 50;

/// Snapshots on either side of the live state.
///
/// `entries[..cursor]` are older states (most recent last) and
/// `entries[cursor..]` are states that were undone. Undo and redo swap the
/// live state with the neighbouring entry, so the total never grows past
/// `max_size`.
#[derive(Debug, Clone)]
pub struct HistoryManager<T> {
    entries: Vec<T>,
    cursor: usize,
    max_size: usize,
}

impl<T> Default for HistoryManager<T> {
    fn default() -> Self {
        Self::new(MAX_HISTORY_SIZE)
    }
}

impl<T> HistoryManager<T> {
    /// Create a history holding at most `max_size` snapshots (minimum 1).
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            max_size: max_size.max(1),
        }
    }

    /// Record the state that preceded a change.
    ///
    /// Any undone entries are discarded first. When the bound is exceeded the
    /// oldest entry is dropped.
    pub fn push(&mut self, snapshot: T) {
        self.entries.truncate(self.cursor);
        self.entries.push(snapshot);
        self.cursor += 1;

        if self.entries.len() > self.max_size {
            self.entries.remove(0);
            self.cursor -= 1;
        }
    }

    /// Step back. `current` is the live state, kept for a later redo.
    /// Returns the snapshot to install, or `None` if there is nothing to undo.
    pub fn undo(&mut self, current: T) -> Option<T> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(std::mem::replace(&mut self.entries[self.cursor], current))
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: T) -> Option<T> {
        if self.cursor >= self.entries.len() {
            return None;
        }
        let snapshot = std::mem::replace(&mut self.entries[self.cursor], current);
        self.cursor += 1;
        Some(snapshot)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Number of undo steps available.
    pub fn undo_depth(&self) -> usize {
        self.cursor
    }

    /// Number of redo steps available.
    pub fn redo_depth(&self) -> usize {
        self.entries.len() - self.cursor
    }

    /// Total stored snapshots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo_walks_the_timeline() {
        let mut history = HistoryManager::new(10);
        // Live value goes 0 -> 1 -> 2; push the value before each change.
        history.push(0);
        history.push(1);

        assert_eq!(history.undo(2), Some(1));
        assert_eq!(history.undo(1), Some(0));
        assert_eq!(history.undo(0), None);

        assert_eq!(history.redo(0), Some(1));
        assert_eq!(history.redo(1), Some(2));
        assert_eq!(history.redo(2), None);
    }

    #[test]
    fn test_push_after_undo_discards_future() {
        let mut history = HistoryManager::new(10);
        history.push(0);
        history.push(1);
        assert_eq!(history.undo(2), Some(1));
        assert!(history.can_redo());

        history.push(1);
        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
        assert_eq!(history.undo(5), Some(1));
    }

    #[test]
    fn test_bound_drops_oldest() {
        let max = 5;
        let mut history = HistoryManager::new(max);
        for i in 0..(max + 3) {
            history.push(i);
            assert!(history.len() <= max);
        }

        let mut live = max + 3;
        let mut undone = 0;
        while let Some(previous) = history.undo(live) {
            live = previous;
            undone += 1;
        }
        assert_eq!(undone, max);
        assert_eq!(live, 3);
        assert_eq!(history.len(), max);
    }

    #[test]
    fn test_empty_history() {
        let mut history: HistoryManager<u32> = HistoryManager::default();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.undo(1), None);
        assert_eq!(history.redo(1), None);
        assert_eq!(history.max_size(), MAX_HISTORY_SIZE);
    }

    #[test]
    fn test_clear() {
        let mut history = HistoryManager::new(3);
        history.push("a");
        history.clear();
        assert!(history.is_empty());
        assert!(!history.can_undo());
    }
}
