use std::path::PathBuf;

pub const HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryEntry {
    pub path: Option<PathBuf>,
    pub page: usize,
}

/// Fixed-size ring of visited locations with a cursor. The cursor entry is the
/// current location; `back_len` counts it plus everything reachable backward.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    back_len: usize,
    forward_len: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self {
            entries: vec![HistoryEntry::default(); HISTORY_CAPACITY],
            cursor: HISTORY_CAPACITY - 1,
            back_len: 0,
            forward_len: 0,
        }
    }

    /// Records a visit and drops the forward branch.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.cursor = (self.cursor + 1) % HISTORY_CAPACITY;
        self.entries[self.cursor] = entry;
        self.back_len = (self.back_len + 1).min(HISTORY_CAPACITY);
        self.forward_len = 0;
    }

    pub fn can_go_back(&self) -> bool {
        self.back_len > 1
    }

    pub fn can_go_forward(&self) -> bool {
        self.forward_len > 0
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        (self.back_len > 0).then(|| &self.entries[self.cursor])
    }

    pub fn step_back(&mut self) -> Option<&HistoryEntry> {
        if !self.can_go_back() {
            return None;
        }
        self.cursor = (self.cursor + HISTORY_CAPACITY - 1) % HISTORY_CAPACITY;
        self.back_len -= 1;
        self.forward_len += 1;
        Some(&self.entries[self.cursor])
    }

    pub fn step_forward(&mut self) -> Option<&HistoryEntry> {
        if !self.can_go_forward() {
            return None;
        }
        self.cursor = (self.cursor + 1) % HISTORY_CAPACITY;
        self.back_len += 1;
        self.forward_len -= 1;
        Some(&self.entries[self.cursor])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(page: usize) -> HistoryEntry {
        HistoryEntry {
            path: Some(PathBuf::from("/docs/a.pdf")),
            page,
        }
    }

    #[test]
    fn back_and_forward_walk_recorded_pages() {
        let mut history = History::new();
        history.record(at(5));
        history.record(at(7));
        assert!(history.can_go_back());
        assert!(!history.can_go_forward());
        assert_eq!(history.step_back().map(|e| e.page), Some(5));
        assert!(history.step_back().is_none());
        assert_eq!(history.step_forward().map(|e| e.page), Some(7));
        assert!(history.step_forward().is_none());
    }

    #[test]
    fn recording_truncates_forward_branch() {
        let mut history = History::new();
        history.record(at(1));
        history.record(at(2));
        history.step_back();
        history.record(at(3));
        assert!(!history.can_go_forward());
        assert_eq!(history.step_back().map(|e| e.page), Some(1));
    }

    #[test]
    fn ring_keeps_most_recent_entries() {
        let mut history = History::new();
        for page in 1..=HISTORY_CAPACITY + 10 {
            history.record(at(page));
        }
        let mut steps = 0;
        let mut oldest = 0;
        while let Some(entry) = history.step_back() {
            oldest = entry.page;
            steps += 1;
        }
        assert_eq!(steps, HISTORY_CAPACITY - 1);
        assert_eq!(oldest, 11);
    }
}
