//! Fixed-capacity history ring shared between threads.
//!
//! Every append is a single locked push-and-evict, so concurrent writers
//! can never push the ring past its capacity.

use std::collections::VecDeque;
use std::sync::Mutex;

/// A thread-safe ring buffer that drops its oldest entry when full.
#[derive(Debug)]
pub struct BoundedHistory<T> {
    capacity: usize,
    entries: Mutex<VecDeque<T>>,
}

impl<T: Clone> BoundedHistory<T> {
    /// Create an empty history. A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Append an entry, returning the evicted oldest entry if the ring
    /// was full.
    pub fn push(&self, entry: T) -> Option<T> {
        let mut entries = self.entries.lock().expect("history lock");
        let evicted = if entries.len() == self.capacity {
            entries.pop_front()
        } else {
            None
        };
        entries.push_back(entry);
        evicted
    }

    /// Copy of all entries, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        let entries = self.entries.lock().expect("history lock");
        entries.iter().cloned().collect()
    }

    /// Copy of the newest `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<T> {
        let entries = self.entries.lock().expect("history lock");
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    /// Newest entry, if any.
    pub fn latest(&self) -> Option<T> {
        let entries = self.entries.lock().expect("history lock");
        entries.back().cloned()
    }

    /// Run `f` over the entries without copying them.
    pub fn with<R>(&self, f: impl FnOnce(&VecDeque<T>) -> R) -> R {
        let entries = self.entries.lock().expect("history lock");
        f(&entries)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("history lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.entries.lock().expect("history lock").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn evicts_oldest_when_full() {
        let history = BoundedHistory::new(3);
        assert_eq!(history.push(1), None);
        assert_eq!(history.push(2), None);
        assert_eq!(history.push(3), None);
        assert_eq!(history.push(4), Some(1));
        assert_eq!(history.snapshot(), vec![2, 3, 4]);
        assert_eq!(history.latest(), Some(4));
    }

    #[test]
    fn recent_returns_newest_in_order() {
        let history = BoundedHistory::new(10);
        for i in 0..6 {
            history.push(i);
        }
        assert_eq!(history.recent(2), vec![4, 5]);
        assert_eq!(history.recent(100).len(), 6);
    }

    #[test]
    fn zero_capacity_holds_one() {
        let history = BoundedHistory::new(0);
        history.push("a");
        history.push("b");
        assert_eq!(history.snapshot(), vec!["b"]);
        assert_eq!(history.capacity(), 1);
    }

    #[test]
    fn concurrent_pushes_respect_capacity() {
        let history = Arc::new(BoundedHistory::new(50));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let history = Arc::clone(&history);
                std::thread::spawn(move || {
                    for i in 0..500 {
                        history.push(t * 1000 + i);
                        assert!(history.len() <= 50);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(history.len(), 50);
    }
}
