//! Fixed-capacity history buffers.

use std::collections::VecDeque;

/// Default number of slots kept by each history buffer of a shell.
pub const DEFAULT_CAPACITY: usize = 20;

/// A fixed-size stack of optional values.
///
/// The buffer always holds exactly `capacity` slots. Appending drops the oldest
/// slot and puts the new value at the newest position; popping takes the newest
/// slot out and shifts an empty slot in at the oldest end. Popping an empty
/// buffer yields `None`, it never fails.
///
/// A slot may legitimately hold `None` (a command that produced no output is
/// still recorded), so `pop` cannot tell "empty slot" from "nothing left".
#[derive(Debug, Clone)]
pub struct FixedStack<T> {
    slots: VecDeque<Option<T>>,
}

impl<T> FixedStack<T> {
    /// Create a buffer with `capacity` empty slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Record `value` as the newest entry, evicting the oldest one.
    pub fn append(&mut self, value: impl Into<Option<T>>) {
        if self.slots.is_empty() {
            return;
        }
        self.slots.pop_front();
        self.slots.push_back(value.into());
    }

    /// Remove and return the newest entry.
    pub fn pop(&mut self) -> Option<T> {
        if self.slots.is_empty() {
            return None;
        }
        self.slots.push_front(None);
        self.slots.pop_back().flatten()
    }

    /// Peek at the newest entry without removing it.
    pub fn last(&self) -> Option<&T> {
        self.slots.back().and_then(Option::as_ref)
    }

    /// Iterate over the occupied slots, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.slots.iter().filter_map(Option::as_ref)
    }
}

impl<T> Default for FixedStack<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_returns_newest_first() {
        let mut stack = FixedStack::new(5);
        for i in 1..=3 {
            stack.append(i);
        }

        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), Some(1));
    }

    #[test]
    fn test_pop_beyond_contents_is_none() {
        let mut stack = FixedStack::new(3);
        stack.append("a");

        assert_eq!(stack.pop(), Some("a"));
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.capacity(), 3);
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut stack = FixedStack::new(2);
        stack.append(1);
        stack.append(2);
        stack.append(3);

        assert_eq!(stack.iter().copied().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_absent_values_occupy_a_slot() {
        let mut stack: FixedStack<String> = FixedStack::new(4);
        stack.append("first".to_string());
        stack.append(None);

        assert_eq!(stack.last(), None);
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.pop(), Some("first".to_string()));
    }

    #[test]
    fn test_zero_capacity_never_panics() {
        let mut stack = FixedStack::new(0);
        stack.append(1);
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_default_capacity() {
        let stack: FixedStack<u8> = FixedStack::default();
        assert_eq!(stack.capacity(), DEFAULT_CAPACITY);
    }
}
