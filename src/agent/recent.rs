//! Bounded memory of recently seen ids.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// How many ids a component remembers unless told otherwise.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Set that forgets its oldest entries once it holds `capacity` of them.
#[derive(Debug, Clone)]
pub struct RecentSet<T> {
    order: VecDeque<T>,
    members: HashSet<T>,
    capacity: usize,
}

impl<T: Copy + Eq + Hash> RecentSet<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            members: HashSet::new(),
            capacity: capacity.max(1),
        }
    }

    /// Remember `item`. Returns `false` if it was already remembered.
    pub fn insert(&mut self, item: T) -> bool {
        if !self.members.insert(item) {
            return false;
        }
        self.order.push_back(item);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        true
    }

    pub fn contains(&self, item: &T) -> bool {
        self.members.contains(item)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
