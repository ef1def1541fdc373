//! Bounded set of already-classified message bodies

use std::collections::{HashSet, VecDeque};

/// Remembers completion bodies that belong to other jobs
///
/// Holds at most `capacity` bodies; inserting past capacity evicts the
/// oldest one. An evicted body that shows up again is simply treated as new.
#[derive(Debug, Clone)]
pub struct DedupSet {
    capacity: usize,
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl DedupSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            members: HashSet::new(),
        }
    }

    /// Adds a body, returning `true` if it was not already present
    pub fn insert(&mut self, body: &str) -> bool {
        if self.members.contains(body) {
            return false;
        }

        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }

        self.order.push_back(body.to_string());
        self.members.insert(body.to_string());
        true
    }

    pub fn contains(&self, body: &str) -> bool {
        self.members.contains(body)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
