use std::collections::{HashSet, VecDeque};

use latentflow_types::BlockId;

/// Bounded set of recently seen block ids with strict FIFO eviction.
///
/// A hit does not refresh an id's position: eviction order is insertion
/// order only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DedupIndex {
    order: VecDeque<BlockId>,
    members: HashSet<BlockId>,
    capacity: usize,
}

impl DedupIndex {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity.min(4096)),
            members: HashSet::new(),
            capacity,
        }
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.members.contains(id)
    }

    /// Insert an id, evicting the oldest one when full.
    ///
    /// Returns the evicted id, if any. Inserting a known id is a no-op.
    pub fn insert(&mut self, id: BlockId) -> Option<BlockId> {
        if self.capacity == 0 || self.members.contains(&id) {
            return None;
        }

        let evicted = if self.order.len() >= self.capacity {
            let oldest = self.order.pop_front();
            if let Some(ref old) = oldest {
                self.members.remove(old);
            }
            oldest
        } else {
            None
        };

        self.members.insert(id.clone());
        self.order.push_back(id);
        evicted
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

    /// Ids from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &BlockId> {
        self.order.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> BlockId {
        BlockId::new(s)
    }

    #[test]
    fn evicts_oldest_first() {
        let mut index = DedupIndex::new(2);
        assert_eq!(index.insert(id("a")), None);
        assert_eq!(index.insert(id("b")), None);
        assert_eq!(index.insert(id("c")), Some(id("a")));

        let remaining: Vec<_> = index.iter().map(|i| i.as_str().to_string()).collect();
        assert_eq!(remaining, vec!["b", "c"]);
        assert!(!index.contains(&id("a")));
    }

    #[test]
    fn duplicate_insert_does_not_refresh_position() {
        let mut index = DedupIndex::new(2);
        index.insert(id("a"));
        index.insert(id("b"));
        index.insert(id("a"));
        assert_eq!(index.insert(id("c")), Some(id("a")));
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut index = DedupIndex::new(0);
        index.insert(id("a"));
        assert!(index.is_empty());
        assert!(!index.contains(&id("a")));
    }
}
