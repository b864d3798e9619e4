//! LRU Tracker Module
//!
//! Implements the recency list used for cache eviction.

// == Slot ==
/// Stable handle to a node in an [`LruList`].
///
/// Entries keep their slot as a back-reference so touching and unlinking
/// never needs a scan.
pub type Slot = usize;

#[derive(Debug)]
struct Node {
    key: String,
    prev: Option<Slot>,
    next: Option<Slot>,
}

// == LRU List ==
/// Doubly-linked recency list stored in a slab.
///
/// - Front = Most recently used
/// - Back = Least recently used
///
/// Freed slots are recycled, so a slot is only valid until it is unlinked.
#[derive(Debug, Default)]
pub struct LruList {
    nodes: Vec<Option<Node>>,
    free: Vec<Slot>,
    head: Option<Slot>,
    tail: Option<Slot>,
    len: usize,
}

impl LruList {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self::default()
    }

    // == Push Front ==
    /// Inserts a key as most recently used and returns its slot.
    pub fn push_front(&mut self, key: &str) -> Slot {
        let node = Node {
            key: key.to_string(),
            prev: None,
            next: self.head,
        };

        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };

        if let Some(old_head) = self.head {
            self.node_mut(old_head).prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
        self.len += 1;
        slot
    }

    // == Move To Front ==
    /// Marks the node at `slot` as most recently used.
    pub fn move_to_front(&mut self, slot: Slot) {
        if self.head == Some(slot) || !self.is_live(slot) {
            return;
        }
        self.detach(slot);

        let old_head = self.head;
        {
            let node = self.node_mut(slot);
            node.prev = None;
            node.next = old_head;
        }
        if let Some(old_head) = old_head {
            self.node_mut(old_head).prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }

    // == Remove ==
    /// Unlinks the node at `slot` and returns its key.
    pub fn remove(&mut self, slot: Slot) -> Option<String> {
        if !self.is_live(slot) {
            return None;
        }
        self.detach(slot);
        let node = self.nodes[slot].take()?;
        self.free.push(slot);
        self.len -= 1;
        Some(node.key)
    }

    // == Pop Back ==
    /// Removes and returns the least recently used key.
    ///
    /// Returns None if the list is empty.
    pub fn pop_back(&mut self) -> Option<String> {
        let tail = self.tail?;
        self.remove(tail)
    }

    // == Peek Back ==
    /// Returns the least recently used key without removing it.
    pub fn peek_back(&self) -> Option<&str> {
        self.tail
            .and_then(|slot| self.nodes[slot].as_ref())
            .map(|node| node.key.as_str())
    }

    /// Iterates keys from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.nodes[cursor?].as_ref()?;
            cursor = node.next;
            Some(node.key.as_str())
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn is_live(&self, slot: Slot) -> bool {
        matches!(self.nodes.get(slot), Some(Some(_)))
    }

    // Slots passed here are always live; callers check with is_live first.
    fn node_mut(&mut self, slot: Slot) -> &mut Node {
        self.nodes[slot]
            .as_mut()
            .unwrap_or_else(|| unreachable!("slot {slot} is not linked"))
    }

    /// Unlinks a node from its neighbours without freeing it.
    fn detach(&mut self, slot: Slot) {
        let (prev, next) = {
            let node = self.node_mut(slot);
            (node.prev.take(), node.next.take())
        };

        match prev {
            Some(prev) => self.node_mut(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.node_mut(next).prev = prev,
            None => self.tail = prev,
        }
    }
}
