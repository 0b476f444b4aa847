//! Ternary min-heap of open cells.
//!
//! Entries are ordered by `(cost, seq)` where `seq` is assigned from a
//! monotonically increasing counter on insertion, so equal costs pop in
//! insertion order. Entries live in an arena addressed by [`EntryHandle`];
//! the heap itself only shuffles `u32` indices. Released arena slots go on a
//! free stack and are reused by later inserts.
//!
//! There is no decrease-key: a cheaper path to a cell is a new entry, and the
//! superseded one is recognised as stale when it is popped.

use std::cmp::Ordering;

use walkcost_core::Point;

/// A candidate cell on the frontier.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrontierEntry {
    pub cost: f64,
    pub seq: u64,
    pub point: Point,
}

impl FrontierEntry {
    #[inline]
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Index of an entry in the frontier arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntryHandle(u32);

const ARITY: usize = 3;

#[derive(Debug, Default)]
pub struct Frontier {
    arena: Vec<FrontierEntry>,
    free: Vec<u32>,
    heap: Vec<u32>,
    next_seq: u64,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size for about `capacity` simultaneous entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: Vec::with_capacity(capacity),
            free: Vec::new(),
            heap: Vec::with_capacity(capacity),
            next_seq: 0,
        }
    }

    /// Number of entries waiting in the heap.
    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Add a candidate and return its handle.
    pub fn insert(&mut self, cost: f64, point: Point) -> EntryHandle {
        let entry = FrontierEntry {
            cost,
            seq: self.next_seq,
            point,
        };
        self.next_seq += 1;
        let idx = match self.free.pop() {
            Some(i) => {
                self.arena[i as usize] = entry;
                i
            }
            None => {
                self.arena.push(entry);
                (self.arena.len() - 1) as u32
            }
        };
        self.heap.push(idx);
        self.sift_up(self.heap.len() - 1);
        EntryHandle(idx)
    }

    /// Remove the smallest `(cost, seq)` entry. `None` when exhausted.
    ///
    /// The arena slot stays reserved until [`release`](Self::release).
    pub fn pop_min(&mut self) -> Option<(EntryHandle, FrontierEntry)> {
        let last = self.heap.pop()?;
        let top = if self.heap.is_empty() {
            last
        } else {
            let top = self.heap[0];
            self.heap[0] = last;
            self.sift_down(0);
            top
        };
        Some((EntryHandle(top), self.arena[top as usize]))
    }

    /// Return a popped entry's slot to the pool.
    pub fn release(&mut self, handle: EntryHandle) {
        self.free.push(handle.0);
    }

    #[inline]
    fn less(&self, a: usize, b: usize) -> bool {
        let (ea, eb) = (&self.arena[self.heap[a] as usize], &self.arena[self.heap[b] as usize]);
        ea.key_cmp(eb) == Ordering::Less
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / ARITY;
            if !self.less(i, parent) {
                break;
            }
            self.heap.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.heap.len();
        loop {
            let first = ARITY * i + 1;
            if first >= n {
                break;
            }
            let mut best = first;
            for child in first + 1..(first + ARITY).min(n) {
                if self.less(child, best) {
                    best = child;
                }
            }
            if !self.less(best, i) {
                break;
            }
            self.heap.swap(i, best);
            i = best;
        }
    }
}
