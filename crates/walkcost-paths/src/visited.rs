//! One bit per cell.

use walkcost_core::{Extent, Point};

/// A packed boolean grid.
///
/// Marks finalized cells during a run, cells still holding their start
/// cost, and null-elevation cells when nulls are kept in the output.
#[derive(Clone, Debug)]
pub struct FlagGrid {
    extent: Extent,
    words: Vec<u64>,
    count: usize,
}

impl FlagGrid {
    /// A grid with every flag cleared.
    pub fn new(extent: Extent) -> Self {
        Self {
            extent,
            words: vec![0; extent.len().div_ceil(64)],
            count: 0,
        }
    }

    #[inline]
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Whether the flag at `p` is set. Outside the grid reads as unset.
    #[inline]
    pub fn get(&self, p: Point) -> bool {
        match self.extent.index(p) {
            Some(i) => self.words[i / 64] & (1 << (i % 64)) != 0,
            None => false,
        }
    }

    /// Set the flag at `p`, returning whether it was previously clear.
    /// Points outside the grid are ignored.
    #[inline]
    pub fn set(&mut self, p: Point) -> bool {
        let Some(i) = self.extent.index(p) else {
            return false;
        };
        let (w, bit) = (i / 64, 1u64 << (i % 64));
        if self.words[w] & bit != 0 {
            return false;
        }
        self.words[w] |= bit;
        self.count += 1;
        true
    }

    /// Clear the flag at `p`, returning whether it was set.
    #[inline]
    pub fn clear(&mut self, p: Point) -> bool {
        let Some(i) = self.extent.index(p) else {
            return false;
        };
        let (w, bit) = (i / 64, 1u64 << (i % 64));
        if self.words[w] & bit == 0 {
            return false;
        }
        self.words[w] &= !bit;
        self.count -= 1;
        true
    }

    /// Number of set flags.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }
}
