//! Incoming movement directions.

use walkcost_core::{Extent, Point};
use walkcost_segment::{Segment, SegmentStats};

use crate::config::TileBudget;
use crate::error::WalkError;

/// A set of the 16 move directions, bit `i` standing for azimuth
/// `22.5 * (i + 1)`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirectionSet(u16);

impl DirectionSet {
    pub const EMPTY: Self = Self(0);

    #[inline]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn single(bit: u8) -> Self {
        Self(1 << (bit & 15))
    }

    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, bit: u8) -> bool {
        self.0 & (1 << (bit & 15)) != 0
    }

    /// The bit pointing the opposite way.
    #[inline]
    pub const fn inverse(bit: u8) -> u8 {
        (bit + 8) % 16
    }

    /// Add `bit` to the set unless `origin`, the set of the cell the move
    /// starts from, already holds its inverse: that would record a path
    /// doubling back on itself. Returns whether the set changed.
    pub fn merge(&mut self, bit: u8, origin: DirectionSet) -> bool {
        if origin.contains(Self::inverse(bit)) || self.contains(bit) {
            return false;
        }
        self.0 |= 1 << (bit & 15);
        true
    }

    /// Azimuth of the lowest direction in the set.
    pub fn azimuth(self) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        Some(22.5 * (self.0.trailing_zeros() as f32 + 1.0))
    }
}

/// Per-cell [`DirectionSet`]s kept in a tiled store.
#[derive(Debug)]
pub struct DirectionStore {
    seg: Segment<u16>,
}

impl DirectionStore {
    /// A store with every set empty.
    pub fn new(extent: Extent, budget: TileBudget) -> Result<Self, WalkError> {
        let layout = budget.layout(extent)?;
        let seg = Segment::filled(layout, budget.resident_tiles, &0)?;
        Ok(Self { seg })
    }

    #[inline]
    pub fn read(&mut self, p: Point) -> Result<DirectionSet, WalkError> {
        Ok(DirectionSet(self.seg.get(p)?))
    }

    #[inline]
    pub fn write(&mut self, p: Point, set: DirectionSet) -> Result<(), WalkError> {
        Ok(self.seg.put(p, &set.0)?)
    }

    pub fn stats(&self) -> SegmentStats {
        self.seg.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_and_azimuth() {
        assert_eq!(DirectionSet::single(15).azimuth(), Some(360.0));
        assert_eq!(DirectionSet::single(0).azimuth(), Some(22.5));
        assert_eq!(DirectionSet::EMPTY.azimuth(), None);
        assert_eq!(DirectionSet::from_bits(0b1010).azimuth(), Some(45.0));
    }

    #[test]
    fn inverse_pairs() {
        assert_eq!(DirectionSet::inverse(15), 7);
        assert_eq!(DirectionSet::inverse(3), 11);
        assert_eq!(DirectionSet::inverse(DirectionSet::inverse(5)), 5);
    }

    #[test]
    fn merge_refuses_doubling_back() {
        // the origin was reached moving east (bit 7); going back west is bit 15
        let origin = DirectionSet::single(7);
        let mut target = DirectionSet::single(3);
        assert!(!target.merge(15, origin));
        assert_eq!(target, DirectionSet::single(3));
        assert!(target.merge(11, origin));
        assert!(target.contains(11));
        assert!(!target.merge(11, origin));
    }

    #[test]
    fn store_round_trip() {
        let budget = TileBudget {
            tile_rows: 2,
            tile_cols: 2,
            resident_tiles: 1,
        };
        let mut store = DirectionStore::new(Extent::new(3, 3), budget).unwrap();
        assert!(store.read(Point::new(2, 2)).unwrap().is_empty());
        let set = DirectionSet::from_bits(0b1000_0000_0000_0001);
        store.write(Point::new(2, 2), set).unwrap();
        store.read(Point::new(0, 0)).unwrap();
        assert_eq!(store.read(Point::new(2, 2)).unwrap(), set);
    }
}
