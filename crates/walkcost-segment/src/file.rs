//! Byte-level tiled storage over an anonymous temporary file.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use walkcost_core::Point;

use crate::error::SegmentError;
use crate::layout::TileLayout;

/// Access counters for a [`SegmentFile`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SegmentStats {
    /// Accesses served by a resident tile.
    pub hits: u64,
    /// Accesses that had to load a tile from disk.
    pub misses: u64,
    /// Tiles dropped from memory to make room.
    pub evictions: u64,
    /// Dirty tiles written back to disk.
    pub writebacks: u64,
}

/// One resident tile.
#[derive(Debug)]
struct Slot {
    tile: usize,
    dirty: bool,
    last_used: u64,
    data: Vec<u8>,
}

/// A grid of fixed-size records kept mostly on disk.
///
/// At most `resident_tiles` tiles are held in memory; the least recently
/// used one is written back (if modified) and dropped when another tile is
/// needed. The backing file is unlinked on creation and vanishes with the
/// handle.
#[derive(Debug)]
pub struct SegmentFile {
    layout: TileLayout,
    record_size: usize,
    budget: usize,
    file: File,
    slots: Vec<Slot>,
    /// Tile index -> slot index, for resident tiles.
    resident: Vec<Option<usize>>,
    tick: u64,
    stats: SegmentStats,
}

impl SegmentFile {
    /// Create a zero-filled store for `layout` with `record_size`-byte cells.
    ///
    /// The budget is clamped to the number of tiles in the layout.
    pub fn open(
        layout: TileLayout,
        record_size: usize,
        resident_tiles: usize,
    ) -> Result<Self, SegmentError> {
        if resident_tiles == 0 {
            return Err(SegmentError::ZeroBudget);
        }
        if record_size == 0 {
            return Err(SegmentError::RecordSize {
                expected: 1,
                found: 0,
            });
        }
        let tiles = layout.tile_count();
        let tile_bytes = layout.cells_per_tile() * record_size;
        let file = tempfile::tempfile()?;
        file.set_len((tiles * tile_bytes) as u64)?;
        let budget = resident_tiles.min(tiles.max(1));
        log::debug!(
            "segment open: grid {}, tiles {}x{} ({} total, {} bytes each), {} resident",
            layout.extent(),
            layout.tile_rows(),
            layout.tile_cols(),
            tiles,
            tile_bytes,
            budget
        );
        Ok(Self {
            layout,
            record_size,
            budget,
            file,
            slots: Vec::with_capacity(budget),
            resident: vec![None; tiles],
            tick: 0,
            stats: SegmentStats::default(),
        })
    }

    #[inline]
    pub fn layout(&self) -> TileLayout {
        self.layout
    }

    #[inline]
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Maximum number of tiles held in memory.
    #[inline]
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Number of tiles currently in memory.
    #[inline]
    pub fn resident_count(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn stats(&self) -> SegmentStats {
        self.stats
    }

    /// Copy the record at `p` into `out`.
    pub fn get(&mut self, p: Point, out: &mut [u8]) -> Result<(), SegmentError> {
        self.check_len(out.len())?;
        let (tile, offset) = self.layout.locate(p)?;
        let slot = self.load(tile)?;
        let start = offset * self.record_size;
        out.copy_from_slice(&self.slots[slot].data[start..start + self.record_size]);
        Ok(())
    }

    /// Overwrite the record at `p` with `record`.
    pub fn put(&mut self, p: Point, record: &[u8]) -> Result<(), SegmentError> {
        self.check_len(record.len())?;
        let (tile, offset) = self.layout.locate(p)?;
        let slot = self.load(tile)?;
        let start = offset * self.record_size;
        let s = &mut self.slots[slot];
        s.data[start..start + self.record_size].copy_from_slice(record);
        s.dirty = true;
        Ok(())
    }

    fn check_len(&self, len: usize) -> Result<(), SegmentError> {
        if len != self.record_size {
            return Err(SegmentError::RecordSize {
                expected: self.record_size,
                found: len,
            });
        }
        Ok(())
    }

    #[inline]
    fn tile_bytes(&self) -> usize {
        self.layout.cells_per_tile() * self.record_size
    }

    /// Make `tile` resident and return its slot index.
    fn load(&mut self, tile: usize) -> Result<usize, SegmentError> {
        self.tick += 1;
        if let Some(slot) = self.resident[tile] {
            self.stats.hits += 1;
            self.slots[slot].last_used = self.tick;
            return Ok(slot);
        }
        self.stats.misses += 1;
        let tile_bytes = self.tile_bytes();

        let slot = if self.slots.len() < self.budget {
            self.slots.push(Slot {
                tile,
                dirty: false,
                last_used: self.tick,
                data: vec![0; tile_bytes],
            });
            self.slots.len() - 1
        } else {
            let victim = self
                .slots
                .iter()
                .enumerate()
                .min_by_key(|(_, s)| s.last_used)
                .map(|(i, _)| i)
                .unwrap_or(0);
            let s = &mut self.slots[victim];
            if s.dirty {
                write_tile(&mut self.file, s.tile, tile_bytes, &s.data)?;
                self.stats.writebacks += 1;
            }
            log::trace!("segment evict tile {} for tile {}", s.tile, tile);
            self.resident[s.tile] = None;
            self.stats.evictions += 1;
            s.tile = tile;
            s.dirty = false;
            s.last_used = self.tick;
            victim
        };

        let s = &mut self.slots[slot];
        self.file
            .seek(SeekFrom::Start((tile * tile_bytes) as u64))?;
        self.file.read_exact(&mut s.data)?;
        self.resident[tile] = Some(slot);
        Ok(slot)
    }
}

fn write_tile(file: &mut File, tile: usize, tile_bytes: usize, data: &[u8]) -> std::io::Result<()> {
    file.seek(SeekFrom::Start((tile * tile_bytes) as u64))?;
    file.write_all(data)
}
