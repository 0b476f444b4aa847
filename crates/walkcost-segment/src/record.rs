//! Typed records on top of [`SegmentFile`].

use std::io;
use std::marker::PhantomData;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use walkcost_core::{Extent, Point};

use crate::error::SegmentError;
use crate::file::{SegmentFile, SegmentStats};
use crate::layout::TileLayout;

/// A fixed-size value that can live in a segment.
///
/// `encode` must write exactly [`Record::SIZE`] bytes and `decode` must read
/// them back. All encodings are little-endian.
pub trait Record: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    fn encode(&self, out: &mut &mut [u8]) -> io::Result<()>;

    fn decode(input: &mut &[u8]) -> io::Result<Self>;
}

impl Record for f64 {
    const SIZE: usize = 8;

    fn encode(&self, out: &mut &mut [u8]) -> io::Result<()> {
        out.write_f64::<LittleEndian>(*self)
    }

    fn decode(input: &mut &[u8]) -> io::Result<Self> {
        input.read_f64::<LittleEndian>()
    }
}

impl Record for u16 {
    const SIZE: usize = 2;

    fn encode(&self, out: &mut &mut [u8]) -> io::Result<()> {
        out.write_u16::<LittleEndian>(*self)
    }

    fn decode(input: &mut &[u8]) -> io::Result<Self> {
        input.read_u16::<LittleEndian>()
    }
}

/// Nullable floats are stored as NaN.
impl Record for Option<f64> {
    const SIZE: usize = 8;

    fn encode(&self, out: &mut &mut [u8]) -> io::Result<()> {
        out.write_f64::<LittleEndian>(null_to_nan(*self))
    }

    fn decode(input: &mut &[u8]) -> io::Result<Self> {
        input.read_f64::<LittleEndian>().map(nan_to_null)
    }
}

/// Map `None` to NaN for storage.
#[inline]
pub fn null_to_nan(v: Option<f64>) -> f64 {
    v.unwrap_or(f64::NAN)
}

/// Map a stored NaN back to `None`.
#[inline]
pub fn nan_to_null(v: f64) -> Option<f64> {
    if v.is_nan() { None } else { Some(v) }
}

/// A tiled grid of `R` records.
#[derive(Debug)]
pub struct Segment<R: Record> {
    file: SegmentFile,
    buf: Vec<u8>,
    _record: PhantomData<R>,
}

impl<R: Record> Segment<R> {
    /// Open a segment for `extent`, cut into `tile_rows x tile_cols` tiles
    /// with at most `resident_tiles` in memory.
    pub fn open(
        extent: Extent,
        tile_rows: i32,
        tile_cols: i32,
        resident_tiles: usize,
    ) -> Result<Self, SegmentError> {
        let layout = TileLayout::new(extent, tile_rows, tile_cols)?;
        Self::with_layout(layout, resident_tiles)
    }

    /// Open a segment for an existing layout.
    pub fn with_layout(layout: TileLayout, resident_tiles: usize) -> Result<Self, SegmentError> {
        Ok(Self {
            file: SegmentFile::open(layout, R::SIZE, resident_tiles)?,
            buf: vec![0; R::SIZE],
            _record: PhantomData,
        })
    }

    /// Open a segment and write `value` into every cell.
    pub fn filled(layout: TileLayout, resident_tiles: usize, value: &R) -> Result<Self, SegmentError> {
        let mut seg = Self::with_layout(layout, resident_tiles)?;
        for p in layout.extent() {
            seg.put(p, value)?;
        }
        Ok(seg)
    }

    #[inline]
    pub fn extent(&self) -> Extent {
        self.file.layout().extent()
    }

    #[inline]
    pub fn layout(&self) -> TileLayout {
        self.file.layout()
    }

    #[inline]
    pub fn stats(&self) -> SegmentStats {
        self.file.stats()
    }

    /// Read the record at `p`.
    pub fn get(&mut self, p: Point) -> Result<R, SegmentError> {
        self.file.get(p, &mut self.buf)?;
        let mut input: &[u8] = &self.buf;
        Ok(R::decode(&mut input)?)
    }

    /// Write the record at `p`.
    pub fn put(&mut self, p: Point, record: &R) -> Result<(), SegmentError> {
        {
            let mut out: &mut [u8] = &mut self.buf;
            record.encode(&mut out)?;
        }
        self.file.put(p, &self.buf)
    }
}
