//! Out-of-core tiled grid storage.
//!
//! A [`SegmentFile`] stores one fixed-size record per grid cell in an
//! anonymous temporary file, cut into rectangular tiles. Only a bounded
//! number of tiles is resident at a time; the least recently used one is
//! written back when another is needed. [`Segment`] layers a typed
//! [`Record`] codec over the raw bytes.
//!
//! ```
//! use walkcost_core::{Extent, Point};
//! use walkcost_segment::Segment;
//!
//! let mut seg: Segment<f64> = Segment::open(Extent::new(100, 100), 16, 16, 2).unwrap();
//! seg.put(Point::new(99, 0), &4.5).unwrap();
//! assert_eq!(seg.get(Point::new(99, 0)).unwrap(), 4.5);
//! ```

mod error;
mod file;
mod layout;
mod record;

pub use error::SegmentError;
pub use file::{SegmentFile, SegmentStats};
pub use layout::TileLayout;
pub use record::{Record, Segment, nan_to_null, null_to_nan};
