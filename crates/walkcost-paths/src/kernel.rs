//! The anisotropic walking-energy model.
//!
//! Neighbours are visited in a fixed order; the first eight are the king
//! moves, the last eight the knight moves:
//!
//! ```text
//!        9    10
//!    13  5  3  6  14
//!        1     2
//!    16  8  4  7  15
//!       12    11
//! ```
//!
//! Each move carries the azimuth (degrees counter-clockwise from east) that
//! points from the neighbour back to the expanding cell.

use walkcost_core::{Point, Resolution};

use crate::config::{WalkCoefficients, WalkConfig};

/// The five distinct step lengths on a grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stride {
    /// One row.
    NorthSouth,
    /// One column.
    EastWest,
    /// One row and one column.
    Diagonal,
    /// Two rows and one column.
    LongNorthSouth,
    /// One row and two columns.
    LongEastWest,
}

/// A neighbour offset.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Move {
    pub offset: Point,
    pub stride: Stride,
    /// Direction bit; the azimuth is `22.5 * (bit + 1)`.
    pub bit: u8,
}

impl Move {
    const fn new(drow: i32, dcol: i32, stride: Stride, bit: u8) -> Self {
        Self {
            offset: Point::new(drow, dcol),
            stride,
            bit,
        }
    }

    /// Azimuth from the neighbour back to the expanding cell.
    #[inline]
    pub fn azimuth(&self) -> f32 {
        22.5 * (self.bit as f32 + 1.0)
    }

    #[inline]
    pub fn is_knight(&self) -> bool {
        matches!(self.stride, Stride::LongNorthSouth | Stride::LongEastWest)
    }

    /// The two king-adjacent cells a knight move passes between, relative
    /// to the expanding cell. `None` for king moves.
    pub fn intermediates(&self) -> Option<[Point; 2]> {
        let Point { row: dr, col: dc } = self.offset;
        match self.stride {
            Stride::LongNorthSouth => Some([Point::new(dr / 2, 0), Point::new(dr / 2, dc)]),
            Stride::LongEastWest => Some([Point::new(0, dc / 2), Point::new(dr, dc / 2)]),
            _ => None,
        }
    }
}

/// Every neighbour in visiting order.
pub const MOVES: [Move; 16] = [
    Move::new(0, -1, Stride::EastWest, 15),        // W  360
    Move::new(0, 1, Stride::EastWest, 7),          // E  180
    Move::new(-1, 0, Stride::NorthSouth, 11),      // N  270
    Move::new(1, 0, Stride::NorthSouth, 3),        // S   90
    Move::new(-1, -1, Stride::Diagonal, 13),       // NW 315
    Move::new(-1, 1, Stride::Diagonal, 9),         // NE 225
    Move::new(1, 1, Stride::Diagonal, 5),          // SE 135
    Move::new(1, -1, Stride::Diagonal, 1),         // SW  45
    Move::new(-2, -1, Stride::LongNorthSouth, 12), // NNW 292.5
    Move::new(-2, 1, Stride::LongNorthSouth, 10),  // NNE 247.5
    Move::new(2, 1, Stride::LongNorthSouth, 4),    // SSE 112.5
    Move::new(2, -1, Stride::LongNorthSouth, 2),   // SSW  67.5
    Move::new(-1, -2, Stride::LongEastWest, 14),   // WNW 337.5
    Move::new(-1, 2, Stride::LongEastWest, 8),     // ENE 202.5
    Move::new(1, 2, Stride::LongEastWest, 6),      // ESE 157.5
    Move::new(1, -2, Stride::LongEastWest, 0),     // WSW  22.5
];

/// The moves evaluated per expansion.
pub fn moves(knight_moves: bool) -> &'static [Move] {
    if knight_moves { &MOVES } else { &MOVES[..8] }
}

/// Physical length of each [`Stride`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DistanceFactors {
    pub ns: f64,
    pub ew: f64,
    pub diag: f64,
    pub long_ns: f64,
    pub long_ew: f64,
}

impl DistanceFactors {
    pub fn new(res: Resolution) -> Self {
        let (ns, ew) = (res.ns, res.ew);
        Self {
            ns,
            ew,
            diag: (ns * ns + ew * ew).sqrt(),
            long_ns: (4.0 * ns * ns + ew * ew).sqrt(),
            long_ew: (ns * ns + 4.0 * ew * ew).sqrt(),
        }
    }

    #[inline]
    pub fn of(&self, stride: Stride) -> f64 {
        match stride {
            Stride::NorthSouth => self.ns,
            Stride::EastWest => self.ew,
            Stride::Diagonal => self.diag,
            Stride::LongNorthSouth => self.long_ns,
            Stride::LongEastWest => self.long_ew,
        }
    }
}

/// One step between two cells, as seen by a cost model.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Edge {
    /// Elevation of the target minus elevation of the source.
    pub rise: f64,
    pub distance: f64,
    /// Mean friction of the cells the step crosses.
    pub friction: f64,
}

/// Cost of a single step. The search adds it to the source's cumulative cost.
pub trait MoveCost {
    fn cost(&self, edge: &Edge) -> f64;
}

/// The walking-energy formula: a slope-dependent elevation term, a flat
/// term proportional to distance and a friction term weighted by `lambda`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WalkingEnergy {
    pub coefficients: WalkCoefficients,
    pub lambda: f64,
    pub slope_factor: f64,
}

impl WalkingEnergy {
    pub fn from_config(config: &WalkConfig) -> Self {
        Self {
            coefficients: config.coefficients,
            lambda: config.lambda,
            slope_factor: config.slope_factor,
        }
    }

    /// The elevation coefficient that applies to `slope`.
    #[inline]
    pub fn slope_coefficient(&self, slope: f64) -> f64 {
        let c = &self.coefficients;
        if slope >= 0.0 {
            c.climb
        } else if slope < self.slope_factor {
            c.steep_descent
        } else {
            c.moderate_descent
        }
    }
}

impl MoveCost for WalkingEnergy {
    fn cost(&self, edge: &Edge) -> f64 {
        let slope = edge.rise / edge.distance;
        let elevation = edge.rise * self.slope_coefficient(slope);
        let flat = edge.distance * self.coefficients.flat;
        let friction = self.lambda * edge.friction * edge.distance;
        elevation + flat + friction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_azimuths() {
        let az: Vec<f32> = MOVES.iter().map(Move::azimuth).collect();
        assert_eq!(
            az,
            vec![
                360.0, 180.0, 270.0, 90.0, 315.0, 225.0, 135.0, 45.0, 292.5, 247.5, 112.5, 67.5,
                337.5, 202.5, 157.5, 22.5
            ]
        );
    }

    #[test]
    fn bits_are_unique_and_inverse_moves_pair_up() {
        let mut seen = 0u16;
        for m in &MOVES {
            seen |= 1 << m.bit;
            let back = MOVES
                .iter()
                .find(|o| o.offset == m.offset.inverse())
                .unwrap();
            assert_eq!(back.bit, (m.bit + 8) % 16);
        }
        assert_eq!(seen, u16::MAX);
    }

    #[test]
    fn knight_intermediates() {
        let nnw = MOVES[8];
        assert_eq!(nnw.intermediates(), Some([Point::new(-1, 0), Point::new(-1, -1)]));
        let ese = MOVES[14];
        assert_eq!(ese.intermediates(), Some([Point::new(0, 1), Point::new(1, 1)]));
        assert_eq!(MOVES[0].intermediates(), None);
        assert_eq!(moves(false).len(), 8);
        assert!(moves(true)[8..].iter().all(Move::is_knight));
    }

    #[test]
    fn distances() {
        let d = DistanceFactors::new(Resolution { ns: 3.0, ew: 4.0 });
        assert_eq!(d.of(Stride::Diagonal), 5.0);
        assert_eq!(d.of(Stride::LongNorthSouth), (36.0f64 + 16.0).sqrt());
        assert_eq!(d.of(Stride::LongEastWest), (9.0f64 + 64.0).sqrt());
        assert_eq!(d.of(Stride::NorthSouth), 3.0);
    }

    #[test]
    fn coefficient_by_slope() {
        let w = WalkingEnergy::from_config(&WalkConfig::default());
        assert_eq!(w.slope_coefficient(0.0), 6.0);
        assert_eq!(w.slope_coefficient(0.3), 6.0);
        assert_eq!(w.slope_coefficient(-0.1), 1.9998);
        assert_eq!(w.slope_coefficient(-0.2125), 1.9998);
        assert_eq!(w.slope_coefficient(-0.5), -1.9998);
    }

    #[test]
    fn energy_terms() {
        let w = WalkingEnergy {
            coefficients: WalkCoefficients::new(0.5, 2.0, 1.0, -1.0),
            lambda: 2.0,
            slope_factor: -0.2,
        };
        // climb 1 over 10: 1*2 + 10*0.5 + 2*3*10
        let up = Edge { rise: 1.0, distance: 10.0, friction: 3.0 };
        assert_eq!(w.cost(&up), 2.0 + 5.0 + 60.0);
        // steep descent: slope -0.5, assistive
        let down = Edge { rise: -5.0, distance: 10.0, friction: 0.0 };
        assert_eq!(w.cost(&down), 5.0 + 5.0);
        // moderate descent: slope -0.1
        let gentle = Edge { rise: -1.0, distance: 10.0, friction: 0.0 };
        assert_eq!(w.cost(&gentle), -1.0 + 5.0);
    }
}
