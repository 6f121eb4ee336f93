// THEORY:
// A `Component` is one maximal 4-connected region of matched cells in a single
// mask. The labeler never keeps the member cells around: as soon as a region has
// been flooded it is reduced to its size and its centroid, and that summary is all
// the rest of the engine ever sees.
//
// The centroid is the plain arithmetic mean of the member pixel coordinates, kept
// as real numbers. A 2x1 region starting at the origin therefore sits at (0.5, 0).

use serde::{Deserialize, Serialize};

/// A real-valued position in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub x: f64,
    pub y: f64,
}

impl Centroid {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The summary of a single connected region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Component {
    /// The number of cells in the region. Always at least 1.
    pub size: usize,
    pub centroid: Centroid,
}
