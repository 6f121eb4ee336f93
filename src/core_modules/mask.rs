// THEORY:
// The `BinaryMask` is the hand-off between the Binarizer and the ComponentLabeler.
// It is a stateless data container: one boolean per pixel, row-major, with exactly
// the dimensions of the frame it was produced from. A `true` cell means "this pixel
// is close enough to the target color".
//
// It can also render itself back into an RGBA buffer (white for matched, black for
// unmatched, fully opaque) so the preview surface can show the user what the
// threshold is selecting.

use crate::core_modules::frame::frame::CHANNELS;

/// A width x height grid of match flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    pub width: u32,
    pub height: u32,
    /// Row-major cells, `width * height` long.
    pub cells: Vec<bool>,
}

impl BinaryMask {
    /// Builds a mask from its cells. Panics if the cell count disagrees with the dimensions.
    pub fn new(width: u32, height: u32, cells: Vec<bool>) -> Self {
        assert_eq!(
            cells.len(),
            width as usize * height as usize,
            "dimension mismatch: {width}x{height} mask needs {} cells",
            width as usize * height as usize
        );
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.cells[y as usize * self.width as usize + x as usize]
    }

    /// The number of matched cells.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Renders the mask as an opaque black and white RGBA buffer.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.cells.len() * CHANNELS);
        for &cell in &self.cells {
            let value = if cell { 255 } else { 0 };
            buffer.extend_from_slice(&[value, value, value, 255]);
        }
        buffer
    }
}
