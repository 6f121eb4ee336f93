// THEORY:
// The `Binarizer` reduces a color frame to a `BinaryMask`. It is the first stage
// of every analysis and the only one that touches pixel colors.
//
// Key architectural principles:
// 1.  **Strict Threshold**: A pixel matches when its distance to the target is
//     strictly less than the threshold. A pixel sitting exactly on the threshold is
//     not a match, so a threshold of 0 matches nothing.
// 2.  **Row-Major Scan**: Cells are produced for y = 0..height, and x = 0..width within
//     each row. The labeler seeds components in the same order, which is what makes
//     the tie-break between equal-sized components deterministic.
// 3.  **Validated Inputs**: The threshold is a `Threshold`, which can only be built from
//     a finite, non-negative number. The frame is checked for a consistent buffer
//     length before the scan starts.

use crate::core_modules::color::color::{Color, Distance};
use crate::core_modules::frame::frame::Frame;
use crate::core_modules::mask::BinaryMask;
use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};

/// A color distance cut-off. Always finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Threshold(Distance);

/// Where the interactive preview starts before the user moves the slider.
pub const DEFAULT_THRESHOLD: Threshold = Threshold(75.0);

impl Threshold {
    pub fn new(value: f64) -> Result<Self, AnalysisError> {
        if !value.is_finite() || value < 0.0 {
            return Err(AnalysisError::InvalidThreshold { value });
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Distance {
        self.0
    }

    pub fn admits(&self, distance: Distance) -> bool {
        distance < self.0
    }
}

impl TryFrom<f64> for Threshold {
    type Error = AnalysisError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Threshold> for f64 {
    fn from(threshold: Threshold) -> Self {
        threshold.0
    }
}

/// Marks every pixel whose RGB distance to `target` is below `threshold`.
pub fn binarize(
    frame: &Frame,
    target: &Color,
    threshold: Threshold,
) -> Result<BinaryMask, AnalysisError> {
    frame.validate()?;

    let cells = frame
        .rgb_pixels()
        .map(|rgb| threshold.admits(target.distance_to(rgb)))
        .collect();

    Ok(BinaryMask::new(frame.width, frame.height, cells))
}
