// THEORY:
// The `FrameAnalyzer` is the per-frame entry point. It composes the two stages,
// binarize then label, and applies the "largest region wins" policy. It holds no
// state at all, so any number of threads may analyze independent frames at once.
//
// Two flavors are exposed:
// - `analyze_frame` returns only the centroid. This is what the pipeline calls once
//   per video frame.
// - `preview_frame` also returns the mask and the winning region's size, for the
//   interactive preview where the user tunes color and threshold on one frame.

use crate::core_modules::binarizer::{Threshold, binarize};
use crate::core_modules::color::color::Color;
use crate::core_modules::component::Centroid;
use crate::core_modules::component_labeler::component_labeler;
use crate::core_modules::frame::frame::Frame;
use crate::core_modules::mask::BinaryMask;
use crate::error::AnalysisError;

/// The target color and threshold an analysis runs with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisParams {
    pub target: Color,
    pub threshold: Threshold,
}

impl AnalysisParams {
    pub fn new(target: Color, threshold: Threshold) -> Self {
        Self { target, threshold }
    }

    /// Validates raw user input, failing on the color before the threshold.
    pub fn parse(color: &str, threshold: f64) -> Result<Self, AnalysisError> {
        let target = Color::from_hex(color)?;
        let threshold = Threshold::new(threshold)?;
        Ok(Self::new(target, threshold))
    }
}

/// Everything the preview surface needs to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePreview {
    pub mask: BinaryMask,
    pub centroid: Option<Centroid>,
    /// The size of the region the centroid belongs to, 0 when there is none.
    pub region_size: usize,
}

/// The centroid of the largest region matching `target` within `threshold`.
pub fn analyze_frame(
    frame: &Frame,
    target: &Color,
    threshold: Threshold,
) -> Result<Option<Centroid>, AnalysisError> {
    let mask = binarize(frame, target, threshold)?;
    Ok(component_labeler::find_largest_component_centroid(
        &mask.cells,
        frame.width,
        frame.height,
    ))
}

pub fn analyze_with(
    frame: &Frame,
    params: &AnalysisParams,
) -> Result<Option<Centroid>, AnalysisError> {
    analyze_frame(frame, &params.target, params.threshold)
}

pub fn preview_frame(
    frame: &Frame,
    target: &Color,
    threshold: Threshold,
) -> Result<FramePreview, AnalysisError> {
    let mask = binarize(frame, target, threshold)?;
    let largest = component_labeler::largest_in_mask(&mask);
    Ok(FramePreview {
        mask,
        centroid: largest.map(|c| c.centroid),
        region_size: largest.map_or(0, |c| c.size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold(value: f64) -> Threshold {
        Threshold::new(value).unwrap()
    }

    #[test]
    fn white_center_of_black_frame() {
        let mut frame = Frame::filled(3, 3, [0, 0, 0]);
        frame.set_pixel(1, 1, [255, 255, 255]);

        let preview = preview_frame(&frame, &Color::WHITE, threshold(10.0)).unwrap();
        assert_eq!(preview.mask.count(), 1);
        assert!(preview.mask.get(1, 1));
        assert_eq!(preview.centroid, Some(Centroid::new(1.0, 1.0)));
        assert_eq!(preview.region_size, 1);

        let centroid = analyze_frame(&frame, &Color::WHITE, threshold(10.0)).unwrap();
        assert_eq!(centroid, Some(Centroid::new(1.0, 1.0)));
    }

    #[test]
    fn first_two_of_four_pixels_match() {
        let mut frame = Frame::filled(4, 1, [0, 0, 255]);
        frame.set_pixel(0, 0, [250, 5, 0]);
        frame.set_pixel(1, 0, [255, 0, 0]);

        let preview = preview_frame(&frame, &Color::new(255, 0, 0), threshold(20.0)).unwrap();
        assert_eq!(preview.mask.cells, vec![true, true, false, false]);
        assert_eq!(preview.region_size, 2);
        assert_eq!(preview.centroid, Some(Centroid::new(0.5, 0.0)));
    }

    #[test]
    fn no_match_yields_none() {
        let frame = Frame::filled(8, 8, [0, 0, 0]);
        let centroid = analyze_frame(&frame, &Color::WHITE, threshold(100.0)).unwrap();
        assert_eq!(centroid, None);
        let preview = preview_frame(&frame, &Color::WHITE, threshold(100.0)).unwrap();
        assert_eq!(preview.region_size, 0);
    }

    #[test]
    fn params_parse_validates_color_then_threshold() {
        assert!(matches!(
            AnalysisParams::parse("nope", -1.0),
            Err(AnalysisError::InvalidColor { .. })
        ));
        assert!(matches!(
            AnalysisParams::parse("#00ff00", -1.0),
            Err(AnalysisError::InvalidThreshold { .. })
        ));
        let params = AnalysisParams::parse("#00ff00", 12.5).unwrap();
        assert_eq!(params.target, Color::new(0, 255, 0));
        assert_eq!(params.threshold.value(), 12.5);
    }

    #[test]
    fn analysis_is_safe_to_run_concurrently() {
        let mut frame = Frame::filled(64, 64, [0, 0, 0]);
        for y in 10..20 {
            for x in 30..40 {
                frame.set_pixel(x, y, [200, 10, 10]);
            }
        }
        let params = AnalysisParams::parse("#c80a0a", 5.0).unwrap();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| analyze_with(&frame, &params).unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), Some(Centroid::new(34.5, 14.5)));
            }
        });
    }
}
