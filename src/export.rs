// THEORY:
// Export turns a `PipelineResult` into the tabular form downstream tools consume:
// CSV with a header row and one row per analyzed frame, in frame order.
//
// A frame without a centroid keeps its row, with the coordinate cells left empty,
// so row N is always frame N. When the frame rate is known a `seconds` column is
// added, which is what people plotting a track over time usually want.

use crate::pipeline::{FrameResult, PipelineResult};
use std::fmt::Write as _;
use std::io::Write;

/// How the CSV is laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CsvOptions {
    /// Frames per second. Adds a `seconds` column when set.
    pub frame_rate: Option<f64>,
}

pub fn csv_header(options: &CsvOptions) -> &'static str {
    if options.frame_rate.is_some() {
        "frame_index,seconds,centroid_x,centroid_y"
    } else {
        "frame_index,centroid_x,centroid_y"
    }
}

pub fn csv_row(result: &FrameResult, options: &CsvOptions) -> String {
    let mut row = result.frame_index.to_string();
    if let Some(fps) = options.frame_rate {
        let _ = write!(row, ",{}", result.frame_index as f64 / fps);
    }
    match result.centroid {
        Some(centroid) => {
            let _ = write!(row, ",{},{}", centroid.x, centroid.y);
        }
        None => row.push_str(",,"),
    }
    row
}

/// The whole result as CSV text, newline terminated.
pub fn to_csv(result: &PipelineResult, options: &CsvOptions) -> String {
    let mut out = String::with_capacity(32 * (result.len() + 1));
    out.push_str(csv_header(options));
    out.push('\n');
    for frame in result {
        out.push_str(&csv_row(frame, options));
        out.push('\n');
    }
    out
}

pub fn write_csv<W: Write>(
    mut writer: W,
    result: &PipelineResult,
    options: &CsvOptions,
) -> std::io::Result<()> {
    writeln!(writer, "{}", csv_header(options))?;
    for frame in result {
        writeln!(writer, "{}", csv_row(frame, options))?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::frame::frame::Frame;
    use crate::core_modules::frame_analyzer::AnalysisParams;
    use crate::frame_source::IterFrameSource;
    use crate::pipeline::PipelineRunner;

    fn sample_result() -> PipelineResult {
        let mut with_dot = Frame::filled(4, 2, [0, 0, 0]);
        with_dot.set_pixel(1, 1, [255, 255, 255]);
        with_dot.set_pixel(2, 1, [255, 255, 255]);
        let frames = vec![with_dot.clone(), Frame::filled(4, 2, [0, 0, 0]), with_dot];
        let params = AnalysisParams::parse("#ffffff", 1.0).unwrap();
        PipelineRunner::new(params)
            .run(IterFrameSource::from_frames(frames))
            .result
    }

    #[test]
    fn csv_has_header_and_empty_cells_for_missing_centroids() {
        let csv = to_csv(&sample_result(), &CsvOptions::default());
        assert_eq!(
            csv,
            "frame_index,centroid_x,centroid_y\n0,1.5,1\n1,,\n2,1.5,1\n"
        );
    }

    #[test]
    fn frame_rate_adds_seconds_column() {
        let options = CsvOptions {
            frame_rate: Some(2.0),
        };
        let csv = to_csv(&sample_result(), &options);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "frame_index,seconds,centroid_x,centroid_y");
        assert_eq!(lines[1], "0,0,1.5,1");
        assert_eq!(lines[2], "1,0.5,,");
        assert_eq!(lines[3], "2,1,1.5,1");
    }

    #[test]
    fn writer_output_matches_string_output() {
        let result = sample_result();
        let options = CsvOptions::default();
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &result, &options).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), to_csv(&result, &options));
    }

    #[test]
    fn empty_result_is_header_only() {
        let csv = to_csv(&PipelineResult::default(), &CsvOptions::default());
        assert_eq!(csv, "frame_index,centroid_x,centroid_y\n");
    }
}
