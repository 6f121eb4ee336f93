// THEORY:
// This file is the main entry point for the `centroid_finder` library crate.
// The crate answers one question per video frame: where is the largest patch of a
// chosen color? Answering it for every frame in order gives a track of an object's
// position over time, exported as CSV.
//
// The layers, leaf first:
// - `core_modules`: the pure, stateless analysis. Color distance, binarization,
//   BFS connected-component labeling and the per-frame analyzer.
// - `frame_source`: the seam to whatever decodes video into frames.
// - `pipeline`: drives the analyzer across a frame source, with progress and
//   cancellation.
// - `jobs`: runs pipelines as background jobs that can be polled, cancelled and fetched.
// - `export` and `config`: CSV output and TOML settings.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod export;
pub mod frame_source;
pub mod jobs;
pub mod pipeline;
pub mod utils;

pub use core_modules::binarizer::{Threshold, binarize};
pub use core_modules::color::color::Color;
pub use core_modules::component::{Centroid, Component};
pub use core_modules::component_labeler::component_labeler::{
    find_largest_component_centroid, label_components,
};
pub use core_modules::frame::frame::Frame;
pub use core_modules::frame_analyzer::{AnalysisParams, FramePreview, analyze_frame, preview_frame};
pub use core_modules::mask::BinaryMask;
pub use error::{AnalysisError, FrameDecodeError, FrameFailure, JobError};
pub use pipeline::{FrameResult, PipelineOutcome, PipelineResult, PipelineRunner, PipelineState};
