// THEORY:
// The `pipeline` module is the top-level driver of the engine. It takes a lazy
// sequence of frames and turns it into an ordered time series of centroids, one
// entry per frame, ready to be exported.
//
// Key architectural principles:
// 1.  **Sequential Accumulation**: The runner pulls one frame, analyzes it, appends the
//     result, and only then pulls the next one. Frame indices are assigned in pull
//     order, so the result sequence is contiguous and never needs reordering. Only one
//     frame, one mask and one visited buffer are alive at a time.
// 2.  **Explicit Lifecycle**: A runner moves Idle -> Running -> one of Completed, Failed
//     or Cancelled. `run` consumes the runner, so a finished runner cannot be started
//     again, which matches frame sources that cannot be rewound.
// 3.  **Cooperative Cancellation**: Cancelling flips a shared flag. The runner looks at it
//     only before pulling the next frame. A frame that was already pulled, even one whose
//     decode was still in progress when the flag flipped, is analyzed and kept, so the
//     result always covers exactly the frames pulled before cancellation took effect.
// 4.  **Fail Fast**: A frame that cannot be decoded or analyzed ends the run. Later
//     frames are not analyzed, because consumers rely on there being no gaps.
// 5.  **Observable Progress**: Every state change and every processed frame is published
//     on a `watch` channel. Any number of observers can poll the latest snapshot without
//     touching the runner's own loop.

use crate::core_modules::component::Centroid;
use crate::core_modules::frame_analyzer::{AnalysisParams, analyze_with};
use crate::error::FrameFailure;
use crate::frame_source::FrameSource;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::binarizer::Threshold;
pub use crate::core_modules::color::color::Color;

/// The outcome for one analyzed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameResult {
    /// 0-based position of the frame in pull order.
    pub frame_index: u64,
    pub centroid: Option<Centroid>,
}

/// Frame results in frame order. Only the runner appends to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineResult {
    frames: Vec<FrameResult>,
}

impl PipelineResult {
    pub fn frames(&self) -> &[FrameResult] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrameResult> {
        self.frames.iter()
    }

    fn push(&mut self, result: FrameResult) {
        debug_assert_eq!(result.frame_index, self.frames.len() as u64);
        self.frames.push(result);
    }
}

impl<'a> IntoIterator for &'a PipelineResult {
    type Item = &'a FrameResult;
    type IntoIter = std::slice::Iter<'a, FrameResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Where a runner is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Idle,
    Running,
    Completed,
    Failed { frame_index: u64, error: FrameFailure },
    Cancelled,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Completed | PipelineState::Failed { .. } | PipelineState::Cancelled
        )
    }
}

/// A snapshot of a runner, as published to observers.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub processed: u64,
    pub total: Option<u64>,
    pub state: PipelineState,
}

impl Progress {
    fn idle() -> Self {
        Self {
            processed: 0,
            total: None,
            state: PipelineState::Idle,
        }
    }
}

/// Requests that a runner stop at the next frame boundary. Cheap to clone and `Send`.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The terminal state of a run together with everything it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub state: PipelineState,
    pub result: PipelineResult,
}

/// Drives frame analysis across a whole frame source.
pub struct PipelineRunner {
    params: AnalysisParams,
    cancel: CancelHandle,
    progress: watch::Sender<Progress>,
    result: PipelineResult,
}

impl PipelineRunner {
    pub fn new(params: AnalysisParams) -> Self {
        let (progress, _) = watch::channel(Progress::idle());
        Self {
            params,
            cancel: CancelHandle::default(),
            progress,
            result: PipelineResult::default(),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// A receiver that always holds the latest progress snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> Progress {
        self.progress.borrow().clone()
    }

    /// Runs the pipeline to a terminal state. Blocks for as long as the source does.
    pub fn run<S: FrameSource>(mut self, mut source: S) -> PipelineOutcome {
        let total = source.total_frames();
        self.publish(total, PipelineState::Running);
        info!(
            target_color = %self.params.target,
            threshold = self.params.threshold.value(),
            ?total,
            "pipeline started"
        );

        let state = loop {
            if self.cancel.is_cancelled() {
                break PipelineState::Cancelled;
            }

            let frame_index = self.result.len() as u64;
            let Some(item) = source.next_frame() else {
                break PipelineState::Completed;
            };

            let analysis = item
                .map_err(FrameFailure::from)
                .and_then(|frame| analyze_with(&frame, &self.params).map_err(FrameFailure::from));

            match analysis {
                Ok(centroid) => {
                    debug!(frame_index, ?centroid, "frame analyzed");
                    self.result.push(FrameResult {
                        frame_index,
                        centroid,
                    });
                    self.publish(total, PipelineState::Running);
                }
                Err(error) => {
                    warn!(
                        frame_index,
                        kind = error.kind(),
                        %error,
                        "frame failed, stopping pipeline"
                    );
                    break PipelineState::Failed { frame_index, error };
                }
            }
        };

        self.publish(total, state.clone());
        info!(processed = self.result.len(), state = ?state, "pipeline finished");

        PipelineOutcome {
            state,
            result: self.result,
        }
    }

    fn publish(&self, total: Option<u64>, state: PipelineState) {
        self.progress.send_replace(Progress {
            processed: self.result.len() as u64,
            total,
            state,
        });
    }
}
