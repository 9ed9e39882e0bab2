//! Stage-event callback for the episode pipeline.
//!
//! One "generate" action walks a fixed state machine:
//!
//! ```text
//! Idle → DocumentProvided → Extracted → RequestBuilt → AwaitingResponse → Completed
//!                 │              │             │                │
//!                 └──────────────┴─────────────┴────────────────┴──────→ Failed
//! ```
//!
//! Inject an [`Arc<dyn StageCallback>`] via
//! [`crate::config::StudioConfigBuilder::progress_callback`] to observe it, for
//! example to drive a spinner. Nothing is carried from one traversal to the
//! next; the pipeline always starts again at `Idle`.
//!
//! # Example
//!
//! ```rust
//! use vinapod::{EpisodeStage, StageCallback, StudioConfig};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl StageCallback for Printer {
//!     fn on_stage(&self, stage: EpisodeStage) {
//!         eprintln!("→ {stage}");
//!     }
//! }
//!
//! let config = StudioConfig::builder()
//!     .progress_callback(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A state of the per-action pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeStage {
    Idle,
    DocumentProvided,
    Extracted,
    RequestBuilt,
    AwaitingResponse,
    Completed,
    Failed,
}

impl EpisodeStage {
    /// `Completed` and `Failed` end a traversal.
    pub fn is_terminal(self) -> bool {
        matches!(self, EpisodeStage::Completed | EpisodeStage::Failed)
    }
}

impl fmt::Display for EpisodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EpisodeStage::Idle => "idle",
            EpisodeStage::DocumentProvided => "document provided",
            EpisodeStage::Extracted => "text extracted",
            EpisodeStage::RequestBuilt => "request built",
            EpisodeStage::AwaitingResponse => "awaiting response",
            EpisodeStage::Completed => "completed",
            EpisodeStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Receives pipeline events. All methods default to no-ops.
pub trait StageCallback: Send + Sync {
    /// Called on every transition, including the terminal one.
    fn on_stage(&self, stage: EpisodeStage) {
        let _ = stage;
    }

    /// Called after text extraction.
    ///
    /// # Arguments
    /// * `page_count` — pages in the document (0 for plain-text input)
    /// * `chars`      — characters extracted
    fn on_extracted(&self, page_count: usize, chars: usize) {
        let _ = (page_count, chars);
    }

    /// Called when the action fails, before the `Failed` stage event.
    ///
    /// # Arguments
    /// * `stage` — the stage that was active when the error happened
    /// * `error` — human-readable description
    fn on_failure(&self, stage: EpisodeStage, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op implementation, used when no callback is configured.
pub struct NoopStageCallback;

impl StageCallback for NoopStageCallback {}

/// Convenience alias matching the type stored in [`crate::config::StudioConfig`].
pub type ProgressCallback = Arc<dyn StageCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        stages: Mutex<Vec<EpisodeStage>>,
        failures: Mutex<Vec<(EpisodeStage, String)>>,
    }

    impl StageCallback for Recorder {
        fn on_stage(&self, stage: EpisodeStage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_failure(&self, stage: EpisodeStage, error: &str) {
            self.failures.lock().unwrap().push((stage, error.to_string()));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopStageCallback;
        cb.on_stage(EpisodeStage::DocumentProvided);
        cb.on_extracted(3, 1200);
        cb.on_failure(EpisodeStage::AwaitingResponse, "boom");
    }

    #[test]
    fn recorder_sees_events_in_order() {
        let rec = Recorder::default();
        rec.on_stage(EpisodeStage::DocumentProvided);
        rec.on_stage(EpisodeStage::Extracted);
        rec.on_failure(EpisodeStage::Extracted, "bad");
        rec.on_stage(EpisodeStage::Failed);

        assert_eq!(
            *rec.stages.lock().unwrap(),
            vec![
                EpisodeStage::DocumentProvided,
                EpisodeStage::Extracted,
                EpisodeStage::Failed
            ]
        );
        assert_eq!(rec.failures.lock().unwrap()[0].1, "bad");
    }

    #[test]
    fn terminal_stages() {
        assert!(EpisodeStage::Completed.is_terminal());
        assert!(EpisodeStage::Failed.is_terminal());
        assert!(!EpisodeStage::AwaitingResponse.is_terminal());
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopStageCallback);
        cb.on_stage(EpisodeStage::Idle);
    }
}
