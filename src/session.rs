//! Session state for an interactive front end.
//!
//! All state lives in one [`SessionState`] value and changes only through
//! [`update`], a pure function of the previous state and a
//! [`SessionEvent`]. [`run_analysis`] is the one async driver: it emits
//! `AnalysisStarted`, runs a batch over the pending files and folds the
//! outcome back in with `AnalysisFinished`.
//!
//! Analyses are keyed by [`ReportId`], assigned when a file is queued, so two
//! uploads with the same file name keep separate results. Only PNG and JPEG
//! images are queued; anything else is dropped when it is added.

use crate::batch::analyze_batch;
use crate::config::AnalyzerConfig;
use crate::output::{BatchOutcome, ImageAnalysis};
use crate::pipeline::input::ReportImage;
use crate::pipeline::llm::ReportAnalyzer;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Identifier of a queued file, unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReportId(pub u64);

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A file waiting in the upload list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedReport {
    pub id: ReportId,
    pub image: ReportImage,
}

/// Everything a front end needs to draw itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Queued files, in upload order.
    pub files: Vec<QueuedReport>,
    /// Finished analyses, in upload order.
    pub analyses: BTreeMap<ReportId, ImageAnalysis>,
    /// Message of the last failure, replaced on every new failure.
    pub error: Option<String>,
    /// True while a batch is running.
    pub analyzing: bool,
    next_id: u64,
}

/// Things that can happen to a session.
#[derive(Debug)]
pub enum SessionEvent {
    /// Files were picked or dropped. Clears the error banner. Images that
    /// are not PNG or JPEG are left out.
    FilesAdded(Vec<ReportImage>),
    /// A file was removed from the list, along with its analysis.
    FileRemoved(ReportId),
    /// A batch is about to run.
    AnalysisStarted,
    /// A batch ended. `ids[i]` is the file that was `images[i]` in the batch.
    AnalysisFinished {
        ids: Vec<ReportId>,
        outcome: BatchOutcome,
    },
    /// "Go home": forget all files, analyses and errors.
    Reset,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queued files that have no analysis yet, in upload order.
    pub fn pending(&self) -> Vec<&QueuedReport> {
        self.files
            .iter()
            .filter(|f| !self.analyses.contains_key(&f.id))
            .collect()
    }

    /// Look up the file queued under `id`.
    pub fn file(&self, id: ReportId) -> Option<&QueuedReport> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn has_results(&self) -> bool {
        !self.analyses.is_empty()
    }
}

/// Apply `event` to `state`, returning the new state.
pub fn update(state: SessionState, event: SessionEvent) -> SessionState {
    let mut next = state;
    match event {
        SessionEvent::FilesAdded(images) => {
            for image in images {
                if !image.is_supported_upload() {
                    warn!(
                        "{}: not a PNG or JPEG upload ({}), skipped",
                        image.file_name, image.media_type
                    );
                    continue;
                }
                let id = ReportId(next.next_id);
                next.next_id += 1;
                next.files.push(QueuedReport { id, image });
            }
            next.error = None;
        }
        SessionEvent::FileRemoved(id) => {
            next.files.retain(|f| f.id != id);
            next.analyses.remove(&id);
        }
        SessionEvent::AnalysisStarted => {
            next.analyzing = true;
            next.error = None;
        }
        SessionEvent::AnalysisFinished { ids, outcome } => {
            for (id, analysis) in ids.into_iter().zip(outcome.analyses) {
                if next.files.iter().any(|f| f.id == id) {
                    next.analyses.insert(id, analysis);
                }
            }
            next.error = outcome.error.map(|e| e.to_string());
            next.analyzing = false;
        }
        SessionEvent::Reset => {
            next.files.clear();
            next.analyses.clear();
            next.error = None;
            next.analyzing = false;
        }
    }
    next
}

/// Analyse every pending file and fold the result into the state.
///
/// Does nothing when no file is pending.
pub async fn run_analysis(
    state: SessionState,
    analyzer: &dyn ReportAnalyzer,
    config: &AnalyzerConfig,
) -> SessionState {
    let (ids, images): (Vec<ReportId>, Vec<ReportImage>) = state
        .pending()
        .into_iter()
        .map(|f| (f.id, f.image.clone()))
        .unzip();
    if images.is_empty() {
        debug!("No pending files to analyse");
        return state;
    }

    let state = update(state, SessionEvent::AnalysisStarted);
    let outcome = analyze_batch(analyzer, &images, config).await;
    update(state, SessionEvent::AnalysisFinished { ids, outcome })
}
