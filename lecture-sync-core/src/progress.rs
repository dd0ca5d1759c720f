//! Step-by-step progress reporting for a sync run.
//!
//! The orchestrator announces each step through a [`SyncProgress`] as it
//! starts, so a front end can show how far a run got even when a later step
//! fails. Tracing output is independent of this and always emitted.

use std::path::Path;

/// One observable step of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent<'a> {
    /// The archive is about to be fetched (or found on disk).
    Fetching { url: &'a str, archive: &'a Path },
    /// An existing archive was used instead of a download.
    ArchiveReused { archive: &'a Path },
    Extracting { archive: &'a Path, into: &'a Path },
    Copying { from: &'a Path, to: &'a Path },
    /// Number of files the rewrite step is about to visit.
    Processing { files: usize },
    Processed { file: &'a Path, changed: bool },
    CleaningUp,
}

/// Receives [`SyncEvent`]s in the order the steps run.
pub trait SyncProgress: Send + Sync {
    fn on_event(&self, event: &SyncEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl SyncProgress for SilentProgress {
    fn on_event(&self, _event: &SyncEvent<'_>) {}
}
