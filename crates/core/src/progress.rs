//! Progress reporting for ingestion runs.

/// Pipeline phase a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Opening,
    Parsing,
    Extracting,
    Finished,
}

/// Event emitted while an ingestion runs.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub current: u64,
    pub total: Option<u64>,
    pub message: Option<String>,
}

/// Receiver for progress updates (progress bars, UI status lines).
pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

/// Forward an event to `handler` when one is attached.
pub fn emit_progress(
    handler: Option<&dyn ProgressHandler>,
    stage: Stage,
    current: u64,
    total: Option<u64>,
    message: Option<&str>,
) {
    if let Some(h) = handler {
        h.on_progress(ProgressEvent {
            stage,
            current,
            total,
            message: message.map(str::to_string),
        });
    }
}
