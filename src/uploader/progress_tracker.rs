use serde::Serialize;
use tokio::time::Instant;

use super::batch::{Batch, UploadVerb};

/// What happened to one batch.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BatchOutcome {
    pub index: usize,
    pub verb: String,
    pub files: usize,
    /// Response status, `None` when nothing was sent (dry run).
    pub status: Option<u16>,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UploadReport {
    pub total_files: usize,
    pub uploaded: usize,
    pub batches: Vec<BatchOutcome>,
    pub dry_run: bool,
    pub elapsed_ms: u128,
}

impl UploadReport {
    pub fn requests_sent(&self) -> usize {
        self.batches.iter().filter(|b| b.status.is_some()).count()
    }
}

/// Running counters for one upload run.
pub struct UploadProgress {
    total_files: usize,
    uploaded: usize,
    batches: Vec<BatchOutcome>,
    dry_run: bool,
    start_time: Instant,
}

impl UploadProgress {
    pub fn new(total_files: usize, dry_run: bool) -> Self {
        Self {
            total_files,
            uploaded: 0,
            batches: Vec::new(),
            dry_run,
            start_time: Instant::now(),
        }
    }

    pub fn uploaded(&self) -> usize {
        self.uploaded
    }

    /// Record a batch the service accepted.
    pub fn record_batch(&mut self, batch: &Batch, verb: UploadVerb, status: u16) {
        self.uploaded = batch.end.min(self.total_files);
        self.batches.push(BatchOutcome {
            index: batch.index,
            verb: verb.to_string(),
            files: batch.len(),
            status: Some(status),
        });

        log::info!("Uploaded {}/{} files", self.uploaded, self.total_files);
    }

    /// Record a batch that was planned but not sent.
    pub fn record_planned(&mut self, batch: &Batch, verb: UploadVerb) {
        self.batches.push(BatchOutcome {
            index: batch.index,
            verb: verb.to_string(),
            files: batch.len(),
            status: None,
        });

        log::info!(
            "[dry run] batch {} would {} files {}..{} of {}",
            batch.index + 1,
            verb,
            batch.start,
            batch.end,
            self.total_files
        );
    }

    pub fn finish(self) -> UploadReport {
        let elapsed_ms = self.start_time.elapsed().as_millis();

        log::info!(
            "Upload {}: {}/{} files in {} batches ({} ms)",
            if self.dry_run { "planned" } else { "completed" },
            self.uploaded,
            self.total_files,
            self.batches.len(),
            elapsed_ms
        );

        UploadReport {
            total_files: self.total_files,
            uploaded: self.uploaded,
            batches: self.batches,
            dry_run: self.dry_run,
            elapsed_ms,
        }
    }
}
