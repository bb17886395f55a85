//! Parallel alignment of independent image files
//!
//! Each file gets its own run, its own `AlignmentLog`, and its own outcome;
//! a failing file is reported and the rest carry on.

use crate::data::loader::{aligned_file_name, save_image};
use crate::diagnostics::{AlignmentLog, DiagnosticSink, Stage};
use crate::error::Result;
use crate::pipeline::{AlignedWafer, WaferAligner};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Result of aligning a single file
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Result<AlignedWafer>,
    pub log: AlignmentLog,
    /// Where the aligned image was written, if anywhere
    pub output_path: Option<PathBuf>,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// A failure other than "nothing to align"
    pub fn is_fatal_failure(&self) -> bool {
        matches!(&self.result, Err(e) if e.is_fatal())
    }
}

pub struct BatchRunner {
    aligner: WaferAligner,
    output_dir: Option<PathBuf>,
}

impl BatchRunner {
    pub fn new(aligner: WaferAligner) -> Self {
        Self {
            aligner,
            output_dir: None,
        }
    }

    /// Write every aligned image as `aligned_<uuid>.png` under `dir`
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn aligner(&self) -> &WaferAligner {
        &self.aligner
    }

    /// Outcomes come back in the same order as `paths`
    pub fn align_files(&self, paths: &[PathBuf]) -> Vec<FileOutcome> {
        tracing::info!(files = paths.len(), "Starting batch alignment");
        let outcomes: Vec<FileOutcome> = paths.par_iter().map(|path| self.align_file(path)).collect();

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        tracing::info!(
            files = outcomes.len(),
            succeeded = succeeded,
            failed = outcomes.len() - succeeded,
            "Batch alignment finished"
        );
        outcomes
    }

    pub fn align_file(&self, path: &Path) -> FileOutcome {
        let mut log = AlignmentLog::new();
        let mut result = self.aligner.align_source(path, &mut log);

        let written = match (&result, &self.output_dir) {
            (Ok(aligned), Some(dir)) => Some(self.write_output(dir, aligned, &mut log)),
            _ => None,
        };
        let output_path = match written {
            Some(Ok(path)) => Some(path),
            Some(Err(e)) => {
                result = Err(e);
                None
            }
            None => None,
        };

        if let Err(e) = &result {
            if e.is_fatal() {
                tracing::error!(path = %path.display(), error = %e, "Alignment failed");
            } else {
                tracing::info!(path = %path.display(), reason = %e, "Nothing to align");
            }
        }

        FileOutcome {
            path: path.to_path_buf(),
            result,
            log,
            output_path,
        }
    }

    fn write_output(&self, dir: &Path, aligned: &AlignedWafer, sink: &mut dyn DiagnosticSink) -> Result<PathBuf> {
        let path = dir.join(aligned_file_name(Uuid::new_v4()));
        if let Err(e) = save_image(&path, aligned.image.as_mat()) {
            sink.emit(Stage::Complete, &format!("Failed to save aligned image: {}", e));
            return Err(e);
        }
        sink.emit(Stage::Complete, &format!("Saved aligned image to {}", path.display()));
        Ok(path)
    }
}

/// Exit status for a finished batch: fatal failures only
pub fn batch_had_fatal_failure(outcomes: &[FileOutcome]) -> bool {
    outcomes.iter().any(FileOutcome::is_fatal_failure)
}
