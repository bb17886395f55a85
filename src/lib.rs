pub mod config;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod runner;
pub mod utils;
pub mod visualization;

pub use config::{AlignerConfig, Config, CropPolicy, CircleSelection};
pub use data::*;
pub use diagnostics::{AlignmentLog, DiagnosticSink, LogEntry, NullSink, Stage, TracingSink};
pub use error::{AlignError, Result};
pub use pipeline::{AlignedWafer, AlignmentReport, InspectionReport, PipelineStage, WaferAligner};
pub use runner::{BatchRunner, FileOutcome};
