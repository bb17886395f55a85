use crate::diagnostics::{DiagnosticSink, Stage};
use crate::error::Result;

/// One step of the alignment chain.
///
/// Stages hold only their configuration; everything a run produces flows
/// through `execute`, together with the diagnostic sink of that run.
pub trait PipelineStage: Send + Sync {
    type Input<'a>;
    type Output;

    /// Execute this stage of the pipeline
    fn execute(&self, input: Self::Input<'_>, sink: &mut dyn DiagnosticSink) -> Result<Self::Output>;

    /// Which stage this is, for logging and timings
    fn stage(&self) -> Stage;

    fn stage_name(&self) -> &'static str {
        self.stage().as_str()
    }
}
