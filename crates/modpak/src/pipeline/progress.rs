//! Progress display for the packaging pipeline
//!
//! Progress is attached to a tracing span; when the CLI installs the
//! `tracing_indicatif` layer the span renders as a progress bar with log
//! lines printed above it. Without that layer the calls are no-ops.

use indicatif::ProgressStyle;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use super::PipelineState;

/// Steps reported between `Init` and `Cleaned`
const STEPS: u64 = 7;

const TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}";

/// Progress of one pipeline run
pub struct PipelineProgress {
    span: Span,
}

impl PipelineProgress {
    /// Create the progress span for a plugin
    pub fn new(plugin_name: &str) -> Self {
        let span = tracing::info_span!("package", plugin = %plugin_name);
        span.pb_set_style(
            &ProgressStyle::default_bar()
                .template(TEMPLATE)
                .expect("Invalid progress template")
                .progress_chars("#>-"),
        );
        span.pb_set_length(STEPS);
        span.pb_set_message(PipelineState::Init.description());

        Self { span }
    }

    /// The span log output of the run should be attached to
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Record that the pipeline reached `state`
    pub fn advance(&self, state: PipelineState) {
        self.span.pb_inc(1);
        self.span.pb_set_message(state.description());
        tracing::debug!(state = ?state, "Pipeline state reached");
    }
}
