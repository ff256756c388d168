use thiserror::Error;

/// Errors produced while loading, running or persisting a pipeline run.
#[derive(Debug, Error)]
pub enum CourtsideError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse records: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("sink write failed: {0}")]
    SinkWrite(String),
    #[error("pipeline protocol violation: {0}")]
    Protocol(String),
    #[error("thread panicked: {0}")]
    ThreadPanicked(String),
    #[error("record {0} has already been enriched")]
    AlreadyEnriched(u64),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<CourtsideError>,
    },
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CourtsideError {
    /// Wraps the error with a description of what was being attempted.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}
