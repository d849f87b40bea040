use thiserror::Error;

#[derive(Debug, Error)]
pub enum MurmurError {
    // Compile-time errors — these abort a build
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Workflow validation failed: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Build failed: {0}")]
    Build(String),

    // Run-time errors — contained by the swarm boundary
    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Model request failed: {0}")]
    ModelRequest(String),

    #[error("Model response parse error: {0}")]
    ModelParse(String),

    // Tool errors
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool execution failed: {tool}: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Tool timeout after {timeout_secs}s: {tool}")]
    ToolTimeout { tool: String, timeout_secs: u64 },

    // Invocation contract errors — surfaced to the caller, not contained
    #[error("Thread {0} already has an active turn")]
    ThreadBusy(String),

    #[error("Invocation cancelled")]
    Cancelled,

    // Checkpoint errors
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MurmurError {
    /// Short category label for user-visible degraded responses.
    /// Never includes internal detail beyond the variant's own message.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Configuration(_) => "configuration",
            Self::Build(_) => "build",
            Self::Execution(_) => "execution",
            Self::ModelRequest(_) | Self::ModelParse(_) => "model",
            Self::ToolNotFound(_) | Self::ToolExecution { .. } | Self::ToolTimeout { .. } => {
                "tool"
            }
            Self::ThreadBusy(_) => "thread_busy",
            Self::Cancelled => "cancelled",
            Self::Checkpoint(_) => "checkpoint",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, MurmurError>;
