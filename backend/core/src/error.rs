use thiserror::Error;

/// Run-terminating errors of the devclaw agent.
///
/// Everything recoverable (parse failures, policy denials, tool failures,
/// container lifecycle problems) is fed back to the model as an observation
/// and never surfaces here.
#[derive(Debug, Error)]
pub enum DevClawError {
    #[error("LLM call failed after {attempts} attempts at step {step}: {message}")]
    Transport {
        step: usize,
        attempts: usize,
        message: String,
    },

    #[error("reached maximum iterations ({0}) without completing the task")]
    IterationLimit(usize),

    #[error("run cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
