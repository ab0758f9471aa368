use std::sync::OnceLock;

use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;

use crate::classifier::ClassifierError;

static ENVIRONMENT: OnceLock<Result<(), String>> = OnceLock::new();

/// Graph optimization applied by ONNX Runtime when a session is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OptimizationLevel {
    Disable,
    Basic,
    Extended,
    #[default]
    All,
}

impl From<OptimizationLevel> for GraphOptimizationLevel {
    fn from(level: OptimizationLevel) -> Self {
        match level {
            OptimizationLevel::Disable => GraphOptimizationLevel::Disable,
            OptimizationLevel::Basic => GraphOptimizationLevel::Level1,
            OptimizationLevel::Extended => GraphOptimizationLevel::Level2,
            OptimizationLevel::All => GraphOptimizationLevel::Level3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: OptimizationLevel,
    /// Longest tokenized input accepted, special tokens included.
    pub max_sequence_length: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0, // Let ONNX Runtime decide
            intra_threads: 0, // Let ONNX Runtime decide
            optimization_level: OptimizationLevel::default(),
            max_sequence_length: 512,
        }
    }
}

/// Commits the process-wide ONNX Runtime environment on first use. Later calls
/// return the result of the first attempt.
pub(crate) fn ensure_initialized() -> Result<(), ClassifierError> {
    environment_status(ENVIRONMENT.get_or_init(|| {
        ort::init()
            .with_name("txn-categorizer")
            .commit()
            .map(|_| ())
            .map_err(|e| e.to_string())
    }))
}

fn environment_status(state: &Result<(), String>) -> Result<(), ClassifierError> {
    state.clone().map_err(|e| {
        log::error!("ONNX Runtime environment failed to initialize: {}", e);
        ClassifierError::ModelError(format!("ONNX Runtime environment failed to initialize: {}", e))
    })
}

/// Session builder configured from `config`. Fails when the ONNX Runtime
/// environment could not be committed.
pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, ClassifierError> {
    ensure_initialized()?;
    let mut builder = Session::builder()?;

    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }
    builder = builder.with_optimization_level(config.optimization_level.into())?;

    Ok(builder)
}
