use ort::Error as OrtError;

/// Represents the different types of errors that can occur while loading a
/// model or categorizing transactions.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// Error occurred while loading or using the tokenizer
    #[error("Tokenizer error: {0}")]
    TokenizerError(String),
    /// Error occurred while loading or running the ONNX model
    #[error("Model error: {0}")]
    ModelError(String),
    /// Error occurred during the build phase
    #[error("Build error: {0}")]
    BuildError(String),
    /// Error occurred while making predictions
    #[error("Prediction error: {0}")]
    PredictionError(String),
    /// Error occurred due to invalid input parameters
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// Label or adapter configuration is missing or inconsistent
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Neither the adapter nor the base model could be loaded
    #[error("Failed to load base model: {base} (adapter: {adapter})")]
    LoadError { adapter: String, base: String },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::ModelError(err.to_string())
    }
}
