use std::fmt;
use std::sync::Arc;

use super::error::ClassifierError;

/// A sequence-classification model: text in, one raw score per category out.
///
/// Implementations must be deterministic for fixed weights and must not
/// mutate state during inference, since a single instance is shared across
/// every `categorize` call.
pub trait SequenceClassifier: Send + Sync + fmt::Debug {
    /// Number of output labels, which must match the configured categories.
    fn num_labels(&self) -> usize;

    /// Runs a forward pass and returns the unnormalized scores.
    fn logits(&self, text: &str) -> Result<Vec<f32>, ClassifierError>;
}

/// Which of the two load paths produced the model in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Base model with the fine-tuned adapter applied
    Adapter,
    /// Plain base model, used when the adapter could not be loaded
    Base,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adapter => write!(f, "fine-tuned adapter"),
            Self::Base => write!(f, "base model"),
        }
    }
}

/// A model that passed loading and label validation.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub kind: ModelKind,
    /// Where the weights came from, for diagnostics.
    pub source: String,
    pub model: Arc<dyn SequenceClassifier>,
}
