use serde::Serialize;

mod error;
mod model;
mod onnx;
mod utils;
pub mod builder;
pub mod classifier;
pub mod loader;

pub use builder::ClassifierBuilder;
pub use classifier::TransactionClassifier;
pub use error::ClassifierError;
pub use loader::{load_model, AdapterConfig, LoadOutcome, ModelLoader, OnnxLoader};
pub use model::{LoadedModel, ModelKind, SequenceClassifier};
pub use onnx::OnnxSequenceClassifier;

/// The categorization of one transaction. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    transaction: String,
    category: String,
    amount: f64,
    confidence: f32,
}

impl ClassificationResult {
    pub(crate) fn new(transaction: &str, category: &str, amount: f64, confidence: f32) -> Self {
        Self {
            transaction: transaction.to_string(),
            category: category.to_string(),
            amount,
            confidence,
        }
    }

    /// The original, un-normalized transaction text
    pub fn transaction(&self) -> &str {
        &self.transaction
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Probability of the selected category, in `[0, 1]`
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Confidence as a percentage with one decimal, e.g. `"87.3%"`.
    pub fn confidence_percent(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }
}

/// Information about a loaded classifier
#[derive(Debug, Clone, Serialize)]
pub struct ClassifierInfo {
    /// Which load path produced the model
    pub model_kind: ModelKind,
    /// Adapter directory or base model directory
    pub model_source: String,
    /// Base model name from the label configuration
    pub base_model: String,
    /// Categories in model output order
    pub categories: Vec<String>,
}
