//! Spending-category classification for free-text financial transactions.
//!
//! A transaction such as `"Paid NPR 350 for NTC mobile topup"` goes through
//! currency normalization, a sequence-classification model and a softmax over
//! the configured categories. The result carries the predicted category, its
//! probability and the first amount found in the text.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use txn_categorizer::{LabelConfig, TransactionClassifier};
//!
//! let classifier = TransactionClassifier::builder()
//!     .with_labels(LabelConfig::default())
//!     .with_adapter_dir("trained_models/finetuned_model")?
//!     .build()?;
//!
//! let results = classifier.categorize(&[
//!     "Paid NPR 350 for NTC mobile topup",
//!     "Sent Rs 2000 to Sita Bank for tuition",
//! ])?;
//! for r in &results {
//!     println!("{}: {} {} ({})", r.transaction(), r.category(), r.amount(), r.confidence_percent());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Model loading
//!
//! `build()` first tries the fine-tuned adapter directory. If anything about
//! it is missing or inconsistent, a warning is logged and the base model named
//! in the [`LabelConfig`] is loaded from the [`ModelManager`] cache instead.
//! The cache is filled with [`ModelManager::ensure_model_downloaded`] (the CLI
//! does this with `--download`). Only when both fail does `build()` return an error. Use
//! [`load_model`] directly to inspect the [`LoadOutcome`].
//!
//! # Thread Safety
//!
//! [`TransactionClassifier`] is `Send + Sync` and cheap to clone; the model is
//! shared read-only behind an `Arc`.

pub mod classifier;
pub mod labels;
pub mod model_manager;
pub mod normalizer;
pub mod report;
mod runtime;

pub use classifier::{
    load_model, ClassificationResult, ClassifierBuilder, ClassifierError, ClassifierInfo, LoadOutcome,
    LoadedModel, ModelKind, ModelLoader, OnnxLoader, OnnxSequenceClassifier, SequenceClassifier,
    TransactionClassifier,
};
pub use labels::LabelConfig;
pub use model_manager::{ModelError, ModelInfo, ModelManager, DEFAULT_HUB_URL};
pub use normalizer::{extract_amount, normalize, CurrencyMap};
pub use report::{default_budgets, Budget, BudgetLine, BudgetStatus, SpendingLog};
pub use runtime::{create_session_builder, OptimizationLevel, RuntimeConfig};

pub fn init_logger() {
    env_logger::init();
}
