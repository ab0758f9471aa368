use std::sync::Arc;

use log::debug;
use ndarray::Array1;

use super::builder::ClassifierBuilder;
use super::error::ClassifierError;
use super::model::{LoadedModel, ModelKind, SequenceClassifier};
use super::utils::{argmax, softmax};
use super::{ClassificationResult, ClassifierInfo};
use crate::labels::LabelConfig;
use crate::normalizer::{extract_amount, CurrencyMap};

/// Categorizes free-text transactions with a loaded sequence-classification
/// model.
///
/// A value of this type only exists once a model has loaded, so every call
/// runs against a ready model. The model is shared read-only; clones and
/// threads see the same weights.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use txn_categorizer::{LabelConfig, TransactionClassifier};
///
/// let classifier = TransactionClassifier::builder()
///     .with_labels(LabelConfig::default())
///     .with_adapter_dir("trained_models/finetuned_model")?
///     .build()?;
///
/// for result in classifier.categorize(&["Paid NPR 350 for NTC mobile topup"])? {
///     println!("{} -> {} ({})", result.transaction(), result.category(), result.confidence_percent());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TransactionClassifier {
    model: Arc<dyn SequenceClassifier>,
    model_kind: ModelKind,
    model_source: String,
    labels: Arc<LabelConfig>,
    currency_map: CurrencyMap,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<TransactionClassifier>();
    }
};

impl TransactionClassifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> ClassifierBuilder {
        ClassifierBuilder::new()
    }

    pub(crate) fn from_parts(loaded: LoadedModel, labels: LabelConfig, currency_map: CurrencyMap) -> Self {
        Self {
            model: loaded.model,
            model_kind: loaded.kind,
            model_source: loaded.source,
            labels: Arc::new(labels),
            currency_map,
        }
    }

    pub fn model_kind(&self) -> ModelKind {
        self.model_kind
    }

    pub fn labels(&self) -> &LabelConfig {
        &self.labels
    }

    pub fn info(&self) -> ClassifierInfo {
        ClassifierInfo {
            model_kind: self.model_kind,
            model_source: self.model_source.clone(),
            base_model: self.labels.model_name().to_string(),
            categories: self.labels.categories().to_vec(),
        }
    }

    /// Categorizes each transaction, preserving input order.
    ///
    /// Items are independent of each other, but the call is all-or-nothing:
    /// the first failing item aborts the batch and no partial results are
    /// returned.
    pub fn categorize<S: AsRef<str>>(&self, transactions: &[S]) -> Result<Vec<ClassificationResult>, ClassifierError> {
        transactions
            .iter()
            .map(|transaction| self.categorize_one(transaction.as_ref()))
            .collect()
    }

    /// Categorizes a single transaction.
    ///
    /// The category comes from the currency-normalized text, the amount from
    /// the original text.
    ///
    /// # Errors
    /// - `ValidationError` if the text is empty or whitespace only
    /// - Any tokenizer or model error from the forward pass
    /// - `PredictionError` if the scores cannot be turned into probabilities
    pub fn categorize_one(&self, transaction: &str) -> Result<ClassificationResult, ClassifierError> {
        let probabilities = self.probabilities(transaction)?;
        let (index, confidence) = argmax(&probabilities)
            .ok_or_else(|| ClassifierError::PredictionError("Model returned no scores".into()))?;
        let category = self
            .labels
            .label_for(index)
            .ok_or_else(|| ClassifierError::PredictionError(format!("No category for output {}", index)))?;

        debug!("{:?} -> {} ({:.3})", transaction, category, confidence);
        Ok(ClassificationResult::new(
            transaction,
            category,
            extract_amount(transaction),
            confidence,
        ))
    }

    /// Full probability distribution over the categories, in label order.
    pub fn category_scores(&self, transaction: &str) -> Result<Vec<(String, f32)>, ClassifierError> {
        let probabilities = self.probabilities(transaction)?;
        Ok(self
            .labels
            .categories()
            .iter()
            .cloned()
            .zip(probabilities.iter().copied())
            .collect())
    }

    fn probabilities(&self, transaction: &str) -> Result<Array1<f32>, ClassifierError> {
        if transaction.trim().is_empty() {
            return Err(ClassifierError::ValidationError("Transaction text cannot be empty".into()));
        }

        let cleaned = self.currency_map.normalize(transaction);
        let logits = self.model.logits(&cleaned)?;
        if logits.len() != self.labels.len() {
            return Err(ClassifierError::PredictionError(format!(
                "Model returned {} scores for {} categories",
                logits.len(),
                self.labels.len()
            )));
        }

        softmax(&Array1::from(logits))
            .ok_or_else(|| ClassifierError::PredictionError("Model returned non-finite scores".into()))
    }
}
