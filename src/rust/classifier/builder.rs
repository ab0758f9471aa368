use std::path::{Path, PathBuf};

use log::info;

use super::classifier::TransactionClassifier;
use super::error::ClassifierError;
use super::loader::{load_model, ModelLoader, OnnxLoader};
use crate::labels::LabelConfig;
use crate::model_manager::ModelManager;
use crate::normalizer::CurrencyMap;
use crate::runtime::RuntimeConfig;

/// A builder for constructing a [`TransactionClassifier`] with a fluent
/// interface.
#[derive(Debug, Default)]
pub struct ClassifierBuilder {
    labels: Option<LabelConfig>,
    adapter_dir: Option<PathBuf>,
    models_dir: Option<PathBuf>,
    currency_map: CurrencyMap,
    runtime_config: RuntimeConfig,
}

impl ClassifierBuilder {
    /// Creates a builder with the default label set, the default currency
    /// table and no adapter directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the category enumeration the model was trained against.
    pub fn with_labels(mut self, labels: LabelConfig) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Sets the directory holding `adapter_config.json`, the adapter-merged
    /// `model.onnx` and the paired `tokenizer.json`.
    ///
    /// The directory need not exist: a missing adapter triggers the base
    /// model fallback at build time.
    ///
    /// # Errors
    /// `BuildError` if the path is empty or an adapter directory is already set.
    pub fn with_adapter_dir(mut self, adapter_dir: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let adapter_dir = adapter_dir.as_ref();
        if adapter_dir.as_os_str().is_empty() {
            return Err(ClassifierError::BuildError("Adapter directory cannot be empty".to_string()));
        }
        if self.adapter_dir.is_some() {
            return Err(ClassifierError::BuildError("Adapter directory already set".to_string()));
        }
        self.adapter_dir = Some(adapter_dir.to_path_buf());
        Ok(self)
    }

    /// Overrides the base model registry root. Defaults to
    /// [`ModelManager::get_default_models_dir`].
    pub fn with_models_dir(mut self, models_dir: impl Into<PathBuf>) -> Self {
        self.models_dir = Some(models_dir.into());
        self
    }

    pub fn with_currency_map(mut self, currency_map: CurrencyMap) -> Self {
        self.currency_map = currency_map;
        self
    }

    /// Sets the runtime configuration for ONNX model execution
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Loads ONNX models from disk and builds the classifier.
    ///
    /// # Errors
    /// - `IoError` if the registry directory cannot be created
    /// - `LoadError` if neither the adapter nor the base model loads
    pub fn build(self) -> Result<TransactionClassifier, ClassifierError> {
        let manager = match &self.models_dir {
            Some(dir) => ModelManager::new(dir)?,
            None => ModelManager::new_default()?,
        };
        let loader = OnnxLoader::new(manager, self.runtime_config.clone());
        self.build_with(&loader)
    }

    /// Builds the classifier with a caller-supplied loader.
    pub fn build_with<L: ModelLoader + ?Sized>(self, loader: &L) -> Result<TransactionClassifier, ClassifierError> {
        self.build_with_outcome(loader).map(|(classifier, _)| classifier)
    }

    /// Like [`build_with`](Self::build_with), also returning the adapter error
    /// when the base model fallback was taken.
    pub fn build_with_outcome<L: ModelLoader + ?Sized>(
        self,
        loader: &L,
    ) -> Result<(TransactionClassifier, Option<ClassifierError>), ClassifierError> {
        let labels = self.labels.unwrap_or_default();
        let (loaded, adapter_error) = load_model(loader, self.adapter_dir.as_deref(), &labels).into_parts()?;
        info!(
            "Classifier ready using {} from {} ({} categories)",
            loaded.kind,
            loaded.source,
            labels.len()
        );
        Ok((
            TransactionClassifier::from_parts(loaded, labels, self.currency_map),
            adapter_error,
        ))
    }
}
