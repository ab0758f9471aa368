//! Model acquisition: try the fine-tuned adapter, fall back to the base model.
//!
//! The procedure runs once and yields a [`LoadOutcome`]; there is no retry and
//! nothing beyond the base model to fall back to.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};
use serde::Deserialize;

use super::error::ClassifierError;
use super::model::{LoadedModel, ModelKind, SequenceClassifier};
use super::onnx::OnnxSequenceClassifier;
use crate::labels::LabelConfig;
use crate::model_manager::ModelManager;
use crate::runtime::RuntimeConfig;

pub const ADAPTER_CONFIG_FILE: &str = "adapter_config.json";
pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Source of models for the two load paths.
pub trait ModelLoader {
    /// Loads the adapter-augmented model and its paired tokenizer from
    /// `adapter_dir`.
    fn load_adapter(
        &self,
        adapter_dir: &Path,
        labels: &LabelConfig,
    ) -> Result<Arc<dyn SequenceClassifier>, ClassifierError>;

    /// Loads the plain base model named by `labels.model_name()`.
    fn load_base(&self, labels: &LabelConfig) -> Result<Arc<dyn SequenceClassifier>, ClassifierError>;

    /// Human-readable location of the base model, for diagnostics.
    fn base_source(&self, labels: &LabelConfig) -> String {
        labels.model_name().to_string()
    }
}

/// Result of the load procedure.
#[derive(Debug)]
pub enum LoadOutcome {
    AdapterLoaded(LoadedModel),
    BaseModelLoaded {
        model: LoadedModel,
        adapter_error: ClassifierError,
    },
    Failed {
        adapter_error: ClassifierError,
        base_error: ClassifierError,
    },
}

impl LoadOutcome {
    pub fn kind(&self) -> Option<ModelKind> {
        match self {
            Self::AdapterLoaded(model) | Self::BaseModelLoaded { model, .. } => Some(model.kind),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::BaseModelLoaded { .. })
    }

    /// Returns the ready model, or a `LoadError` carrying both failures.
    pub fn into_model(self) -> Result<LoadedModel, ClassifierError> {
        self.into_parts().map(|(model, _)| model)
    }

    /// Like [`into_model`](Self::into_model), also handing back the adapter
    /// error when the fallback was taken.
    pub fn into_parts(self) -> Result<(LoadedModel, Option<ClassifierError>), ClassifierError> {
        match self {
            Self::AdapterLoaded(model) => Ok((model, None)),
            Self::BaseModelLoaded { model, adapter_error } => Ok((model, Some(adapter_error))),
            Self::Failed { adapter_error, base_error } => Err(ClassifierError::LoadError {
                adapter: adapter_error.to_string(),
                base: base_error.to_string(),
            }),
        }
    }
}

/// Runs the two-state load procedure.
///
/// A model whose output count differs from the configured categories is
/// treated as a load failure on either path.
pub fn load_model<L: ModelLoader + ?Sized>(
    loader: &L,
    adapter_dir: Option<&Path>,
    labels: &LabelConfig,
) -> LoadOutcome {
    let adapter_error = match adapter_dir {
        Some(dir) => {
            info!("Loading fine-tuned adapter from {:?}", dir);
            match loader
                .load_adapter(dir, labels)
                .and_then(|model| check_label_count(model, labels))
            {
                Ok(model) => {
                    info!("Fine-tuned adapter loaded");
                    return LoadOutcome::AdapterLoaded(LoadedModel {
                        kind: ModelKind::Adapter,
                        source: dir.display().to_string(),
                        model,
                    });
                }
                Err(e) => e,
            }
        }
        None => ClassifierError::BuildError("No adapter directory configured".into()),
    };

    warn!("Error loading fine-tuned model: {}", adapter_error);
    warn!("Loading base model '{}' instead", labels.model_name());

    match loader
        .load_base(labels)
        .and_then(|model| check_label_count(model, labels))
    {
        Ok(model) => LoadOutcome::BaseModelLoaded {
            model: LoadedModel {
                kind: ModelKind::Base,
                source: loader.base_source(labels),
                model,
            },
            adapter_error,
        },
        Err(base_error) => {
            error!("Failed to load base model: {}", base_error);
            LoadOutcome::Failed { adapter_error, base_error }
        }
    }
}

fn check_label_count(
    model: Arc<dyn SequenceClassifier>,
    labels: &LabelConfig,
) -> Result<Arc<dyn SequenceClassifier>, ClassifierError> {
    if model.num_labels() != labels.len() {
        return Err(ClassifierError::ModelError(format!(
            "Model has {} outputs but {} categories are configured",
            model.num_labels(),
            labels.len()
        )));
    }
    Ok(model)
}

/// The subset of a PEFT `adapter_config.json` this crate reads.
#[derive(Debug, Deserialize)]
pub struct AdapterConfig {
    pub base_model_name_or_path: String,
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub id2label: Option<BTreeMap<String, String>>,
}

impl AdapterConfig {
    pub fn from_dir(adapter_dir: &Path) -> Result<Self, ClassifierError> {
        let path = adapter_dir.join(ADAPTER_CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .map_err(|e| ClassifierError::ConfigError(format!("Cannot read {:?}: {}", path, e)))?;
        serde_json::from_str(&json)
            .map_err(|e| ClassifierError::ConfigError(format!("Invalid adapter config {:?}: {}", path, e)))
    }

    /// Whether the adapter was trained on `model_name`. A hub namespace or
    /// local directory prefix on either side is ignored, so
    /// `distilbert/distilbert-base-uncased` targets `distilbert-base-uncased`.
    pub fn targets_base_model(&self, model_name: &str) -> bool {
        fn short(name: &str) -> &str {
            let name = name.trim_end_matches('/');
            name.rsplit('/').next().unwrap_or(name)
        }
        short(&self.base_model_name_or_path) == short(model_name)
    }
}

/// Loads ONNX exports from disk. The adapter directory holds the adapter
/// merged into its base model; base models come from the [`ModelManager`]
/// cache.
#[derive(Debug, Clone)]
pub struct OnnxLoader {
    manager: ModelManager,
    runtime_config: RuntimeConfig,
}

impl OnnxLoader {
    pub fn new(manager: ModelManager, runtime_config: RuntimeConfig) -> Self {
        Self { manager, runtime_config }
    }

    fn base_paths(&self, labels: &LabelConfig) -> (PathBuf, PathBuf) {
        (
            self.manager.get_model_path(labels.model_name()),
            self.manager.get_tokenizer_path(labels.model_name()),
        )
    }
}

impl ModelLoader for OnnxLoader {
    fn load_adapter(
        &self,
        adapter_dir: &Path,
        labels: &LabelConfig,
    ) -> Result<Arc<dyn SequenceClassifier>, ClassifierError> {
        let config = AdapterConfig::from_dir(adapter_dir)?;
        info!(
            "Adapter targets base model '{}' (task: {})",
            config.base_model_name_or_path,
            config.task_type.as_deref().unwrap_or("unspecified")
        );
        if !config.targets_base_model(labels.model_name()) {
            warn!(
                "Adapter was trained on '{}' but the configured base model is '{}'",
                config.base_model_name_or_path,
                labels.model_name()
            );
        }
        if let Some(id2label) = &config.id2label {
            labels.check_id2label(id2label)?;
        }

        let model = OnnxSequenceClassifier::from_files(
            &adapter_dir.join(MODEL_FILE),
            &adapter_dir.join(TOKENIZER_FILE),
            &self.runtime_config,
        )?;
        Ok(Arc::new(model))
    }

    fn load_base(&self, labels: &LabelConfig) -> Result<Arc<dyn SequenceClassifier>, ClassifierError> {
        self.manager.require_model(labels.model_name()).map_err(|e| {
            ClassifierError::BuildError(format!(
                "{}. Run with --download or call ModelManager::ensure_model_downloaded() first",
                e
            ))
        })?;
        let (model_path, tokenizer_path) = self.base_paths(labels);
        let model = OnnxSequenceClassifier::from_files(&model_path, &tokenizer_path, &self.runtime_config)?;
        Ok(Arc::new(model))
    }

    fn base_source(&self, labels: &LabelConfig) -> String {
        self.manager.model_dir(labels.model_name()).display().to_string()
    }
}
