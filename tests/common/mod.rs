#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use txn_categorizer::{ClassifierError, LabelConfig, ModelLoader, SequenceClassifier};

pub const CATEGORIES: [&str; 4] = ["Food", "Shopping", "Utilities", "Education"];

/// Scores each category by counting keyword hits in the (normalized) text.
/// Text containing `<corrupt>` fails the forward pass.
#[derive(Debug)]
pub struct KeywordModel {
    keywords: Vec<Vec<&'static str>>,
    bias: f32,
}

impl KeywordModel {
    pub fn new() -> Self {
        Self {
            keywords: vec![
                vec!["lunch", "dinner", "momo", "restaurant"],
                vec!["shoes", "daraz", "mall"],
                vec!["topup", "ntc", "electricity", "₹"],
                vec!["tuition", "school", "books"],
            ],
            bias: 0.0,
        }
    }

    /// Same keywords, distinguishable by a constant shift in every logit.
    pub fn with_bias(bias: f32) -> Self {
        Self { bias, ..Self::new() }
    }
}

impl SequenceClassifier for KeywordModel {
    fn num_labels(&self) -> usize {
        self.keywords.len()
    }

    fn logits(&self, text: &str) -> Result<Vec<f32>, ClassifierError> {
        if text.contains("<corrupt>") {
            return Err(ClassifierError::ModelError("Failed to run model: corrupt input".into()));
        }
        let lower = text.to_lowercase();
        Ok(self
            .keywords
            .iter()
            .map(|words| words.iter().filter(|w| lower.contains(*w)).count() as f32 * 2.0 + self.bias)
            .collect())
    }
}

/// Loader with switchable failures for each load path.
pub struct StubLoader {
    pub adapter_fails: bool,
    pub base_fails: bool,
    pub adapter_labels: usize,
}

impl StubLoader {
    pub fn working() -> Self {
        Self {
            adapter_fails: false,
            base_fails: false,
            adapter_labels: CATEGORIES.len(),
        }
    }

    pub fn broken_adapter() -> Self {
        Self {
            adapter_fails: true,
            ..Self::working()
        }
    }
}

impl ModelLoader for StubLoader {
    fn load_adapter(
        &self,
        adapter_dir: &Path,
        _labels: &LabelConfig,
    ) -> Result<Arc<dyn SequenceClassifier>, ClassifierError> {
        if self.adapter_fails {
            return Err(ClassifierError::ConfigError(format!(
                "Cannot read {:?}: No such file or directory",
                adapter_dir.join("adapter_config.json")
            )));
        }
        let mut model = KeywordModel::with_bias(1.0);
        model.keywords.truncate(self.adapter_labels);
        Ok(Arc::new(model))
    }

    fn load_base(&self, _labels: &LabelConfig) -> Result<Arc<dyn SequenceClassifier>, ClassifierError> {
        if self.base_fails {
            return Err(ClassifierError::BuildError("Model 'stub' is not downloaded".into()));
        }
        Ok(Arc::new(KeywordModel::new()))
    }
}

pub fn labels() -> LabelConfig {
    LabelConfig::new("stub-base", CATEGORIES).unwrap()
}
