use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierError;

/// Base model used when no other name is configured.
pub const DEFAULT_MODEL_NAME: &str = "distilbert-base-uncased";

const DEFAULT_CATEGORIES: [(&str, &str); 8] = [
    ("Food", "#FF6B6B"),
    ("Shopping", "#4ECDC4"),
    ("Entertainment", "#FFD166"),
    ("Transportation", "#118AB2"),
    ("Utilities", "#06D6A0"),
    ("Education", "#8338EC"),
    ("Healthcare", "#EF476F"),
    ("Others", "#8D99AE"),
];

/// The closed set of spending categories a model was trained against.
///
/// Category `i` is the label of the model's `i`-th output. Names are unique and
/// non-empty, so the index to label mapping is a bijection. Construction and
/// deserialization both enforce this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLabelConfig", into = "RawLabelConfig")]
pub struct LabelConfig {
    model_name: String,
    categories: Vec<String>,
    colors: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize)]
struct RawLabelConfig {
    #[serde(default = "default_model_name")]
    model_name: String,
    categories: Vec<String>,
    #[serde(default)]
    colors: BTreeMap<String, String>,
}

fn default_model_name() -> String {
    DEFAULT_MODEL_NAME.to_string()
}

impl TryFrom<RawLabelConfig> for LabelConfig {
    type Error = ClassifierError;

    fn try_from(raw: RawLabelConfig) -> Result<Self, Self::Error> {
        LabelConfig::new(raw.model_name, raw.categories)?.with_colors(raw.colors)
    }
}

impl From<LabelConfig> for RawLabelConfig {
    fn from(config: LabelConfig) -> Self {
        Self {
            model_name: config.model_name,
            categories: config.categories,
            colors: config.colors,
        }
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            categories: DEFAULT_CATEGORIES.iter().map(|(name, _)| name.to_string()).collect(),
            colors: DEFAULT_CATEGORIES
                .iter()
                .map(|(name, color)| (name.to_string(), color.to_string()))
                .collect(),
        }
    }
}

impl LabelConfig {
    /// Creates a label configuration for the given base model and categories.
    ///
    /// # Errors
    /// `ConfigError` if the model name is empty, the list is empty, or a
    /// category name is empty or repeated.
    pub fn new<S: Into<String>>(
        model_name: impl Into<String>,
        categories: impl IntoIterator<Item = S>,
    ) -> Result<Self, ClassifierError> {
        let model_name = model_name.into();
        if model_name.trim().is_empty() {
            return Err(ClassifierError::ConfigError("Model name cannot be empty".into()));
        }

        let categories: Vec<String> = categories.into_iter().map(Into::into).collect();
        if categories.is_empty() {
            return Err(ClassifierError::ConfigError("At least one category must be configured".into()));
        }
        if let Some(pos) = categories.iter().position(|c| c.trim().is_empty()) {
            return Err(ClassifierError::ConfigError(format!("Category {} cannot be empty", pos + 1)));
        }
        for (i, category) in categories.iter().enumerate() {
            if categories[..i].contains(category) {
                return Err(ClassifierError::ConfigError(format!("Duplicate category '{}'", category)));
            }
        }

        Ok(Self {
            model_name,
            categories,
            colors: BTreeMap::new(),
        })
    }

    /// Attaches display colors. Every key must name a configured category.
    pub fn with_colors(mut self, colors: BTreeMap<String, String>) -> Result<Self, ClassifierError> {
        if let Some(unknown) = colors.keys().find(|k| !self.categories.contains(k)) {
            return Err(ClassifierError::ConfigError(format!(
                "Color configured for unknown category '{}'",
                unknown
            )));
        }
        self.colors = colors;
        Ok(self)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ClassifierError> {
        serde_json::from_str(json).map_err(|e| ClassifierError::ConfigError(format!("Invalid label config: {}", e)))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        log::info!("Loaded label configuration from {:?}", path);
        Self::from_json_str(&json)
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Label of model output `index`.
    pub fn label_for(&self, index: usize) -> Option<&str> {
        self.categories.get(index).map(String::as_str)
    }

    /// Model output index of `label`.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.categories.iter().position(|c| c == label)
    }

    pub fn id2label(&self) -> BTreeMap<usize, &str> {
        self.categories.iter().map(String::as_str).enumerate().collect()
    }

    pub fn label2id(&self) -> HashMap<&str, usize> {
        self.categories.iter().enumerate().map(|(i, c)| (c.as_str(), i)).collect()
    }

    pub fn color_for(&self, category: &str) -> Option<&str> {
        self.colors.get(category).map(String::as_str)
    }

    /// Checks an `id2label` table shipped with a model against this
    /// configuration. Keys are decimal indices, as written by training tools.
    pub fn check_id2label(&self, id2label: &BTreeMap<String, String>) -> Result<(), ClassifierError> {
        if id2label.len() != self.len() {
            return Err(ClassifierError::ConfigError(format!(
                "Model declares {} labels, configuration has {}",
                id2label.len(),
                self.len()
            )));
        }
        for (key, label) in id2label {
            let index: usize = key
                .parse()
                .map_err(|_| ClassifierError::ConfigError(format!("Invalid label index '{}'", key)))?;
            if self.label_for(index) != Some(label.as_str()) {
                return Err(ClassifierError::ConfigError(format!(
                    "Label {} is '{}' in the model but '{}' in the configuration",
                    index,
                    label,
                    self.label_for(index).unwrap_or("<missing>")
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mapping_is_bijective() {
        let config = LabelConfig::default();
        assert_eq!(config.len(), 8);
        for (i, label) in config.id2label() {
            assert_eq!(config.label2id()[label], i);
            assert_eq!(config.index_of(label), Some(i));
        }
        assert_eq!(config.color_for("Food"), Some("#FF6B6B"));
        assert_eq!(config.model_name(), DEFAULT_MODEL_NAME);
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert!(LabelConfig::new("m", vec!["Food", "Food"]).is_err());
        assert!(LabelConfig::new("m", vec!["Food", " "]).is_err());
        assert!(LabelConfig::new("m", Vec::<String>::new()).is_err());
        assert!(LabelConfig::new("", vec!["Food"]).is_err());
    }

    #[test]
    fn test_json_round_trip_validates() {
        let config = LabelConfig::from_json_str(
            r##"{"categories": ["Food", "Shopping"], "colors": {"Food": "#fff"}}"##,
        )
        .unwrap();
        assert_eq!(config.model_name(), DEFAULT_MODEL_NAME);
        assert_eq!(config.label_for(1), Some("Shopping"));

        let err = LabelConfig::from_json_str(r#"{"categories": ["Food", "Food"]}"#).unwrap_err();
        assert!(matches!(err, ClassifierError::ConfigError(_)));

        let err = LabelConfig::from_json_str(r##"{"categories": ["Food"], "colors": {"Rent": "#000"}}"##)
            .unwrap_err();
        assert!(matches!(err, ClassifierError::ConfigError(_)));
    }

    #[test]
    fn test_check_id2label() {
        let config = LabelConfig::new("m", vec!["Food", "Shopping"]).unwrap();
        let mut table = BTreeMap::new();
        table.insert("0".to_string(), "Food".to_string());
        table.insert("1".to_string(), "Shopping".to_string());
        assert!(config.check_id2label(&table).is_ok());

        table.insert("1".to_string(), "Rent".to_string());
        assert!(config.check_id2label(&table).is_err());

        table.remove("1");
        assert!(config.check_id2label(&table).is_err());
    }
}
