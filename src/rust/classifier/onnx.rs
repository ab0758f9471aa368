use std::collections::HashMap;
use std::path::Path;

use log::{error, info};
use ndarray::Array2;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::error::ClassifierError;
use super::model::SequenceClassifier;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// Sequence classifier backed by an ONNX Runtime session and a Hugging Face
/// tokenizer.
///
/// The ONNX model is expected to:
/// - Accept `input_ids` and `attention_mask` (shape `[1, sequence_length]`),
///   plus `token_type_ids` when the graph declares it
/// - Produce logits of shape `[1, num_labels]` as its first output
#[derive(Debug)]
pub struct OnnxSequenceClassifier {
    tokenizer: Tokenizer,
    session: Session,
    num_labels: usize,
    max_sequence_length: usize,
    uses_token_type_ids: bool,
}

impl OnnxSequenceClassifier {
    /// Loads the tokenizer and model, validates the graph inputs, and infers the
    /// label count with a probe forward pass.
    pub fn from_files(
        model_path: &Path,
        tokenizer_path: &Path,
        config: &RuntimeConfig,
    ) -> Result<Self, ClassifierError> {
        if !model_path.exists() {
            return Err(ClassifierError::BuildError(format!("Model file not found: {:?}", model_path)));
        }
        if !tokenizer_path.exists() {
            return Err(ClassifierError::BuildError(format!("Tokenizer file not found: {:?}", tokenizer_path)));
        }

        let tokenizer = Tokenizer::from_file(tokenizer_path).map_err(|e| {
            error!("Failed to load tokenizer: {}", e);
            ClassifierError::TokenizerError(format!("Failed to load tokenizer: {}", e))
        })?;
        info!("Tokenizer loaded from {:?}", tokenizer_path);

        let session = create_session_builder(config)?.commit_from_file(model_path)?;
        Self::validate_model(&session)?;
        let uses_token_type_ids = session.inputs.iter().any(|input| input.name == "token_type_ids");
        info!("Model structure validated for {:?}", model_path);

        let mut classifier = Self {
            tokenizer,
            session,
            num_labels: 0,
            max_sequence_length: config.max_sequence_length,
            uses_token_type_ids,
        };
        classifier.num_labels = classifier.run("Test input to infer label count")?.len();
        info!("Inferred {} output labels from model", classifier.num_labels);
        Ok(classifier)
    }

    fn validate_model(session: &Session) -> Result<(), ClassifierError> {
        let inputs = &session.inputs;
        if !inputs.iter().any(|i| i.name == "input_ids") || !inputs.iter().any(|i| i.name == "attention_mask") {
            return Err(ClassifierError::ModelError(format!(
                "Model must take input_ids and attention_mask, found {:?}",
                inputs.iter().map(|i| i.name.as_str()).collect::<Vec<_>>()
            )));
        }
        if session.outputs.is_empty() {
            return Err(ClassifierError::ModelError("Model must have at least 1 output for logits".to_string()));
        }
        Ok(())
    }

    fn run(&self, text: &str) -> Result<Vec<f32>, ClassifierError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ClassifierError::TokenizerError(e.to_string()))?;
        let ids = encoding.get_ids();
        let len = ids.len();
        if len > self.max_sequence_length {
            return Err(ClassifierError::ValidationError(format!(
                "Input text too long: {} tokens (max: {})",
                len, self.max_sequence_length
            )));
        }

        let to_array = |values: &[u32]| {
            Array2::from_shape_vec((1, len), values.iter().map(|&x| x as i64).collect())
                .map_err(|e| ClassifierError::ModelError(format!("Failed to create input array: {}", e)))
        };

        let mut input_tensors = HashMap::new();
        input_tensors.insert("input_ids", Tensor::from_array(to_array(ids)?)?);
        input_tensors.insert("attention_mask", Tensor::from_array(to_array(encoding.get_attention_mask())?)?);
        if self.uses_token_type_ids {
            input_tensors.insert("token_type_ids", Tensor::from_array(to_array(encoding.get_type_ids())?)?);
        }

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to run model: {}", e)))?;
        let logits = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::ModelError(format!("Failed to extract output tensor: {}", e)))?;

        let shape = logits.shape();
        if shape.len() != 2 || shape[0] != 1 {
            return Err(ClassifierError::ModelError(format!(
                "Expected logits of shape [1, num_labels], got {:?}",
                shape
            )));
        }
        Ok(logits.iter().copied().collect())
    }
}

impl SequenceClassifier for OnnxSequenceClassifier {
    fn num_labels(&self) -> usize {
        self.num_labels
    }

    fn logits(&self, text: &str) -> Result<Vec<f32>, ClassifierError> {
        self.run(text)
    }
}
