mod common;

use std::path::Path;

use common::{labels, StubLoader};
use txn_categorizer::{
    load_model, ClassifierError, LabelConfig, LoadOutcome, ModelKind, ModelManager, OnnxLoader, RuntimeConfig,
    TransactionClassifier,
};

const ADAPTER_DIR: &str = "trained_models/finetuned_model";

#[test]
fn test_adapter_loaded() {
    let outcome = load_model(&StubLoader::working(), Some(Path::new(ADAPTER_DIR)), &labels());
    assert_eq!(outcome.kind(), Some(ModelKind::Adapter));
    assert!(!outcome.is_fallback());
    let model = outcome.into_model().unwrap();
    assert_eq!(model.source, ADAPTER_DIR);
}

#[test]
fn test_broken_adapter_falls_back_to_base() -> Result<(), ClassifierError> {
    let outcome = load_model(&StubLoader::broken_adapter(), Some(Path::new(ADAPTER_DIR)), &labels());
    match &outcome {
        LoadOutcome::BaseModelLoaded { model, adapter_error } => {
            assert_eq!(model.kind, ModelKind::Base);
            assert!(matches!(adapter_error, ClassifierError::ConfigError(_)));
        }
        other => panic!("expected base model fallback, got {:?}", other),
    }

    let (classifier, adapter_error) = TransactionClassifier::builder()
        .with_labels(labels())
        .with_adapter_dir(ADAPTER_DIR)?
        .build_with_outcome(&StubLoader::broken_adapter())?;
    assert!(adapter_error.is_some());
    assert_eq!(classifier.model_kind(), ModelKind::Base);

    let results = classifier.categorize(&["Paid NPR 350 for NTC mobile topup"])?;
    assert_eq!(results[0].category(), "Utilities");
    assert_eq!(results[0].amount(), 350.0);
    Ok(())
}

#[test]
fn test_adapter_with_wrong_label_count_falls_back() {
    let loader = StubLoader {
        adapter_labels: 3,
        ..StubLoader::working()
    };
    let outcome = load_model(&loader, Some(Path::new(ADAPTER_DIR)), &labels());
    match outcome {
        LoadOutcome::BaseModelLoaded { adapter_error, .. } => {
            assert!(matches!(adapter_error, ClassifierError::ModelError(_)));
        }
        other => panic!("expected base model fallback, got {:?}", other),
    }
}

#[test]
fn test_no_adapter_dir_uses_base() -> Result<(), ClassifierError> {
    let classifier = TransactionClassifier::builder()
        .with_labels(labels())
        .build_with(&StubLoader::working())?;
    assert_eq!(classifier.model_kind(), ModelKind::Base);
    Ok(())
}

#[test]
fn test_both_paths_failing_is_fatal() {
    let loader = StubLoader {
        base_fails: true,
        ..StubLoader::broken_adapter()
    };
    let outcome = load_model(&loader, Some(Path::new(ADAPTER_DIR)), &labels());
    assert!(outcome.kind().is_none());
    assert!(matches!(outcome, LoadOutcome::Failed { .. }));

    let err = TransactionClassifier::builder()
        .with_labels(labels())
        .with_adapter_dir(ADAPTER_DIR)
        .unwrap()
        .build_with(&loader)
        .unwrap_err();
    match err {
        ClassifierError::LoadError { adapter, base } => {
            assert!(adapter.contains("adapter_config.json"));
            assert!(base.contains("not downloaded"));
        }
        other => panic!("expected LoadError, got {:?}", other),
    }
}

#[test]
fn test_base_model_with_wrong_label_count_is_fatal() {
    let five = LabelConfig::new("stub-base", vec!["A", "B", "C", "D", "E"]).unwrap();
    let outcome = load_model(&StubLoader::broken_adapter(), Some(Path::new(ADAPTER_DIR)), &five);
    assert!(matches!(outcome, LoadOutcome::Failed { .. }));
}

#[test]
fn test_onnx_loader_without_files_fails() {
    let models = tempfile::tempdir().unwrap();
    let adapter = tempfile::tempdir().unwrap();
    std::fs::write(
        adapter.path().join("adapter_config.json"),
        r#"{"base_model_name_or_path": "distilbert-base-uncased"}"#,
    )
    .unwrap();

    let loader = OnnxLoader::new(ModelManager::new(models.path()).unwrap(), RuntimeConfig::default());
    let outcome = load_model(&loader, Some(adapter.path()), &LabelConfig::default());
    match outcome {
        LoadOutcome::Failed { adapter_error, base_error } => {
            assert!(matches!(adapter_error, ClassifierError::BuildError(_)));
            assert!(base_error.to_string().contains("not downloaded"));
        }
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[test]
fn test_builder_validation() {
    let result = TransactionClassifier::builder().with_adapter_dir("");
    assert!(matches!(result, Err(ClassifierError::BuildError(_))));

    let result = TransactionClassifier::builder()
        .with_adapter_dir("a")
        .and_then(|builder| builder.with_adapter_dir("b"));
    assert!(matches!(result, Err(ClassifierError::BuildError(_))));
}
