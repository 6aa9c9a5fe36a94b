//! Integration test: artifact persistence and the scoring handle

mod common;

use attrition_ml::artifact::{self, ARTIFACT_MAGIC};
use attrition_ml::prelude::*;
use attrition_ml::selection::ModelSelector;
use tempfile::TempDir;

fn trained() -> TrainedPipeline {
    let features = common::feature_set(40);
    ModelSelector::new(common::search_config())
        .select(&features, &common::template(&features))
        .unwrap()
        .pipeline
}

/// Three employees with known values; one has an unseen role, one a null salary
fn sample() -> FeatureFrame {
    let mut frame = FeatureFrame::new(vec!["a".into(), "b".into(), "c".into()]);
    frame
        .push_numeric("monthlysalary", vec![Some(3100.0), None, Some(7200.0)])
        .unwrap();
    frame
        .push_numeric("tenure_in_days", vec![Some(400.0), Some(2500.0), Some(4000.0)])
        .unwrap();
    frame
        .push_numeric("jobsatisfactionscore", vec![Some(1.0), Some(3.0), Some(5.0)])
        .unwrap();
    frame
        .push_categorical(
            "jobrole",
            vec![Some("Engineer".into()), Some("Pilot".into()), None],
        )
        .unwrap();
    frame
        .push_categorical(
            "overtimefrequency",
            vec![Some("Often".into()), Some("Rarely".into()), Some("Rarely".into())],
        )
        .unwrap();
    frame
}

#[test]
fn test_round_trip_predictions_match() {
    let pipeline = trained();
    let before = pipeline.predict_proba(&sample()).unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("attrition_pipeline.bin");
    let store = ArtifactStore::new(&path);
    store.save(&pipeline).unwrap();
    assert!(store.exists());

    let loaded = store.load().unwrap();
    let after = loaded.predict_proba(&sample()).unwrap();
    assert_eq!(before.len(), 3);
    for (x, y) in before.iter().zip(after.iter()) {
        assert!((x - y).abs() <= 1e-6, "{} vs {}", x, y);
        assert!((0.0..=1.0).contains(x));
    }
    assert_eq!(loaded.metadata(), pipeline.metadata());
    assert_eq!(loaded.preprocessor().feature_names(), pipeline.preprocessor().feature_names());
}

#[test]
fn test_save_leaves_no_temp_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.bin");
    artifact::save(&trained(), &path).unwrap();
    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..4], &ARTIFACT_MAGIC);
}

#[test]
fn test_truncated_artifact_is_corrupt() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.bin");
    artifact::save(&trained(), &path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
    assert!(matches!(artifact::load(&path), Err(AttritionError::ArtifactCorrupt(_))));
}

#[test]
fn test_handle_lifecycle() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.bin");
    let pipeline = trained();
    artifact::save(&pipeline, &path).unwrap();

    let handle = PipelineHandle::new();
    let employee = FeatureVector::new()
        .with_numeric("monthlysalary", 3050.0)
        .with_numeric("jobsatisfactionscore", 1.0)
        .with_categorical("overtimefrequency", Some("Often"))
        .with_categorical("jobrole", Some("Engineer"));
    assert_eq!(handle.assess(&employee).unwrap(), None);

    assert!(handle.load(&path));
    let assessment = handle.assess(&employee).unwrap().unwrap();
    let expected = pipeline.predict_one(&employee).unwrap();
    assert!((assessment.probability - expected).abs() <= 1e-12);
    assert_eq!(assessment.level, RiskLevel::from_probability(expected));

    handle.unload();
    assert!(handle.current().is_none());

    // A missing artifact leaves the handle empty instead of failing
    assert!(!handle.load(&dir.path().join("absent.bin")));
    assert_eq!(handle.assess(&employee).unwrap(), None);
}

#[test]
fn test_handle_swaps_in_memory_pipeline() {
    let handle = PipelineHandle::new();
    assert!(handle.replace(trained()).is_none());
    assert!(handle.is_loaded());
    let previous = handle.replace(trained());
    assert!(previous.is_some());
}
