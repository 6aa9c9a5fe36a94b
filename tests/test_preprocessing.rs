//! Integration test: leakage-safe preprocessing

mod common;

use attrition_ml::prelude::*;
use attrition_ml::preprocessing::median;
use attrition_ml::selection::{stratified_train_test_split, ModelSelector};

#[test]
fn test_fit_statistics_come_from_training_rows_only() {
    let features = common::feature_set(40);
    let split = stratified_train_test_split(&features.labels, 0.25, 42).unwrap();
    let train = features.frame.take(&split.train_indices);

    let mut preprocessor = common::template(&features);
    preprocessor.fit(&train).unwrap();
    let medians = preprocessor.medians();
    let vocabularies = preprocessor.vocabularies();

    let expected = median(train.numeric("monthlysalary").unwrap()).unwrap();
    assert_eq!(medians["monthlysalary"], expected);

    // Rows that only ever reach transform: extreme values, unseen categories
    let mut extra = FeatureFrame::new(vec!["new".to_string()]);
    for name in features.frame.numeric_names() {
        extra.push_numeric(name, vec![Some(1e9)]).unwrap();
    }
    for name in features.frame.categorical_names() {
        extra.push_categorical(name, vec![Some("Never seen".to_string())]).unwrap();
    }
    preprocessor.transform(&extra).unwrap();
    preprocessor.transform(&features.frame.take(&split.test_indices)).unwrap();
    assert_eq!(preprocessor.medians(), medians);
    assert_eq!(preprocessor.vocabularies(), vocabularies);

    // A fresh fit on the same training rows learns the same statistics
    let mut refit = common::template(&features);
    refit.fit(&train).unwrap();
    assert_eq!(refit.medians(), medians);
    assert_eq!(refit.vocabularies(), vocabularies);
}

#[test]
fn test_selected_pipeline_medians_match_training_partition() {
    let features = common::feature_set(40);
    let selector = ModelSelector::new(common::search_config());
    let selection = selector.select(&features, &common::template(&features)).unwrap();

    let train = features.frame.take(&selection.split.train_indices);
    let fitted = selection.pipeline.preprocessor().medians();
    for name in &features.numerical {
        let expected = median(train.numeric(name).unwrap()).unwrap_or(0.0);
        assert_eq!(fitted[name], expected, "median of {}", name);
    }
}

#[test]
fn test_unknown_category_encodes_as_zeros() {
    let features = common::feature_set(24);
    let mut preprocessor = common::template(&features);
    preprocessor.fit(&features.frame).unwrap();

    // First employee, with a job role never seen at fit time
    let first = features.frame.take(&[0]);
    let mut row = FeatureFrame::new(first.ids().to_vec());
    for name in first.numeric_names() {
        row.push_numeric(name.clone(), first.numeric(&name).unwrap().to_vec()).unwrap();
    }
    for name in first.categorical_names() {
        let values = if name == "jobrole" {
            vec![Some("Astronaut".to_string())]
        } else {
            first.categorical(&name).unwrap().to_vec()
        };
        row.push_categorical(name, values).unwrap();
    }

    let x = preprocessor.transform(&row).unwrap();
    let names = preprocessor.feature_names();
    let role_columns: Vec<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, n)| n.starts_with("jobrole_"))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(role_columns.len(), 3);
    for j in role_columns {
        assert_eq!(x[[0, j]], 0.0);
    }
}

#[test]
fn test_transform_before_fit_fails() {
    let features = common::feature_set(8);
    let preprocessor = common::template(&features);
    assert!(matches!(
        preprocessor.transform(&features.frame),
        Err(AttritionError::ModelNotFitted)
    ));
}
