use attrition_ml::features::{FeatureFrame, FeatureSet};
use attrition_ml::preprocessing::Preprocessor;
use attrition_ml::selection::{HyperparameterGrid, ModelSelector, SearchConfig};
use attrition_ml::training::{Classifier, ModelFamily, Params};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array1;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const ROLES: [&str; 4] = ["Engineer", "Analyst", "Manager", "Sales"];

fn create_feature_set(n_rows: usize, n_numeric: usize) -> FeatureSet {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let ids = (0..n_rows).map(|i| format!("e{}", i)).collect();
    let mut frame = FeatureFrame::new(ids);

    let mut signal = vec![0.0; n_rows];
    let mut numerical = Vec::with_capacity(n_numeric);
    for j in 0..n_numeric {
        let values: Vec<Option<f64>> = (0..n_rows)
            .map(|i| {
                // About 5% missing
                if rng.gen::<f64>() < 0.05 {
                    return None;
                }
                let v = rng.gen::<f64>() * 10.0;
                if j < 3 {
                    signal[i] += v;
                }
                Some(v)
            })
            .collect();
        let name = format!("feature_{}", j);
        frame.push_numeric(name.clone(), values).unwrap();
        numerical.push(name);
    }

    let roles: Vec<Option<String>> = (0..n_rows)
        .map(|_| Some(ROLES[rng.gen_range(0..ROLES.len())].to_string()))
        .collect();
    frame.push_categorical("jobrole", roles).unwrap();

    let labels: Array1<f64> = signal
        .iter()
        .map(|s| if *s + rng.gen::<f64>() * 3.0 > 16.5 { 1.0 } else { 0.0 })
        .collect();

    FeatureSet {
        frame,
        labels,
        numerical,
        categorical: vec!["jobrole".to_string()],
        frequency_levels: Vec::new(),
    }
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    let grid = HyperparameterGrid::new()
        .with_knob("n_estimators", vec![20usize.into(), 50usize.into()])
        .unwrap()
        .with_knob("max_depth", vec![3usize.into(), 5usize.into()])
        .unwrap();

    for n_rows in [500, 2000].iter() {
        let features = create_feature_set(*n_rows, 10);
        let template = Preprocessor::new(features.numerical.clone(), features.categorical.clone());

        for n_jobs in [1, 4] {
            let config = SearchConfig::default().with_grid(grid.clone()).with_n_jobs(n_jobs);
            group.bench_with_input(
                BenchmarkId::new(format!("jobs_{}", n_jobs), n_rows),
                &features,
                |b, features| {
                    b.iter(|| {
                        ModelSelector::new(config.clone())
                            .search(black_box(&features.frame), &features.labels, &template)
                            .unwrap()
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit");
    group.sample_size(10);

    let features = create_feature_set(5000, 10);
    let mut preprocessor = Preprocessor::new(features.numerical.clone(), features.categorical.clone());
    let x = preprocessor.fit_transform(&features.frame).unwrap();

    for family in [ModelFamily::GradientBoosting, ModelFamily::LogisticRegression] {
        group.bench_function(family.to_string(), |b| {
            b.iter(|| {
                let mut model = family.build(&Params::new(), 42).unwrap();
                model.fit(black_box(&x), &features.labels).unwrap();
                model
            })
        });
    }

    group.finish();
}

fn bench_preprocess(c: &mut Criterion) {
    let features = create_feature_set(10000, 20);

    c.bench_function("preprocess_fit_transform", |b| {
        b.iter(|| {
            let mut preprocessor =
                Preprocessor::new(features.numerical.clone(), features.categorical.clone());
            preprocessor.fit_transform(black_box(&features.frame)).unwrap()
        })
    });
}

criterion_group!(benches, bench_search, bench_fit, bench_preprocess);
criterion_main!(benches);
