//! Shared fixtures for the integration tests
#![allow(dead_code)]

use attrition_ml::prelude::*;
use attrition_ml::selection::HyperparameterGrid;
use chrono::{DateTime, TimeZone, Utc};
use polars::prelude::*;

pub const ROLES: [&str; 3] = ["Engineer", "Analyst", "Manager"];

/// Rows with `i % 4 < 2` have left the company
pub fn departed(i: usize) -> bool {
    i % 4 < 2
}

pub fn employee_id(i: usize) -> i64 {
    1000 + i as i64
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap()
}

pub fn employees(n: usize) -> DataFrame {
    let ids: Vec<i64> = (0..n).map(employee_id).collect();
    let roles: Vec<&str> = (0..n).map(|i| ROLES[i % 3]).collect();
    let joined: Vec<String> = (0..n)
        .map(|i| format!("20{:02}-{:02}-15", 10 + i % 10, 1 + i % 12))
        .collect();
    let salary: Vec<f64> = (0..n)
        .map(|i| if departed(i) { 3000.0 } else { 7000.0 } + 10.0 * i as f64)
        .collect();
    let reason: Vec<Option<&str>> = (0..n)
        .map(|i| match (departed(i), i % 3) {
            (true, 0) => Some("Relocation"),
            (true, _) => Some("Better offer"),
            (false, 0) => None,
            (false, 1) => Some(" Still Working "),
            (false, _) => Some("still working"),
        })
        .collect();
    let gender: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "M" } else { "F" }).collect();
    let overtime: Vec<&str> = (0..n)
        .map(|i| if departed(i) { "Often" } else { "Rarely" })
        .collect();
    let lateness: Vec<&str> = (0..n).map(|i| ["Often", "Rarely", "Never"][i % 3]).collect();
    let experience: Vec<f64> = (0..n).map(|i| (i % 12) as f64).collect();

    df!(
        "EmployeeID" => ids,
        "JobRole" => roles,
        "DateOfJoining" => joined,
        "MonthlySalary" => salary,
        "ReasonForResignation" => reason,
        "Gender" => gender,
        "OvertimeFrequency" => overtime,
        "LateArrivalFrequency" => lateness,
        "YearsOfExperience" => experience
    )
    .unwrap()
}

/// Every other employee answered the engagement survey
pub fn engagement(n: usize) -> DataFrame {
    let rows: Vec<usize> = (0..n).step_by(2).collect();
    let ids: Vec<i64> = rows.iter().map(|&i| employee_id(i)).collect();
    let score: Vec<f64> = rows
        .iter()
        .map(|&i| if departed(i) { 1.0 } else { 4.0 } + (i % 2) as f64)
        .collect();
    let source: Vec<&str> = rows.iter().map(|_| "survey").collect();
    df!(
        "EmployeeID" => ids,
        "JobSatisfactionScore" => score,
        "Source" => source
    )
    .unwrap()
}

/// Complete compensation table whose first `dups` ids appear twice
pub fn compensation(n: usize, dups: usize) -> DataFrame {
    let rows: Vec<usize> = (0..n).chain(0..dups).collect();
    let ids: Vec<i64> = rows.iter().map(|&i| employee_id(i)).collect();
    let benchmark: Vec<f64> = rows.iter().map(|_| 6000.0).collect();
    let satisfaction: Vec<f64> = rows
        .iter()
        .map(|&i| if departed(i) { 2.0 } else { 4.0 })
        .collect();
    df!(
        "EmployeeID" => ids,
        "IndustryBenchmarkSalary" => benchmark,
        "CompensationSatisfaction" => satisfaction
    )
    .unwrap()
}

/// A table without the join key
pub fn notes() -> DataFrame {
    df!("Note" => &["quarterly review", "offsite"]).unwrap()
}

pub fn store(n: usize) -> InMemoryTableStore {
    InMemoryTableStore::new()
        .with_table("employees", employees(n))
        .with_table("engagement", engagement(n))
        .with_table("compensation", compensation(n, 5))
        .with_table("notes", notes())
}

pub fn feature_set(n: usize) -> FeatureSet {
    let tables = store(n).snapshot().unwrap();
    let merged = DataMerger::default().merge(&tables).unwrap();
    FeatureEngineer::default().engineer(&merged, now()).unwrap()
}

pub fn template(features: &FeatureSet) -> Preprocessor {
    Preprocessor::new(features.numerical.clone(), features.categorical.clone())
}

/// Small grid so the searches stay fast
pub fn small_grid() -> HyperparameterGrid {
    HyperparameterGrid::new()
        .with_knob("n_estimators", vec![5usize.into(), 10usize.into()])
        .unwrap()
        .with_knob("max_depth", vec![2usize.into(), 3usize.into()])
        .unwrap()
}

pub fn search_config() -> SearchConfig {
    SearchConfig::default()
        .with_grid(small_grid())
        .with_random_state(7)
        .with_n_jobs(2)
}
