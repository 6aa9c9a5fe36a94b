//! Feature contract configuration

use serde::{Deserialize, Serialize};

/// A day-count feature computed from a date column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateFeature {
    /// Engineered column name
    pub name: String,
    /// Source date column
    pub source: String,
}

impl DateFeature {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Declared features, label source and missing-value policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub numerical: Vec<String>,
    pub categorical: Vec<String>,
    /// Column the label is derived from
    pub label_column: String,
    /// Reason value that marks a current employee (compared trimmed, lowercase)
    pub retained_marker: String,
    pub date_features: Vec<DateFeature>,
    /// Fill value for missing categorical entries
    pub categorical_fill: String,
    /// Ordered frequency scale behind the lateness and overtime codes,
    /// matched case-insensitively; values off the scale code as null
    pub frequency_levels: Vec<String>,
}

const DEFAULT_FREQUENCY_LEVELS: &[&str] = &["never", "rarely", "sometimes", "often", "always"];

const DEFAULT_CATEGORICAL: &[&str] = &[
    "maritalstatus",
    "gender",
    "employmentstatus",
    "jobrole",
    "careerlevel",
    "hiringplatform",
    "city",
    "healthinsurancestatus",
    "overtimefrequency",
];

const DEFAULT_NUMERICAL: &[&str] = &[
    "yearsofexperience",
    "tenure_in_days",
    "days_since_last_appraisal",
    "days_since_last_hike",
    "monthlysalary",
    "percentsalaryhike",
    "bonusamount",
    "stockoptionlevel",
    "paidtimeoffbalance",
    "teamsize",
    "peerreviewscores",
    "crossfunctionalcollaboration",
    "teamturnoverrate",
    "averageworkinghoursperweek",
    "remoteworkdays",
    "sickleavetaken",
    "traininghourscompleted",
    "certificationsearned",
    "skillassessmentscores",
    "riskscore",
    "jobsatisfactionscore",
    "worklifebalancerating",
    "managersatisfactionscore",
    "careergrowthsatisfaction",
    "compensationsatisfaction",
    "workenvironmentsatisfaction",
    "compensation_ratio",
    "satisfaction_x_compensation_ratio",
    "lateness_x_overtime",
];

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            numerical: DEFAULT_NUMERICAL.iter().map(|s| s.to_string()).collect(),
            categorical: DEFAULT_CATEGORICAL.iter().map(|s| s.to_string()).collect(),
            label_column: "reasonforresignation".to_string(),
            retained_marker: "still working".to_string(),
            date_features: vec![
                DateFeature::new("tenure_in_days", "dateofjoining"),
                DateFeature::new("days_since_last_appraisal", "lastappraisaldate"),
                DateFeature::new("days_since_last_hike", "lastsalaryincreasedate"),
            ],
            categorical_fill: "Unknown".to_string(),
            frequency_levels: DEFAULT_FREQUENCY_LEVELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FeatureConfig {
    pub fn with_numerical(mut self, columns: Vec<String>) -> Self {
        self.numerical = columns;
        self
    }

    pub fn with_categorical(mut self, columns: Vec<String>) -> Self {
        self.categorical = columns;
        self
    }

    pub fn with_label_column(mut self, column: impl Into<String>) -> Self {
        self.label_column = column.into();
        self
    }

    pub fn with_categorical_fill(mut self, fill: impl Into<String>) -> Self {
        self.categorical_fill = fill.into();
        self
    }

    pub fn with_frequency_levels(mut self, levels: Vec<String>) -> Self {
        self.frequency_levels = levels;
        self
    }
}
