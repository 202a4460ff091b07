use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data_handling::columns::*;
use crate::preprocessing::derived_name;
use crate::regression::ModelSpec;
use crate::report::plots::PlotSettings;

/// Two columns tested against each other.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ColumnPair {
    pub a: String,
    pub b: String,
}

/// A column tested against a fixed reference mean.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ReferenceTest {
    pub column: String,
    pub reference: f64,
}

/// One row of the model design; the response is filled in per outcome.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModelTemplate {
    pub name: String,
    pub predictors: Vec<String>,
}

impl ModelTemplate {
    pub fn for_outcome(&self, outcome: &str) -> ModelSpec {
        ModelSpec {
            name: self.name.clone(),
            response: outcome.to_string(),
            predictors: self.predictors.clone(),
        }
    }
}

/// Outcome/predictor pair for the partial-correlation stage.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PartialTarget {
    pub outcome: String,
    pub predictor: String,
}

/// Central configuration for the analysis run. Defaults encode the study
/// design; a JSON file only needs the fields it changes.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    pub data_file: String,
    pub output_dir: String,
    pub report_file: Option<String>,
    pub json_file: Option<String>,

    pub descriptive_columns: Vec<String>,
    pub frequency_columns: Vec<String>,
    pub group_column: String,

    pub paired_tests: Vec<ColumnPair>,
    pub one_sample_tests: Vec<ReferenceTest>,
    pub correlations: Vec<ColumnPair>,
    /// Columns compared between the two levels of `group_column`.
    pub group_comparisons: Vec<String>,

    pub standardize: Vec<String>,
    pub outcomes: Vec<String>,
    pub models: Vec<ModelTemplate>,
    /// Nested comparisons as 1-based (baseline, extended) indices into `models`.
    pub comparisons: Vec<(usize, usize)>,
    pub partials: Vec<PartialTarget>,
    /// 1-based index of the model whose predictors (minus the predictor of
    /// interest) are the partial-correlation covariates.
    pub partial_covariates_model: usize,

    pub labels: BTreeMap<String, String>,
    pub plot: PlotSettings,
}

fn pair(a: &str, b: &str) -> ColumnPair {
    ColumnPair {
        a: a.to_string(),
        b: b.to_string(),
    }
}

fn template(name: &str, predictors: &[&str]) -> ModelTemplate {
    ModelTemplate {
        name: name.to_string(),
        predictors: predictors.iter().map(|p| p.to_string()).collect(),
    }
}

fn extend<'a>(base: &[&'a str], extra: &[&'a str]) -> Vec<&'a str> {
    base.iter().chain(extra).copied().collect()
}

fn default_models() -> Vec<ModelTemplate> {
    let age = derived_name(AGE_MONTHS);
    let ses = derived_name(SES);
    let exp18 = derived_name(EXPOSURE_18);
    let exp30 = derived_name(EXPOSURE_30);
    let vocab = derived_name(VOCAB);
    let rt = derived_name(RT);
    let (age, ses, exp18, exp30, vocab, rt) = (
        age.as_str(),
        ses.as_str(),
        exp18.as_str(),
        exp30.as_str(),
        vocab.as_str(),
        rt.as_str(),
    );

    let demographics = [age, SEX, ses];
    let exposure = extend(&demographics, &[exp18, exp30]);

    vec![
        template("Demographics", &demographics),
        template("+ Exposure", &exposure),
        template("+ Exposure + Vocabulary", &extend(&exposure, &[vocab])),
        template("+ Exposure + RT", &extend(&exposure, &[rt])),
        template("+ Exposure + Vocabulary + RT", &extend(&exposure, &[vocab, rt])),
        template("Demographics + Vocabulary + RT", &extend(&demographics, &[vocab, rt])),
    ]
}

fn default_labels() -> BTreeMap<String, String> {
    [
        (COMPOSITE_ENG, "English composite"),
        (COMPOSITE_SPA, "Spanish composite"),
        ("z_age_months", "Age (z)"),
        ("z_ses", "Maternal education (z)"),
        ("z_exposure_18", "Exposure at 18 mo (z)"),
        ("z_exposure_30", "Exposure at 30 mo (z)"),
        ("z_vocab", "Vocabulary (z)"),
        ("z_rt", "Reaction time (z)"),
        ("sexM", "Sex (male)"),
        ("sex1", "Sex (male)"),
        (VOCAB, "Vocabulary"),
        (RT, "Reaction time"),
        (ACCURACY, "Accuracy"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let z_vocab = derived_name(VOCAB);
        let z_rt = derived_name(RT);
        Self {
            data_file: "data/child_language.csv".to_string(),
            output_dir: "figures".to_string(),
            report_file: None,
            json_file: None,

            descriptive_columns: [
                AGE_MONTHS, SES, EXPOSURE_18, EXPOSURE_30, VOCAB, ACCURACY, RT, COMPOSITE_ENG,
                COMPOSITE_SPA,
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            frequency_columns: vec![MOTHER_BIRTH_COUNTRY.to_string(), BIRTH_ORDER.to_string()],
            group_column: SEX.to_string(),

            paired_tests: vec![pair(EXPOSURE_18, EXPOSURE_30), pair(COMPOSITE_ENG, COMPOSITE_SPA)],
            one_sample_tests: vec![
                ReferenceTest {
                    column: ACCURACY.to_string(),
                    reference: 0.5,
                },
                ReferenceTest {
                    column: COMPOSITE_ENG.to_string(),
                    reference: 100.0,
                },
                ReferenceTest {
                    column: COMPOSITE_SPA.to_string(),
                    reference: 100.0,
                },
            ],
            correlations: vec![
                pair(VOCAB, ACCURACY),
                pair(VOCAB, RT),
                pair(ACCURACY, RT),
                pair(EXPOSURE_30, COMPOSITE_SPA),
                pair(VOCAB, COMPOSITE_ENG),
            ],
            group_comparisons: vec![COMPOSITE_ENG.to_string(), COMPOSITE_SPA.to_string()],

            standardize: [AGE_MONTHS, SES, EXPOSURE_18, EXPOSURE_30, VOCAB, ACCURACY, RT]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            outcomes: vec![COMPOSITE_ENG.to_string(), COMPOSITE_SPA.to_string()],
            models: default_models(),
            comparisons: vec![(1, 2), (2, 3), (2, 4), (2, 5), (3, 5), (4, 5), (1, 6)],
            partials: [
                (COMPOSITE_ENG, z_vocab.as_str()),
                (COMPOSITE_ENG, z_rt.as_str()),
                (COMPOSITE_SPA, z_vocab.as_str()),
                (COMPOSITE_SPA, z_rt.as_str()),
            ]
            .iter()
            .map(|(o, p)| PartialTarget {
                outcome: o.to_string(),
                predictor: p.to_string(),
            })
            .collect(),
            partial_covariates_model: 5,

            labels: default_labels(),
            plot: PlotSettings::default(),
        }
    }
}

impl AnalysisConfig {
    /// Human-readable label for a column or model term.
    pub fn label(&self, name: &str) -> String {
        self.labels.get(name).cloned().unwrap_or_else(|| name.to_string())
    }
}

/// Load an analysis configuration from a JSON file.
pub fn load_analysis_config<P: AsRef<Path>>(path: P) -> Result<AnalysisConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: AnalysisConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}
