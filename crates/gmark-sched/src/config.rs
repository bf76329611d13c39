//! Harness configuration and job construction.

use serde::{Deserialize, Serialize};

use gmark_core::errors::{ErrorInfo, GmarkError};
use gmark_core::IdType;

use crate::job::Job;
use crate::registry::{self, AlgorithmEntry};

/// Validated startup configuration for one harness run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Backend parallelism hint; shifts every job's starting scale.
    pub parallelism: u32,
    /// Samples required at a scale before the baseline advances.
    #[serde(default = "default_target_samples")]
    pub target_samples: u32,
    /// Master seed from which all per-sample seeds derive.
    pub master_seed: u64,
    /// Selected id representations; empty means the full closed set.
    #[serde(default)]
    pub id_types: Vec<IdType>,
    /// Selected algorithms with weights; empty means the full catalogue.
    #[serde(default)]
    pub algorithms: Vec<Selection>,
}

fn default_target_samples() -> u32 {
    8
}

/// One algorithm selector with its scheduling weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Catalogue job label.
    pub name: String,
    /// Relative scheduling share; default 1.0.
    #[serde(default = "default_ratio")]
    pub ratio: f64,
}

fn default_ratio() -> f64 {
    1.0
}

impl Selection {
    /// Parses a `name` or `name=ratio` selector token.
    pub fn parse(token: &str) -> Result<Self, GmarkError> {
        let (name, ratio) = match token.split_once('=') {
            None => (token, default_ratio()),
            Some((name, raw)) => {
                let ratio: f64 = raw.parse().map_err(|_| invalid_ratio(token, raw))?;
                if !ratio.is_finite() || ratio <= 0.0 {
                    return Err(invalid_ratio(token, raw));
                }
                (name, ratio)
            }
        };
        if name.is_empty() {
            return Err(GmarkError::Config(
                ErrorInfo::new("empty-selector", "algorithm selector has no name")
                    .with_context("selector", token),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            ratio,
        })
    }
}

fn invalid_ratio(token: &str, raw: &str) -> GmarkError {
    GmarkError::Config(
        ErrorInfo::new("invalid-ratio", "selector ratio must be a positive number")
            .with_context("selector", token)
            .with_context("ratio", raw),
    )
}

impl HarnessConfig {
    /// Checks the cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), GmarkError> {
        if self.parallelism == 0 {
            return Err(GmarkError::Config(ErrorInfo::new(
                "invalid-parallelism",
                "parallelism must be a positive integer",
            )));
        }
        if self.target_samples == 0 {
            return Err(GmarkError::Config(ErrorInfo::new(
                "invalid-samples",
                "target sample count must be at least 1",
            )));
        }
        for selection in &self.algorithms {
            if !selection.ratio.is_finite() || selection.ratio <= 0.0 {
                return Err(invalid_ratio(&selection.name, &selection.ratio.to_string()));
            }
            let duplicates = self
                .algorithms
                .iter()
                .filter(|other| other.name == selection.name)
                .count();
            if duplicates > 1 {
                return Err(GmarkError::Config(
                    ErrorInfo::new("duplicate-algorithm", "algorithm selected more than once")
                        .with_context("algorithm", selection.name.as_str()),
                ));
            }
        }
        Ok(())
    }

    fn selected_entries(&self) -> Result<Vec<(&'static AlgorithmEntry, f64)>, GmarkError> {
        if self.algorithms.is_empty() {
            return Ok(registry::BUILTIN
                .iter()
                .map(|entry| (entry, default_ratio()))
                .collect());
        }
        self.algorithms
            .iter()
            .map(|selection| {
                registry::find(&selection.name)
                    .map(|entry| (entry, selection.ratio))
                    .ok_or_else(|| {
                        GmarkError::Config(
                            ErrorInfo::new("unknown-algorithm", "algorithm not in the catalogue")
                                .with_context("algorithm", selection.name.as_str())
                                .with_hint(catalogue_hint()),
                        )
                    })
            })
            .collect()
    }

    fn selected_types(&self) -> Vec<IdType> {
        if self.id_types.is_empty() {
            IdType::all().to_vec()
        } else {
            self.id_types.clone()
        }
    }

    /// Builds one job per selected algorithm × supported representation.
    ///
    /// Fails before any job is constructed on an unknown algorithm name or
    /// when the selection produces an empty pool.
    pub fn build_jobs(&self) -> Result<Vec<Job>, GmarkError> {
        self.validate()?;
        let entries = self.selected_entries()?;
        let types = self.selected_types();

        let mut jobs = Vec::new();
        for (entry, ratio) in entries {
            for &id_type in &types {
                if !entry.types.supports(id_type) {
                    continue;
                }
                let spec = registry::spec_for(entry, id_type);
                let initial = registry::initial_scale(entry, id_type, self.parallelism);
                jobs.push(Job::new(spec, ratio, initial, self.target_samples));
            }
        }
        if jobs.is_empty() {
            return Err(GmarkError::Config(ErrorInfo::new(
                "empty-selection",
                "selected algorithms support none of the selected id types",
            )));
        }
        Ok(jobs)
    }
}

fn catalogue_hint() -> String {
    let names: Vec<&str> = registry::BUILTIN.iter().map(|entry| entry.name).collect();
    format!("known algorithms: {}", names.join(", "))
}
