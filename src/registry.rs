use crate::error::ScoreError;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt::Debug, fs, ops::RangeBounds, path::Path};

const DEFAULT_TRIALS: usize = 100;

/// Scoring parameters of one environment.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct EnvSpec {
    /// Environment identifier.
    pub id: String,

    /// Number of consecutive episodes averaged when scoring.
    #[serde(default = "default_trials")]
    pub trials: usize,

    /// Rolling-mean reward at which the environment counts as solved.
    #[serde(default)]
    pub reward_threshold: Option<f64>,
}

fn default_trials() -> usize {
    DEFAULT_TRIALS
}

/// Table of environment specifications keyed by identifier.
///
/// Loaded from a TOML file with one `[[env]]` table per environment.
/// See [`Registry::from_file`] for loading.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default, rename = "env")]
    specs: Vec<EnvSpec>,
}

impl Registry {
    /// Load a [`Registry`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed,
    /// or if any environment specification is invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let registry: Registry = toml::from_str(contents).context("failed to parse registry")?;
        registry.validate().context("failed to validate registry")?;
        Ok(registry)
    }

    /// Look up the specification of `env_id`.
    pub fn spec(&self, env_id: &str) -> Result<&EnvSpec, ScoreError> {
        self.specs
            .iter()
            .find(|spec| spec.id == env_id)
            .ok_or_else(|| ScoreError::Lookup(env_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for spec in &self.specs {
            if spec.id.is_empty() {
                bail!("environment id must not be empty");
            }
            if !ids.insert(spec.id.as_str()) {
                bail!("environment {:?} is defined more than once", spec.id);
            }
            check_num(spec.trials, 1..=100_000)
                .with_context(|| format!("invalid number of trials for {:?}", spec.id))?;
            if let Some(threshold) = spec.reward_threshold {
                if !threshold.is_finite() {
                    bail!("reward threshold for {:?} must be finite", spec.id);
                }
            }
        }
        Ok(())
    }
}

pub fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
