use crate::graph::compute_graph_stats;
use crate::record::RunRecord;
use crate::registry::Registry;
use crate::scoring::{ScoreSummary, compute_summary};
use crate::stats::EqualWidthBinner;
use anyhow::{Context, Result, bail};
use glob::glob;
use serde::Serialize;
use std::{
    collections::HashSet,
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

const SCORE_SUFFIX: &str = "-score.json";
const GRAPH_SUFFIX: &str = "-graph.json";

/// Scoring parameters given on the command line.
///
/// Values left unset are taken from the registry entry of the record's environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub trials: Option<usize>,
    pub reward_threshold: Option<f64>,
}

/// Resolve the trial window and reward threshold of `record`.
pub fn resolve_params(
    record: &RunRecord,
    registry: Option<&Registry>,
    overrides: &Overrides,
) -> Result<(usize, Option<f64>)> {
    let complete = overrides.trials.is_some() && overrides.reward_threshold.is_some();
    let spec = match (registry, record.env_id.as_deref()) {
        (Some(registry), Some(env_id)) if !complete => Some(registry.spec(env_id)?),
        _ => None,
    };

    let trials = match (overrides.trials, spec) {
        (Some(trials), _) => trials,
        (None, Some(spec)) => spec.trials,
        (None, None) => bail!("number of trials not given and not found in a registry"),
    };
    let reward_threshold = overrides
        .reward_threshold
        .or(spec.and_then(|spec| spec.reward_threshold));

    Ok((trials, reward_threshold))
}

pub fn score_record(
    record: &RunRecord,
    registry: Option<&Registry>,
    overrides: &Overrides,
) -> Result<ScoreSummary> {
    let (trials, reward_threshold) =
        resolve_params(record, registry, overrides).context("failed to resolve parameters")?;
    log::info!("scoring with trials = {trials}, reward_threshold = {reward_threshold:?}");

    let summary = compute_summary(
        &record.episode_lengths,
        &record.episode_rewards,
        &record.timestamps,
        trials,
        reward_threshold,
    )?;
    Ok(summary)
}

pub fn save_json<T: Serialize, P: AsRef<Path>>(value: &T, file: P) -> Result<()> {
    let file = file.as_ref();
    let writer =
        BufWriter::new(File::create(file).with_context(|| format!("failed to create {file:?}"))?);
    serde_json::to_writer_pretty(writer, value).context("failed to serialize results")?;
    Ok(())
}

/// Batch scorer over a directory of record files.
pub struct Manager {
    run_dir: PathBuf,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(run_dir: P) -> Result<Self> {
        let run_dir = run_dir.as_ref().to_path_buf();
        if !run_dir.is_dir() {
            bail!("{run_dir:?} is not a directory");
        }
        Ok(Self { run_dir })
    }

    /// Score and bucket every record file, writing the results beside it.
    pub fn analyze_runs(
        &self,
        registry: Option<&Registry>,
        overrides: &Overrides,
        n_buckets: usize,
    ) -> Result<usize> {
        let record_files = self.record_files().context("failed to list record files")?;
        for record_file in &record_files {
            let record = RunRecord::from_file(record_file)
                .with_context(|| format!("failed to load {record_file:?}"))?;

            let summary = score_record(&record, registry, overrides)
                .with_context(|| format!("failed to score {record_file:?}"))?;
            save_json(&summary, self.output_file(record_file, SCORE_SUFFIX))?;

            let graph_stats = compute_graph_stats(
                &record.episode_lengths,
                &record.episode_rewards,
                &record.timestamps,
                n_buckets,
                &EqualWidthBinner,
            )
            .with_context(|| format!("failed to bucket {record_file:?}"))?;
            save_json(&graph_stats, self.output_file(record_file, GRAPH_SUFFIX))?;

            log::info!("analyzed {record_file:?}");
        }

        Ok(record_files.len())
    }

    /// Remove every results file written by [`Manager::analyze_runs`].
    pub fn clean_runs(&self) -> Result<()> {
        for suffix in [SCORE_SUFFIX, GRAPH_SUFFIX] {
            for file in self.glob_files(&format!("*{suffix}"))? {
                fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
                log::info!("removed {file:?}");
            }
        }
        Ok(())
    }

    fn record_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = self.glob_files("*.json")?;
        files.retain(|file| {
            let name = file.to_string_lossy();
            !name.ends_with(SCORE_SUFFIX) && !name.ends_with(GRAPH_SUFFIX)
        });
        files.extend(self.glob_files("*.msgpack")?);
        files.sort();

        // Results are named after the stem, so stems must be unique.
        let mut stems = HashSet::new();
        for file in &files {
            if !stems.insert(file.file_stem()) {
                bail!("more than one record file named {:?}", file.with_extension(""));
            }
        }

        Ok(files)
    }

    fn glob_files(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = self.run_dir.join(pattern);
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let files = glob(pattern)
            .context("failed to glob files")?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();
        Ok(files)
    }

    fn output_file(&self, record_file: &Path, suffix: &str) -> PathBuf {
        let stem = record_file
            .file_stem()
            .map(|stem| stem.to_string_lossy())
            .unwrap_or_default();
        self.run_dir.join(format!("{stem}{suffix}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn record(env_id: Option<&str>) -> RunRecord {
        RunRecord {
            episode_lengths: vec![1, 1, 1],
            episode_rewards: vec![0.0, 10.0, 10.0],
            timestamps: vec![0.0, 1.0, 2.0],
            env_id: env_id.map(str::to_string),
        }
    }

    fn registry() -> Registry {
        Registry::from_toml("[[env]]\nid = \"Toy-v0\"\ntrials = 2\nreward_threshold = 4.0\n")
            .expect("failed to parse registry")
    }

    #[test]
    fn overrides_take_precedence_over_registry() {
        let registry = registry();
        let rec = record(Some("Toy-v0"));

        let params = resolve_params(&rec, Some(&registry), &Overrides::default())
            .expect("failed to resolve");
        assert_eq!(params, (2, Some(4.0)));

        let overrides = Overrides {
            trials: Some(3),
            reward_threshold: None,
        };
        let params = resolve_params(&rec, Some(&registry), &overrides).expect("failed to resolve");
        assert_eq!(params, (3, Some(4.0)));
    }

    #[test]
    fn missing_trials_is_an_error() {
        assert!(resolve_params(&record(None), None, &Overrides::default()).is_err());
        assert!(resolve_params(&record(Some("Other-v0")), Some(&registry()), &Overrides::default())
            .is_err());
    }

    #[test]
    fn full_overrides_skip_registry_lookup() {
        let overrides = Overrides {
            trials: Some(2),
            reward_threshold: Some(1.0),
        };
        let params = resolve_params(&record(Some("Other-v0")), Some(&registry()), &overrides)
            .expect("failed to resolve");
        assert_eq!(params, (2, Some(1.0)));

        // A missing threshold still needs the registry entry.
        let overrides = Overrides {
            trials: Some(2),
            reward_threshold: None,
        };
        assert!(resolve_params(&record(Some("Other-v0")), Some(&registry()), &overrides).is_err());
    }

    #[test]
    fn duplicate_record_stems_are_rejected() {
        let run_dir = env::temp_dir().join(format!("rlscore-manager-{}", std::process::id()));
        fs::remove_dir_all(&run_dir).ok();
        fs::create_dir_all(&run_dir).expect("failed to create test directory");

        let rec = record(Some("Toy-v0"));
        fs::write(
            run_dir.join("run.json"),
            serde_json::to_string(&rec).expect("failed to encode"),
        )
        .expect("failed to write JSON file");
        fs::write(
            run_dir.join("run.msgpack"),
            rmp_serde::to_vec_named(&rec).expect("failed to encode"),
        )
        .expect("failed to write MessagePack file");

        let mgr = Manager::new(&run_dir).expect("failed to construct mgr");
        assert!(
            mgr.analyze_runs(Some(&registry()), &Overrides::default(), 2)
                .is_err()
        );
        assert!(!run_dir.join("run-score.json").exists());

        fs::remove_file(run_dir.join("run.msgpack")).expect("failed to remove file");
        let n_runs = mgr
            .analyze_runs(Some(&registry()), &Overrides::default(), 2)
            .expect("failed to analyze");
        assert_eq!(n_runs, 1);
        assert!(run_dir.join("run-score.json").is_file());
        assert!(run_dir.join("run-graph.json").is_file());

        fs::remove_dir_all(&run_dir).ok();
    }

    #[test]
    fn record_is_scored_from_registry() {
        let summary = score_record(&record(Some("Toy-v0")), Some(&registry()), &Overrides::default())
            .expect("failed to score");
        assert_eq!(summary.episode_t_value, Some(0));
        assert_eq!(summary.mean, Some(10.0));
    }
}
