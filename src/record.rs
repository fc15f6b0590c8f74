use crate::error::ScoreError;
use anyhow::{Context, Result, bail};
use rmp_serde::decode;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

/// Raw evaluation log of a single run.
///
/// The three episode sequences are index-aligned: entry `i` of each one
/// belongs to episode `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Number of steps of each episode.
    pub episode_lengths: Vec<u64>,
    /// Total reward of each episode.
    pub episode_rewards: Vec<f64>,
    /// Wall-clock time (in seconds) at which each episode ended.
    pub timestamps: Vec<f64>,

    /// Environment identifier, resolved through the registry.
    #[serde(default)]
    pub env_id: Option<String>,
}

impl RunRecord {
    /// Load a [`RunRecord`] from a JSON (`.json`) or MessagePack (`.msgpack`) file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or decoded,
    /// or if its episode sequences are not aligned.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let ext = file.extension().and_then(|ext| ext.to_str());
        let reader = BufReader::new(
            File::open(file).with_context(|| format!("failed to open {file:?}"))?,
        );

        let record: RunRecord = match ext {
            Some("json") => serde_json::from_reader(reader).context("failed to parse JSON")?,
            Some("msgpack") => decode::from_read(reader).context("failed to decode MessagePack")?,
            _ => bail!("unsupported record file extension {ext:?}"),
        };

        record.validate().context("failed to validate record")?;

        Ok(record)
    }

    /// Fetch a JSON-encoded [`RunRecord`] with one blocking GET request.
    pub fn from_url(url: &str) -> Result<Self, ScoreError> {
        log::info!("fetching {url}");
        let record: RunRecord = reqwest::blocking::get(url)?.error_for_status()?.json()?;
        record.validate()?;
        Ok(record)
    }

    /// Ensure the episode sequences are index-aligned.
    pub fn validate(&self) -> Result<(), ScoreError> {
        check_aligned(&self.episode_lengths, &self.episode_rewards, &self.timestamps)
    }
}

pub fn check_aligned(
    episode_lengths: &[u64],
    episode_rewards: &[f64],
    timestamps: &[f64],
) -> Result<(), ScoreError> {
    let lengths = episode_lengths.len();
    let rewards = episode_rewards.len();
    let timestamps = timestamps.len();
    if lengths != rewards || rewards != timestamps {
        return Err(ScoreError::ShapeMismatch {
            lengths,
            rewards,
            timestamps,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    fn record() -> RunRecord {
        RunRecord {
            episode_lengths: vec![10, 20, 30],
            episode_rewards: vec![1.0, 2.0, 3.0],
            timestamps: vec![0.5, 1.5, 2.5],
            env_id: Some("CartPole-v0".to_string()),
        }
    }

    #[test]
    fn misaligned_record_is_rejected() {
        let mut rec = record();
        rec.timestamps.pop();
        assert!(matches!(
            rec.validate(),
            Err(ScoreError::ShapeMismatch {
                lengths: 3,
                rewards: 3,
                timestamps: 2
            })
        ));
    }

    #[test]
    fn env_id_is_optional() {
        let json = r#"{"episode_lengths":[1],"episode_rewards":[2],"timestamps":[3.0]}"#;
        let rec: RunRecord = serde_json::from_str(json).expect("failed to parse record");
        assert_eq!(rec.env_id, None);
        assert_eq!(rec.episode_rewards, vec![2.0]);
    }

    #[test]
    fn record_loads_from_json_and_msgpack_files() {
        let dir = env::temp_dir().join(format!("rlscore-record-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("failed to create test directory");

        let json_file = dir.join("run.json");
        fs::write(&json_file, serde_json::to_string(&record()).expect("failed to encode"))
            .expect("failed to write JSON file");
        assert_eq!(RunRecord::from_file(&json_file).expect("failed to load"), record());

        let msgpack_file = dir.join("run.msgpack");
        fs::write(
            &msgpack_file,
            rmp_serde::to_vec_named(&record()).expect("failed to encode"),
        )
        .expect("failed to write MessagePack file");
        assert_eq!(RunRecord::from_file(&msgpack_file).expect("failed to load"), record());

        assert!(RunRecord::from_file(dir.join("run.csv")).is_err());

        fs::remove_dir_all(&dir).ok();
    }
}
