use crate::error::ScoreError;
use crate::record::{RunRecord, check_aligned};
use crate::registry::Registry;
use crate::stats::{compute_mean, compute_std_dev, rolling_mean};
use serde::{Deserialize, Serialize};

/// Summary score of a run.
///
/// Optional fields are `None` when there is not enough data: fewer episodes
/// than the trial window, fewer than 3 timestamps, no threshold configured or
/// a threshold that is never exceeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    /// First window-start episode whose rolling mean exceeds the threshold.
    pub episode_t_value: Option<usize>,
    /// Total steps taken before `episode_t_value`.
    pub timestep_t_value: Option<u64>,
    /// Mean reward of the best window.
    pub mean: Option<f64>,
    /// Error of the best window mean.
    pub error: Option<f64>,
    pub number_episodes: usize,
    pub number_timesteps: u64,
    /// Time from the first to the last timestamp.
    pub time_in_seconds: Option<f64>,
}

/// Score a run from its aligned episode sequences.
///
/// # Errors
/// Returns [`ScoreError::ShapeMismatch`] if the sequences differ in length
/// and [`ScoreError::InvalidWindow`] if `trials` is zero.
pub fn compute_summary(
    episode_lengths: &[u64],
    episode_rewards: &[f64],
    timestamps: &[f64],
    trials: usize,
    reward_threshold: Option<f64>,
) -> Result<ScoreSummary, ScoreError> {
    check_aligned(episode_lengths, episode_rewards, timestamps)?;
    if trials == 0 {
        return Err(ScoreError::InvalidWindow);
    }

    let mut summary = ScoreSummary {
        episode_t_value: None,
        timestep_t_value: None,
        mean: None,
        error: None,
        number_episodes: episode_rewards.len(),
        number_timesteps: episode_lengths.iter().sum(),
        time_in_seconds: None,
    };

    if timestamps.len() > 2 {
        summary.time_in_seconds = Some(timestamps[timestamps.len() - 1] - timestamps[0]);
    }

    if episode_rewards.len() < trials {
        log::debug!(
            "{} episodes are fewer than {trials} trials",
            episode_rewards.len()
        );
        return Ok(summary);
    }

    let means = rolling_mean(episode_rewards, trials);

    if let Some(threshold) = reward_threshold {
        if let Some(i_ep) = means.iter().position(|&mean| mean > threshold) {
            summary.episode_t_value = Some(i_ep);
            summary.timestep_t_value = Some(episode_lengths[..i_ep].iter().sum());
        }
    }

    // First occurrence wins on ties.
    let mut i_best = 0;
    for (i_win, &mean) in means.iter().enumerate() {
        if mean > means[i_best] {
            i_best = i_win;
        }
    }
    let best_rewards = &episode_rewards[i_best..i_best + trials];
    summary.mean = Some(compute_mean(best_rewards));
    summary.error = Some(compute_std_dev(best_rewards) / ((trials as f64).sqrt() - 1.0));

    Ok(summary)
}

/// Score a run fetched from `url`, taking its parameters from `registry`.
///
/// # Errors
/// Returns [`ScoreError::Retrieval`] if the record cannot be fetched, decoded
/// or has no `env_id`, and [`ScoreError::Lookup`] if the environment is unknown.
pub fn score_from_remote(url: &str, registry: &Registry) -> Result<ScoreSummary, ScoreError> {
    let record = RunRecord::from_url(url)?;
    score_registered(&record, registry)
}

/// Score `record` with the parameters registered for its `env_id`.
pub fn score_registered(record: &RunRecord, registry: &Registry) -> Result<ScoreSummary, ScoreError> {
    let env_id = record
        .env_id
        .as_deref()
        .ok_or_else(|| ScoreError::Retrieval("record has no env_id".to_string()))?;
    let spec = registry.spec(env_id)?;
    compute_summary(
        &record.episode_lengths,
        &record.episode_rewards,
        &record.timestamps,
        spec.trials,
        spec.reward_threshold,
    )
}
