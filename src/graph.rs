use crate::error::ScoreError;
use crate::record::check_aligned;
use crate::stats::{BinnedStatistic, MedianBinner, rolling_mean};
use serde::{Deserialize, Serialize};

/// Plottable series: bin centers against the per-bin statistic.
///
/// Both vectors have the same length and hold only finite values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketedSeries {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl From<BinnedStatistic> for BucketedSeries {
    fn from(binned: BinnedStatistic) -> Self {
        let centers = rolling_mean(&binned.edges, 2);
        let (x, y) = centers
            .into_iter()
            .zip(binned.statistic)
            .filter(|(x_val, y_val)| x_val.is_finite() && y_val.is_finite())
            .unzip();
        Self { x, y }
    }
}

/// Median reward and length against episode start timestep, episode index
/// and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub x_timestep_y_reward: BucketedSeries,
    pub x_timestep_y_length: BucketedSeries,
    pub x_episode_y_reward: BucketedSeries,
    pub x_episode_y_length: BucketedSeries,
    pub x_timestamp_y_reward: BucketedSeries,
    pub x_timestamp_y_length: BucketedSeries,
}

/// Bucket a run into `n_buckets` median bins along each x-axis.
///
/// # Errors
/// Returns [`ScoreError::ShapeMismatch`] if the sequences differ in length
/// and [`ScoreError::InvalidBuckets`] if `n_buckets` is zero.
pub fn compute_graph_stats<B: MedianBinner>(
    episode_lengths: &[u64],
    episode_rewards: &[f64],
    timestamps: &[f64],
    n_buckets: usize,
    binner: &B,
) -> Result<GraphStats, ScoreError> {
    check_aligned(episode_lengths, episode_rewards, timestamps)?;
    if n_buckets == 0 {
        return Err(ScoreError::InvalidBuckets);
    }
    let n_episodes = episode_lengths.len();

    // Steps taken before each episode starts.
    let mut x_timestep = Vec::with_capacity(n_episodes);
    let mut steps: u64 = 0;
    for &len in episode_lengths {
        x_timestep.push(steps as f64);
        steps += len;
    }
    debug_assert_eq!(x_timestep.len(), n_episodes);

    let x_episode: Vec<_> = (0..n_episodes).map(|i_ep| i_ep as f64).collect();
    let x_timestamp = timestamps;

    let y_reward = episode_rewards;
    let y_length: Vec<_> = episode_lengths.iter().map(|&len| len as f64).collect();

    let series = |x: &[f64], y: &[f64]| BucketedSeries::from(binner.median_bin(x, y, n_buckets));

    Ok(GraphStats {
        x_timestep_y_reward: series(&x_timestep, y_reward),
        x_timestep_y_length: series(&x_timestep, &y_length),
        x_episode_y_reward: series(&x_episode, y_reward),
        x_episode_y_length: series(&x_episode, &y_length),
        x_timestamp_y_reward: series(x_timestamp, y_reward),
        x_timestamp_y_length: series(x_timestamp, &y_length),
    })
}
