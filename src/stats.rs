use serde::{Deserialize, Serialize};

/// Rolling mean of `vals` over windows of `window` consecutive values.
///
/// Element `i` of the output is the mean of `vals[i..i + window]`, so the
/// output has `vals.len() - window + 1` elements. Returns an empty vector
/// when the window is empty or longer than `vals`.
pub fn rolling_mean(vals: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || window > vals.len() {
        return Vec::new();
    }

    let mut cum_sum = Vec::with_capacity(vals.len() + 1);
    let mut sum = 0.0;
    cum_sum.push(sum);
    for &val in vals {
        sum += val;
        cum_sum.push(sum);
    }

    cum_sum[window..]
        .iter()
        .zip(&cum_sum[..cum_sum.len() - window])
        .map(|(hi, lo)| (hi - lo) / window as f64)
        .collect()
}

pub fn compute_mean(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    vals.iter().sum::<f64>() / vals.len() as f64
}

/// Population standard deviation (divides by `n`, not `n - 1`).
pub fn compute_std_dev(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    let mean = compute_mean(vals);
    let var = vals.iter().map(|&val| (val - mean).powi(2)).sum::<f64>() / vals.len() as f64;
    var.sqrt()
}

/// Median of `vals`; NaN if `vals` is empty or holds a NaN.
pub fn compute_median(vals: &[f64]) -> f64 {
    if vals.is_empty() || vals.iter().any(|val| val.is_nan()) {
        return f64::NAN;
    }
    let mut sorted = vals.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Result of binning `y` by `x`.
///
/// `edges` has one more element than `statistic`; bin `i` spans
/// `edges[i]..edges[i + 1]`. Empty bins hold NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinnedStatistic {
    pub edges: Vec<f64>,
    pub statistic: Vec<f64>,
}

/// Computes the median of `y` inside equal-width bins over the range of `x`.
pub trait MedianBinner {
    fn median_bin(&self, x: &[f64], y: &[f64], n_bins: usize) -> BinnedStatistic;
}

/// Histogram-style binner.
///
/// The range is `[min(x), max(x)]`, widened by 0.5 on each side when all
/// values coincide. Bins are half-open except the last one, which also holds
/// its right edge. Pairs with a non-finite `x` are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct EqualWidthBinner;

impl MedianBinner for EqualWidthBinner {
    fn median_bin(&self, x: &[f64], y: &[f64], n_bins: usize) -> BinnedStatistic {
        let pairs: Vec<_> = x
            .iter()
            .zip(y)
            .filter(|(x_val, _)| x_val.is_finite())
            .map(|(&x_val, &y_val)| (x_val, y_val))
            .collect();

        if pairs.is_empty() || n_bins == 0 {
            return BinnedStatistic {
                edges: Vec::new(),
                statistic: Vec::new(),
            };
        }

        let mut lo = pairs.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let mut hi = pairs.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }

        let mut edges: Vec<_> = (0..=n_bins)
            .map(|i_bin| lo + (hi - lo) * i_bin as f64 / n_bins as f64)
            .collect();
        edges[n_bins] = hi;

        let mut bins = vec![Vec::new(); n_bins];
        for (x_val, y_val) in pairs {
            let i_bin = edges
                .partition_point(|&edge| edge <= x_val)
                .saturating_sub(1)
                .min(n_bins - 1);
            bins[i_bin].push(y_val);
        }

        let statistic = bins.iter().map(|bin| compute_median(bin)).collect();

        BinnedStatistic { edges, statistic }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_mean_of_short_sequence() {
        assert_eq!(rolling_mean(&[1.0, 2.0, 3.0, 4.0], 2), vec![1.5, 2.5, 3.5]);
        assert_eq!(rolling_mean(&[1.0, 2.0, 3.0, 4.0], 4), vec![2.5]);
        assert_eq!(rolling_mean(&[1.0, 2.0, 3.0, 4.0], 1), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn rolling_mean_with_oversized_window_is_empty() {
        assert!(rolling_mean(&[1.0, 2.0], 3).is_empty());
        assert!(rolling_mean(&[1.0, 2.0], 0).is_empty());
        assert!(rolling_mean(&[], 1).is_empty());
    }

    #[test]
    fn std_dev_is_population() {
        assert_eq!(compute_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0);
        assert_eq!(compute_std_dev(&[3.0]), 0.0);
        assert!(compute_std_dev(&[]).is_nan());
    }

    #[test]
    fn median_of_odd_and_even_counts() {
        assert_eq!(compute_median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(compute_median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert!(compute_median(&[]).is_nan());
        assert!(compute_median(&[1.0, f64::NAN]).is_nan());
    }

    #[test]
    fn binner_splits_range_evenly() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [10.0, 20.0, 30.0, 40.0, 50.0];
        let binned = EqualWidthBinner.median_bin(&x, &y, 2);
        assert_eq!(binned.edges, vec![0.0, 2.0, 4.0]);
        // The maximum lands in the last bin.
        assert_eq!(binned.statistic, vec![15.0, 40.0]);
    }

    #[test]
    fn binner_marks_empty_bins_nan() {
        let x = [0.0, 0.5, 10.0];
        let y = [1.0, 3.0, 5.0];
        let binned = EqualWidthBinner.median_bin(&x, &y, 4);
        assert_eq!(binned.edges.len(), 5);
        assert_eq!(binned.statistic[0], 2.0);
        assert!(binned.statistic[1].is_nan());
        assert!(binned.statistic[2].is_nan());
        assert_eq!(binned.statistic[3], 5.0);
    }

    #[test]
    fn binner_widens_degenerate_range() {
        let binned = EqualWidthBinner.median_bin(&[7.0, 7.0], &[1.0, 2.0], 1);
        assert_eq!(binned.edges, vec![6.5, 7.5]);
        assert_eq!(binned.statistic, vec![1.5]);
    }

    #[test]
    fn binner_of_empty_input_is_empty() {
        let binned = EqualWidthBinner.median_bin(&[], &[], 3);
        assert!(binned.edges.is_empty());
        assert!(binned.statistic.is_empty());
    }
}
