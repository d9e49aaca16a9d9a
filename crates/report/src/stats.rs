//! Population statistics over one numeric field.

/// Summary statistics of a finite sample, computed over the full population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Arithmetic mean.
    pub mean: f64,
    /// Middle value; the average of the two middle values for even counts.
    pub median: f64,
    /// `max - min`.
    pub range: f64,
    /// Population standard deviation (divisor `n`, not `n - 1`).
    pub std: f64,
}

impl Summary {
    /// Computes the summary, or `None` for an empty sample.
    pub fn compute(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        let min = sorted[0];
        let max = sorted[sorted.len() - 1];

        Some(Self { mean, median, range: max - min, std: variance.sqrt() })
    }
}

/// Projects the height the chain will have reached at `target_unix_secs`.
///
/// Extrapolates linearly from the current tip using the mean inter-block
/// time. Returns the current tip when the target is in the past or the mean
/// is not a usable positive number.
pub fn estimate_height_at(
    latest_height: u64,
    mean_block_secs: f64,
    now_unix_secs: f64,
    target_unix_secs: f64,
) -> u64 {
    if !(mean_block_secs.is_finite() && mean_block_secs > 0.0) {
        return latest_height;
    }
    let remaining_secs = target_unix_secs - now_unix_secs;
    if remaining_secs <= 0.0 {
        return latest_height;
    }
    latest_height + (remaining_secs / mean_block_secs) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sample_matches_expected_population_stats() {
        let summary = Summary::compute(&[100.0, 200.0, 300.0]).expect("summary");
        assert_eq!(summary.mean, 200.0);
        assert_eq!(summary.median, 200.0);
        assert_eq!(summary.range, 200.0);
        // Population std, not sample std: sqrt(20000/3).
        assert!((summary.std - 81.649_658_092_772_6).abs() < 1e-9);
    }

    #[test]
    fn empty_sample_has_no_summary() {
        assert_eq!(Summary::compute(&[]), None);
    }

    #[test]
    fn single_value_degenerates_cleanly() {
        let summary = Summary::compute(&[42.0]).expect("summary");
        assert_eq!(summary.mean, 42.0);
        assert_eq!(summary.median, 42.0);
        assert_eq!(summary.range, 0.0);
        assert_eq!(summary.std, 0.0);
    }

    #[test]
    fn even_count_median_averages_the_middle_pair() {
        let summary = Summary::compute(&[4.0, 1.0, 3.0, 2.0]).expect("summary");
        assert_eq!(summary.median, 2.5);
    }

    #[test]
    fn height_projection_extrapolates_from_mean_block_time() {
        // 6s blocks, one hour out: 600 blocks ahead.
        assert_eq!(estimate_height_at(1_000, 6.0, 0.0, 3_600.0), 1_600);
        // Target in the past clamps to the tip.
        assert_eq!(estimate_height_at(1_000, 6.0, 3_600.0, 0.0), 1_000);
        // Degenerate mean clamps to the tip.
        assert_eq!(estimate_height_at(1_000, 0.0, 0.0, 3_600.0), 1_000);
    }
}
