//! Utility functions shared by the builder, the predictor and the evaluator,
//! primarily for majority voting with a deterministic tie-break and for
//! summarising repeated measurements.

use std::time::Duration;

/// Finds the key with the highest count in an ordered sequence of `(key, count)` pairs.
///
/// Ties are broken by choosing the key that appears first, so callers control
/// the tie-break by controlling iteration order (the engine always iterates in
/// first-seen order).
///
/// # Arguments
/// * `counts` - Pairs of key and count, in tie-break priority order.
///
/// # Returns
/// The winning key, or `None` if `counts` is empty.
pub fn first_max_by_count<'a, I>(counts: I) -> Option<&'a str>
where
    I: IntoIterator<Item = (&'a str, usize)>,
{
    let mut winner: Option<(&'a str, usize)> = None;
    for (key, count) in counts {
        match winner {
            // Strict comparison: an equal count never displaces the earlier key.
            Some((_, best)) if count <= best => {}
            _ => winner = Some((key, count)),
        }
    }
    winner.map(|(key, _)| key)
}

/// Majority vote over a sequence of decisions.
///
/// Decisions are tallied in the order they are first encountered and the
/// tally is resolved by `first_max_by_count`.
///
/// # Returns
/// The most frequent decision, or `None` if there were no decisions.
pub fn majority_vote<'a, I>(decisions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut tally: Vec<(&'a str, usize)> = Vec::new();
    for decision in decisions {
        match tally.iter_mut().find(|(d, _)| *d == decision) {
            Some((_, n)) => *n += 1,
            None => tally.push((decision, 1)),
        }
    }
    first_max_by_count(tally)
}

/// `-p * log2(p)`, with the convention that a zero probability contributes nothing.
#[inline]
pub fn entropy_term(p: f64) -> f64 {
    if p > 0.0 {
        -p * p.log2()
    } else {
        0.0
    }
}

/// Shannon entropy (base 2) of a distribution given as raw counts.
///
/// Returns 0 for an empty distribution.
pub fn entropy_of_counts<I>(counts: I) -> f64
where
    I: IntoIterator<Item = usize>,
    I::IntoIter: Clone,
{
    let iter = counts.into_iter();
    let total: usize = iter.clone().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    iter.map(|c| entropy_term(c as f64 / total)).sum()
}

/// Calculates min, median, max, mean, and population standard deviation of a set of values.
///
/// # Arguments
/// * `values` - The measurements, in any order.
///
/// # Returns
/// A tuple `(min, median, max, mean, std_dev)`. All zero when `values` is empty.
pub fn calculate_stats(values: &[f64]) -> (f64, f64, f64, f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0, 0.0, 0.0, 0.0);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let min_val = sorted[0];
    let max_val = sorted[n - 1];
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    let std_dev = variance.sqrt();

    let median_val = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        // Even number of elements: average of the two middle ones
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };

    (min_val, median_val, max_val, mean, std_dev)
}

/// Convenience wrapper over `calculate_stats` for timings, in seconds.
pub fn calculate_duration_stats(durations: &[Duration]) -> (f64, f64, f64, f64, f64) {
    let secs: Vec<f64> = durations.iter().map(Duration::as_secs_f64).collect();
    calculate_stats(&secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_first_max_by_count() {
        assert_eq!(first_max_by_count([("a", 1), ("b", 5), ("c", 2)]), Some("b"));
        // Tie: first key wins.
        assert_eq!(first_max_by_count([("a", 5), ("b", 1), ("c", 5)]), Some("a"));
        assert_eq!(first_max_by_count([("a", 1), ("b", 1), ("c", 1)]), Some("a"));
        assert_eq!(first_max_by_count([("a", 0), ("b", 0), ("c", 1)]), Some("c"));
        assert_eq!(first_max_by_count([("a", 3), ("b", 9), ("c", 9)]), Some("b"));
        assert_eq!(first_max_by_count(Vec::<(&str, usize)>::new()), None);
    }

    #[test]
    fn test_majority_vote() {
        assert_eq!(majority_vote(["A", "B", "B"]), Some("B"));
        assert_eq!(majority_vote(["B", "A", "A", "B"]), Some("B"));
        assert_eq!(majority_vote(["A"]), Some("A"));
        assert_eq!(majority_vote(Vec::<&str>::new()), None);
    }

    #[test]
    fn test_entropy_of_counts() {
        assert_eq!(entropy_of_counts(Vec::<usize>::new()), 0.0);
        assert_eq!(entropy_of_counts([4]), 0.0);
        assert_eq!(entropy_of_counts([0, 4]), 0.0);
        assert_relative_eq!(entropy_of_counts([2, 2]), 1.0);
        assert_relative_eq!(entropy_of_counts([1, 1, 1, 1]), 2.0);
        // 1/3, 2/3 split
        assert_relative_eq!(entropy_of_counts([1, 2]), 0.918_295_834_054_489_6, epsilon = 1e-12);
    }

    #[test]
    fn test_calculate_stats_multiple() {
        let values = [1.0, 1.1, 0.9, 1.0];
        let (min_val, median_val, max_val, mean, std_dev) = calculate_stats(&values);
        assert_relative_eq!(min_val, 0.9);
        assert_relative_eq!(median_val, 1.0); // Median of (1.0, 1.0)
        assert_relative_eq!(max_val, 1.1);
        assert_relative_eq!(mean, 1.0, epsilon = 1e-12);
        // Variance = 0.02 / 4 = 0.005
        assert_relative_eq!(std_dev, 0.005f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_calculate_stats_odd() {
        let (_, median_val, _, mean, std_dev) = calculate_stats(&[1.0, 1.1, 0.9]);
        assert_relative_eq!(median_val, 1.0); // Middle element
        assert_relative_eq!(mean, 1.0, epsilon = 1e-12);
        assert_relative_eq!(std_dev, (0.02f64 / 3.0).sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_calculate_stats_empty_and_single() {
        assert_eq!(calculate_stats(&[]), (0.0, 0.0, 0.0, 0.0, 0.0));
        assert_eq!(calculate_stats(&[5.0]), (5.0, 5.0, 5.0, 5.0, 0.0));
    }

    #[test]
    fn test_calculate_duration_stats() {
        let durations = [Duration::from_millis(500), Duration::from_millis(1500)];
        let (min_val, median_val, max_val, mean, _) = calculate_duration_stats(&durations);
        assert_relative_eq!(min_val, 0.5);
        assert_relative_eq!(median_val, 1.0);
        assert_relative_eq!(max_val, 1.5);
        assert_relative_eq!(mean, 1.0);
    }
}
