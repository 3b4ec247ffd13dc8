/// Sorts `samples` in place and returns the mean of the inner half,
/// `samples[len / 4..len * 3 / 4]`.
///
/// Returns `None` when the inner half is empty, which happens for fewer
/// than two samples.
pub fn trimmed_mean(samples: &mut [f64]) -> Option<f64> {
    samples.sort_unstable_by(f64::total_cmp);

    let len = samples.len();
    let inner = &samples[len / 4..len * 3 / 4];

    if inner.is_empty() {
        return None;
    }

    Some(inner.iter().sum::<f64>() / inner.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::trimmed_mean;

    #[test]
    fn empty() {
        assert_eq!(trimmed_mean(&mut []), None);
    }

    #[test]
    fn single_sample_has_no_inner_half() {
        assert_eq!(trimmed_mean(&mut [10.0]), None);
    }

    #[test]
    fn small_windows() {
        // 2 -> [0, 1), 3 -> [0, 2)
        assert_eq!(trimmed_mean(&mut [30.0, 10.0]), Some(10.0));
        assert_eq!(trimmed_mean(&mut [30.0, 10.0, 20.0]), Some(15.0));
    }

    #[test]
    fn drops_outer_quartiles() {
        let mut samples = [100.0, 1.0, 20.0, 22.0, 21.0, 23.0, 500.0, 0.5];
        assert_eq!(trimmed_mean(&mut samples), Some(21.5));
    }

    #[test]
    fn sorts_in_place() {
        let mut samples = [4.0, 2.0, 3.0, 1.0];
        trimmed_mean(&mut samples);
        assert_eq!(samples, [1.0, 2.0, 3.0, 4.0]);
    }
}
