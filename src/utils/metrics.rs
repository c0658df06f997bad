//! Averages and dispersion of observed prices.

/// Arithmetic mean; `None` for no prices.
pub fn mean(prices: &[f64]) -> Option<f64> {
    (!prices.is_empty()).then(|| prices.iter().sum::<f64>() / prices.len() as f64)
}

/// Population standard deviation (dividing by `n`). A single value has
/// zero dispersion. Returns `None` for an empty slice.
pub fn std_dev(prices: &[f64]) -> Option<f64> {
    let m = mean(prices)?;
    let sum_sq: f64 = prices.iter().map(|p| (p - m).powi(2)).sum();
    Some((sum_sq / prices.len() as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[]), None);
        assert_eq!(std_dev(&[3.5]), Some(0.0));
        let s = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((s - 2.0).abs() < 1e-12);
    }
}
