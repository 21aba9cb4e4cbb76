//! Trailing momentum (rate of change over a fixed number of observations).
//!
//! MOM(n)[i] = C[i] / C[i-n] - 1
//! Undefined for the first n rows, and wherever either close is missing.

/// Roughly three months of trading sessions.
pub const DEFAULT_LOOKBACK: usize = 63;

pub fn momentum(closes: &[Option<f64>], lookback: usize) -> Vec<Option<f64>> {
    (0..closes.len())
        .map(|i| {
            if lookback == 0 || i < lookback {
                return None;
            }
            match (closes[i], closes[i - lookback]) {
                (Some(curr), Some(prev)) if prev > 0.0 => Some(curr / prev - 1.0),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn present(prices: &[f64]) -> Vec<Option<f64>> {
        prices.iter().copied().map(Some).collect()
    }

    #[test]
    fn momentum_warmup() {
        let m = momentum(&present(&[100.0, 105.0, 110.0, 115.0, 120.0]), 3);
        assert_eq!(m[..3], [None, None, None]);
        assert!(m[3].is_some());
        assert!(m[4].is_some());
    }

    #[test]
    fn momentum_basic_calculation() {
        let m = momentum(&present(&[100.0, 105.0, 110.0, 115.0]), 2);
        assert_relative_eq!(m[2].unwrap(), 0.10, epsilon = 1e-12);
        assert_relative_eq!(m[3].unwrap(), 115.0 / 105.0 - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn momentum_negative_change() {
        let m = momentum(&present(&[100.0, 90.0, 80.0]), 2);
        assert_relative_eq!(m[2].unwrap(), -0.20, epsilon = 1e-12);
    }

    #[test]
    fn momentum_gap_is_absent() {
        let closes = vec![Some(100.0), None, Some(110.0), Some(120.0)];
        let m = momentum(&closes, 2);
        assert_relative_eq!(m[2].unwrap(), 0.10, epsilon = 1e-12);
        assert_eq!(m[3], None);
    }

    #[test]
    fn momentum_shorter_than_lookback() {
        let m = momentum(&present(&[100.0; 10]), DEFAULT_LOOKBACK);
        assert!(m.iter().all(Option::is_none));
    }

    #[test]
    fn momentum_non_positive_base_is_absent() {
        let m = momentum(&present(&[0.0, 100.0, 110.0]), 2);
        assert_eq!(m[2], None);
    }
}
