/// Descriptive statistics over the numeric metrics of one configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; zero for a single value.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    /// Returns `None` when there are no values or any value is not a number,
    /// e.g. profiler reports or sentinel entries.
    pub fn from_metrics<'a>(metrics: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let values = metrics
            .into_iter()
            .map(|m| m.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect::<Option<Vec<f64>>>()?;
        Self::from_values(&values)
    }

    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let std_dev = if count > 1 {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        } else {
            0.0
        };
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            count,
            mean,
            std_dev,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn summary_of_timings() {
        let summary = Summary::from_metrics(["2.0", "4.0", "4.0", "4.0", "5.0", "5.0", "7.0", "9.0"])
            .unwrap();
        assert_eq!(summary.count, 8);
        assert!(f64_approx_equal(summary.mean, 5.0));
        assert!(f64_approx_equal(summary.std_dev, (32.0f64 / 7.0).sqrt()));
        assert!(f64_approx_equal(summary.min, 2.0));
        assert!(f64_approx_equal(summary.max, 9.0));
    }

    #[test]
    fn single_value_has_zero_spread() {
        let summary = Summary::from_metrics([" 3.25 "]).unwrap();
        assert!(f64_approx_equal(summary.std_dev, 0.0));
        assert!(f64_approx_equal(summary.mean, 3.25));
    }

    #[test]
    fn non_numeric_or_empty_metrics_have_no_summary() {
        assert!(Summary::from_metrics(["1.0", "NaN"]).is_none());
        assert!(Summary::from_metrics(["Flat profile:"]).is_none());
        assert!(Summary::from_metrics(std::iter::empty()).is_none());
    }
}
