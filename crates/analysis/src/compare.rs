//! Two-sample comparison tests.
//!
//! `ttest` is the independent two-sample Student t test with pooled
//! variance. `mannwhitney` reports U for the first sample and a two-sided
//! p-value from the normal approximation, with tie correction and a 0.5
//! continuity correction. Both p-values are two-sided.

use std::fmt;
use std::str::FromStr;

use pipeline_common::{PipelineError, PipelineResult};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

/// The supported test kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    TTest,
    MannWhitney,
}

impl TestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestKind::TTest => "ttest",
            TestKind::MannWhitney => "mannwhitney",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ttest" => Ok(TestKind::TTest),
            "mannwhitney" => Ok(TestKind::MannWhitney),
            other => Err(PipelineError::UnsupportedTest(other.to_string())),
        }
    }
}

/// Outcome of a comparison. `test` echoes the requested kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    pub statistic: f64,
    pub pvalue: f64,
    pub test: String,
}

/// Compare two samples with the named test.
pub fn statistical_test(a: &[f64], b: &[f64], test: &str) -> PipelineResult<ComparisonResult> {
    let kind: TestKind = test.parse()?;

    let (statistic, pvalue) = match kind {
        TestKind::TTest => ttest_ind(a, b)?,
        TestKind::MannWhitney => mann_whitney_u(a, b)?,
    };

    Ok(ComparisonResult {
        statistic,
        pvalue,
        test: kind.as_str().to_string(),
    })
}

fn insufficient(message: impl Into<String>) -> PipelineError {
    PipelineError::invalid_value("analysis.comparison", message)
}

fn distribution_error(err: impl fmt::Display) -> PipelineError {
    PipelineError::DataRead(format!("distribution: {}", err))
}

/// Pooled-variance t statistic and two-sided p-value.
pub fn ttest_ind(a: &[f64], b: &[f64]) -> PipelineResult<(f64, f64)> {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    if a.is_empty() || b.is_empty() || a.len() + b.len() < 3 {
        return Err(insufficient(format!(
            "t test needs both groups non-empty and at least 3 values, got {} and {}",
            a.len(),
            b.len()
        )));
    }

    let m1 = a.iter().sum::<f64>() / n1;
    let m2 = b.iter().sum::<f64>() / n2;
    let ss1: f64 = a.iter().map(|v| (v - m1).powi(2)).sum();
    let ss2: f64 = b.iter().map(|v| (v - m2).powi(2)).sum();

    let df = n1 + n2 - 2.0;
    let pooled = (ss1 + ss2) / df;
    if pooled <= 0.0 {
        return Err(insufficient("t test is undefined for zero variance"));
    }

    let t = (m1 - m2) / (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();
    let dist = StudentsT::new(0.0, 1.0, df).map_err(distribution_error)?;
    let p = (2.0 * dist.sf(t.abs())).min(1.0);

    Ok((t, p))
}

/// Average ranks (1-based) of `values`, with ties sharing the mean rank.
/// Also returns the tie-correction term: the sum of t^3 - t over tie groups.
fn rank_with_ties(values: &[f64]) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    let mut ranks = vec![0.0; values.len()];
    let mut tie_term = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end share ranks start+1..=end.
        let avg = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg;
        }
        let t = (end - start) as f64;
        tie_term += t * t * t - t;
        start = end;
    }

    (ranks, tie_term)
}

/// U of the first sample and its two-sided normal-approximation p-value.
pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> PipelineResult<(f64, f64)> {
    if a.is_empty() || b.is_empty() {
        return Err(insufficient(format!(
            "Mann-Whitney U needs both groups non-empty, got {} and {}",
            a.len(),
            b.len()
        )));
    }

    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let n = n1 + n2;

    let combined: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
    let (ranks, tie_term) = rank_with_ties(&combined);

    let r1: f64 = ranks[..a.len()].iter().sum();
    let u1 = r1 - n1 * (n1 + 1.0) / 2.0;
    let u2 = n1 * n2 - u1;

    let mu = n1 * n2 / 2.0;
    let sigma = (n1 * n2 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)))).sqrt();
    if sigma <= 0.0 || sigma.is_nan() {
        // Every value tied: no evidence either way.
        return Ok((u1, 1.0));
    }

    let z = (u1.max(u2) - mu - 0.5) / sigma;
    let normal = Normal::new(0.0, 1.0).map_err(distribution_error)?;
    let p = (2.0 * normal.sf(z)).clamp(0.0, 1.0);

    Ok((u1, p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    const LOW: [f64; 5] = [1.0, 2.0, 3.0, 4.0, 5.0];
    const HIGH: [f64; 5] = [6.0, 7.0, 8.0, 9.0, 10.0];

    #[test]
    fn test_ttest_separated_groups() {
        let result = statistical_test(&LOW, &HIGH, "ttest").unwrap();
        assert_approx_eq!(result.statistic, -5.0, 1e-12);
        assert_approx_eq!(result.pvalue, 0.001052, 1e-5);
        assert_eq!(result.test, "ttest");
    }

    #[test]
    fn test_ttest_identical_means() {
        let (t, p) = ttest_ind(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
        assert_approx_eq!(t, 0.0, 1e-12);
        assert_approx_eq!(p, 1.0, 1e-12);
    }

    #[test]
    fn test_ttest_zero_variance_rejected() {
        assert!(ttest_ind(&[1.0, 1.0], &[1.0, 1.0]).is_err());
        assert!(ttest_ind(&[1.0], &[]).is_err());
    }

    #[test]
    fn test_mannwhitney_separated_groups() {
        let result = statistical_test(&LOW, &HIGH, "mannwhitney").unwrap();
        assert_approx_eq!(result.statistic, 0.0, 1e-12);
        assert_approx_eq!(result.pvalue, 0.01219, 1e-4);
        assert_eq!(result.test, "mannwhitney");
    }

    #[test]
    fn test_mannwhitney_u_is_first_sample() {
        let (u, _) = mann_whitney_u(&HIGH, &LOW).unwrap();
        assert_approx_eq!(u, 25.0, 1e-12);
    }

    #[test]
    fn test_ranks_average_ties() {
        let (ranks, tie_term) = rank_with_ties(&[10.0, 20.0, 20.0, 30.0]);
        assert_eq!(ranks, vec![1.0, 2.5, 2.5, 4.0]);
        assert_approx_eq!(tie_term, 6.0, 1e-12);
    }

    #[test]
    fn test_all_tied_gives_unit_pvalue() {
        let (u, p) = mann_whitney_u(&[1.0, 1.0], &[1.0, 1.0]).unwrap();
        assert_approx_eq!(u, 2.0, 1e-12);
        assert_approx_eq!(p, 1.0, 1e-12);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        match statistical_test(&LOW, &HIGH, "anova") {
            Err(PipelineError::UnsupportedTest(kind)) => assert_eq!(kind, "anova"),
            other => panic!("expected UnsupportedTest, got {:?}", other),
        }
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(TestKind::MannWhitney.to_string(), "mannwhitney");
        assert_eq!("ttest".parse::<TestKind>().unwrap(), TestKind::TTest);
    }
}
