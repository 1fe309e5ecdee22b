//! Descriptive statistics.

use pipeline_common::{PipelineError, PipelineResult};

use crate::table::{Cell, Table};

/// Row labels of a summary table, in order.
pub const SUMMARY_ROWS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Standard deviation with `ddof` delta degrees of freedom.
fn std_with_ddof(values: &[f64], ddof: usize) -> Option<f64> {
    let m = mean(values)?;
    let n = values.len();
    if n <= ddof {
        return None;
    }
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (n - ddof) as f64).sqrt())
}

/// Population standard deviation (divides by n).
pub fn population_std(values: &[f64]) -> Option<f64> {
    std_with_ddof(values, 0)
}

/// Sample standard deviation (divides by n - 1).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    std_with_ddof(values, 1)
}

/// Linearly interpolated quantile of already sorted values.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Summary of one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; NaN for a single value.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl ColumnSummary {
    /// Summarise `values`; None when there are no values.
    pub fn from_values(column: impl Into<String>, values: &[f64]) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        Some(Self {
            column: column.into(),
            count: sorted.len(),
            mean: mean(&sorted)?,
            std: sample_std(&sorted).unwrap_or(f64::NAN),
            min: *sorted.first()?,
            q25: quantile_sorted(&sorted, 0.25)?,
            median: quantile_sorted(&sorted, 0.5)?,
            q75: quantile_sorted(&sorted, 0.75)?,
            max: *sorted.last()?,
        })
    }

    /// Values in [`SUMMARY_ROWS`] order.
    pub fn values(&self) -> [f64; 8] {
        [
            self.count as f64,
            self.mean,
            self.std,
            self.min,
            self.q25,
            self.median,
            self.q75,
            self.max,
        ]
    }
}

/// Summaries for the named columns, or every numeric column when `columns`
/// is None.
pub fn summarize(table: &Table, columns: Option<&[String]>) -> PipelineResult<Vec<ColumnSummary>> {
    let names: Vec<String> = match columns {
        Some(cols) => cols.to_vec(),
        None => table.numeric_columns().into_iter().map(String::from).collect(),
    };

    names
        .iter()
        .map(|name| {
            let values = table.numeric_values(name, "analysis.columns")?;
            ColumnSummary::from_values(name.as_str(), &values).ok_or_else(|| {
                PipelineError::invalid_value(
                    "analysis.columns",
                    format!("column '{}' has no values", name),
                )
            })
        })
        .collect()
}

/// Lay summaries out with one row per statistic and one column per input
/// column, headed by a `statistic` label column.
pub fn summary_table(summaries: &[ColumnSummary]) -> PipelineResult<Table> {
    let mut table = Table::new(
        std::iter::once("statistic".to_string()).chain(summaries.iter().map(|s| s.column.clone())),
    );

    for (row_index, label) in SUMMARY_ROWS.iter().enumerate() {
        let mut row = vec![Cell::from(*label)];
        row.extend(summaries.iter().map(|s| {
            let v = s.values()[row_index];
            if v.is_nan() {
                Cell::Missing
            } else {
                Cell::Number(v)
            }
        }));
        table.push_row(row)?;
    }

    Ok(table)
}

/// Mean and population standard deviation of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasicAnalysis {
    pub mean: f64,
    pub std: f64,
}

pub fn basic_analysis(values: &[f64]) -> PipelineResult<BasicAnalysis> {
    match (mean(values), population_std(values)) {
        (Some(mean), Some(std)) => Ok(BasicAnalysis { mean, std }),
        _ => Err(PipelineError::DataRead(
            "basic analysis needs at least one value".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_std_variants() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_approx_eq!(population_std(&v).unwrap(), 2.0, 1e-12);
        assert_approx_eq!(sample_std(&v).unwrap(), 2.138089935299395, 1e-12);
        assert!(sample_std(&[1.0]).is_none());
        assert!(population_std(&[]).is_none());
    }

    #[test]
    fn test_quantiles_interpolate() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_approx_eq!(quantile_sorted(&sorted, 0.25).unwrap(), 1.75, 1e-12);
        assert_approx_eq!(quantile_sorted(&sorted, 0.5).unwrap(), 2.5, 1e-12);
        assert_approx_eq!(quantile_sorted(&sorted, 0.75).unwrap(), 3.25, 1e-12);
        assert_eq!(quantile_sorted(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile_sorted(&sorted, 1.0), Some(4.0));
    }

    #[test]
    fn test_column_summary() {
        let s = ColumnSummary::from_values("x", &[5.0, 1.0, 3.0, 2.0, 4.0]).unwrap();
        assert_eq!(s.count, 5);
        assert_approx_eq!(s.mean, 3.0, 1e-12);
        assert_approx_eq!(s.std, 1.5811388300841898, 1e-12);
        assert_eq!((s.min, s.q25, s.median, s.q75, s.max), (1.0, 2.0, 3.0, 4.0, 5.0));
    }

    #[test]
    fn test_single_value_has_nan_std() {
        let s = ColumnSummary::from_values("x", &[7.0]).unwrap();
        assert!(s.std.is_nan());

        let table = summary_table(&[s]).unwrap();
        assert_eq!(table.rows()[2][1], Cell::Missing);
    }

    #[test]
    fn test_summary_table_layout() {
        let a = ColumnSummary::from_values("a", &[1.0, 2.0]).unwrap();
        let b = ColumnSummary::from_values("b", &[3.0, 4.0]).unwrap();
        let table = summary_table(&[a, b]).unwrap();

        assert_eq!(table.columns(), &["statistic", "a", "b"]);
        assert_eq!(table.n_rows(), 8);
        assert_eq!(table.rows()[0][0], Cell::Text("count".to_string()));
        assert_eq!(table.rows()[1][2], Cell::Number(3.5));
    }

    #[test]
    fn test_basic_analysis() {
        let result = basic_analysis(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_approx_eq!(result.mean, 2.5, 1e-12);
        assert_approx_eq!(result.std, 1.118033988749895, 1e-12);
        assert!(basic_analysis(&[]).is_err());
    }
}
