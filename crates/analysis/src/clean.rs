//! Table cleaning.

use std::collections::HashSet;

use pipeline_common::{PipelineError, PipelineResult};
use pipeline_config::CleaningConfig;
use tracing::info;

use crate::stats::population_std;
use crate::table::{Cell, Table, Unimplemented};

/// Turns a raw table into an analysis-ready one.
pub trait Cleaner {
    fn clean(&self, table: Table) -> PipelineResult<Table>;
}

impl Cleaner for Unimplemented {
    fn clean(&self, _table: Table) -> PipelineResult<Table> {
        Err(PipelineError::NotImplemented("clean".to_string()))
    }
}

/// Coercion, de-duplication, missing-row removal and z-score outlier
/// removal, in that order. Each step can be switched off.
#[derive(Debug, Clone)]
pub struct StandardCleaner {
    options: CleaningConfig,
}

impl StandardCleaner {
    pub fn new(options: CleaningConfig) -> Self {
        Self { options }
    }
}

impl Default for StandardCleaner {
    fn default() -> Self {
        Self::new(CleaningConfig::default())
    }
}

impl Cleaner for StandardCleaner {
    fn clean(&self, mut table: Table) -> PipelineResult<Table> {
        let rows_in = table.n_rows();

        let coerced = if self.options.coerce_numeric {
            coerce_numeric(&mut table)
        } else {
            0
        };

        let duplicates = if self.options.drop_duplicates {
            drop_duplicates(&mut table)
        } else {
            0
        };

        let incomplete = if self.options.drop_missing {
            drop_missing(&mut table)
        } else {
            0
        };

        let outliers = match self.options.outlier_zscore {
            Some(threshold) if threshold > 0.0 => drop_outliers(&mut table, threshold),
            Some(threshold) => {
                return Err(PipelineError::invalid_value(
                    "preprocess.cleaning.outlier_zscore",
                    format!("must be positive, got {}", threshold),
                ))
            }
            None => 0,
        };

        info!(
            rows_in,
            rows_out = table.n_rows(),
            coerced_columns = coerced,
            duplicates,
            incomplete,
            outliers,
            "Cleaned table"
        );

        Ok(table)
    }
}

/// Convert text columns whose every non-missing cell reads as a number.
/// Returns the number of columns converted.
fn coerce_numeric(table: &mut Table) -> usize {
    let convertible: Vec<usize> = (0..table.n_columns())
        .filter(|&i| {
            let mut has_text = false;
            let all_numeric = table.column(i).all(|cell| match cell {
                Cell::Text(_) => {
                    has_text = true;
                    cell.coerce_number().is_some()
                }
                _ => true,
            });
            has_text && all_numeric
        })
        .collect();

    for row in table.rows_mut() {
        for &i in &convertible {
            if let Some(v) = row[i].coerce_number() {
                row[i] = Cell::Number(v);
            }
        }
    }

    convertible.len()
}

/// Drop rows identical to an earlier row. Returns how many were dropped.
fn drop_duplicates(table: &mut Table) -> usize {
    let before = table.n_rows();
    let mut seen = HashSet::new();
    table.retain_rows(|row| seen.insert(row_key(row)));
    before - table.n_rows()
}

fn row_key(row: &[Cell]) -> Vec<String> {
    row.iter()
        .map(|cell| match cell {
            Cell::Missing => "\u{0}".to_string(),
            Cell::Number(v) => format!("n{}", v.to_bits()),
            Cell::Text(s) => format!("t{}", s),
        })
        .collect()
}

fn drop_missing(table: &mut Table) -> usize {
    let before = table.n_rows();
    table.retain_rows(|row| !row.iter().any(Cell::is_missing));
    before - table.n_rows()
}

/// Drop rows where any numeric column lies more than `threshold`
/// population standard deviations from that column's mean. Constant
/// columns never flag a row.
fn drop_outliers(table: &mut Table, threshold: f64) -> usize {
    let moments: Vec<(usize, f64, f64)> = (0..table.n_columns())
        .filter(|&i| table.is_numeric_column(i))
        .filter_map(|i| {
            let values: Vec<f64> = table.column(i).filter_map(Cell::as_number).collect();
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let std = population_std(&values)?;
            (std > 0.0).then_some((i, mean, std))
        })
        .collect();

    let before = table.n_rows();
    table.retain_rows(|row| {
        moments.iter().all(|&(i, mean, std)| match row[i] {
            Cell::Number(v) => ((v - mean) / std).abs() <= threshold,
            _ => true,
        })
    });
    before - table.n_rows()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[Cell]]) -> Table {
        let mut t = Table::new(["name", "value"]);
        for row in rows {
            t.push_row(row.to_vec()).unwrap();
        }
        t
    }

    #[test]
    fn test_coerce_only_fully_numeric_text() {
        let mut t = Table::new(["a", "b"]);
        t.push_row(vec![Cell::parse(" 1"), Cell::parse("x")]).unwrap();
        t.push_row(vec![Cell::parse("2"), Cell::parse(" 3")]).unwrap();

        assert_eq!(coerce_numeric(&mut t), 1);
        assert_eq!(t.rows()[0][0], Cell::Number(1.0));
        assert_eq!(t.rows()[1][1], Cell::Text(" 3".to_string()));
    }

    #[test]
    fn test_drop_duplicates_keeps_first() {
        let mut t = table(&[
            &["a".into(), 1.0.into()],
            &["a".into(), 1.0.into()],
            &["b".into(), 1.0.into()],
        ]);
        assert_eq!(drop_duplicates(&mut t), 1);
        assert_eq!(t.n_rows(), 2);
    }

    #[test]
    fn test_drop_missing() {
        let mut t = table(&[&["a".into(), Cell::Missing], &["b".into(), 2.0.into()]]);
        assert_eq!(drop_missing(&mut t), 1);
        assert_eq!(t.rows()[0][0], Cell::Text("b".to_string()));
    }

    #[test]
    fn test_outlier_removed() {
        let mut rows: Vec<Vec<Cell>> = (0..9)
            .map(|i| vec!["x".into(), (10.0 + (i % 3) as f64).into()])
            .collect();
        rows.push(vec!["y".into(), 100.0.into()]);
        let mut t = Table::new(["name", "value"]);
        for row in rows {
            t.push_row(row).unwrap();
        }

        assert_eq!(drop_outliers(&mut t, 2.5), 1);
        assert!(t.rows().iter().all(|r| r[1] != Cell::Number(100.0)));
    }

    #[test]
    fn test_constant_column_never_flags() {
        let mut t = table(&[&["a".into(), 5.0.into()], &["b".into(), 5.0.into()]]);
        assert_eq!(drop_outliers(&mut t, 0.1), 0);
    }

    #[test]
    fn test_non_positive_threshold_rejected() {
        let cleaner = StandardCleaner::new(CleaningConfig {
            outlier_zscore: Some(0.0),
            ..CleaningConfig::default()
        });
        assert!(matches!(
            cleaner.clean(Table::new(["a"])),
            Err(PipelineError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_unimplemented_cleaner() {
        match Unimplemented.clean(Table::default()) {
            Err(PipelineError::NotImplemented(op)) => assert_eq!(op, "clean"),
            other => panic!("expected NotImplemented, got {:?}", other),
        }
    }
}
