//! Tabular side of the pipeline: loading and saving tables, cleaning them,
//! and the statistics the analysis stage reports.
//!
//! # Modules
//!
//! - [`table`]: `Table`, `Cell`, and the `TableSource`/`TableSink` formats
//! - [`clean`]: the `Cleaner` trait and `StandardCleaner`
//! - [`stats`]: describe-style summaries and basic moments
//! - [`compare`]: two-sample `ttest` and `mannwhitney`
//! - [`stage`]: the preprocess and analyze stage bodies

pub mod clean;
pub mod compare;
pub mod stage;
pub mod stats;
pub mod table;

pub use clean::{Cleaner, StandardCleaner};
pub use compare::{statistical_test, ComparisonResult, TestKind};
pub use stage::{
    compare_groups, run_analysis, run_preprocess, AnalysisReport, PreprocessReport, RESULTS_FILE,
    SUMMARY_FILE,
};
pub use stats::{basic_analysis, summarize, summary_table, BasicAnalysis, ColumnSummary};
pub use table::{
    select_format, Cell, CsvFormat, Table, TableFormat, TableSink, TableSource, Unimplemented,
};
