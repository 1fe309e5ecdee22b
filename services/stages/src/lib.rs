//! Shared plumbing for the pipeline's stage programs.
//!
//! - [`cli`]: the flags every binary accepts, logging setup and config bootstrap
//! - [`publish`]: batch notebook-to-HTML conversion

pub mod cli;
pub mod publish;

pub use cli::{bootstrap, init_logging, parse_level, CommonArgs, LogFormat, LogSettings};
pub use publish::{
    find_notebooks, html_path, publish_notebooks, ConversionError, JupyterConverter,
    NotebookConverter, PublishReport,
};
