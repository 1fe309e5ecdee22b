//! Batch conversion of notebooks to static HTML.
//!
//! Each notebook is converted independently. A failed conversion is logged
//! and counted; it never stops the batch.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pipeline_common::PipelineResult;
use thiserror::Error;
use tokio::process::Command;
use tracing::{error, info, instrument};

const NOTEBOOK_EXTENSION: &str = "ipynb";

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Converts one notebook into an HTML page inside `output_dir`.
#[async_trait]
pub trait NotebookConverter: Send + Sync {
    /// Returns the path of the written page.
    async fn convert(&self, notebook: &Path, output_dir: &Path) -> Result<PathBuf, ConversionError>;
}

/// Runs `<program> nbconvert --to html <notebook> --output-dir <dir>`.
#[derive(Debug, Clone)]
pub struct JupyterConverter {
    program: String,
}

impl JupyterConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, notebook: &Path, output_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("nbconvert")
            .args(["--to", "html"])
            .arg(notebook)
            .arg("--output-dir")
            .arg(output_dir);
        cmd
    }
}

impl Default for JupyterConverter {
    fn default() -> Self {
        Self::new("jupyter")
    }
}

#[async_trait]
impl NotebookConverter for JupyterConverter {
    async fn convert(
        &self,
        notebook: &Path,
        output_dir: &Path,
    ) -> Result<PathBuf, ConversionError> {
        let output = self
            .command(notebook, output_dir)
            .output()
            .await
            .map_err(|source| ConversionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(html_path(notebook, output_dir))
        } else {
            Err(ConversionError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// Where the converter puts the page for `notebook`.
pub fn html_path(notebook: &Path, output_dir: &Path) -> PathBuf {
    let stem = notebook.file_stem().unwrap_or_default().to_string_lossy();
    output_dir.join(format!("{}.html", stem))
}

/// Notebooks directly inside `dir`, sorted by name. A missing directory
/// has no notebooks.
pub async fn find_notebooks(dir: &Path) -> PipelineResult<Vec<PathBuf>> {
    if !tokio::fs::try_exists(dir).await? {
        return Ok(Vec::new());
    }

    let mut notebooks = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_notebook = path.extension().is_some_and(|ext| ext == NOTEBOOK_EXTENSION);
        if is_notebook && entry.file_type().await?.is_file() {
            notebooks.push(path);
        }
    }
    notebooks.sort();
    Ok(notebooks)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishReport {
    pub total: usize,
    pub converted: Vec<PathBuf>,
    /// `(notebook, reason)` for each conversion that failed.
    pub failures: Vec<(PathBuf, String)>,
}

impl PublishReport {
    pub fn summary(&self) -> String {
        format!("{}/{} converted", self.converted.len(), self.total)
    }
}

/// Convert every notebook in `notebooks_dir` into `output_dir`.
///
/// `output_dir` is created first. Only I/O errors while listing or
/// creating directories fail the call.
#[instrument(
    skip(converter),
    fields(notebooks_dir = %notebooks_dir.display(), output_dir = %output_dir.display())
)]
pub async fn publish_notebooks(
    notebooks_dir: &Path,
    output_dir: &Path,
    converter: &dyn NotebookConverter,
) -> PipelineResult<PublishReport> {
    tokio::fs::create_dir_all(output_dir).await?;

    let notebooks = find_notebooks(notebooks_dir).await?;
    if notebooks.is_empty() {
        info!("No notebooks found");
        return Ok(PublishReport::default());
    }
    info!(count = notebooks.len(), "Found notebooks");

    let mut report = PublishReport {
        total: notebooks.len(),
        ..PublishReport::default()
    };

    for notebook in notebooks {
        match converter.convert(&notebook, output_dir).await {
            Ok(page) => {
                info!(notebook = %notebook.display(), page = %page.display(), "Converted");
                report.converted.push(page);
            }
            Err(e) => {
                error!(notebook = %notebook.display(), error = %e, "Conversion failed");
                report.failures.push((notebook, e.to_string()));
            }
        }
    }

    info!(
        converted = report.converted.len(),
        total = report.total,
        "{}",
        report.summary()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_path_uses_stem() {
        assert_eq!(
            html_path(Path::new("notebooks/01_overview.ipynb"), Path::new("docs")),
            PathBuf::from("docs/01_overview.html")
        );
    }

    #[test]
    fn test_command_line() {
        let cmd = JupyterConverter::default().command(Path::new("nb/a.ipynb"), Path::new("docs"));
        let std = cmd.as_std();
        assert_eq!(std.get_program(), "jupyter");
        let args: Vec<_> = std.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec!["nbconvert", "--to", "html", "nb/a.ipynb", "--output-dir", "docs"]
        );
    }

    #[tokio::test]
    async fn test_find_notebooks_sorted_and_flat() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["b.ipynb", "a.ipynb", "notes.md"] {
            std::fs::write(tmp.path().join(name), "{}").unwrap();
        }
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        std::fs::write(tmp.path().join("nested/c.ipynb"), "{}").unwrap();

        let found = find_notebooks(tmp.path()).await.unwrap();
        assert_eq!(
            found,
            vec![tmp.path().join("a.ipynb"), tmp.path().join("b.ipynb")]
        );

        assert!(find_notebooks(&tmp.path().join("missing"))
            .await
            .unwrap()
            .is_empty());
    }
}
