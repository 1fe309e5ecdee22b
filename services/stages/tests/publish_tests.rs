//! Notebook publishing with substitute converters.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use stages::{publish_notebooks, ConversionError, JupyterConverter, NotebookConverter};

/// Writes a page for every notebook except `b.ipynb`.
struct FailsOnB;

#[async_trait]
impl NotebookConverter for FailsOnB {
    async fn convert(
        &self,
        notebook: &Path,
        output_dir: &Path,
    ) -> Result<PathBuf, ConversionError> {
        if notebook.file_name().is_some_and(|n| n == "b.ipynb") {
            return Err(ConversionError::Failed {
                program: "fake".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "kernel died".to_string(),
            });
        }
        let page = stages::html_path(notebook, output_dir);
        std::fs::write(&page, "<html></html>").unwrap();
        Ok(page)
    }
}

fn notebooks(root: &Path, names: &[&str]) -> PathBuf {
    let dir = root.join("notebooks");
    std::fs::create_dir_all(&dir).unwrap();
    for name in names {
        std::fs::write(dir.join(name), "{}").unwrap();
    }
    dir
}

fn pages(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_failure_does_not_stop_batch() {
    let tmp = tempfile::tempdir().unwrap();
    let input = notebooks(tmp.path(), &["a.ipynb", "b.ipynb"]);
    let docs = tmp.path().join("docs");

    let report = publish_notebooks(&input, &docs, &FailsOnB).await.unwrap();

    assert_eq!(report.summary(), "1/2 converted");
    assert_eq!(report.converted, vec![docs.join("a.html")]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, input.join("b.ipynb"));
    assert!(report.failures[0].1.contains("kernel died"));
    assert_eq!(pages(&docs), vec!["a.html"]);
}

#[tokio::test]
async fn test_no_notebooks_still_creates_output() {
    let tmp = tempfile::tempdir().unwrap();
    let input = notebooks(tmp.path(), &[]);
    let docs = tmp.path().join("docs");

    let report = publish_notebooks(&input, &docs, &FailsOnB).await.unwrap();

    assert_eq!(report.total, 0);
    assert_eq!(report.summary(), "0/0 converted");
    assert!(docs.is_dir());
}

#[tokio::test]
async fn test_missing_program_is_a_per_file_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let input = notebooks(tmp.path(), &["a.ipynb"]);
    let converter = JupyterConverter::new("definitely-not-a-real-converter-binary");

    let report = publish_notebooks(&input, &tmp.path().join("docs"), &converter)
        .await
        .unwrap();

    assert!(report.converted.is_empty());
    assert!(report.failures[0].1.starts_with("Failed to start"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_jupyter_converter_runs_program() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempfile::tempdir().unwrap();
    let input = notebooks(tmp.path(), &["a.ipynb", "broken.ipynb"]);
    let docs = tmp.path().join("docs");

    // Stands in for `jupyter`: args are nbconvert --to html <nb> --output-dir <dir>
    let script = tmp.path().join("fake-jupyter");
    std::fs::write(
        &script,
        "#!/bin/sh\n\
         stem=$(basename \"$4\" .ipynb)\n\
         if [ \"$stem\" = broken ]; then echo \"bad notebook\" >&2; exit 3; fi\n\
         echo '<html></html>' > \"$6/$stem.html\"\n",
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let converter = JupyterConverter::new(script.to_string_lossy());
    let report = publish_notebooks(&input, &docs, &converter).await.unwrap();

    assert_eq!(report.summary(), "1/2 converted");
    assert_eq!(pages(&docs), vec!["a.html"]);
    assert!(report.failures[0].1.contains("bad notebook"));
}
