//! Configuration loader for the pipeline stages.
//!
//! The configuration is a single YAML document read fresh by every stage.
//! It is kept as a nested mapping; stages pull the keys they need and fail
//! fast with [`PipelineError::MissingKey`] when one is absent.
//!
//! Supports environment variable substitution using `${VAR}` and
//! `${VAR:-default}` syntax.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pipeline_common::{PipelineError, PipelineResult};
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use tracing::debug;

/// A parsed configuration document.
#[derive(Debug, Clone)]
pub struct Config {
    root: Value,
    source: Option<PathBuf>,
}

impl Config {
    /// Load and parse a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PipelineError::ConfigNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut config = Self::from_yaml_str(&content)?;
        config.source = Some(path.to_path_buf());

        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse a configuration document held in memory.
    pub fn from_yaml_str(content: &str) -> PipelineResult<Self> {
        let expanded = expand_env_vars(content)?;

        let root: Value = serde_yaml::from_str(&expanded)
            .map_err(|e| PipelineError::ConfigParse(e.to_string()))?;

        match root {
            Value::Mapping(_) => Ok(Self { root, source: None }),
            Value::Null => Err(PipelineError::ConfigParse(
                "configuration document is empty".to_string(),
            )),
            _ => Err(PipelineError::ConfigParse(
                "top level of the configuration must be a mapping".to_string(),
            )),
        }
    }

    /// File the configuration was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// The whole document.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Look up a dotted key path such as `data.paths.raw`.
    pub fn get(&self, dotted: &str) -> Option<&Value> {
        dotted
            .split('.')
            .try_fold(&self.root, |node, key| node.get(key))
            .filter(|value| !value.is_null())
    }

    /// Like [`Config::get`], failing with `MissingKey` when absent.
    pub fn require(&self, dotted: &str) -> PipelineResult<&Value> {
        self.get(dotted)
            .ok_or_else(|| PipelineError::MissingKey(dotted.to_string()))
    }

    /// A required string value.
    pub fn require_str(&self, dotted: &str) -> PipelineResult<&str> {
        self.require(dotted)?
            .as_str()
            .ok_or_else(|| PipelineError::invalid_value(dotted, "expected a string"))
    }

    /// A required boolean value.
    pub fn require_bool(&self, dotted: &str) -> PipelineResult<bool> {
        self.require(dotted)?
            .as_bool()
            .ok_or_else(|| PipelineError::invalid_value(dotted, "expected true or false"))
    }

    /// Deserialize a required section into a typed struct.
    pub fn section<T: DeserializeOwned>(&self, dotted: &str) -> PipelineResult<T> {
        let value = self.require(dotted)?;
        serde_yaml::from_value(value.clone())
            .map_err(|e| PipelineError::invalid_value(dotted, e.to_string()))
    }

    /// Deserialize an optional section, falling back to `T::default()`.
    pub fn section_or_default<T: DeserializeOwned + Default>(
        &self,
        dotted: &str,
    ) -> PipelineResult<T> {
        match self.get(dotted) {
            Some(value) => serde_yaml::from_value(value.clone())
                .map_err(|e| PipelineError::invalid_value(dotted, e.to_string())),
            None => Ok(T::default()),
        }
    }

    /// The `data.sources` mapping of source name to URL.
    pub fn sources(&self) -> PipelineResult<BTreeMap<String, String>> {
        self.section_or_default("data.sources")
    }

    /// URL of a named data source.
    pub fn source_url(&self, name: &str) -> PipelineResult<&str> {
        self.require_str(&format!("data.sources.{}", name))
    }
}

// ----------------------------------------------------------------------------
// ${VAR} substitution
// ----------------------------------------------------------------------------

/// Substitute `${VAR}` and `${VAR:-default}` in every line of a YAML
/// document. Comments are copied untouched, so documentation that mentions
/// the syntax never needs the variable to exist.
fn expand_env_vars(content: &str) -> PipelineResult<String> {
    let mut out = String::with_capacity(content.len());
    for (idx, line) in content.split_inclusive('\n').enumerate() {
        let (code, comment) = line.split_at(comment_start(line));
        out.push_str(&substitute_line(code, idx + 1)?);
        out.push_str(comment);
    }
    Ok(out)
}

/// Byte offset of the YAML comment on `line`, or its length when it has
/// none. A `#` starts a comment only outside quoted scalars and at the
/// start of the line or after whitespace.
fn comment_start(line: &str) -> usize {
    let mut quote: Option<char> = None;
    let mut prev = ' ';
    for (pos, ch) in line.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') if prev.is_whitespace() || matches!(prev, '[' | '{' | ',') => {
                quote = Some(ch)
            }
            (None, '#') if prev.is_whitespace() => return pos,
            _ => {}
        }
        prev = ch;
    }
    line.len()
}

fn substitute_line(code: &str, line_no: usize) -> PipelineResult<String> {
    let mut out = String::with_capacity(code.len());
    let mut rest = code;
    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let close = after.find('}').ok_or_else(|| {
            PipelineError::ConfigParse(format!(
                "line {}: unclosed variable substitution '{}'",
                line_no,
                rest[open..].trim_end()
            ))
        })?;
        out.push_str(&resolve_var_expr(&after[..close])?);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Value of `NAME` or `NAME:-default`. A set but empty variable falls back
/// to the default.
fn resolve_var_expr(expr: &str) -> PipelineResult<String> {
    let (name, default) = match expr.split_once(":-") {
        Some((name, default)) => (name.trim(), Some(default)),
        None => (expr.trim(), None),
    };
    match (std::env::var(name).ok(), default) {
        (Some(value), None) => Ok(value),
        (Some(value), Some(_)) if !value.is_empty() => Ok(value),
        (_, Some(default)) => Ok(default.to_string()),
        (None, None) => Err(PipelineError::ConfigParse(format!(
            "environment variable {} not set",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
data:
  sources:
    marine_regions: "https://geo.vliz.be/geoserver/MarineRegions/wfs"
  paths:
    raw: data/raw
    processed: data/processed
plotting:
  figsize: [10, 6]
  save_figures: true
"#;

    #[test]
    fn test_get_nested() {
        let config = Config::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(
            config.get("data.paths.raw").and_then(Value::as_str),
            Some("data/raw")
        );
        assert!(config.get("data.paths.figures").is_none());
        assert!(config.get("data.paths.raw.deeper").is_none());
    }

    #[test]
    fn test_require_missing_key() {
        let config = Config::from_yaml_str(SAMPLE).unwrap();
        match config.require_str("data.paths.figures") {
            Err(PipelineError::MissingKey(key)) => assert_eq!(key, "data.paths.figures"),
            other => panic!("expected MissingKey, got {:?}", other),
        }
    }

    #[test]
    fn test_require_wrong_type() {
        let config = Config::from_yaml_str(SAMPLE).unwrap();
        assert!(matches!(
            config.require_str("plotting.figsize"),
            Err(PipelineError::InvalidValue { .. })
        ));
        assert!(config.require_bool("plotting.save_figures").unwrap());
    }

    #[test]
    fn test_null_value_counts_as_missing() {
        let config = Config::from_yaml_str("data:\n  paths:\n    raw: ~\n").unwrap();
        assert!(matches!(
            config.require("data.paths.raw"),
            Err(PipelineError::MissingKey(_))
        ));
    }

    #[test]
    fn test_sources() {
        let config = Config::from_yaml_str(SAMPLE).unwrap();
        let sources = config.sources().unwrap();
        assert_eq!(sources.len(), 1);
        assert!(config.source_url("marine_regions").unwrap().ends_with("/wfs"));
    }

    #[test]
    fn test_malformed_document() {
        let err = Config::from_yaml_str("data: [unclosed").unwrap_err();
        assert!(matches!(err, PipelineError::ConfigParse(_)));
    }

    #[test]
    fn test_scalar_document_rejected() {
        let err = Config::from_yaml_str("just a string").unwrap_err();
        assert!(matches!(err, PipelineError::ConfigParse(_)));
    }

    #[test]
    fn test_empty_document_rejected() {
        let err = Config::from_yaml_str("").unwrap_err();
        assert!(matches!(err, PipelineError::ConfigParse(_)));
    }

    #[test]
    fn test_expand_env_vars_simple() {
        std::env::set_var("PIPELINE_TEST_VAR", "test_value");
        let result = expand_env_vars("prefix_${PIPELINE_TEST_VAR}_suffix").unwrap();
        assert_eq!(result, "prefix_test_value_suffix");
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        std::env::remove_var("PIPELINE_NONEXISTENT_VAR");
        let result = expand_env_vars("value_${PIPELINE_NONEXISTENT_VAR:-default}_end").unwrap();
        assert_eq!(result, "value_default_end");
    }

    #[test]
    fn test_expand_env_vars_missing_required() {
        std::env::remove_var("PIPELINE_REQUIRED_VAR");
        let result = expand_env_vars("${PIPELINE_REQUIRED_VAR}");
        assert!(matches!(result, Err(PipelineError::ConfigParse(_))));
    }

    #[test]
    fn test_expand_env_vars_unclosed() {
        assert!(expand_env_vars("raw: ${DATA_DIR").is_err());
    }

    #[test]
    fn test_resolve_var_expr_override_default() {
        std::env::set_var("PIPELINE_SET_VAR", "custom");
        let result = resolve_var_expr("PIPELINE_SET_VAR:-default").unwrap();
        assert_eq!(result, "custom");
    }

    #[test]
    fn test_comments_are_not_expanded() {
        std::env::remove_var("PIPELINE_DOC_ONLY_VAR");
        let yaml = "# set ${PIPELINE_DOC_ONLY_VAR} to override\n\
                    data:\n\
                    \x20 paths:\n\
                    \x20   raw: data/raw  # or ${PIPELINE_DOC_ONLY_VAR:-x}\n";
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.require_str("data.paths.raw").unwrap(), "data/raw");
    }

    #[test]
    fn test_hash_inside_values_is_kept() {
        std::env::set_var("PIPELINE_HASH_VAR", "frag");
        let line = "url: \"http://host/a # b/${PIPELINE_HASH_VAR}\" # ${PIPELINE_HASH_UNSET}\n";
        assert_eq!(
            expand_env_vars(line).unwrap(),
            "url: \"http://host/a # b/frag\" # ${PIPELINE_HASH_UNSET}\n"
        );
        assert_eq!(
            expand_env_vars("id: a#${PIPELINE_HASH_VAR}\n").unwrap(),
            "id: a#frag\n"
        );
        assert_eq!(
            expand_env_vars("title: Monterey's bay # ${PIPELINE_HASH_UNSET}\n").unwrap(),
            "title: Monterey's bay # ${PIPELINE_HASH_UNSET}\n"
        );
    }

    #[test]
    fn test_unclosed_reports_line() {
        match expand_env_vars("data:\n  raw: ${DATA_DIR\n") {
            Err(PipelineError::ConfigParse(msg)) => assert!(msg.starts_with("line 2:"), "{}", msg),
            other => panic!("expected ConfigParse, got {:?}", other),
        }
    }
}
