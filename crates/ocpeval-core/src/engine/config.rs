use super::registry::MetricFn;
use super::task::{MetricSpec, TargetMetrics, Task};
use crate::core::models::property::Property;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown task '{0}' and no explicit metric specification was given")]
    UnknownTask(String),

    #[error("Unknown metric function: '{0}'")]
    UnknownMetric(String),

    #[error("Unknown property: '{0}'")]
    UnknownProperty(String),

    #[error("Metric specification does not contain any metric")]
    EmptySpec,

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileTarget {
    property: String,
    metrics: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct FileEvaluatorConfig {
    task: Option<String>,
    primary_metric: Option<String>,
    #[serde(default)]
    targets: Vec<FileTarget>,
}

/// Evaluator settings as read from a TOML document.
///
/// ```toml
/// task = "s2ef"
///
/// [[targets]]
/// property = "energy"
/// metrics = ["energy_mae", "mse"]
/// ```
///
/// Every name is resolved while parsing, so an unknown metric or property
/// is reported before any batch is evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorConfig {
    pub task: Option<String>,
    pub spec: Option<MetricSpec>,
    pub primary_metric: Option<String>,
}

impl EvaluatorConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let file: FileEvaluatorConfig = toml::from_str(&content).map_err(|e| ConfigError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::resolve(file)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: FileEvaluatorConfig = toml::from_str(content).map_err(|e| ConfigError::Toml {
            path: "<string>".to_string(),
            source: e,
        })?;
        Self::resolve(file)
    }

    fn resolve(file: FileEvaluatorConfig) -> Result<Self, ConfigError> {
        let spec = if file.targets.is_empty() {
            None
        } else {
            let targets = file
                .targets
                .into_iter()
                .map(|t| {
                    let property = t
                        .property
                        .parse::<Property>()
                        .map_err(|e| ConfigError::UnknownProperty(e.0))?;
                    let metrics = t
                        .metrics
                        .iter()
                        .map(|m| m.parse::<MetricFn>())
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(TargetMetrics { property, metrics })
                })
                .collect::<Result<Vec<_>, ConfigError>>()?;
            Some(MetricSpec::new(targets)?)
        };

        if let Some(task) = &file.task {
            // Unknown task names are allowed only when a spec stands in for them.
            if task.parse::<Task>().is_err() && spec.is_none() {
                return Err(ConfigError::UnknownTask(task.clone()));
            }
        } else if spec.is_none() {
            return Err(ConfigError::EmptySpec);
        }

        Ok(Self {
            task: file.task,
            spec,
            primary_metric: file.primary_metric,
        })
    }
}
