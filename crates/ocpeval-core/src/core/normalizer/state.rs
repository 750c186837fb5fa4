use super::NormalizerError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// In-memory form of a normalizer's statistics; always per-channel vectors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizerState {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

/// A persisted statistic. Older state files store plain scalars.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum PersistedValue {
    Scalar(f64),
    Tensor(Vec<f64>),
}

impl From<PersistedValue> for Vec<f64> {
    fn from(value: PersistedValue) -> Self {
        match value {
            PersistedValue::Scalar(v) => vec![v],
            PersistedValue::Tensor(v) => v,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct PersistedState {
    mean: PersistedValue,
    std: PersistedValue,
}

impl From<PersistedState> for NormalizerState {
    fn from(state: PersistedState) -> Self {
        if matches!(state.mean, PersistedValue::Scalar(_)) {
            debug!("Upgrading legacy scalar normalizer state to tensor form.");
        }
        Self {
            mean: state.mean.into(),
            std: state.std.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArchiveRow {
    mean: f64,
    std: f64,
}

impl NormalizerState {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<PersistedState>(content).map(Into::into)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// Reads a state file, trying the TOML state record first and the
    /// CSV archive (`mean,std` columns, one row per channel) second.
    pub fn load(path: &Path) -> Result<Self, NormalizerError> {
        let content = std::fs::read_to_string(path).map_err(|e| NormalizerError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        match Self::from_toml_str(&content) {
            Ok(state) => Ok(state),
            Err(toml_err) => {
                debug!(
                    "'{}' is not a TOML normalizer state ({}); trying CSV archive.",
                    path.display(),
                    toml_err.message()
                );
                Self::from_csv_str(&content).map_err(|e| NormalizerError::Csv {
                    path: path.to_string_lossy().to_string(),
                    source: e,
                })
            }
        }
    }

    fn from_csv_str(content: &str) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut state = Self {
            mean: Vec::new(),
            std: Vec::new(),
        };
        for result in reader.deserialize::<ArchiveRow>() {
            let row = result?;
            state.mean.push(row.mean);
            state.std.push(row.std);
        }
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<(), NormalizerError> {
        let content = self
            .to_toml_string()
            .map_err(|e| NormalizerError::Serialize(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| NormalizerError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }
}
