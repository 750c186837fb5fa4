//! # Normalizer Module
//!
//! Affine rescaling of regression targets: `norm(x) = (x - mean) / std` and
//! its inverse `denorm(y) = y * std + mean`.
//!
//! Statistics are stored as per-channel vectors. A single-element vector acts
//! as a scalar and applies to every element; otherwise its length must match
//! the number of columns of the tensor being transformed.
//!
//! A [`Normalizer`] is immutable once built. It can be created from a persisted
//! state file (see [`state`]), from explicit statistics, or fitted to a sample
//! tensor; [`NormalizerBuilder`] picks among these sources.

pub mod state;

use nalgebra::{DMatrix, DVector};
use state::NormalizerState;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum NormalizerError {
    #[error("Normalizer configuration error: {0}")]
    Config(&'static str),

    #[error("Standard deviation must be finite and non-zero (channel {channel} is {value})")]
    ZeroStd { channel: usize, value: f64 },

    #[error("Mean has {mean} channel(s) but std has {std}")]
    LengthMismatch { mean: usize, std: usize },

    #[error("Cannot apply {channels}-channel statistics to a tensor with {columns} column(s)")]
    ShapeMismatch { channels: usize, columns: usize },

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },

    #[error("Failed to serialize normalizer state: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalizer {
    mean: DVector<f64>,
    std: DVector<f64>,
}

impl Normalizer {
    pub fn new(mean: DVector<f64>, std: DVector<f64>) -> Result<Self, NormalizerError> {
        if mean.len() != std.len() {
            return Err(NormalizerError::LengthMismatch {
                mean: mean.len(),
                std: std.len(),
            });
        }
        if mean.is_empty() {
            return Err(NormalizerError::Config("mean and std must not be empty"));
        }
        if let Some((channel, &value)) = std
            .iter()
            .enumerate()
            .find(|(_, s)| **s == 0.0 || !s.is_finite())
        {
            return Err(NormalizerError::ZeroStd { channel, value });
        }
        Ok(Self { mean, std })
    }

    pub fn from_scalars(mean: f64, std: f64) -> Result<Self, NormalizerError> {
        Self::new(DVector::from_element(1, mean), DVector::from_element(1, std))
    }

    /// Fits per-column statistics along the leading axis of `samples`,
    /// using the unbiased (n - 1) standard deviation.
    pub fn from_samples(samples: &DMatrix<f64>) -> Result<Self, NormalizerError> {
        let n = samples.nrows();
        if n < 2 {
            return Err(NormalizerError::Config(
                "at least two samples are needed to estimate a standard deviation",
            ));
        }
        let mean = samples.row_mean().transpose();
        let std = DVector::from_iterator(
            samples.ncols(),
            samples.column_iter().zip(mean.iter()).map(|(column, &mu)| {
                let ss: f64 = column.iter().map(|x| (x - mu).powi(2)).sum();
                (ss / (n - 1) as f64).sqrt()
            }),
        );
        debug!(
            "Fitted normalizer over {} samples and {} channel(s).",
            n,
            samples.ncols()
        );
        Self::new(mean, std)
    }

    pub fn from_state(state: NormalizerState) -> Result<Self, NormalizerError> {
        Self::new(DVector::from_vec(state.mean), DVector::from_vec(state.std))
    }

    pub fn load(path: &Path) -> Result<Self, NormalizerError> {
        Self::from_state(NormalizerState::load(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), NormalizerError> {
        self.state().save(path)
    }

    pub fn state(&self) -> NormalizerState {
        NormalizerState {
            mean: self.mean.iter().copied().collect(),
            std: self.std.iter().copied().collect(),
        }
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn std(&self) -> &DVector<f64> {
        &self.std
    }

    pub fn channels(&self) -> usize {
        self.mean.len()
    }

    pub fn norm(&self, tensor: &DMatrix<f64>) -> Result<DMatrix<f64>, NormalizerError> {
        self.apply(tensor, |x, mean, std| (x - mean) / std)
    }

    pub fn denorm(&self, normed: &DMatrix<f64>) -> Result<DMatrix<f64>, NormalizerError> {
        self.apply(normed, |y, mean, std| y * std + mean)
    }

    /// Model-output direction: maps normalized predictions back to physical units.
    pub fn forward(&self, normed: &DMatrix<f64>) -> Result<DMatrix<f64>, NormalizerError> {
        self.denorm(normed)
    }

    pub fn norm_scalar(&self, value: f64) -> Result<f64, NormalizerError> {
        let (mean, std) = self.scalar_stats()?;
        Ok((value - mean) / std)
    }

    pub fn denorm_scalar(&self, value: f64) -> Result<f64, NormalizerError> {
        let (mean, std) = self.scalar_stats()?;
        Ok(value * std + mean)
    }

    fn scalar_stats(&self) -> Result<(f64, f64), NormalizerError> {
        if self.channels() != 1 {
            return Err(NormalizerError::ShapeMismatch {
                channels: self.channels(),
                columns: 1,
            });
        }
        Ok((self.mean[0], self.std[0]))
    }

    fn apply<F>(&self, tensor: &DMatrix<f64>, f: F) -> Result<DMatrix<f64>, NormalizerError>
    where
        F: Fn(f64, f64, f64) -> f64,
    {
        let channels = self.channels();
        if channels != 1 && channels != tensor.ncols() {
            return Err(NormalizerError::ShapeMismatch {
                channels,
                columns: tensor.ncols(),
            });
        }
        Ok(DMatrix::from_fn(tensor.nrows(), tensor.ncols(), |i, j| {
            let c = if channels == 1 { 0 } else { j };
            f(tensor[(i, j)], self.mean[c], self.std[c])
        }))
    }
}

/// Chooses a construction path for a [`Normalizer`].
///
/// Precedence: a state file, then an in-memory state, then explicit
/// `mean`/`std`, then fitting to `samples`.
#[derive(Debug, Default, Clone)]
pub struct NormalizerBuilder {
    file: Option<PathBuf>,
    state: Option<NormalizerState>,
    mean: Option<DVector<f64>>,
    std: Option<DVector<f64>>,
    samples: Option<DMatrix<f64>>,
}

impl NormalizerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: PathBuf) -> Self {
        self.file = Some(path);
        self
    }
    pub fn state(mut self, state: NormalizerState) -> Self {
        self.state = Some(state);
        self
    }
    pub fn mean(mut self, mean: DVector<f64>) -> Self {
        self.mean = Some(mean);
        self
    }
    pub fn std(mut self, std: DVector<f64>) -> Self {
        self.std = Some(std);
        self
    }
    pub fn samples(mut self, samples: DMatrix<f64>) -> Self {
        self.samples = Some(samples);
        self
    }

    pub fn build(self) -> Result<Normalizer, NormalizerError> {
        if let Some(path) = self.file {
            debug!("Loading normalizer state from {:?}", path);
            return Normalizer::load(&path);
        }
        if let Some(state) = self.state {
            return Normalizer::from_state(state);
        }
        match (self.mean, self.std, self.samples) {
            (Some(mean), Some(std), _) => Normalizer::new(mean, std),
            (_, _, Some(samples)) => Normalizer::from_samples(&samples),
            _ => Err(NormalizerError::Config(
                "one of a state file, a state, mean and std, or a sample tensor must be given",
            )),
        }
    }
}
