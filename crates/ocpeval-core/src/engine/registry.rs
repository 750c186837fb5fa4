use super::config::ConfigError;
use super::error::EvalError;
use super::metrics::{self, ErrorKind};
use super::record::MetricRecord;
use crate::core::models::batch::Batch;
use crate::core::models::property::Property;
use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;

/// Every metric the evaluator can compute.
///
/// The generic variants (`Mae`, `Mse`, `CosineSimilarity`, `MagnitudeError`)
/// operate on the property they are attached to; the remaining variants name
/// their own inputs and ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricFn {
    Mae,
    Mse,
    CosineSimilarity,
    MagnitudeError,
    EnergyMae,
    EnergyMse,
    ForcesxMae,
    ForcesxMse,
    ForcesyMae,
    ForcesyMse,
    ForceszMae,
    ForceszMse,
    ForcesMae,
    ForcesMse,
    ForcesCos,
    ForcesMagnitude,
    PositionsMae,
    PositionsMse,
    EnergyForceWithinThreshold,
    EnergyWithinThreshold,
    AverageDistanceWithinThreshold,
    StressMae,
}

static METRIC_FNS: Map<&'static str, MetricFn> = phf_map! {
    "mae" => MetricFn::Mae,
    "mse" => MetricFn::Mse,
    "cosine_similarity" => MetricFn::CosineSimilarity,
    "magnitude_error" => MetricFn::MagnitudeError,
    "energy_mae" => MetricFn::EnergyMae,
    "energy_mse" => MetricFn::EnergyMse,
    "forcesx_mae" => MetricFn::ForcesxMae,
    "forcesx_mse" => MetricFn::ForcesxMse,
    "forcesy_mae" => MetricFn::ForcesyMae,
    "forcesy_mse" => MetricFn::ForcesyMse,
    "forcesz_mae" => MetricFn::ForceszMae,
    "forcesz_mse" => MetricFn::ForceszMse,
    "forces_mae" => MetricFn::ForcesMae,
    "forces_mse" => MetricFn::ForcesMse,
    "forces_cos" => MetricFn::ForcesCos,
    "forces_magnitude" => MetricFn::ForcesMagnitude,
    "positions_mae" => MetricFn::PositionsMae,
    "positions_mse" => MetricFn::PositionsMse,
    "energy_force_within_threshold" => MetricFn::EnergyForceWithinThreshold,
    "energy_within_threshold" => MetricFn::EnergyWithinThreshold,
    "average_distance_within_threshold" => MetricFn::AverageDistanceWithinThreshold,
    "stress_mae" => MetricFn::StressMae,
};

impl MetricFn {
    pub fn name(&self) -> &'static str {
        match self {
            MetricFn::Mae => "mae",
            MetricFn::Mse => "mse",
            MetricFn::CosineSimilarity => "cosine_similarity",
            MetricFn::MagnitudeError => "magnitude_error",
            MetricFn::EnergyMae => "energy_mae",
            MetricFn::EnergyMse => "energy_mse",
            MetricFn::ForcesxMae => "forcesx_mae",
            MetricFn::ForcesxMse => "forcesx_mse",
            MetricFn::ForcesyMae => "forcesy_mae",
            MetricFn::ForcesyMse => "forcesy_mse",
            MetricFn::ForceszMae => "forcesz_mae",
            MetricFn::ForceszMse => "forcesz_mse",
            MetricFn::ForcesMae => "forces_mae",
            MetricFn::ForcesMse => "forces_mse",
            MetricFn::ForcesCos => "forces_cos",
            MetricFn::ForcesMagnitude => "forces_magnitude",
            MetricFn::PositionsMae => "positions_mae",
            MetricFn::PositionsMse => "positions_mse",
            MetricFn::EnergyForceWithinThreshold => "energy_force_within_threshold",
            MetricFn::EnergyWithinThreshold => "energy_within_threshold",
            MetricFn::AverageDistanceWithinThreshold => "average_distance_within_threshold",
            MetricFn::StressMae => "stress_mae",
        }
    }

    pub fn compute(
        &self,
        prediction: &Batch,
        target: &Batch,
        key: Property,
    ) -> Result<MetricRecord, EvalError> {
        use ErrorKind::{Absolute, Squared};
        let (p, t) = (prediction, target);
        match self {
            MetricFn::Mae => metrics::mae(p, t, key),
            MetricFn::Mse => metrics::mse(p, t, key),
            MetricFn::CosineSimilarity => metrics::cosine_similarity(p, t, key),
            MetricFn::MagnitudeError => metrics::magnitude_error(p, t, key, 2),
            MetricFn::EnergyMae => metrics::mae(p, t, Property::Energy),
            MetricFn::EnergyMse => metrics::mse(p, t, Property::Energy),
            MetricFn::ForcesxMae => metrics::component_error(Absolute, p, t, Property::Forces, 0),
            MetricFn::ForcesxMse => metrics::component_error(Squared, p, t, Property::Forces, 0),
            MetricFn::ForcesyMae => metrics::component_error(Absolute, p, t, Property::Forces, 1),
            MetricFn::ForcesyMse => metrics::component_error(Squared, p, t, Property::Forces, 1),
            MetricFn::ForceszMae => metrics::component_error(Absolute, p, t, Property::Forces, 2),
            MetricFn::ForceszMse => metrics::component_error(Squared, p, t, Property::Forces, 2),
            MetricFn::ForcesMae => metrics::mae(p, t, Property::Forces),
            MetricFn::ForcesMse => metrics::mse(p, t, Property::Forces),
            MetricFn::ForcesCos => metrics::cosine_similarity(p, t, Property::Forces),
            MetricFn::ForcesMagnitude => metrics::magnitude_error(p, t, Property::Forces, 2),
            MetricFn::PositionsMae => metrics::mae(p, t, Property::Positions),
            MetricFn::PositionsMse => metrics::mse(p, t, Property::Positions),
            MetricFn::EnergyForceWithinThreshold => metrics::energy_force_within_threshold(p, t),
            MetricFn::EnergyWithinThreshold => metrics::energy_within_threshold(p, t),
            MetricFn::AverageDistanceWithinThreshold => {
                metrics::average_distance_within_threshold(p, t)
            }
            MetricFn::StressMae => metrics::stress_mae(p, t),
        }
    }
}

impl FromStr for MetricFn {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        METRIC_FNS
            .get(s.trim())
            .copied()
            .ok_or_else(|| ConfigError::UnknownMetric(s.to_string()))
    }
}

impl fmt::Display for MetricFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key under which a metric is recorded for `property`.
///
/// A function whose name already mentions the property is used verbatim;
/// otherwise the property is prefixed (`energy` + `mae` -> `energy_mae`).
pub fn metric_name(property: Property, metric: MetricFn) -> String {
    compose_metric_name(property.name(), metric.name())
}

pub fn compose_metric_name(property: &str, function: &str) -> String {
    if function.contains(property) {
        function.to_string()
    } else {
        format!("{property}_{function}")
    }
}
