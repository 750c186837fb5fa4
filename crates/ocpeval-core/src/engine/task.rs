use super::config::ConfigError;
use super::registry::{MetricFn, metric_name};
use crate::core::models::property::Property;
use std::fmt;
use std::str::FromStr;

/// A benchmark task with a fixed default set of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Structure to energy and forces.
    S2ef,
    /// Initial structure to relaxed structure.
    Is2rs,
    /// Initial structure to relaxed energy.
    Is2re,
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::S2ef => "s2ef",
            Task::Is2rs => "is2rs",
            Task::Is2re => "is2re",
        }
    }

    /// The `(property, metric)` pair whose value ranks models on this task.
    pub fn primary_pair(&self) -> (Property, MetricFn) {
        match self {
            Task::S2ef => (Property::Forces, MetricFn::EnergyForceWithinThreshold),
            Task::Is2rs => (Property::Positions, MetricFn::AverageDistanceWithinThreshold),
            Task::Is2re => (Property::Energy, MetricFn::EnergyMae),
        }
    }

    /// Table key of the primary metric, as recorded by the evaluator.
    pub fn primary_metric(&self) -> String {
        let (property, metric) = self.primary_pair();
        metric_name(property, metric)
    }

    pub fn metric_spec(&self) -> MetricSpec {
        let targets = match self {
            Task::S2ef => S2EF_METRICS,
            Task::Is2rs => IS2RS_METRICS,
            Task::Is2re => IS2RE_METRICS,
        };
        MetricSpec {
            targets: targets
                .iter()
                .map(|(property, metrics)| TargetMetrics {
                    property: *property,
                    metrics: metrics.to_vec(),
                })
                .collect(),
        }
    }
}

type StaticSpec = &'static [(Property, &'static [MetricFn])];

const S2EF_METRICS: StaticSpec = &[
    (Property::Energy, &[MetricFn::EnergyMae]),
    (
        Property::Forces,
        &[
            MetricFn::ForcesxMae,
            MetricFn::ForcesyMae,
            MetricFn::ForceszMae,
            MetricFn::ForcesMae,
            MetricFn::ForcesCos,
            MetricFn::ForcesMagnitude,
            MetricFn::EnergyForceWithinThreshold,
        ],
    ),
];

const IS2RS_METRICS: StaticSpec = &[(
    Property::Positions,
    &[
        MetricFn::AverageDistanceWithinThreshold,
        MetricFn::PositionsMae,
        MetricFn::PositionsMse,
    ],
)];

const IS2RE_METRICS: StaticSpec = &[(
    Property::Energy,
    &[
        MetricFn::EnergyMae,
        MetricFn::EnergyMse,
        MetricFn::EnergyWithinThreshold,
    ],
)];

impl FromStr for Task {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "s2ef" => Ok(Task::S2ef),
            "is2rs" => Ok(Task::Is2rs),
            "is2re" => Ok(Task::Is2re),
            other => Err(ConfigError::UnknownTask(other.to_string())),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMetrics {
    pub property: Property,
    pub metrics: Vec<MetricFn>,
}

/// Ordered (property, metrics) pairs an evaluator computes on every batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSpec {
    targets: Vec<TargetMetrics>,
}

impl MetricSpec {
    pub fn new(targets: Vec<TargetMetrics>) -> Result<Self, ConfigError> {
        if targets.iter().all(|t| t.metrics.is_empty()) {
            return Err(ConfigError::EmptySpec);
        }
        Ok(Self { targets })
    }

    pub fn targets(&self) -> &[TargetMetrics] {
        &self.targets
    }

    /// Flattened `(property, metric)` pairs in evaluation order.
    pub fn pairs(&self) -> impl Iterator<Item = (Property, MetricFn)> + '_ {
        self.targets
            .iter()
            .flat_map(|t| t.metrics.iter().map(move |m| (t.property, *m)))
    }
}
