use super::config::{ConfigError, EvaluatorConfig};
use super::error::EvalError;
use super::record::{MetricRecord, MetricsTable};
use super::registry::metric_name;
use super::task::{MetricSpec, Task};
use crate::core::models::batch::Batch;
use tracing::{debug, instrument, trace};

/// Computes a fixed set of metrics on prediction/target batch pairs.
///
/// The evaluator holds no per-batch state; running statistics live in the
/// [`MetricsTable`] the caller threads through successive calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluator {
    task: Option<Task>,
    spec: MetricSpec,
    primary_metric: Option<String>,
}

impl Evaluator {
    pub fn for_task(task: Task) -> Self {
        Self {
            task: Some(task),
            spec: task.metric_spec(),
            primary_metric: Some(task.primary_metric()),
        }
    }

    pub fn with_spec(spec: MetricSpec) -> Self {
        Self {
            task: None,
            spec,
            primary_metric: None,
        }
    }

    /// Binds to a known task id, or to `fallback` when the id is not one of
    /// the built-in tasks.
    pub fn new(task_id: &str, fallback: Option<MetricSpec>) -> Result<Self, ConfigError> {
        match (task_id.parse::<Task>(), fallback) {
            (Ok(task), _) => Ok(Self::for_task(task)),
            (Err(_), Some(spec)) => {
                debug!("Task '{}' is not built in; using explicit metric spec.", task_id);
                Ok(Self::with_spec(spec))
            }
            (Err(e), None) => Err(e),
        }
    }

    pub fn from_config(config: &EvaluatorConfig) -> Result<Self, ConfigError> {
        let mut evaluator = match (&config.task, &config.spec) {
            (Some(task), spec) => Self::new(task, spec.clone())?,
            (None, Some(spec)) => Self::with_spec(spec.clone()),
            (None, None) => return Err(ConfigError::EmptySpec),
        };
        if let Some(primary) = &config.primary_metric {
            evaluator.primary_metric = Some(primary.clone());
        }
        Ok(evaluator)
    }

    pub fn task(&self) -> Option<Task> {
        self.task
    }

    pub fn spec(&self) -> &MetricSpec {
        &self.spec
    }

    pub fn primary_metric(&self) -> Option<&str> {
        self.primary_metric.as_deref()
    }

    /// Names under which this evaluator records its metrics, in order.
    pub fn metric_names(&self) -> Vec<String> {
        self.spec
            .pairs()
            .map(|(property, metric)| metric_name(property, metric))
            .collect()
    }

    /// Evaluates one batch pair and returns `prior` extended with the results.
    pub fn eval(
        &self,
        prediction: &Batch,
        target: &Batch,
        mut prior: MetricsTable,
    ) -> Result<MetricsTable, EvalError> {
        self.eval_into(prediction, target, &mut prior)?;
        Ok(prior)
    }

    /// Evaluates one batch pair into `metrics`.
    ///
    /// All metrics of the batch are computed before any is merged, so on
    /// error `metrics` is left exactly as it was.
    #[instrument(skip_all, name = "evaluate_batch")]
    pub fn eval_into(
        &self,
        prediction: &Batch,
        target: &Batch,
        metrics: &mut MetricsTable,
    ) -> Result<(), EvalError> {
        let records = self
            .spec
            .pairs()
            .map(|(property, metric)| {
                let record = metric.compute(prediction, target, property)?;
                let name = metric_name(property, metric);
                trace!(metric = %name, value = ?record.metric, "Computed batch metric.");
                Ok((name, record))
            })
            .collect::<Result<Vec<(String, MetricRecord)>, EvalError>>()?;

        for (name, record) in records {
            metrics.update(&name, record);
        }
        Ok(())
    }
}
