use crate::core::models::batch::Batch;
use crate::engine::error::EvalError;
use crate::engine::evaluator::Evaluator;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::record::MetricsTable;
use tracing::{info, instrument, warn};

/// What to do when a batch pair cannot be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPolicy {
    /// Stop at the first failing batch and return its error.
    #[default]
    Abort,
    /// Log the failure, leave the table untouched and continue.
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub metrics: MetricsTable,
    pub evaluated: usize,
    pub skipped: usize,
    pub primary_metric: Option<String>,
}

impl EvaluationReport {
    /// Current value of the evaluator's primary metric, if it has one and it
    /// has seen at least one element.
    pub fn primary_value(&self) -> Option<f64> {
        self.primary_metric
            .as_deref()
            .and_then(|name| self.metrics.metric(name))
    }
}

/// Evaluates every `(prediction, target)` pair in order into a single table.
#[instrument(skip_all, name = "evaluation_workflow")]
pub fn run<I>(
    evaluator: &Evaluator,
    batches: I,
    policy: BatchPolicy,
    reporter: &ProgressReporter,
) -> Result<EvaluationReport, EvalError>
where
    I: IntoIterator<Item = (Batch, Batch)>,
{
    let batches = batches.into_iter();
    let (lower, upper) = batches.size_hint();
    let total_batches = (upper == Some(lower)).then_some(lower as u64);

    reporter.report(Progress::PhaseStart { name: "Evaluation" });
    reporter.report(Progress::TaskStart { total_batches });
    info!(
        task = ?evaluator.task(),
        metrics = evaluator.metric_names().len(),
        "Starting evaluation."
    );

    let mut metrics = MetricsTable::new();
    let mut evaluated = 0;
    let mut skipped = 0;

    for (index, (prediction, target)) in batches.enumerate() {
        match evaluator.eval_into(&prediction, &target, &mut metrics) {
            Ok(()) => {
                evaluated += 1;
                reporter.report(Progress::BatchEvaluated { index });
            }
            Err(e) => match policy {
                BatchPolicy::Abort => {
                    reporter.report(Progress::TaskFinish);
                    reporter.report(Progress::PhaseFinish);
                    return Err(e);
                }
                BatchPolicy::Skip => {
                    warn!(batch = index, error = %e, "Skipping batch that failed evaluation.");
                    skipped += 1;
                    reporter.report(Progress::BatchSkipped {
                        index,
                        reason: e.to_string(),
                    });
                }
            },
        }
    }

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let report = EvaluationReport {
        metrics,
        evaluated,
        skipped,
        primary_metric: evaluator.primary_metric().map(str::to_string),
    };
    info!(
        evaluated,
        skipped,
        primary = ?report.primary_value(),
        "Evaluation finished."
    );
    Ok(report)
}

/// Folds tables produced by independent workers into one.
pub fn merge_tables<'a, I>(tables: I) -> MetricsTable
where
    I: IntoIterator<Item = &'a MetricsTable>,
{
    tables
        .into_iter()
        .fold(MetricsTable::new(), |mut merged, table| {
            merged.merge(table);
            merged
        })
}
