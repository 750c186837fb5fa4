use crate::cli::{EvalArgs, MetricSource};
use crate::data;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use ocpeval::engine::config::EvaluatorConfig;
use ocpeval::engine::evaluator::Evaluator;
use ocpeval::engine::progress::ProgressReporter;
use ocpeval::engine::record::MetricsTable;
use ocpeval::workflows::evaluate::{self, BatchPolicy};
use std::fmt::Write;
use tracing::{info, warn};

pub fn run(args: EvalArgs) -> Result<()> {
    let evaluator = build_evaluator(&args.metrics)?;
    info!(
        "Evaluator ready with {} metric(s).",
        evaluator.metric_names().len()
    );

    let predictions = data::load_batches(&args.prediction)?;
    let targets = data::load_batches(&args.target)?;
    if predictions.len() != targets.len() {
        return Err(CliError::Argument(format!(
            "{} prediction batch(es) but {} target batch(es)",
            predictions.len(),
            targets.len()
        )));
    }
    info!("Loaded {} batch pair(s).", predictions.len());

    let prior = match &args.prior {
        Some(path) => {
            info!("Extending metrics table from {:?}", path);
            data::load_table(path)?
        }
        None => MetricsTable::new(),
    };

    let policy = if args.skip_invalid {
        BatchPolicy::Skip
    } else {
        BatchPolicy::Abort
    };

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let report = evaluate::run(
        &evaluator,
        predictions.into_iter().zip(targets),
        policy,
        &reporter,
    )?;

    if report.skipped > 0 {
        warn!("{} batch(es) were skipped.", report.skipped);
    }

    let metrics = evaluate::merge_tables([&prior, &report.metrics]);
    print!("{}", format_table(&metrics, evaluator.primary_metric()));
    println!(
        "Evaluated {} batch(es), skipped {}.",
        report.evaluated, report.skipped
    );

    if let Some(path) = &args.output {
        data::save_table(&metrics, path)?;
        println!("Metrics table written to: {}", path.display());
    }
    Ok(())
}

fn build_evaluator(source: &MetricSource) -> Result<Evaluator> {
    match (&source.task, &source.config) {
        (Some(task), None) => Ok(Evaluator::new(task, None)?),
        (None, Some(path)) => {
            info!("Loading evaluator configuration from {:?}", path);
            let config = EvaluatorConfig::from_file(path)?;
            Ok(Evaluator::from_config(&config)?)
        }
        _ => Err(CliError::Argument(
            "exactly one of --task or --config must be given".to_string(),
        )),
    }
}

/// Renders one line per metric, marking the primary metric with `*`.
pub fn format_table(table: &MetricsTable, primary: Option<&str>) -> String {
    let width = table.names().map(str::len).max().unwrap_or(0);
    let mut out = String::new();
    for (name, record) in table {
        let marker = if Some(name.as_str()) == primary { '*' } else { ' ' };
        let value = record
            .metric
            .map_or_else(|| "n/a".to_string(), |m| format!("{m:.6}"));
        let _ = writeln!(
            out,
            "{marker} {name:<width$}  {value:>14}  (n={})",
            record.numel
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn source(task: Option<&str>, config: Option<PathBuf>) -> MetricSource {
        MetricSource {
            task: task.map(str::to_string),
            config,
        }
    }

    #[test]
    fn evaluator_is_built_from_task_name() {
        let evaluator = build_evaluator(&source(Some("is2re"), None)).unwrap();
        assert_eq!(evaluator.primary_metric(), Some("energy_mae"));
    }

    #[test]
    fn unknown_task_name_is_a_config_error() {
        let result = build_evaluator(&source(Some("oc22"), None));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn evaluator_is_built_from_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.toml");
        fs::write(
            &path,
            "[[targets]]\nproperty = \"forces\"\nmetrics = [\"forces_cos\"]\n",
        )
        .unwrap();
        let evaluator = build_evaluator(&source(None, Some(path))).unwrap();
        assert_eq!(evaluator.metric_names(), vec!["forces_cos"]);
    }

    #[test]
    fn table_marks_primary_metric() {
        let mut table = MetricsTable::new();
        table.update("energy_mae", 0.5);
        table.update("energy_mse", 0.25);
        let text = format_table(&table, Some("energy_mae"));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("* energy_mae"));
        assert!(lines[0].contains("0.500000"));
        assert!(lines[1].starts_with("  energy_mse"));
        assert!(lines[1].ends_with("(n=1)"));
    }

    #[test]
    fn run_writes_merged_table() {
        let dir = tempdir().unwrap();
        let prediction = dir.path().join("pred.json");
        let target = dir.path().join("target.json");
        let prior = dir.path().join("prior.json");
        let output = dir.path().join("out.json");
        fs::write(&prediction, r#"[{ "energy": [1.0] }, { "energy": [0.0, 0.0] }]"#).unwrap();
        fs::write(&target, r#"[{ "energy": [0.0] }, { "energy": [0.0, 0.0] }]"#).unwrap();

        let mut prior_table = MetricsTable::new();
        prior_table.update("energy_mae", 1.0);
        data::save_table(&prior_table, &prior).unwrap();

        run(EvalArgs {
            prediction,
            target,
            metrics: source(Some("is2re"), None),
            prior: Some(prior),
            output: Some(output.clone()),
            skip_invalid: false,
        })
        .unwrap();

        let table = data::load_table(&output).unwrap();
        let mae = table.get("energy_mae").unwrap();
        assert_eq!(mae.numel, 4);
        assert_eq!(mae.total, 2.0);
        assert_eq!(table.metric("energy_within_threshold"), Some(2.0 / 3.0));
    }

    #[test]
    fn run_rejects_unpaired_batches() {
        let dir = tempdir().unwrap();
        let prediction = dir.path().join("pred.json");
        let target = dir.path().join("target.json");
        fs::write(&prediction, r#"[{ "energy": [1.0] }]"#).unwrap();
        fs::write(&target, "[]").unwrap();

        let result = run(EvalArgs {
            prediction,
            target,
            metrics: source(Some("is2re"), None),
            prior: None,
            output: None,
            skip_invalid: true,
        });
        assert!(matches!(result, Err(CliError::Argument(_))));
    }
}
