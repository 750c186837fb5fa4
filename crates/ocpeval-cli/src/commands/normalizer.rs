use crate::cli::{NormalizerArgs, NormalizerCommands};
use crate::data;
use crate::error::{CliError, Result};
use ocpeval::core::normalizer::{Normalizer, NormalizerBuilder};
use std::path::Path;
use tracing::info;

pub fn run(args: NormalizerArgs) -> Result<()> {
    match args.command {
        NormalizerCommands::Fit { samples, output } => handle_fit(&samples, &output),
        NormalizerCommands::Show { normalizer } => handle_show(&normalizer),
        NormalizerCommands::Apply {
            normalizer,
            input,
            inverse,
        } => handle_apply(&normalizer, &input, inverse),
    }
}

fn handle_fit(samples: &Path, output: &Path) -> Result<()> {
    let matrix = data::load_matrix(samples)?;
    info!(
        "Fitting normalizer to {} sample(s) with {} channel(s).",
        matrix.nrows(),
        matrix.ncols()
    );
    let normalizer = NormalizerBuilder::new().samples(matrix).build()?;
    normalizer.save(output)?;

    println!("{}", describe(&normalizer));
    println!("Normalizer written to: {}", output.display());
    Ok(())
}

fn handle_show(path: &Path) -> Result<()> {
    let normalizer = NormalizerBuilder::new().file(path.to_path_buf()).build()?;
    println!("{}", describe(&normalizer));
    Ok(())
}

fn handle_apply(path: &Path, input: &Path, inverse: bool) -> Result<()> {
    let normalizer = Normalizer::load(path)?;
    let matrix = data::load_matrix(input)?;
    let result = if inverse {
        normalizer.denorm(&matrix)?
    } else {
        normalizer.norm(&matrix)?
    };
    let json = serde_json::to_string_pretty(&data::matrix_to_rows(&result))
        .map_err(|e| CliError::Other(e.into()))?;
    println!("{json}");
    Ok(())
}

fn describe(normalizer: &Normalizer) -> String {
    let format = |values: &[f64]| {
        values
            .iter()
            .map(|v| format!("{v:.6}"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "channels: {}\nmean:     [{}]\nstd:      [{}]",
        normalizer.channels(),
        format(normalizer.mean().as_slice()),
        format(normalizer.std().as_slice())
    )
}
