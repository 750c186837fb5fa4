use crate::error::{CliError, Result};
use nalgebra::{DMatrix, Matrix3};
use ocpeval::core::models::batch::Batch;
use ocpeval::core::models::property::Property;
use ocpeval::engine::record::MetricsTable;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// One batch as stored in a JSON batch file. Every property is optional;
/// which ones are needed depends on the metrics being computed.
///
/// ```json
/// { "natoms": [2], "energy": [-1.5], "forces": [[0, 0, 1], [0, 0, -1]] }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchRecord {
    natoms: Option<Vec<usize>>,
    energy: Option<Vec<f64>>,
    forces: Option<Vec<[f64; 3]>>,
    positions: Option<Vec<[f64; 3]>>,
    /// Row-major 3×3 lattice per structure, lattice vectors as rows.
    cell: Option<Vec<[[f64; 3]; 3]>>,
    /// One row shared by every structure, or one row per structure.
    pbc: Option<Vec<[bool; 3]>>,
    stress: Option<Vec<[f64; 9]>>,
    isotropic_stress: Option<Vec<f64>>,
    anisotropic_stress: Option<Vec<[f64; 5]>>,
}

impl BatchRecord {
    pub fn into_batch(self) -> Batch {
        let mut batch = Batch::new();
        if let Some(natoms) = self.natoms {
            batch = batch.with_natoms(&natoms);
        }
        if let Some(energy) = self.energy {
            batch = batch.with_column(Property::Energy, &energy);
        }
        if let Some(forces) = self.forces {
            batch = batch.with_rows(Property::Forces, &forces);
        }
        if let Some(positions) = self.positions {
            batch = batch.with_rows(Property::Positions, &positions);
        }
        if let Some(cell) = self.cell {
            let cells: Vec<Matrix3<f64>> = cell
                .iter()
                .map(|rows| Matrix3::from_fn(|i, j| rows[i][j]))
                .collect();
            batch = batch.with_cells(&cells);
        }
        if let Some(pbc) = self.pbc {
            batch = batch.with_pbc(&pbc);
        }
        if let Some(stress) = self.stress {
            batch = batch.with_rows(Property::Stress, &stress);
        }
        if let Some(iso) = self.isotropic_stress {
            batch = batch.with_column(Property::IsotropicStress, &iso);
        }
        if let Some(aniso) = self.anisotropic_stress {
            batch = batch.with_rows(Property::AnisotropicStress, &aniso);
        }
        batch
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

pub fn load_batches(path: &Path) -> Result<Vec<Batch>> {
    let records: Vec<BatchRecord> = read_json(path)?;
    Ok(records.into_iter().map(BatchRecord::into_batch).collect())
}

/// Reads a JSON array of equally long rows into a matrix.
pub fn load_matrix(path: &Path) -> Result<DMatrix<f64>> {
    let rows: Vec<Vec<f64>> = read_json(path)?;
    rows_to_matrix(&rows).map_err(|reason| CliError::FileParsing {
        path: path.to_path_buf(),
        source: anyhow::anyhow!(reason),
    })
}

fn rows_to_matrix(rows: &[Vec<f64>]) -> std::result::Result<DMatrix<f64>, String> {
    let width = rows.first().map_or(0, Vec::len);
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(format!(
            "row {i} has {} column(s), expected {width}",
            row.len()
        ));
    }
    Ok(DMatrix::from_fn(rows.len(), width, |i, j| rows[i][j]))
}

pub fn matrix_to_rows(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

pub fn load_table(path: &Path) -> Result<MetricsTable> {
    read_json(path)
}

pub fn save_table(table: &MetricsTable, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, table).map_err(|e| CliError::Other(e.into()))
}
