//! Metric functions over a prediction/target batch pair.
//!
//! Every function is pure and returns a [`MetricRecord`] holding the sum of
//! the per-element (or per-structure) statistic together with its count, so
//! the result can be merged into a running table without re-reading tensors.

use super::error::{EvalError, Side};
use super::record::MetricRecord;
use crate::core::models::batch::{Batch, decode_cells, decode_natoms, decode_pbc, split_by_natoms};
use crate::core::models::property::Property;
use crate::core::utils::geometry::mean_displacement;
use crate::core::utils::stress::{ANISOTROPIC_COMPONENTS, reconstruct_stress};
use itertools::izip;
use nalgebra::{DMatrix, DMatrixView, Vector3};
use tracing::trace;

pub const ENERGY_THRESHOLD: f64 = 0.02;
pub const FORCE_THRESHOLD: f64 = 0.03;

/// Distance thresholds swept by [`average_distance_within_threshold`]:
/// `0.01, 0.011, ..., 0.499`.
pub const DISTANCE_THRESHOLD_START: f64 = 0.01;
pub const DISTANCE_THRESHOLD_STEP: f64 = 0.001;
pub const DISTANCE_THRESHOLD_COUNT: usize = 490;

const COSINE_EPS: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Absolute,
    Squared,
}

impl ErrorKind {
    #[inline]
    fn apply(self, pred: f64, target: f64) -> f64 {
        match self {
            ErrorKind::Absolute => (target - pred).abs(),
            ErrorKind::Squared => (target - pred).powi(2),
        }
    }
}

pub fn distance_thresholds() -> impl Iterator<Item = f64> {
    (0..DISTANCE_THRESHOLD_COUNT)
        .map(|i| DISTANCE_THRESHOLD_START + i as f64 * DISTANCE_THRESHOLD_STEP)
}

fn fetch(batch: &Batch, property: Property, side: Side) -> Result<&DMatrix<f64>, EvalError> {
    batch
        .get(property)
        .ok_or(EvalError::MissingKey { property, side })
}

fn fetch_pair<'a>(
    prediction: &'a Batch,
    target: &'a Batch,
    property: Property,
) -> Result<(&'a DMatrix<f64>, &'a DMatrix<f64>), EvalError> {
    let pred = fetch(prediction, property, Side::Prediction)?;
    let tgt = fetch(target, property, Side::Target)?;
    if pred.shape() != tgt.shape() {
        return Err(EvalError::ShapeMismatch {
            property,
            expected: tgt.shape(),
            found: pred.shape(),
        });
    }
    Ok((pred, tgt))
}

fn sum_record(values: impl Iterator<Item = f64>) -> MetricRecord {
    let (total, numel) = values.fold((0.0, 0), |(sum, n), v| (sum + v, n + 1));
    MetricRecord::from_sum(total, numel)
}

fn error_record(kind: ErrorKind, pred: &[f64], target: &[f64]) -> MetricRecord {
    sum_record(pred.iter().zip(target).map(|(&p, &t)| kind.apply(p, t)))
}

/// Row-major flattening, independent of nalgebra's column-major storage.
fn row_major(tensor: &DMatrix<f64>) -> Vec<f64> {
    tensor.transpose().as_slice().to_vec()
}

fn rows_as_vectors(block: &DMatrixView<'_, f64>) -> Vec<Vector3<f64>> {
    block
        .row_iter()
        .map(|row| Vector3::new(row[0], row[1], row[2]))
        .collect()
}

fn require_columns(
    tensor: &DMatrix<f64>,
    property: Property,
    columns: usize,
) -> Result<(), EvalError> {
    if tensor.ncols() != columns {
        return Err(EvalError::InvalidShape {
            property,
            reason: format!("expected {columns} columns, found {}", tensor.ncols()),
        });
    }
    Ok(())
}

fn elementwise(
    kind: ErrorKind,
    prediction: &Batch,
    target: &Batch,
    key: Property,
) -> Result<MetricRecord, EvalError> {
    let (pred, tgt) = fetch_pair(prediction, target, key)?;
    Ok(error_record(kind, pred.as_slice(), tgt.as_slice()))
}

pub fn mae(prediction: &Batch, target: &Batch, key: Property) -> Result<MetricRecord, EvalError> {
    elementwise(ErrorKind::Absolute, prediction, target, key)
}

pub fn mse(prediction: &Batch, target: &Batch, key: Property) -> Result<MetricRecord, EvalError> {
    elementwise(ErrorKind::Squared, prediction, target, key)
}

/// Error restricted to one column (0 = x, 1 = y, 2 = z) of the `key` tensor.
pub fn component_error(
    kind: ErrorKind,
    prediction: &Batch,
    target: &Batch,
    key: Property,
    axis: usize,
) -> Result<MetricRecord, EvalError> {
    let (pred, tgt) = fetch_pair(prediction, target, key)?;
    if axis >= pred.ncols() {
        return Err(EvalError::InvalidShape {
            property: key,
            reason: format!("column {axis} requested from a {}-column tensor", pred.ncols()),
        });
    }
    Ok(sum_record(
        pred.column(axis)
            .iter()
            .zip(tgt.column(axis).iter())
            .map(|(&p, &t)| kind.apply(p, t)),
    ))
}

/// Row-wise cosine similarity; one element per row.
pub fn cosine_similarity(
    prediction: &Batch,
    target: &Batch,
    key: Property,
) -> Result<MetricRecord, EvalError> {
    let (pred, tgt) = fetch_pair(prediction, target, key)?;
    Ok(sum_record(pred.row_iter().zip(tgt.row_iter()).map(
        |(p, t)| {
            let denom = p.norm().max(COSINE_EPS) * t.norm().max(COSINE_EPS);
            p.dot(&t) / denom
        },
    )))
}

/// Absolute difference of row-wise L-`p` norms.
pub fn magnitude_error(
    prediction: &Batch,
    target: &Batch,
    key: Property,
    p: u32,
) -> Result<MetricRecord, EvalError> {
    let (pred, tgt) = fetch_pair(prediction, target, key)?;
    if pred.ncols() <= 1 {
        return Err(EvalError::InvalidShape {
            property: key,
            reason: "magnitude error needs more than one column".to_string(),
        });
    }
    if p == 0 {
        return Err(EvalError::InvalidValue {
            property: key,
            reason: "norm order must be at least 1".to_string(),
        });
    }

    let lp_norm = |row: nalgebra::RowDVector<f64>| -> f64 {
        row.iter()
            .map(|x| x.abs().powi(p as i32))
            .sum::<f64>()
            .powf(1.0 / p as f64)
    };
    Ok(sum_record(
        pred.row_iter()
            .zip(tgt.row_iter())
            .map(|(a, b)| (lp_norm(a.into_owned()) - lp_norm(b.into_owned())).abs()),
    ))
}

/// Counts structures whose energy error is below [`ENERGY_THRESHOLD`] and
/// whose largest force-component error is below [`FORCE_THRESHOLD`].
pub fn energy_force_within_threshold(
    prediction: &Batch,
    target: &Batch,
) -> Result<MetricRecord, EvalError> {
    let natoms = decode_natoms(fetch(target, Property::Natoms, Side::Target)?)?;
    let pred_forces = fetch(prediction, Property::Forces, Side::Prediction)?;
    let pred_energy = fetch(prediction, Property::Energy, Side::Prediction)?;

    let atom_count: usize = natoms.iter().sum();
    if atom_count != pred_forces.nrows() {
        return Err(EvalError::CountMismatch {
            context: "sum of natoms vs predicted force rows",
            expected: atom_count,
            found: pred_forces.nrows(),
        });
    }
    if natoms.len() != pred_energy.len() {
        return Err(EvalError::CountMismatch {
            context: "structures vs predicted energies",
            expected: natoms.len(),
            found: pred_energy.len(),
        });
    }

    let (pred_forces, target_forces) = fetch_pair(prediction, target, Property::Forces)?;
    let (pred_energy, target_energy) = fetch_pair(prediction, target, Property::Energy)?;

    let mut start = 0;
    let mut success = 0usize;
    for (&n, &p_e, &t_e) in izip!(&natoms, pred_energy.iter(), target_energy.iter()) {
        let energy_error = (t_e - p_e).abs();
        // NaN-propagating max; a structure without atoms is judged on energy alone.
        let max_force_error = pred_forces
            .rows(start, n)
            .iter()
            .zip(target_forces.rows(start, n).iter())
            .map(|(p, t)| (t - p).abs())
            .fold(f64::NEG_INFINITY, |acc, x| if x.is_nan() || x > acc { x } else { acc });

        if energy_error < ENERGY_THRESHOLD && max_force_error < FORCE_THRESHOLD {
            success += 1;
        }
        start += n;
    }

    Ok(MetricRecord::from_sum(success as f64, natoms.len()))
}

/// Counts structures whose energy error is below [`ENERGY_THRESHOLD`].
pub fn energy_within_threshold(
    prediction: &Batch,
    target: &Batch,
) -> Result<MetricRecord, EvalError> {
    let (pred, tgt) = fetch_pair(prediction, target, Property::Energy)?;
    let success = pred
        .iter()
        .zip(tgt.iter())
        .filter(|(p, t)| (*t - *p).abs() < ENERGY_THRESHOLD)
        .count();
    Ok(MetricRecord::from_sum(success as f64, tgt.len()))
}

/// Success rate of per-structure mean minimum-image displacement, integrated
/// over the [`distance_thresholds`] sweep.
pub fn average_distance_within_threshold(
    prediction: &Batch,
    target: &Batch,
) -> Result<MetricRecord, EvalError> {
    let pred_positions = fetch(prediction, Property::Positions, Side::Prediction)?;
    let target_positions = fetch(target, Property::Positions, Side::Target)?;
    require_columns(pred_positions, Property::Positions, 3)?;
    require_columns(target_positions, Property::Positions, 3)?;

    let pred_natoms = decode_natoms(fetch(prediction, Property::Natoms, Side::Prediction)?)?;
    let target_natoms = decode_natoms(fetch(target, Property::Natoms, Side::Target)?)?;
    if pred_natoms.len() != target_natoms.len() {
        return Err(EvalError::CountMismatch {
            context: "predicted vs target structures",
            expected: target_natoms.len(),
            found: pred_natoms.len(),
        });
    }
    let structures = target_natoms.len();

    let cells = decode_cells(fetch(target, Property::Cell, Side::Target)?)?;
    if cells.len() != structures {
        return Err(EvalError::CountMismatch {
            context: "cells vs structures",
            expected: structures,
            found: cells.len(),
        });
    }
    let pbc = decode_pbc(fetch(target, Property::Pbc, Side::Target)?, structures)?;

    let pred_blocks = split_by_natoms(pred_positions, &pred_natoms)?;
    let target_blocks = split_by_natoms(target_positions, &target_natoms)?;

    let mut mean_distances = Vec::with_capacity(structures);
    for (i, (pred_block, target_block)) in pred_blocks.iter().zip(&target_blocks).enumerate() {
        if pred_block.nrows() != target_block.nrows() {
            return Err(EvalError::CountMismatch {
                context: "atoms per structure",
                expected: target_block.nrows(),
                found: pred_block.nrows(),
            });
        }
        let distance = mean_displacement(
            &rows_as_vectors(pred_block),
            &rows_as_vectors(target_block),
            &cells[i],
            pbc[i],
        )
        .ok_or(EvalError::SingularCell { structure: i })?;
        trace!(structure = i, distance, "Mean minimum-image displacement.");
        mean_distances.push(distance);
    }

    let success: usize = distance_thresholds()
        .map(|threshold| mean_distances.iter().filter(|&&d| d < threshold).count())
        .sum();

    Ok(MetricRecord::from_sum(
        success as f64,
        structures * DISTANCE_THRESHOLD_COUNT,
    ))
}

/// MAE between the target stress and the stress rebuilt from predicted
/// isotropic and anisotropic components.
pub fn stress_mae(prediction: &Batch, target: &Batch) -> Result<MetricRecord, EvalError> {
    let isotropic = fetch(prediction, Property::IsotropicStress, Side::Prediction)?;
    let anisotropic = fetch(prediction, Property::AnisotropicStress, Side::Prediction)?;
    let target_stress = fetch(target, Property::Stress, Side::Target)?;

    let structures = isotropic.len();
    if anisotropic.len() != structures * ANISOTROPIC_COMPONENTS {
        return Err(EvalError::ShapeMismatch {
            property: Property::AnisotropicStress,
            expected: (structures, ANISOTROPIC_COMPONENTS),
            found: anisotropic.shape(),
        });
    }
    if target_stress.len() != structures * 9 {
        return Err(EvalError::ShapeMismatch {
            property: Property::Stress,
            expected: (structures, 9),
            found: target_stress.shape(),
        });
    }

    let anisotropic = row_major(anisotropic);
    let predicted: Vec<f64> = row_major(isotropic)
        .iter()
        .zip(anisotropic.chunks_exact(ANISOTROPIC_COMPONENTS))
        .flat_map(|(&iso, aniso)| {
            let mut parts = [0.0; ANISOTROPIC_COMPONENTS];
            parts.copy_from_slice(aniso);
            reconstruct_stress(iso, &parts).iter().copied().collect::<Vec<_>>()
        })
        .collect();

    Ok(error_record(
        ErrorKind::Absolute,
        &predicted,
        &row_major(target_stress),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix3;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn force_batches() -> (Batch, Batch) {
        let prediction = Batch::new()
            .with_rows(Property::Forces, &[[1.0, 0.0, -1.0], [0.5, 2.0, 0.0]])
            .with_column(Property::Energy, &[1.0]);
        let target = Batch::new()
            .with_rows(Property::Forces, &[[0.0, 0.0, 1.0], [0.5, 1.0, 0.0]])
            .with_column(Property::Energy, &[1.5]);
        (prediction, target)
    }

    #[test]
    fn mae_averages_absolute_errors_over_all_elements() {
        let (p, t) = force_batches();
        let record = mae(&p, &t, Property::Forces).unwrap();
        assert_eq!(record.numel, 6);
        assert!(f64_approx_equal(record.total, 4.0));
        assert!(f64_approx_equal(record.metric.unwrap(), 4.0 / 6.0));
    }

    #[test]
    fn mse_averages_squared_errors() {
        let (p, t) = force_batches();
        let record = mse(&p, &t, Property::Forces).unwrap();
        assert!(f64_approx_equal(record.total, 1.0 + 4.0 + 1.0));
        assert_eq!(record.numel, 6);
    }

    #[test]
    fn component_error_selects_single_column() {
        let (p, t) = force_batches();
        let z = component_error(ErrorKind::Absolute, &p, &t, Property::Forces, 2).unwrap();
        assert!(f64_approx_equal(z.total, 2.0));
        assert_eq!(z.numel, 2);
        let y = component_error(ErrorKind::Squared, &p, &t, Property::Forces, 1).unwrap();
        assert!(f64_approx_equal(y.total, 1.0));
    }

    #[test]
    fn component_error_rejects_out_of_range_axis() {
        let (p, t) = force_batches();
        let result = component_error(ErrorKind::Absolute, &p, &t, Property::Energy, 1);
        assert!(matches!(result, Err(EvalError::InvalidShape { .. })));
    }

    #[test]
    fn missing_property_reports_side() {
        let (p, _) = force_batches();
        let result = mae(&p, &Batch::new(), Property::Forces);
        assert_eq!(
            result.unwrap_err(),
            EvalError::MissingKey {
                property: Property::Forces,
                side: Side::Target
            }
        );
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let p = Batch::new().with_rows(Property::Forces, &[[0.0; 3]; 2]);
        let t = Batch::new().with_rows(Property::Forces, &[[0.0; 3]; 3]);
        let result = mae(&p, &t, Property::Forces);
        assert_eq!(
            result.unwrap_err(),
            EvalError::ShapeMismatch {
                property: Property::Forces,
                expected: (3, 3),
                found: (2, 3),
            }
        );
    }

    #[test]
    fn cosine_similarity_is_one_for_parallel_rows_and_minus_one_for_opposite() {
        let p = Batch::new().with_rows(Property::Forces, &[[1.0, 2.0, 3.0], [1.0, 0.0, 0.0]]);
        let t = Batch::new().with_rows(Property::Forces, &[[2.0, 4.0, 6.0], [-3.0, 0.0, 0.0]]);
        let record = cosine_similarity(&p, &t, Property::Forces).unwrap();
        assert_eq!(record.numel, 2);
        assert!(f64_approx_equal(record.total, 0.0));
    }

    #[test]
    fn cosine_similarity_of_zero_vector_is_zero() {
        let p = Batch::new().with_rows(Property::Forces, &[[0.0, 0.0, 0.0]]);
        let t = Batch::new().with_rows(Property::Forces, &[[1.0, 0.0, 0.0]]);
        let record = cosine_similarity(&p, &t, Property::Forces).unwrap();
        assert!(f64_approx_equal(record.total, 0.0));
    }

    #[test]
    fn magnitude_error_compares_row_norms() {
        let p = Batch::new().with_rows(Property::Forces, &[[3.0, 4.0, 0.0]]);
        let t = Batch::new().with_rows(Property::Forces, &[[0.0, 0.0, 2.0]]);
        let record = magnitude_error(&p, &t, Property::Forces, 2).unwrap();
        assert!(f64_approx_equal(record.total, 3.0));
        let l1 = magnitude_error(&p, &t, Property::Forces, 1).unwrap();
        assert!(f64_approx_equal(l1.total, 5.0));
    }

    #[test]
    fn magnitude_error_rejects_single_column() {
        let p = Batch::new().with_column(Property::Energy, &[1.0, 2.0]);
        let t = p.clone();
        let result = magnitude_error(&p, &t, Property::Energy, 2);
        assert!(matches!(result, Err(EvalError::InvalidShape { .. })));
    }

    #[test]
    fn energy_within_threshold_uses_strict_inequality() {
        let t = Batch::new().with_column(Property::Energy, &[1.0, 1.0]);
        let p = Batch::new().with_column(Property::Energy, &[1.019999, 1.02]);
        let record = energy_within_threshold(&p, &t).unwrap();
        assert_eq!(record.total, 1.0);
        assert_eq!(record.numel, 2);
        assert_eq!(record.metric, Some(0.5));
    }

    fn threshold_batches(force_rows: usize) -> (Batch, Batch) {
        let forces = vec![[0.0; 3]; force_rows];
        let prediction = Batch::new()
            .with_rows(Property::Forces, &forces)
            .with_column(Property::Energy, &[0.0, 0.0]);
        let target = Batch::new()
            .with_rows(Property::Forces, &forces)
            .with_column(Property::Energy, &[0.0, 0.0])
            .with_natoms(&[2, 3]);
        (prediction, target)
    }

    #[test]
    fn energy_force_within_threshold_accepts_consistent_counts() {
        let (p, t) = threshold_batches(5);
        let record = energy_force_within_threshold(&p, &t).unwrap();
        assert_eq!(record.numel, 2);
        assert_eq!(record.metric, Some(1.0));
    }

    #[test]
    fn energy_force_within_threshold_rejects_force_count_mismatch() {
        let (p, t) = threshold_batches(4);
        let result = energy_force_within_threshold(&p, &t);
        assert!(matches!(
            result,
            Err(EvalError::CountMismatch {
                expected: 5,
                found: 4,
                ..
            })
        ));
    }

    #[test]
    fn energy_force_within_threshold_rejects_energy_count_mismatch() {
        let (_, t) = threshold_batches(5);
        let p = Batch::new()
            .with_rows(Property::Forces, &[[0.0; 3]; 5])
            .with_column(Property::Energy, &[0.0, 0.0, 0.0]);
        let result = energy_force_within_threshold(&p, &t);
        assert!(matches!(
            result,
            Err(EvalError::CountMismatch {
                expected: 2,
                found: 3,
                ..
            })
        ));
    }

    #[test]
    fn energy_force_within_threshold_requires_both_conditions_per_structure() {
        let prediction = Batch::new()
            .with_rows(
                Property::Forces,
                &[[0.0; 3], [0.0; 3], [0.0, 0.05, 0.0], [0.0; 3], [0.0; 3]],
            )
            .with_column(Property::Energy, &[0.01, 0.0, 0.5]);
        let target = Batch::new()
            .with_rows(Property::Forces, &[[0.0; 3]; 5])
            .with_column(Property::Energy, &[0.0, 0.0, 0.0])
            .with_natoms(&[2, 1, 2]);
        let record = energy_force_within_threshold(&prediction, &target).unwrap();
        // structure 0 passes, 1 fails on forces, 2 fails on energy
        assert_eq!(record.total, 1.0);
        assert_eq!(record.numel, 3);
    }

    #[test]
    fn energy_force_within_threshold_fails_on_nan_force() {
        let prediction = Batch::new()
            .with_rows(Property::Forces, &[[f64::NAN, 0.0, 0.0], [0.0; 3]])
            .with_column(Property::Energy, &[0.0]);
        let target = Batch::new()
            .with_rows(Property::Forces, &[[0.0; 3]; 2])
            .with_column(Property::Energy, &[0.0])
            .with_natoms(&[2]);
        let record = energy_force_within_threshold(&prediction, &target).unwrap();
        assert_eq!(record.total, 0.0);
    }

    #[test]
    fn energy_force_within_threshold_takes_max_over_each_structure_slice() {
        // natoms [1, 0, 2]: the empty structure is judged on energy alone,
        // and a bad force row only fails the structure that owns it.
        let prediction = Batch::new()
            .with_rows(
                Property::Forces,
                &[[0.02, 0.0, 0.0], [0.0; 3], [0.0, 0.0, -0.04]],
            )
            .with_column(Property::Energy, &[0.0, 0.01, 0.0]);
        let target = Batch::new()
            .with_rows(Property::Forces, &[[0.0; 3]; 3])
            .with_column(Property::Energy, &[0.0, 0.0, 0.0])
            .with_natoms(&[1, 0, 2]);
        let record = energy_force_within_threshold(&prediction, &target).unwrap();
        assert_eq!(record.total, 2.0);
        assert_eq!(record.numel, 3);
    }

    fn structure_batches(offset: [f64; 3]) -> (Batch, Batch) {
        let target_positions = [
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0],
            [2.0, 0.5, 0.5],
        ];
        let pred_positions: Vec<[f64; 3]> = target_positions
            .iter()
            .map(|p| [p[0] + offset[0], p[1] + offset[1], p[2] + offset[2]])
            .collect();
        let prediction = Batch::new()
            .with_rows(Property::Positions, &pred_positions)
            .with_natoms(&[2, 1]);
        let target = Batch::new()
            .with_rows(Property::Positions, &target_positions)
            .with_natoms(&[2, 1])
            .with_cells(&[Matrix3::from_diagonal_element(4.0); 2])
            .with_pbc(&[[true, true, true]]);
        (prediction, target)
    }

    #[test]
    fn distance_thresholds_match_sweep_bounds() {
        let thresholds: Vec<f64> = distance_thresholds().collect();
        assert_eq!(thresholds.len(), 490);
        assert!(f64_approx_equal(thresholds[0], 0.01));
        assert!(f64_approx_equal(thresholds[1], 0.011));
        assert!(f64_approx_equal(*thresholds.last().unwrap(), 0.499));
    }

    #[test]
    fn average_distance_is_one_for_identical_positions() {
        let (p, t) = structure_batches([0.0; 3]);
        let record = average_distance_within_threshold(&p, &t).unwrap();
        assert_eq!(record.numel, 2 * DISTANCE_THRESHOLD_COUNT);
        assert_eq!(record.metric, Some(1.0));
    }

    #[test]
    fn average_distance_is_zero_for_large_displacement() {
        let (p, t) = structure_batches([1.0, 0.0, 0.0]);
        let record = average_distance_within_threshold(&p, &t).unwrap();
        assert_eq!(record.total, 0.0);
    }

    #[test]
    fn average_distance_uses_minimum_image() {
        // A shift by one full lattice vector is no displacement at all.
        let (p, t) = structure_batches([4.0, 0.0, -4.0]);
        let record = average_distance_within_threshold(&p, &t).unwrap();
        assert_eq!(record.metric, Some(1.0));
    }

    #[test]
    fn average_distance_counts_thresholds_above_mean_displacement() {
        // mean displacement 0.1005: thresholds 0.101 ..= 0.499 succeed (399 of them).
        let (p, t) = structure_batches([0.1005, 0.0, 0.0]);
        let record = average_distance_within_threshold(&p, &t).unwrap();
        assert_eq!(record.total, 2.0 * 399.0);
        assert_eq!(record.numel, 2 * DISTANCE_THRESHOLD_COUNT);
    }

    #[test]
    fn average_distance_rejects_missing_cell() {
        let (p, _) = structure_batches([0.0; 3]);
        let t = Batch::new()
            .with_rows(Property::Positions, &[[0.0; 3]; 3])
            .with_natoms(&[2, 1])
            .with_pbc(&[[true; 3]]);
        let result = average_distance_within_threshold(&p, &t);
        assert_eq!(
            result.unwrap_err(),
            EvalError::MissingKey {
                property: Property::Cell,
                side: Side::Target
            }
        );
    }

    #[test]
    fn average_distance_rejects_singular_cell() {
        let (p, t) = structure_batches([0.0; 3]);
        let t = t.with_cells(&[Matrix3::identity(), Matrix3::zeros()]);
        let result = average_distance_within_threshold(&p, &t);
        assert_eq!(result.unwrap_err(), EvalError::SingularCell { structure: 1 });
    }

    #[test]
    fn stress_mae_is_zero_for_exact_reconstruction() {
        let iso = 3f64.sqrt();
        let prediction = Batch::new()
            .with_column(Property::IsotropicStress, &[iso])
            .with_rows(Property::AnisotropicStress, &[[0.0; 5]]);
        let target = Batch::new().with_rows(
            Property::Stress,
            &[[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]],
        );
        let record = stress_mae(&prediction, &target).unwrap();
        assert_eq!(record.numel, 9);
        assert!(record.total.abs() < TOLERANCE);
    }

    #[test]
    fn stress_mae_reads_target_row_major() {
        let prediction = Batch::new()
            .with_column(Property::IsotropicStress, &[0.0, 0.0])
            .with_rows(Property::AnisotropicStress, &[[0.0; 5], [0.0; 5]]);
        let mut row = [0.0; 9];
        row[1] = 2.0;
        let target = Batch::new().with_rows(Property::Stress, &[row, [0.0; 9]]);
        let record = stress_mae(&prediction, &target).unwrap();
        assert_eq!(record.numel, 18);
        assert!(f64_approx_equal(record.total, 2.0));
    }

    #[test]
    fn stress_mae_rejects_wrong_anisotropic_width() {
        let prediction = Batch::new()
            .with_column(Property::IsotropicStress, &[0.0])
            .with_rows(Property::AnisotropicStress, &[[0.0; 4]]);
        let target = Batch::new().with_rows(Property::Stress, &[[0.0; 9]]);
        let result = stress_mae(&prediction, &target);
        assert!(matches!(
            result,
            Err(EvalError::ShapeMismatch {
                property: Property::AnisotropicStress,
                ..
            })
        ));
    }
}
