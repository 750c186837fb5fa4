use super::property::Property;
use crate::engine::error::EvalError;
use nalgebra::{DMatrix, DMatrixView, Matrix3};
use std::collections::HashMap;

/// A collated set of tensors for one or more structures, keyed by [`Property`].
///
/// Rows are the leading axis: per-structure quantities have one row per
/// structure, per-atom quantities one row per atom, with the atoms of all
/// structures concatenated in the order given by `natoms`.
///
/// `natoms`, `cell` and `pbc` are stored as tensors like everything else
/// (`n×1` counts, `3n×3` stacked cells, `k×3` 0/1 flags) and are written
/// through the typed helpers on this type and read back through
/// [`decode_natoms`], [`decode_cells`] and [`decode_pbc`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    tensors: HashMap<Property, DMatrix<f64>>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tensor(mut self, property: Property, tensor: DMatrix<f64>) -> Self {
        self.tensors.insert(property, tensor);
        self
    }

    /// One value per row, e.g. per-structure energies.
    pub fn with_column(self, property: Property, values: &[f64]) -> Self {
        self.with_tensor(property, DMatrix::from_column_slice(values.len(), 1, values))
    }

    pub fn with_rows<const C: usize>(self, property: Property, rows: &[[f64; C]]) -> Self {
        let tensor = DMatrix::from_fn(rows.len(), C, |i, j| rows[i][j]);
        self.with_tensor(property, tensor)
    }

    pub fn with_natoms(self, natoms: &[usize]) -> Self {
        let counts: Vec<f64> = natoms.iter().map(|&n| n as f64).collect();
        self.with_column(Property::Natoms, &counts)
    }

    pub fn with_cells(self, cells: &[Matrix3<f64>]) -> Self {
        let tensor = DMatrix::from_fn(cells.len() * 3, 3, |i, j| cells[i / 3][(i % 3, j)]);
        self.with_tensor(Property::Cell, tensor)
    }

    /// Either a single row shared by every structure or one row per structure.
    pub fn with_pbc(self, pbc: &[[bool; 3]]) -> Self {
        let tensor = DMatrix::from_fn(pbc.len(), 3, |i, j| if pbc[i][j] { 1.0 } else { 0.0 });
        self.with_tensor(Property::Pbc, tensor)
    }

    pub fn insert(&mut self, property: Property, tensor: DMatrix<f64>) -> Option<DMatrix<f64>> {
        self.tensors.insert(property, tensor)
    }

    pub fn get(&self, property: Property) -> Option<&DMatrix<f64>> {
        self.tensors.get(&property)
    }

    pub fn contains(&self, property: Property) -> bool {
        self.tensors.contains_key(&property)
    }

    pub fn properties(&self) -> impl Iterator<Item = Property> + '_ {
        self.tensors.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

pub fn decode_natoms(tensor: &DMatrix<f64>) -> Result<Vec<usize>, EvalError> {
    tensor
        .iter()
        .map(|&value| {
            if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
                Ok(value as usize)
            } else {
                Err(EvalError::InvalidValue {
                    property: Property::Natoms,
                    reason: format!("atom count {value} is not a non-negative integer"),
                })
            }
        })
        .collect()
}

pub fn decode_cells(tensor: &DMatrix<f64>) -> Result<Vec<Matrix3<f64>>, EvalError> {
    if tensor.ncols() != 3 || tensor.nrows() % 3 != 0 {
        return Err(EvalError::InvalidValue {
            property: Property::Cell,
            reason: format!(
                "expected 3n x 3 stacked cells, found {} x {}",
                tensor.nrows(),
                tensor.ncols()
            ),
        });
    }
    Ok((0..tensor.nrows() / 3)
        .map(|s| Matrix3::from_fn(|i, j| tensor[(3 * s + i, j)]))
        .collect())
}

/// Expands the stored flags to one row per structure.
pub fn decode_pbc(tensor: &DMatrix<f64>, structures: usize) -> Result<Vec<[bool; 3]>, EvalError> {
    if tensor.ncols() != 3 {
        return Err(EvalError::InvalidValue {
            property: Property::Pbc,
            reason: format!("expected 3 flags per row, found {}", tensor.ncols()),
        });
    }
    let rows = (0..tensor.nrows())
        .map(|i| {
            let mut flags = [false; 3];
            for (j, flag) in flags.iter_mut().enumerate() {
                *flag = match tensor[(i, j)] {
                    v if v == 1.0 => true,
                    v if v == 0.0 => false,
                    v => {
                        return Err(EvalError::InvalidValue {
                            property: Property::Pbc,
                            reason: format!("flag {v} is neither 0 nor 1"),
                        });
                    }
                };
            }
            Ok(flags)
        })
        .collect::<Result<Vec<_>, _>>()?;

    match rows.len() {
        1 => Ok(vec![rows[0]; structures]),
        n if n == structures => Ok(rows),
        n => Err(EvalError::CountMismatch {
            context: "pbc rows vs structures",
            expected: structures,
            found: n,
        }),
    }
}

/// Partitions a per-atom tensor into one row block per structure.
pub fn split_by_natoms<'a>(
    tensor: &'a DMatrix<f64>,
    natoms: &[usize],
) -> Result<Vec<DMatrixView<'a, f64>>, EvalError> {
    let total: usize = natoms.iter().sum();
    if total != tensor.nrows() {
        return Err(EvalError::CountMismatch {
            context: "sum of natoms vs per-atom rows",
            expected: total,
            found: tensor.nrows(),
        });
    }

    let mut start = 0;
    Ok(natoms
        .iter()
        .map(|&n| {
            let block = tensor.rows(start, n);
            start += n;
            block
        })
        .collect())
}
