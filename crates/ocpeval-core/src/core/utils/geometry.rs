use nalgebra::{Matrix3, Vector3};

/// Maps a fractional coordinate difference onto the minimum image.
///
/// The modulo is applied twice: for tiny negative inputs the first
/// `rem_euclid` can round up to exactly `1.0`.
#[inline]
fn wrap_fractional(value: f64) -> f64 {
    let wrapped = value.rem_euclid(1.0).rem_euclid(1.0);
    if wrapped > 0.5 { wrapped - 1.0 } else { wrapped }
}

/// Displacements `pred - target` under the minimum-image convention.
///
/// Cartesian differences are taken into fractional coordinates of `cell`
/// (lattice vectors as rows), wrapped along every periodic axis, and brought
/// back to Cartesian space. Non-periodic axes pass through unchanged: neither
/// the modulo nor the `> 0.5` shift touches them, so a slab's vacuum direction
/// keeps its full displacement.
///
/// Both slices must have the same length. Returns `None` if `cell` is singular.
pub fn min_diff(
    pred: &[Vector3<f64>],
    target: &[Vector3<f64>],
    cell: &Matrix3<f64>,
    pbc: [bool; 3],
) -> Option<Vec<Vector3<f64>>> {
    debug_assert_eq!(pred.len(), target.len());

    let cell_t = cell.transpose();
    let to_fractional = cell_t.try_inverse()?;

    Some(
        pred.iter()
            .zip(target)
            .map(|(p, t)| {
                let mut fractional = to_fractional * (p - t);
                for (axis, &periodic) in pbc.iter().enumerate() {
                    if periodic {
                        fractional[axis] = wrap_fractional(fractional[axis]);
                    }
                }
                cell_t * fractional
            })
            .collect(),
    )
}

/// Mean Euclidean length of the minimum-image displacements.
///
/// An empty structure has no defined mean and yields `NaN`.
pub fn mean_displacement(
    pred: &[Vector3<f64>],
    target: &[Vector3<f64>],
    cell: &Matrix3<f64>,
    pbc: [bool; 3],
) -> Option<f64> {
    let diffs = min_diff(pred, target, cell, pbc)?;
    let sum: f64 = diffs.iter().map(|d| d.norm()).sum();
    Some(sum / diffs.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn vec3_approx_equal(a: &Vector3<f64>, b: &Vector3<f64>) -> bool {
        (a - b).norm() < TOLERANCE
    }

    #[test]
    fn wrap_fractional_maps_into_centered_unit_interval() {
        for value in [-3.7, -0.5, -0.2, 0.0, 0.3, 0.5, 0.9, 1.2, 5.75] {
            let wrapped = wrap_fractional(value);
            assert!((-0.5..=0.5).contains(&wrapped), "{value} -> {wrapped}");
        }
    }

    #[test]
    fn wrap_fractional_handles_tiny_negative_residue() {
        assert_eq!(wrap_fractional(-1e-18), 0.0);
    }

    #[test]
    fn min_diff_wraps_large_displacement_in_unit_cube() {
        let diffs = min_diff(
            &[Vector3::new(0.9, 0.0, 0.0)],
            &[Vector3::zeros()],
            &Matrix3::identity(),
            [true, true, true],
        )
        .unwrap();
        assert!(vec3_approx_equal(&diffs[0], &Vector3::new(-0.1, 0.0, 0.0)));
    }

    #[test]
    fn min_diff_leaves_non_periodic_axis_untouched() {
        let diffs = min_diff(
            &[Vector3::new(0.9, 0.9, 0.9)],
            &[Vector3::zeros()],
            &Matrix3::identity(),
            [true, false, false],
        )
        .unwrap();
        assert!(vec3_approx_equal(&diffs[0], &Vector3::new(-0.1, 0.9, 0.9)));
    }

    #[test]
    fn min_diff_without_periodicity_is_plain_difference() {
        let pred = Vector3::new(2.7, 0.6, -1.4);
        let target = Vector3::new(0.1, 0.0, 0.2);
        let diffs = min_diff(&[pred], &[target], &Matrix3::identity(), [false; 3]).unwrap();
        assert!(vec3_approx_equal(&diffs[0], &(pred - target)));
    }

    #[test]
    fn min_diff_scales_with_cell_size() {
        let cell = Matrix3::from_diagonal_element(2.0);
        let diffs = min_diff(
            &[Vector3::new(1.5, -0.7, 0.4)],
            &[Vector3::zeros()],
            &cell,
            [true, true, true],
        )
        .unwrap();
        assert!(vec3_approx_equal(&diffs[0], &Vector3::new(-0.5, -0.7, 0.4)));
    }

    #[test]
    fn min_diff_handles_skewed_cell() {
        let cell = Matrix3::new(
            1.0, 0.0, 0.0, //
            0.5, 1.0, 0.0, //
            0.0, 0.0, 1.0,
        );
        // One full lattice vector b away is the same image.
        let diffs = min_diff(
            &[Vector3::new(0.5, 1.0, 0.0)],
            &[Vector3::zeros()],
            &cell,
            [true, true, true],
        )
        .unwrap();
        assert!(vec3_approx_equal(&diffs[0], &Vector3::zeros()));
    }

    #[test]
    fn min_diff_returns_none_for_singular_cell() {
        let cell = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, 0.0));
        let result = min_diff(
            &[Vector3::zeros()],
            &[Vector3::zeros()],
            &cell,
            [true, true, true],
        );
        assert!(result.is_none());
    }

    #[test]
    fn mean_displacement_averages_norms() {
        let pred = [Vector3::new(0.3, 0.0, 0.0), Vector3::new(0.0, 0.4, 0.3)];
        let target = [Vector3::zeros(), Vector3::zeros()];
        let mean = mean_displacement(&pred, &target, &(Matrix3::identity() * 10.0), [true; 3]);
        assert!((mean.unwrap() - 0.4).abs() < TOLERANCE);
    }

    #[test]
    fn mean_displacement_of_empty_structure_is_nan() {
        let mean = mean_displacement(&[], &[], &Matrix3::identity(), [true; 3]);
        assert!(mean.unwrap().is_nan());
    }
}
