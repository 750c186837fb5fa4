use nalgebra::{SMatrix, SVector};
use std::f64::consts::FRAC_1_SQRT_2;

/// Number of independent anisotropic (l = 2) stress components.
pub const ANISOTROPIC_COMPONENTS: usize = 5;

/// Orthonormal change of basis between the irreducible representation of a
/// rank-2 tensor (1 scalar, 3 vector, 5 traceless-symmetric components) and
/// its flattened Cartesian form `[xx, xy, xz, yx, yy, yz, zx, zy, zz]`.
///
/// Row `k` holds the Cartesian coefficients of irrep component `k`.
pub fn change_of_basis() -> SMatrix<f64, 9, 9> {
    let s3 = 1.0 / 3f64.sqrt();
    let s6 = 1.0 / 6f64.sqrt();
    let s2 = FRAC_1_SQRT_2;

    #[rustfmt::skip]
    let rows = [
        s3,  0.0, 0.0, 0.0, s3,       0.0, 0.0, 0.0, s3,
        0.0, 0.0, 0.0, 0.0, 0.0,      s2,  0.0, -s2, 0.0,
        0.0, 0.0, -s2, 0.0, 0.0,      0.0, s2,  0.0, 0.0,
        0.0, s2,  0.0, -s2, 0.0,      0.0, 0.0, 0.0, 0.0,
        0.0, 0.0, s2,  0.0, 0.0,      0.0, s2,  0.0, 0.0,
        0.0, s2,  0.0, s2,  0.0,      0.0, 0.0, 0.0, 0.0,
        -s6, 0.0, 0.0, 0.0, 2.0 * s6, 0.0, 0.0, 0.0, -s6,
        0.0, 0.0, 0.0, 0.0, 0.0,      s2,  0.0, s2,  0.0,
        -s2, 0.0, 0.0, 0.0, 0.0,      0.0, 0.0, 0.0, s2,
    ];
    SMatrix::from_row_slice(&rows)
}

/// Rebuilds the flattened Cartesian stress of one structure from its
/// isotropic and anisotropic parts. The antisymmetric (vector) part is zero.
pub fn reconstruct_stress(
    isotropic: f64,
    anisotropic: &[f64; ANISOTROPIC_COMPONENTS],
) -> SVector<f64, 9> {
    let mut irreps = SVector::<f64, 9>::zeros();
    irreps[0] = isotropic;
    irreps.fixed_rows_mut::<ANISOTROPIC_COMPONENTS>(4)
        .copy_from_slice(anisotropic);
    change_of_basis().transpose() * irreps
}
