use nalgebra::DVector;
use nalgebra_sparse::CscMatrix;
use num_complex::Complex64;

/// `Ybus * v` for a complex CSC matrix.
pub(crate) fn ybus_mul(ybus: &CscMatrix<Complex64>, v: &DVector<Complex64>) -> DVector<Complex64> {
    let mut out = DVector::zeros(ybus.nrows());
    for (i, j, y) in ybus.triplet_iter() {
        out[i] += y * v[j];
    }
    out
}

/// Bus power injections `S = V .* conj(Ybus V)`.
pub(crate) fn power_injection(
    ybus: &CscMatrix<Complex64>,
    v: &DVector<Complex64>,
) -> DVector<Complex64> {
    let ibus = ybus_mul(ybus, v);
    v.zip_map(&ibus, |vi, ii| vi * ii.conj())
}

/// Computes the partial derivatives of bus power injections with respect to
/// voltage magnitudes and angles.
///
/// The derivatives are evaluated entrywise over the sparsity pattern of
/// `Ybus`, yielding `(row, col, dS/dVm, dS/dVa)` for every stored entry.
///
/// # Notes
///
/// * `Ybus` must store every diagonal entry, even when it is zero.
/// * This method is from MatPower:
///  R. D. Zimmerman, "AC Power Flows, Generalized OPF Costs and
///  their Derivatives using Complex Matrix Notation", MATPOWER
///  Technical Note 2, February 2010.
#[allow(non_snake_case)]
pub(crate) fn dSbus_dV(
    Ybus: &CscMatrix<Complex64>,
    v: &DVector<Complex64>,
) -> Vec<(usize, usize, Complex64, Complex64)> {
    let ibus = ybus_mul(Ybus, v);
    let vnorm = v.map(|e| if e.norm() > 0.0 { e / e.norm() } else { Complex64::new(1.0, 0.0) });
    let j = Complex64::i();
    Ybus.triplet_iter()
        .map(|(r, c, y)| {
            let mut dS_dVm = v[r] * (y * vnorm[c]).conj();
            let mut dS_dVa = -j * v[r] * (y * v[c]).conj();
            if r == c {
                dS_dVm += ibus[r].conj() * vnorm[r];
                dS_dVa += j * v[r] * ibus[r].conj();
            }
            (r, c, dS_dVm, dS_dVa)
        })
        .collect()
}
