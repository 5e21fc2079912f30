use nalgebra::DVector;
use nalgebra_sparse::{CscMatrix, CsrMatrix};
use num_complex::Complex64;

use super::newtonpf::{IterationOutcome, converged, mismatch};

/// Gauss-Seidel power flow.
///
/// Each sweep updates the PV nodes (reactive power re-estimated, magnitude
/// pinned to the set point) and then the PQ nodes in place. Convergence is
/// judged on the same mismatch vector as [`newton_pf`](super::newton_pf).
#[allow(non_snake_case)]
pub fn gauss_seidel_pf(
    Ybus: &CscMatrix<Complex64>,
    Sbus: &DVector<Complex64>,
    v_init: &DVector<Complex64>,
    pv: &[usize],
    pq: &[usize],
    tolerance: f64,
    max_iter: usize,
) -> IterationOutcome {
    let rows = CsrMatrix::from(Ybus);
    let pvpq: Vec<usize> = pv.iter().chain(pq).copied().collect();
    let v_set: Vec<f64> = pv.iter().map(|&k| v_init[k].norm()).collect();
    let mut v = v_init.clone();
    let mut s = Sbus.clone();

    let mut iterations = 0;
    loop {
        let F = mismatch(Ybus, Sbus, &v, &pvpq, pq);
        let failure = match converged(&F, tolerance) {
            Ok(true) => None,
            Ok(false) if iterations < max_iter => {
                iterations += 1;
                if let Err(reason) = sweep(&rows, &mut v, &mut s, pv, &v_set, pq) {
                    return IterationOutcome {
                        v,
                        iterations,
                        failure: Some(reason),
                    };
                }
                continue;
            }
            Ok(false) => Some(format!("maximum number of iterations ({max_iter}) reached")),
            Err(reason) => Some(reason),
        };
        return IterationOutcome {
            v,
            iterations,
            failure,
        };
    }
}

fn sweep(
    rows: &CsrMatrix<Complex64>,
    v: &mut DVector<Complex64>,
    s: &mut DVector<Complex64>,
    pv: &[usize],
    v_set: &[f64],
    pq: &[usize],
) -> Result<(), String> {
    for (k, &node) in pv.iter().enumerate() {
        let (current, y_kk) = row_current(rows, v, node);
        s[node].im = (v[node] * current.conj()).im;
        update(v, s, node, current, y_kk)?;
        let vm = v[node].norm();
        v[node] *= v_set[k] / vm;
    }
    for &node in pq {
        let (current, y_kk) = row_current(rows, v, node);
        update(v, s, node, current, y_kk)?;
    }
    Ok(())
}

/// `(Ybus[k, :] * v, Ybus[k, k])`
fn row_current(rows: &CsrMatrix<Complex64>, v: &DVector<Complex64>, k: usize) -> (Complex64, Complex64) {
    let row = rows.row(k);
    let mut current = Complex64::new(0.0, 0.0);
    let mut y_kk = Complex64::new(0.0, 0.0);
    for (&col, &y) in row.col_indices().iter().zip(row.values()) {
        current += y * v[col];
        if col == k {
            y_kk += y;
        }
    }
    (current, y_kk)
}

fn update(
    v: &mut DVector<Complex64>,
    s: &DVector<Complex64>,
    k: usize,
    current: Complex64,
    y_kk: Complex64,
) -> Result<(), String> {
    if y_kk.norm() == 0.0 {
        return Err(format!("node {k} has no self admittance"));
    }
    let vk = v[k];
    v[k] = vk + ((s[k] / vk).conj() - current) / y_kk;
    if v[k].is_finite() {
        Ok(())
    } else {
        Err("voltage update is no longer finite".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::dsbus_dv::power_injection;
    use nalgebra_sparse::CooMatrix;

    #[test]
    fn matches_load_flow_solution() {
        let y = Complex64::new(0.01, 0.1).inv();
        let mut coo = CooMatrix::new(3, 3);
        for (a, b) in [(0, 1), (1, 2)] {
            coo.push(a, a, y);
            coo.push(a, b, -y);
            coo.push(b, a, -y);
            coo.push(b, b, y);
        }
        let ybus = CscMatrix::from(&coo);
        let sbus = DVector::from_vec(vec![
            Complex64::new(0.0, 0.0),
            Complex64::new(0.2, 0.0),
            Complex64::new(-0.4, -0.1),
        ]);
        let v0 = DVector::from_vec(vec![
            Complex64::new(1.0, 0.0),
            Complex64::new(1.01, 0.0),
            Complex64::new(1.0, 0.0),
        ]);
        let out = gauss_seidel_pf(&ybus, &sbus, &v0, &[1], &[2], 1e-8, 1000);
        assert!(out.converged(), "{:?}", out.failure);
        assert!(out.iterations > 1);
        assert!((out.v[1].norm() - 1.01).abs() < 1e-12);
        let s = power_injection(&ybus, &out.v);
        assert!((s[2] - sbus[2]).norm() < 1e-7);
        assert!((s[1].re - 0.2).abs() < 1e-7);
    }

    #[test]
    fn stops_at_iteration_limit() {
        let y = Complex64::new(0.01, 0.1).inv();
        let mut coo = CooMatrix::new(2, 2);
        coo.push(0, 0, y);
        coo.push(0, 1, -y);
        coo.push(1, 0, -y);
        coo.push(1, 1, y);
        let ybus = CscMatrix::from(&coo);
        let sbus = DVector::from_vec(vec![Complex64::new(0.0, 0.0), Complex64::new(-0.5, -0.2)]);
        let v0 = DVector::from_element(2, Complex64::new(1.0, 0.0));
        let out = gauss_seidel_pf(&ybus, &sbus, &v0, &[], &[1], 1e-12, 1);
        assert!(!out.converged());
        assert_eq!(out.iterations, 1);
    }
}
