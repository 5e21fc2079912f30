use std::f64::consts::PI;

use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CscMatrix};
use num_complex::Complex64;

use super::dsbus_dv::{dSbus_dV, power_injection};
use super::solver::Solve;

/// Final state of an iterative solve: voltages, iterations used and, when the
/// solve did not converge, the reason.
#[derive(Debug, Clone)]
pub struct IterationOutcome {
    pub v: DVector<Complex64>,
    pub iterations: usize,
    pub failure: Option<String>,
}

impl IterationOutcome {
    pub fn converged(&self) -> bool {
        self.failure.is_none()
    }
}

/// Position of every node inside the state vector, `None` when the node
/// contributes no unknown of that kind.
pub(crate) fn positions(n: usize, nodes: &[usize]) -> Vec<Option<usize>> {
    let mut pos = vec![None; n];
    for (k, &node) in nodes.iter().enumerate() {
        pos[node] = Some(k);
    }
    pos
}

/// Mismatch vector `[dP(pv, pq); dQ(pq)]` in per unit.
#[allow(non_snake_case)]
pub(crate) fn mismatch(
    Ybus: &CscMatrix<Complex64>,
    Sbus: &DVector<Complex64>,
    v: &DVector<Complex64>,
    pvpq: &[usize],
    pq: &[usize],
) -> DVector<f64> {
    let mis = power_injection(Ybus, v) - Sbus;
    DVector::from_iterator(
        pvpq.len() + pq.len(),
        pvpq.iter()
            .map(|&k| mis[k].re)
            .chain(pq.iter().map(|&k| mis[k].im)),
    )
}

#[allow(non_snake_case)]
pub(crate) fn converged(F: &DVector<f64>, tol: f64) -> Result<bool, String> {
    if F.iter().any(|f| !f.is_finite()) {
        return Err("power mismatch is no longer finite".into());
    }
    Ok(F.iter().fold(0.0_f64, |m, f| m.max(f.abs())) < tol)
}

/// Assembles the real Jacobian
///
/// ```text
/// | dP/dVa(pvpq, pvpq)  dP/dVm(pvpq, pq) |
/// | dQ/dVa(pq, pvpq)    dQ/dVm(pq, pq)   |
/// ```
///
/// from the entrywise derivatives. The sparsity pattern only depends on
/// `Ybus` and the node partition, so symbolic factorizations stay valid for
/// the whole solve.
#[allow(non_snake_case)]
fn build_jacobian(
    Ybus: &CscMatrix<Complex64>,
    v: &DVector<Complex64>,
    pvpq_pos: &[Option<usize>],
    pq_pos: &[Option<usize>],
    npvpq: usize,
    n: usize,
) -> CscMatrix<f64> {
    let mut coo = CooMatrix::new(n, n);
    for (r, c, dS_dVm, dS_dVa) in dSbus_dV(Ybus, v) {
        if let Some(i) = pvpq_pos[r] {
            if let Some(j) = pvpq_pos[c] {
                coo.push(i, j, dS_dVa.re);
            }
            if let Some(j) = pq_pos[c] {
                coo.push(i, npvpq + j, dS_dVm.re);
            }
        }
        if let Some(i) = pq_pos[r] {
            if let Some(j) = pvpq_pos[c] {
                coo.push(npvpq + i, j, dS_dVa.im);
            }
            if let Some(j) = pq_pos[c] {
                coo.push(npvpq + i, npvpq + j, dS_dVm.im);
            }
        }
    }
    CscMatrix::from(&coo)
}

/// Newton-Raphson power flow in polar coordinates.
///
/// `pv` and `pq` list solver nodes by kind; every other node is a reference.
/// The tolerance applies to the largest per unit power mismatch.
#[allow(non_snake_case)]
#[allow(clippy::too_many_arguments)]
pub fn newton_pf<Solver: Solve>(
    Ybus: &CscMatrix<Complex64>,
    Sbus: &DVector<Complex64>,
    v_init: &DVector<Complex64>,
    pv: &[usize],
    pq: &[usize],
    tolerance: Option<f64>,
    max_iter: Option<usize>,
    solver: &mut Solver,
) -> IterationOutcome {
    let tol = tolerance.unwrap_or(1e-8);
    let max_iter = max_iter.unwrap_or(10);
    let n_nodes = v_init.len();
    let pvpq: Vec<usize> = pv.iter().chain(pq).copied().collect();
    let npvpq = pvpq.len();
    let num_state = npvpq + pq.len();
    let pvpq_pos = positions(n_nodes, &pvpq);
    let pq_pos = positions(n_nodes, pq);

    let mut v = v_init.clone();
    let mut v_m = v.map(|e| e.norm());
    let mut v_a = v.map(|e| e.arg());
    let mut F = mismatch(Ybus, Sbus, &v, &pvpq, pq);

    solver.reset();
    let mut iterations = 0;
    loop {
        match converged(&F, tol) {
            Ok(true) => {
                return IterationOutcome {
                    v,
                    iterations,
                    failure: None,
                };
            }
            Ok(false) if iterations < max_iter => {}
            Ok(false) => {
                return IterationOutcome {
                    v,
                    iterations,
                    failure: Some(format!(
                        "maximum number of iterations ({max_iter}) reached"
                    )),
                };
            }
            Err(reason) => {
                return IterationOutcome {
                    v,
                    iterations,
                    failure: Some(reason),
                };
            }
        }
        iterations += 1;

        let jacobian = build_jacobian(Ybus, &v, &pvpq_pos, &pq_pos, npvpq, num_state);
        let (Ap, Ai, Ax) = jacobian.disassemble();
        if let Err(e) = solver.solve(&Ap, &Ai, &Ax, F.as_mut_slice(), num_state) {
            return IterationOutcome {
                v,
                iterations,
                failure: Some(format!("Jacobian solve failed: {e}")),
            };
        }

        let dx = &F;
        for (k, &node) in pvpq.iter().enumerate() {
            v_a[node] = (v_a[node] - dx[k] + PI).rem_euclid(2.0 * PI) - PI;
        }
        for (k, &node) in pq.iter().enumerate() {
            v_m[node] -= dx[npvpq + k];
        }
        v.zip_zip_apply(&v_m, &v_a, |e, vm, va| *e = Complex64::from_polar(vm, va));
        F = mismatch(Ybus, Sbus, &v, &pvpq, pq);
    }
}
