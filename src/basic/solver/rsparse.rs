use rsparse::{
    data::{self, Numeric, Symb},
    lsolve, lu, sqr, usolve,
};

use super::Solve;

/// Sparse LU solver backed by `rsparse`. The symbolic analysis is computed on
/// the first call and reused until [`Solve::reset`].
#[derive(Default)]
pub struct RSparseSolver {
    x: Vec<f64>,
    symbolic: Option<Symb>,
}

#[allow(non_snake_case)]
impl Solve for RSparseSolver {
    fn solve(
        &mut self,
        Ap: &[usize],
        Ai: &[usize],
        Ax: &[f64],
        b: &mut [f64],
        n: usize,
    ) -> Result<(), &'static str> {
        if Ap.len() != n + 1 || b.len() != n {
            return Err("dimension mismatch");
        }
        // rsparse's symbolic analysis needs at least two columns
        if n < 2 {
            return solve_scalar(Ax, b);
        }
        let a = data::Sprs {
            m: n,
            n,
            i: Ai.to_vec(),
            p: Ap.iter().map(|&v| v as isize).collect(),
            x: Ax.to_vec(),
            nzmax: Ax.len(),
        };
        let s = self.symbolic.get_or_insert_with(|| sqr(&a, 1, false));
        if self.x.len() != n {
            self.x = vec![0.0; n];
        }
        let x = &mut self.x;
        let num = lu(&a, s, 1e-6).map_err(|_| "LU factorization failed")?; // numeric LU factorization
        ipvec(&num.pinv, b, &mut x[..]); // x = P*b
        lsolve(&num.l, x); // x = L\x
        usolve(&num.u, x); // x = U\x
        ipvec(&s.q, &x[..], b); // b = Q*x
        Ok(())
    }

    fn reset(&mut self) {
        self.symbolic = None;
    }
}

#[allow(non_snake_case)]
fn solve_scalar(Ax: &[f64], b: &mut [f64]) -> Result<(), &'static str> {
    let Some(x) = b.first_mut() else {
        return Ok(());
    };
    let pivot: f64 = Ax.iter().sum();
    if pivot == 0.0 || !pivot.is_finite() {
        return Err("LU factorization failed");
    }
    *x /= pivot;
    Ok(())
}

fn ipvec_identity<T: Numeric<T>>(b: &[T], x: &mut [T]) {
    x.copy_from_slice(b);
}

fn ipvec_perm<T: Numeric<T>>(p: &[isize], b: &[T], x: &mut [T]) {
    for k in 0..b.len() {
        x[p[k] as usize] = b[k];
    }
}

fn ipvec<T: Numeric<T>>(p: &Option<Vec<isize>>, b: &[T], x: &mut [T]) {
    match p {
        Some(pvec) => ipvec_perm(pvec, b, x),
        None => ipvec_identity(b, x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_small_system() {
        // [4 1; 2 3] x = [1; 2]  ->  x = [0.1, 0.6]
        let ap = [0, 2, 4];
        let ai = [0, 1, 0, 1];
        let ax = [4.0, 2.0, 1.0, 3.0];
        let mut b = [1.0, 2.0];
        let mut solver = RSparseSolver::default();
        solver.solve(&ap, &ai, &ax, &mut b, 2).unwrap();
        assert!((b[0] - 0.1).abs() < 1e-12);
        assert!((b[1] - 0.6).abs() < 1e-12);

        // the cached analysis is reused for new values on the same pattern
        let ax = [2.0, 0.0, 0.0, 5.0];
        let mut b = [4.0, 10.0];
        solver.solve(&ap, &ai, &ax, &mut b, 2).unwrap();
        assert!((b[0] - 2.0).abs() < 1e-12);
        assert!((b[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn solves_single_unknown() {
        let mut solver = RSparseSolver::default();
        let mut b = [3.0];
        solver.solve(&[0, 1], &[0], &[-4.0], &mut b, 1).unwrap();
        assert_eq!(b[0], -0.75);

        let mut b = [1.0];
        assert!(solver.solve(&[0, 1], &[0], &[0.0], &mut b, 1).is_err());
        assert!(solver.solve(&[0, 0], &[], &[], &mut b, 1).is_err());

        let mut empty: [f64; 0] = [];
        solver.solve(&[0], &[], &[], &mut empty, 0).unwrap();
    }
}
