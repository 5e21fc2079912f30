use std::marker::PhantomData;
use std::str::FromStr;

use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CscMatrix};
use num_complex::Complex64;
use tracing::debug;

use super::dsbus_dv::power_injection;
use super::gausspf::gauss_seidel_pf;
use super::newtonpf::{IterationOutcome, newton_pf, positions};
use super::results::write_results;
use super::solver::{DefaultSolver, Solve};
use super::system::{NodeKind, PfSystem};
use super::{Diagnostics, PowerFlowSolver, SolveOptions, SolveOutcome, SolverError};
use crate::io::pandapower::Network;

/// Upper bound on PV to PQ switching passes when reactive limits are enforced.
const MAX_QLIM_PASSES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    NewtonRaphson,
    Iwamoto,
    GaussSeidel,
}

impl FromStr for Algorithm {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nr" => Ok(Algorithm::NewtonRaphson),
            "iwamoto_nr" => Ok(Algorithm::Iwamoto),
            "gs" => Ok(Algorithm::GaussSeidel),
            other => Err(SolverError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMethod {
    Auto,
    Flat,
    Dc,
    Results,
}

impl FromStr for InitMethod {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(InitMethod::Auto),
            "flat" => Ok(InitMethod::Flat),
            "dc" => Ok(InitMethod::Dc),
            "results" => Ok(InitMethod::Results),
            other => Err(SolverError::UnknownInit(other.to_string())),
        }
    }
}

/// The built-in AC power flow: polar Newton-Raphson (or Gauss-Seidel) over a
/// sparse `Ybus`, with the linear algebra delegated to `S`.
pub struct NewtonEngine<S = DefaultSolver> {
    _solver: PhantomData<fn() -> S>,
}

impl<S> Default for NewtonEngine<S> {
    fn default() -> Self {
        Self {
            _solver: PhantomData,
        }
    }
}

impl<S> std::fmt::Debug for NewtonEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewtonEngine").finish()
    }
}

impl NewtonEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_options(options: &SolveOptions) -> Result<(), SolverError> {
    if !(options.tolerance_mva.is_finite() && options.tolerance_mva > 0.0) {
        return Err(SolverError::InvalidParameter(format!(
            "tolerance_mva must be positive, got {}",
            options.tolerance_mva
        )));
    }
    if options.max_iteration == 0 {
        return Err(SolverError::InvalidParameter(
            "max_iteration must be at least 1".into(),
        ));
    }
    Ok(())
}

/// Voltage angles and magnitudes of the previous solution, by node.
fn previous_voltages(net: &Network, sys: &PfSystem) -> Option<DVector<Complex64>> {
    let res = net.res_bus.as_ref()?;
    let mut v = DVector::from_element(sys.n_nodes, Complex64::new(1.0, 0.0));
    let mut found = false;
    for bus in &net.bus {
        let Some(k) = sys.node_of(bus.index) else {
            continue;
        };
        if let (Some(vm), Some(va)) = (res.get(bus.index, "vm_pu"), res.get(bus.index, "va_degree"))
        {
            v[k] = Complex64::from_polar(vm, va.to_radians());
            found = true;
        }
    }
    found.then_some(v)
}

fn flat_start(sys: &PfSystem) -> DVector<Complex64> {
    DVector::from_iterator(
        sys.n_nodes,
        (0..sys.n_nodes).map(|k| match sys.kind[k] {
            NodeKind::Pq => Complex64::new(1.0, 0.0),
            _ => Complex64::from_polar(sys.v_set[k], sys.va_ref[k]),
        }),
    )
}

/// DC power flow estimate of the voltage angles:
/// `B[pvpq, pvpq] * theta = P[pvpq] - B[pvpq, ref] * theta_ref` with `B = -Im(Ybus)`.
fn dc_start<S: Solve + Default>(sys: &PfSystem) -> Result<DVector<Complex64>, &'static str> {
    let mut v = flat_start(sys);
    let pvpq: Vec<usize> = (0..sys.n_nodes)
        .filter(|&k| sys.kind[k] != NodeKind::Ref)
        .collect();
    if pvpq.is_empty() {
        return Ok(v);
    }
    let pos = positions(sys.n_nodes, &pvpq);
    let n = pvpq.len();
    let p = sys.s_bus();
    let mut rhs: Vec<f64> = pvpq.iter().map(|&k| p[k].re).collect();
    let mut coo = CooMatrix::new(n, n);
    for (r, c, y) in sys.ybus.triplet_iter() {
        let Some(i) = pos[r] else { continue };
        match pos[c] {
            Some(j) => coo.push(i, j, -y.im),
            None => rhs[i] += y.im * sys.va_ref[c],
        }
    }
    let b = CscMatrix::from(&coo);
    let (ap, ai, ax) = b.disassemble();
    let mut solver = S::default();
    solver.solve(&ap, &ai, &ax, &mut rhs, n)?;
    if rhs.iter().any(|t| !t.is_finite()) {
        return Err("angles are not finite");
    }
    for (i, &k) in pvpq.iter().enumerate() {
        v[k] = Complex64::from_polar(v[k].norm(), rhs[i]);
    }
    Ok(v)
}

impl<S: Solve + Default> NewtonEngine<S> {
    fn initial_voltages(
        &self,
        net: &Network,
        sys: &PfSystem,
        init: InitMethod,
        angles: bool,
        diag: &mut Diagnostics,
    ) -> DVector<Complex64> {
        let init = match init {
            InitMethod::Auto if angles => InitMethod::Dc,
            InitMethod::Auto => InitMethod::Flat,
            other => other,
        };
        match init {
            InitMethod::Results => match previous_voltages(net, sys) {
                Some(mut v) => {
                    // set points win over the stored state
                    for k in 0..sys.n_nodes {
                        if sys.kind[k] != NodeKind::Pq {
                            v[k] = Complex64::from_polar(sys.v_set[k], v[k].arg());
                        }
                        if sys.kind[k] == NodeKind::Ref {
                            v[k] = Complex64::from_polar(sys.v_set[k], sys.va_ref[k]);
                        }
                    }
                    v
                }
                None => {
                    diag.warn("init='results' requested but no previous results exist, using a flat start");
                    flat_start(sys)
                }
            },
            InitMethod::Dc => match dc_start::<S>(sys) {
                Ok(v) => v,
                Err(e) => {
                    diag.warn(format!("DC initialization failed ({e}), using a flat start"));
                    flat_start(sys)
                }
            },
            _ => flat_start(sys),
        }
    }

    fn iterate(
        &self,
        algorithm: Algorithm,
        sys: &PfSystem,
        v0: &DVector<Complex64>,
        options: &SolveOptions,
    ) -> IterationOutcome {
        let pv = sys.nodes_of(NodeKind::Pv);
        let pq = sys.nodes_of(NodeKind::Pq);
        let tol = options.tolerance_mva / sys.sn_mva;
        match algorithm {
            Algorithm::NewtonRaphson | Algorithm::Iwamoto => newton_pf(
                &sys.ybus,
                &sys.s_bus(),
                v0,
                &pv,
                &pq,
                Some(tol),
                Some(options.max_iteration),
                &mut S::default(),
            ),
            Algorithm::GaussSeidel => {
                gauss_seidel_pf(&sys.ybus, &sys.s_bus(), v0, &pv, &pq, tol, options.max_iteration)
            }
        }
    }
}

/// Switches PV nodes whose reactive output left `[q_min, q_max]` to PQ nodes
/// pinned at the violated limit. Returns the number of switched nodes.
fn enforce_q_limits(sys: &mut PfSystem, v: &DVector<Complex64>, diag: &mut Diagnostics) -> usize {
    let s_calc = power_injection(&sys.ybus, v);
    let mut switched = 0;
    for k in sys.nodes_of(NodeKind::Pv) {
        let q_gen = s_calc[k].im - sys.s_fixed[k].im;
        let limit = if q_gen > sys.q_max[k] {
            sys.q_max[k]
        } else if q_gen < sys.q_min[k] {
            sys.q_min[k]
        } else {
            continue;
        };
        sys.kind[k] = NodeKind::Pq;
        sys.q_forced[k] = Some(limit);
        switched += 1;
        diag.warn(format!(
            "generator reactive power limit reached ({:.4} Mvar), voltage control released",
            limit * sys.sn_mva
        ));
    }
    switched
}

impl<S: Solve + Default> PowerFlowSolver for NewtonEngine<S> {
    fn solve(
        &self,
        network: &mut Network,
        options: &SolveOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<SolveOutcome, SolverError> {
        let algorithm: Algorithm = options.algorithm.parse()?;
        let init: InitMethod = options.init.parse()?;
        check_options(options)?;

        let mut sys = PfSystem::build(network, options.calculate_voltage_angles, diagnostics)?;
        let mut v0 = self.initial_voltages(
            network,
            &sys,
            init,
            options.calculate_voltage_angles,
            diagnostics,
        );
        network.clear_results();

        let passes = if options.enforce_q_lims { MAX_QLIM_PASSES } else { 1 };
        let mut iterations = 0;
        let mut outcome = None;
        for pass in 0..passes {
            let run = self.iterate(algorithm, &sys, &v0, options);
            iterations += run.iterations;
            debug!(pass, iterations = run.iterations, converged = run.converged(), "power flow pass");
            if !run.converged() || !options.enforce_q_lims {
                outcome = Some(run);
                break;
            }
            if enforce_q_limits(&mut sys, &run.v, diagnostics) == 0 {
                outcome = Some(run);
                break;
            }
            if pass + 1 == passes {
                diagnostics.warn("reactive power limits still violated after the last switching pass");
                outcome = Some(run);
                break;
            }
            v0 = run.v;
        }

        let Some(run) = outcome else {
            return Err(SolverError::Numerical("no power flow pass was executed".into()));
        };
        if let Some(reason) = &run.failure {
            debug!(%reason, "power flow did not converge");
            return Ok(SolveOutcome {
                converged: false,
                iterations: Some(iterations),
            });
        }
        write_results(network, &sys, &run.v);
        network.converged = true;
        Ok(SolveOutcome {
            converged: true,
            iterations: Some(iterations),
        })
    }
}
