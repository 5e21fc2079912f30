use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use tracing::{error, info, warn};

use super::extract;
use super::iterations;
use super::schema::{CalculationLog, PowerFlowRequest, PowerFlowResult};
use crate::basic::{Diagnostics, PowerFlowSolver, SolveOptions, SolveOutcome, SolverError};
use crate::io::pandapower::Network;

pub const CONVERGED_MESSAGE: &str = "Power flow converged successfully";
pub const NOT_CONVERGED_MESSAGE: &str = "Power flow did not converge";

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "solver panicked".to_string()
    }
}

fn empty_result(converged: bool, message: String, log: CalculationLog) -> PowerFlowResult {
    PowerFlowResult {
        converged,
        message,
        iterations: log.iterations,
        calculation_log: log,
        res_bus: None,
        res_line: None,
        res_trafo: None,
        res_trafo3w: None,
        res_load: None,
        res_gen: None,
        res_sgen: None,
        res_ext_grid: None,
        res_shunt: None,
        max_loading_percent: None,
        min_vm_pu: None,
        max_vm_pu: None,
    }
}

/// Runs one power flow on `network` and turns every outcome into a result.
///
/// Solver errors and panics do not escape: they come back as a non-converged
/// result whose only warning is the failure text. The network's result tables
/// are cleared on every path that does not converge.
pub fn run_power_flow<S: PowerFlowSolver + ?Sized>(
    solver: &S,
    network: &mut Network,
    request: &PowerFlowRequest,
) -> PowerFlowResult {
    let max_iteration = iterations::resolve(&request.algorithm, request.max_iteration);
    let options = SolveOptions {
        algorithm: request.algorithm.clone(),
        max_iteration,
        enforce_q_lims: request.enforce_q_lims,
        calculate_voltage_angles: request.calculate_voltage_angles,
        init: request.init.clone(),
        tolerance_mva: request.tolerance_mva,
    };
    info!(
        algorithm = %options.algorithm,
        max_iteration,
        init = %options.init,
        tolerance_mva = options.tolerance_mva,
        "starting power flow"
    );

    let mut diagnostics = Diagnostics::new();
    let start = Instant::now();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        solver.solve(network, &options, &mut diagnostics)
    }))
    .unwrap_or_else(|payload| Err(SolverError::Numerical(panic_message(payload.as_ref()))));
    let time_ms = start.elapsed().as_secs_f64() * 1000.0;

    let mut log = CalculationLog {
        algorithm: options.algorithm,
        init_method: options.init,
        tolerance_mva: options.tolerance_mva,
        max_iteration,
        calculation_time_ms: Some(round2(time_ms)),
        iterations: None,
        warnings: Vec::new(),
        slack_p_mw: None,
        slack_q_mvar: None,
    };

    match outcome {
        Ok(SolveOutcome {
            converged: true,
            iterations,
        }) => {
            log.iterations = iterations;
            log.warnings = diagnostics.into_warnings();
            if let Some((p, q)) = extract::slack_power(network) {
                log.slack_p_mw = Some(p);
                log.slack_q_mvar = Some(q);
            }
            let mut result = empty_result(true, CONVERGED_MESSAGE.into(), log);
            extract::populate(&mut result, network);
            info!(
                converged = true,
                time_ms,
                min_vm_pu = ?result.min_vm_pu,
                max_vm_pu = ?result.max_vm_pu,
                max_loading_percent = ?result.max_loading_percent,
                "power flow converged"
            );
            result
        }
        Ok(SolveOutcome { iterations, .. }) => {
            network.clear_results();
            log.iterations = iterations;
            log.warnings = diagnostics.into_warnings();
            log.warnings.push(NOT_CONVERGED_MESSAGE.into());
            warn!(converged = false, algorithm = %log.algorithm, time_ms, "power flow did not converge");
            empty_result(false, NOT_CONVERGED_MESSAGE.into(), log)
        }
        Err(e) => {
            network.clear_results();
            let text = e.to_string();
            error!(error = %text, time_ms, "power flow calculation failed");
            log.warnings = vec![text.clone()];
            empty_result(false, format!("Power flow calculation failed: {text}"), log)
        }
    }
}
