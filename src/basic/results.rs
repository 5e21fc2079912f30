use std::collections::HashMap;

use nalgebra::DVector;
use num_complex::Complex64;

use super::dsbus_dv::power_injection;
use super::system::{BranchStamp, PfSystem};
use crate::io::pandapower::{Network, ResultTable};

const SQRT3: f64 = 1.732_050_807_568_877_2;

/// Node level bookkeeping of how much power every controllable element
/// injects once the solved state is known.
struct Shares {
    /// Active power each slack element injects, MW.
    slack_p: Vec<f64>,
    /// Reactive power each voltage controlling element injects, Mvar.
    ctrl_q: Vec<f64>,
}

fn shares(net: &Network, sys: &PfSystem, s_calc: &DVector<Complex64>) -> Shares {
    let n = sys.n_nodes;
    let mut n_slack = vec![0usize; n];
    let mut n_ctrl = vec![0usize; n];
    for eg in net.ext_grids() {
        if let Some(k) = sys.element_node(eg.in_service, eg.bus) {
            n_slack[k] += 1;
            n_ctrl[k] += 1;
        }
    }
    for g in net.gens() {
        if let Some(k) = sys.element_node(g.in_service, g.bus) {
            if g.slack {
                n_slack[k] += 1;
            }
            n_ctrl[k] += 1;
        }
    }
    let mut slack_p = vec![0.0; n];
    let mut ctrl_q = vec![0.0; n];
    for k in 0..n {
        let residual = (s_calc[k] - sys.s_fixed[k] - sys.p_gen[k]) * sys.sn_mva;
        if n_slack[k] > 0 {
            slack_p[k] = residual.re / n_slack[k] as f64;
        }
        if n_ctrl[k] > 0 {
            ctrl_q[k] = residual.im / n_ctrl[k] as f64;
        }
    }
    Shares { slack_p, ctrl_q }
}

fn polar(v: Complex64) -> (f64, f64) {
    (v.norm(), v.arg().to_degrees())
}

/// Writes every `res_*` table for a converged state `v`.
pub(crate) fn write_results(net: &mut Network, sys: &PfSystem, v: &DVector<Complex64>) {
    let s_calc = power_injection(&sys.ybus, v);
    let shares = shares(net, sys, &s_calc);
    let sn = sys.sn_mva;
    let nan = f64::NAN;
    let bus_v = |bus: i64| {
        sys.node_of(bus)
            .map_or((nan, nan), |k| polar(v[k]))
    };

    // element consumption per bus index, accumulated while writing element tables
    let mut bus_pq: HashMap<i64, (f64, f64)> = HashMap::new();
    let mut consume = |bus: i64, p: f64, q: f64| {
        let e = bus_pq.entry(bus).or_insert((0.0, 0.0));
        e.0 += p;
        e.1 += q;
    };

    if !net.loads().is_empty() {
        let mut t = ResultTable::new(&["p_mw", "q_mvar"]);
        for load in net.loads() {
            let (p, q) = match sys.element_node(load.in_service, load.bus) {
                Some(_) => (load.p_mw * load.scaling, load.q_mvar * load.scaling),
                None => (0.0, 0.0),
            };
            consume(load.bus, p, q);
            t.push(load.index, &[p, q]);
        }
        net.res_load = Some(t);
    }

    if !net.sgens().is_empty() {
        let mut t = ResultTable::new(&["p_mw", "q_mvar"]);
        for sgen in net.sgens() {
            let (p, q) = match sys.element_node(sgen.in_service, sgen.bus) {
                Some(_) => (sgen.p_mw * sgen.scaling, sgen.q_mvar * sgen.scaling),
                None => (0.0, 0.0),
            };
            consume(sgen.bus, -p, -q);
            t.push(sgen.index, &[p, q]);
        }
        net.res_sgen = Some(t);
    }

    if !net.shunts().is_empty() {
        let mut t = ResultTable::new(&["p_mw", "q_mvar", "vm_pu"]);
        for shunt in net.shunts() {
            let row = match sys.element_node(shunt.in_service, shunt.bus) {
                Some(k) => {
                    let vm = v[k].norm();
                    let vn_bus = sys.bus_vn_kv(net, shunt.bus);
                    let ratio = if shunt.vn_kv.is_finite() && shunt.vn_kv > 0.0 {
                        (vn_bus / shunt.vn_kv).powi(2)
                    } else {
                        1.0
                    };
                    let scale = vm * vm * ratio * shunt.step as f64;
                    [shunt.p_mw * scale, shunt.q_mvar * scale, vm]
                }
                None => [0.0, 0.0, nan],
            };
            consume(shunt.bus, row[0], row[1]);
            t.push(shunt.index, &row);
        }
        net.res_shunt = Some(t);
    }

    if !net.ext_grids().is_empty() {
        let mut t = ResultTable::new(&["p_mw", "q_mvar"]);
        for eg in net.ext_grids() {
            let (p, q) = match sys.element_node(eg.in_service, eg.bus) {
                Some(k) => (shares.slack_p[k], shares.ctrl_q[k]),
                None => (0.0, 0.0),
            };
            consume(eg.bus, -p, -q);
            t.push(eg.index, &[p, q]);
        }
        net.res_ext_grid = Some(t);
    }

    if !net.gens().is_empty() {
        let mut t = ResultTable::new(&["p_mw", "q_mvar", "va_degree", "vm_pu"]);
        for g in net.gens() {
            let row = match sys.element_node(g.in_service, g.bus) {
                Some(k) => {
                    let p = if g.slack {
                        shares.slack_p[k]
                    } else {
                        g.p_mw * g.scaling
                    };
                    let (vm, va) = polar(v[k]);
                    [p, shares.ctrl_q[k], va, vm]
                }
                None => [0.0, 0.0, nan, nan],
            };
            consume(g.bus, -row[0], -row[1]);
            t.push(g.index, &row);
        }
        net.res_gen = Some(t);
    }

    let mut t = ResultTable::new(&["vm_pu", "va_degree", "p_mw", "q_mvar"]);
    for bus in &net.bus {
        let row = match sys.node_of(bus.index) {
            Some(k) => {
                let (vm, va) = polar(v[k]);
                let (p, q) = bus_pq.get(&bus.index).copied().unwrap_or((0.0, 0.0));
                [vm, va, p, q]
            }
            None => [nan; 4],
        };
        t.push(bus.index, &row);
    }
    net.res_bus = Some(t);

    if !net.lines().is_empty() {
        let mut t = ResultTable::new(&[
            "p_from_mw",
            "q_from_mvar",
            "p_to_mw",
            "q_to_mvar",
            "pl_mw",
            "ql_mvar",
            "i_from_ka",
            "i_to_ka",
            "i_ka",
            "vm_from_pu",
            "va_from_degree",
            "vm_to_pu",
            "va_to_degree",
            "loading_percent",
        ]);
        for (line, stamp) in net.lines().iter().zip(&sys.line_stamps) {
            let (vm_f, va_f) = bus_v(line.from_bus);
            let (vm_t, va_t) = bus_v(line.to_bus);
            let vn_kv = sys.bus_vn_kv(net, line.from_bus);
            let row = match stamp {
                Some(stamp) => {
                    let flow = BranchFlow::new(stamp, v, sn);
                    let i_f = flow.i_from_pu * sn / (SQRT3 * vn_kv);
                    let i_t = flow.i_to_pu * sn / (SQRT3 * vn_kv);
                    let i_ka = i_f.max(i_t);
                    let rating = line.max_i_ka * line.df * line.parallel as f64;
                    [
                        flow.s_from.re,
                        flow.s_from.im,
                        flow.s_to.re,
                        flow.s_to.im,
                        flow.s_from.re + flow.s_to.re,
                        flow.s_from.im + flow.s_to.im,
                        i_f,
                        i_t,
                        i_ka,
                        vm_f,
                        va_f,
                        vm_t,
                        va_t,
                        i_ka / rating * 100.0,
                    ]
                }
                None => [
                    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, vm_f, va_f, vm_t, va_t, 0.0,
                ],
            };
            t.push(line.index, &row);
        }
        net.res_line = Some(t);
    }

    if !net.trafos().is_empty() {
        let mut t = ResultTable::new(&[
            "p_hv_mw",
            "q_hv_mvar",
            "p_lv_mw",
            "q_lv_mvar",
            "pl_mw",
            "ql_mvar",
            "i_hv_ka",
            "i_lv_ka",
            "vm_hv_pu",
            "va_hv_degree",
            "vm_lv_pu",
            "va_lv_degree",
            "loading_percent",
        ]);
        for (trafo, stamp) in net.trafos().iter().zip(&sys.trafo_stamps) {
            let (vm_h, va_h) = bus_v(trafo.hv_bus);
            let (vm_l, va_l) = bus_v(trafo.lv_bus);
            let row = match stamp {
                Some(stamp) => {
                    let flow = BranchFlow::new(stamp, v, sn);
                    let i_h = flow.i_from_pu * sn / (SQRT3 * sys.bus_vn_kv(net, trafo.hv_bus));
                    let i_l = flow.i_to_pu * sn / (SQRT3 * sys.bus_vn_kv(net, trafo.lv_bus));
                    let loading = (i_h * trafo.vn_hv_kv).max(i_l * trafo.vn_lv_kv) * SQRT3
                        / (trafo.sn_mva * trafo.parallel as f64 * trafo.df)
                        * 100.0;
                    [
                        flow.s_from.re,
                        flow.s_from.im,
                        flow.s_to.re,
                        flow.s_to.im,
                        flow.s_from.re + flow.s_to.re,
                        flow.s_from.im + flow.s_to.im,
                        i_h,
                        i_l,
                        vm_h,
                        va_h,
                        vm_l,
                        va_l,
                        loading,
                    ]
                }
                None => [
                    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, vm_h, va_h, vm_l, va_l, 0.0,
                ],
            };
            t.push(trafo.index, &row);
        }
        net.res_trafo = Some(t);
    }

    if !net.trafos3w().is_empty() {
        // only de-energized three-winding transformers reach this point
        let columns = [
            "p_hv_mw",
            "q_hv_mvar",
            "p_mv_mw",
            "q_mv_mvar",
            "p_lv_mw",
            "q_lv_mvar",
            "pl_mw",
            "ql_mvar",
            "i_hv_ka",
            "i_mv_ka",
            "i_lv_ka",
            "loading_percent",
        ];
        let mut t = ResultTable::new(&columns);
        for t3 in net.trafos3w() {
            t.push(t3.index, &[0.0; 12]);
        }
        net.res_trafo3w = Some(t);
    }
}

/// Terminal powers (MVA) and current magnitudes (pu) of one branch.
struct BranchFlow {
    s_from: Complex64,
    s_to: Complex64,
    i_from_pu: f64,
    i_to_pu: f64,
}

impl BranchFlow {
    fn new(stamp: &BranchStamp, v: &DVector<Complex64>, sn_mva: f64) -> Self {
        let (i_f, i_t) = stamp.currents(v);
        Self {
            s_from: v[stamp.from] * i_f.conj() * sn_mva,
            s_to: v[stamp.to] * i_t.conj() * sn_mva,
            i_from_pu: i_f.norm(),
            i_to_pu: i_t.norm(),
        }
    }
}
