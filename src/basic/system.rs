use std::collections::{HashMap, HashSet, VecDeque};
use std::f64::consts::PI;

use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CscMatrix};
use num_complex::Complex64;

use super::{Diagnostics, SolverError};
use crate::io::pandapower::{Line, Network, Shunt, SwitchType, Transformer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Ref,
    Pv,
    Pq,
}

/// Two-port admittance of a branch between two solver nodes, in per unit.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BranchStamp {
    pub from: usize,
    pub to: usize,
    pub yff: Complex64,
    pub yft: Complex64,
    pub ytf: Complex64,
    pub ytt: Complex64,
}

impl BranchStamp {
    /// Per unit currents entering the branch at its from and to terminals.
    pub fn currents(&self, v: &DVector<Complex64>) -> (Complex64, Complex64) {
        let (vf, vt) = (v[self.from], v[self.to]);
        (
            self.yff * vf + self.yft * vt,
            self.ytf * vf + self.ytt * vt,
        )
    }

    fn stamp(&self, coo: &mut CooMatrix<Complex64>) {
        coo.push(self.from, self.from, self.yff);
        coo.push(self.from, self.to, self.yft);
        coo.push(self.to, self.from, self.ytf);
        coo.push(self.to, self.to, self.ytt);
    }
}

/// Minimal union-find used to merge buses joined by closed bus-bus switches.
struct Groups {
    parent: Vec<usize>,
}

impl Groups {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb.max(ra)] = ra.min(rb);
        }
    }
}

/// The per-unit equivalent of a [`Network`]: energized buses collapsed into
/// solver nodes, their kinds and set points, and the bus admittance matrix.
#[derive(Debug, Clone)]
pub(crate) struct PfSystem {
    pub sn_mva: f64,
    pub n_nodes: usize,
    /// Solver node of each bus row, `None` for de-energized buses.
    pub bus_node: Vec<Option<usize>>,
    bus_pos: HashMap<i64, usize>,
    pub kind: Vec<NodeKind>,
    pub v_set: Vec<f64>,
    /// Reference angles in radians.
    pub va_ref: Vec<f64>,
    /// Injection of static generators minus loads.
    pub s_fixed: Vec<Complex64>,
    /// Active power of voltage controlled, non-slack generators.
    pub p_gen: Vec<f64>,
    /// Reactive power pinned after a generator hit its limit.
    pub q_forced: Vec<Option<f64>>,
    pub q_min: Vec<f64>,
    pub q_max: Vec<f64>,
    /// Stamps aligned with `net.lines()` and `net.trafos()`.
    pub line_stamps: Vec<Option<BranchStamp>>,
    pub trafo_stamps: Vec<Option<BranchStamp>>,
    pub ybus: CscMatrix<Complex64>,
}

fn finite(element: &'static str, index: i64, values: &[f64]) -> Result<(), SolverError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SolverError::InvalidElement {
            element,
            index,
            reason: "parameters must be finite numbers".into(),
        })
    }
}

impl PfSystem {
    pub fn build(
        net: &Network,
        calculate_voltage_angles: bool,
        diag: &mut Diagnostics,
    ) -> Result<Self, SolverError> {
        if !(net.sn_mva.is_finite() && net.sn_mva > 0.0) {
            return Err(SolverError::InvalidParameter(format!(
                "sn_mva must be positive, got {}",
                net.sn_mva
            )));
        }
        let n_bus = net.bus.len();
        let mut bus_pos = HashMap::with_capacity(n_bus);
        for (pos, bus) in net.bus.iter().enumerate() {
            if bus_pos.insert(bus.index, pos).is_some() {
                return Err(SolverError::InvalidElement {
                    element: "bus",
                    index: bus.index,
                    reason: "duplicate bus index".into(),
                });
            }
        }
        let lookup = |element: &'static str, index: i64, bus: i64| {
            bus_pos
                .get(&bus)
                .copied()
                .ok_or(SolverError::UnknownBus {
                    element,
                    index,
                    bus,
                })
        };
        let energized = |pos: usize| net.bus[pos].in_service;

        // bus-bus switches and open branch switches
        let mut groups = Groups::new(n_bus);
        let mut open_lines = HashSet::new();
        let mut open_trafos = HashSet::new();
        for sw in net.switches() {
            let bus = lookup("switch", sw.index, sw.bus)?;
            match sw.et {
                SwitchType::SwitchTwoBuses if sw.closed => {
                    let other = lookup("switch", sw.index, sw.element)?;
                    if energized(bus) && energized(other) {
                        groups.union(bus, other);
                    }
                }
                SwitchType::SwitchBusLine if !sw.closed => {
                    open_lines.insert(sw.element);
                }
                SwitchType::SwitchBusTransformer if !sw.closed => {
                    open_trafos.insert(sw.element);
                }
                _ => {}
            }
        }

        // branch ends as bus rows, `None` when the branch carries no flow
        let mut line_ends = Vec::with_capacity(net.lines().len());
        for line in net.lines() {
            let f = lookup("line", line.index, line.from_bus)?;
            let t = lookup("line", line.index, line.to_bus)?;
            let active = line.in_service
                && energized(f)
                && energized(t)
                && !open_lines.contains(&line.index);
            line_ends.push(active.then_some((f, t)));
        }
        let mut trafo_ends = Vec::with_capacity(net.trafos().len());
        for trafo in net.trafos() {
            let f = lookup("trafo", trafo.index, trafo.hv_bus)?;
            let t = lookup("trafo", trafo.index, trafo.lv_bus)?;
            let active = trafo.in_service
                && energized(f)
                && energized(t)
                && !open_trafos.contains(&trafo.index);
            trafo_ends.push(active.then_some((f, t)));
        }
        for t3 in net.trafos3w() {
            let ends = [
                lookup("trafo3w", t3.index, t3.hv_bus)?,
                lookup("trafo3w", t3.index, t3.mv_bus)?,
                lookup("trafo3w", t3.index, t3.lv_bus)?,
            ];
            if t3.in_service && ends.iter().any(|&b| energized(b)) {
                return Err(SolverError::UnsupportedElement(format!(
                    "in-service three-winding transformer {}",
                    t3.index
                )));
            }
        }

        let mut adjacency: HashMap<usize, Vec<usize>> = HashMap::new();
        for &(f, t) in line_ends.iter().chain(trafo_ends.iter()).flatten() {
            let (gf, gt) = (groups.find(f), groups.find(t));
            adjacency.entry(gf).or_default().push(gt);
            adjacency.entry(gt).or_default().push(gf);
        }

        for load in net.loads() {
            lookup("load", load.index, load.bus)?;
        }
        for sgen in net.sgens() {
            lookup("sgen", sgen.index, sgen.bus)?;
        }
        for shunt in net.shunts() {
            lookup("shunt", shunt.index, shunt.bus)?;
        }

        // reference groups
        let mut sources = Vec::new();
        for eg in net.ext_grids() {
            let pos = lookup("ext_grid", eg.index, eg.bus)?;
            if eg.in_service && energized(pos) {
                sources.push(groups.find(pos));
            }
        }
        for g in net.gens() {
            let pos = lookup("gen", g.index, g.bus)?;
            if g.in_service && g.slack && energized(pos) {
                sources.push(groups.find(pos));
            }
        }
        if sources.is_empty() {
            return Err(SolverError::NoSlack);
        }

        let mut reached = HashSet::new();
        let mut queue: VecDeque<usize> = sources.iter().copied().collect();
        while let Some(g) = queue.pop_front() {
            if !reached.insert(g) {
                continue;
            }
            if let Some(next) = adjacency.get(&g) {
                queue.extend(next.iter().filter(|n| !reached.contains(*n)));
            }
        }

        let mut group_node: HashMap<usize, usize> = HashMap::new();
        let mut bus_node = vec![None; n_bus];
        let mut isolated = 0usize;
        for pos in 0..n_bus {
            if !energized(pos) {
                continue;
            }
            let g = groups.find(pos);
            if reached.contains(&g) {
                let next = group_node.len();
                bus_node[pos] = Some(*group_node.entry(g).or_insert(next));
            } else {
                isolated += 1;
            }
        }
        if isolated > 0 {
            diag.warn(format!(
                "{isolated} in-service bus(es) are not connected to a slack and were left out of the calculation"
            ));
        }
        let n_nodes = group_node.len();

        let mut sys = Self {
            sn_mva: net.sn_mva,
            n_nodes,
            bus_node,
            bus_pos,
            kind: vec![NodeKind::Pq; n_nodes],
            v_set: vec![1.0; n_nodes],
            va_ref: vec![0.0; n_nodes],
            s_fixed: vec![Complex64::new(0.0, 0.0); n_nodes],
            p_gen: vec![0.0; n_nodes],
            q_forced: vec![None; n_nodes],
            q_min: vec![0.0; n_nodes],
            q_max: vec![0.0; n_nodes],
            line_stamps: Vec::new(),
            trafo_stamps: Vec::new(),
            ybus: CscMatrix::zeros(n_nodes, n_nodes),
        };
        sys.assign_kinds(net, calculate_voltage_angles)?;
        sys.assign_injections(net)?;

        let mut coo = CooMatrix::new(n_nodes, n_nodes);
        for k in 0..n_nodes {
            coo.push(k, k, Complex64::new(0.0, 0.0));
        }
        for (line, ends) in net.lines().iter().zip(&line_ends) {
            let stamp = match ends {
                Some((f, t)) => match (sys.bus_node[*f], sys.bus_node[*t]) {
                    (Some(nf), Some(nt)) => {
                        let s = line_stamp(line, net, net.bus[*f].vn_kv, nf, nt)?;
                        s.stamp(&mut coo);
                        Some(s)
                    }
                    _ => None,
                },
                None => None,
            };
            sys.line_stamps.push(stamp);
        }
        for (trafo, ends) in net.trafos().iter().zip(&trafo_ends) {
            let stamp = match ends {
                Some((f, t)) => match (sys.bus_node[*f], sys.bus_node[*t]) {
                    (Some(nf), Some(nt)) => {
                        let s = trafo_stamp(
                            trafo,
                            net.sn_mva,
                            net.bus[*f].vn_kv,
                            net.bus[*t].vn_kv,
                            calculate_voltage_angles,
                            nf,
                            nt,
                        )?;
                        s.stamp(&mut coo);
                        Some(s)
                    }
                    _ => None,
                },
                None => None,
            };
            sys.trafo_stamps.push(stamp);
        }
        for shunt in net.shunts() {
            let Some(node) = sys.element_node(shunt.in_service, shunt.bus) else {
                continue;
            };
            finite("shunt", shunt.index, &[shunt.p_mw, shunt.q_mvar])?;
            coo.push(node, node, sys.shunt_admittance(net, shunt.bus, shunt));
        }
        sys.ybus = CscMatrix::from(&coo);
        Ok(sys)
    }

    fn assign_kinds(&mut self, net: &Network, angles: bool) -> Result<(), SolverError> {
        for eg in net.ext_grids() {
            let Some(node) = self.element_node(eg.in_service, eg.bus) else {
                continue;
            };
            finite("ext_grid", eg.index, &[eg.vm_pu, eg.va_degree])?;
            if self.kind[node] != NodeKind::Ref {
                self.kind[node] = NodeKind::Ref;
                self.v_set[node] = eg.vm_pu;
                self.va_ref[node] = if angles { eg.va_degree.to_radians() } else { 0.0 };
            }
        }
        for g in net.gens().iter().filter(|g| g.slack) {
            let Some(node) = self.element_node(g.in_service, g.bus) else {
                continue;
            };
            finite("gen", g.index, &[g.vm_pu])?;
            if self.kind[node] != NodeKind::Ref {
                self.kind[node] = NodeKind::Ref;
                self.v_set[node] = g.vm_pu;
            }
        }
        for g in net.gens().iter().filter(|g| !g.slack) {
            let Some(node) = self.element_node(g.in_service, g.bus) else {
                continue;
            };
            finite("gen", g.index, &[g.vm_pu])?;
            if self.kind[node] == NodeKind::Pq {
                self.kind[node] = NodeKind::Pv;
                self.v_set[node] = g.vm_pu;
            }
        }
        Ok(())
    }

    fn assign_injections(&mut self, net: &Network) -> Result<(), SolverError> {
        let sn = self.sn_mva;
        for load in net.loads() {
            if let Some(node) = self.element_node(load.in_service, load.bus) {
                finite("load", load.index, &[load.p_mw, load.q_mvar, load.scaling])?;
                self.s_fixed[node] -= Complex64::new(load.p_mw, load.q_mvar) * load.scaling / sn;
            }
        }
        for sgen in net.sgens() {
            if let Some(node) = self.element_node(sgen.in_service, sgen.bus) {
                finite("sgen", sgen.index, &[sgen.p_mw, sgen.q_mvar, sgen.scaling])?;
                self.s_fixed[node] += Complex64::new(sgen.p_mw, sgen.q_mvar) * sgen.scaling / sn;
            }
        }
        let mut limited = vec![true; self.n_nodes];
        for g in net.gens() {
            let Some(node) = self.element_node(g.in_service, g.bus) else {
                continue;
            };
            if !g.slack {
                finite("gen", g.index, &[g.p_mw, g.scaling])?;
                self.p_gen[node] += g.p_mw * g.scaling / sn;
            }
            match (g.min_q_mvar, g.max_q_mvar) {
                (Some(lo), Some(hi)) if lo.is_finite() && hi.is_finite() => {
                    self.q_min[node] += lo / sn;
                    self.q_max[node] += hi / sn;
                }
                _ => limited[node] = false,
            }
        }
        for (node, ok) in limited.into_iter().enumerate() {
            if !ok || self.kind[node] != NodeKind::Pv {
                self.q_min[node] = f64::NEG_INFINITY;
                self.q_max[node] = f64::INFINITY;
            }
        }
        Ok(())
    }

    /// Solver node of an element attached to `bus`, if the element takes part.
    pub fn element_node(&self, in_service: bool, bus: i64) -> Option<usize> {
        if !in_service {
            return None;
        }
        self.node_of(bus)
    }

    pub fn node_of(&self, bus: i64) -> Option<usize> {
        self.bus_pos.get(&bus).and_then(|&pos| self.bus_node[pos])
    }

    pub fn bus_vn_kv(&self, net: &Network, bus: i64) -> f64 {
        self.bus_pos
            .get(&bus)
            .map_or(f64::NAN, |&pos| net.bus[pos].vn_kv)
    }

    fn shunt_admittance(
        &self,
        net: &Network,
        bus: i64,
        shunt: &Shunt,
    ) -> Complex64 {
        let vn_bus = self.bus_vn_kv(net, bus);
        let ratio = if shunt.vn_kv.is_finite() && shunt.vn_kv > 0.0 {
            (vn_bus / shunt.vn_kv).powi(2)
        } else {
            1.0
        };
        Complex64::new(shunt.p_mw, -shunt.q_mvar) * shunt.step as f64 / self.sn_mva * ratio
    }

    /// Specified complex injection per node.
    pub fn s_bus(&self) -> DVector<Complex64> {
        DVector::from_iterator(
            self.n_nodes,
            (0..self.n_nodes).map(|k| {
                let mut s = self.s_fixed[k] + self.p_gen[k];
                if let Some(q) = self.q_forced[k] {
                    s += Complex64::new(0.0, q);
                }
                s
            }),
        )
    }

    pub fn nodes_of(&self, kind: NodeKind) -> Vec<usize> {
        (0..self.n_nodes).filter(|&k| self.kind[k] == kind).collect()
    }
}

fn line_stamp(
    line: &Line,
    net: &Network,
    vn_kv: f64,
    from: usize,
    to: usize,
) -> Result<BranchStamp, SolverError> {
    finite(
        "line",
        line.index,
        &[
            line.length_km,
            line.r_ohm_per_km,
            line.x_ohm_per_km,
            line.c_nf_per_km,
            line.g_us_per_km,
        ],
    )?;
    if line.parallel < 1 {
        return Err(SolverError::InvalidElement {
            element: "line",
            index: line.index,
            reason: format!("parallel must be at least 1, got {}", line.parallel),
        });
    }
    let parallel = line.parallel as f64;
    let zbase = vn_kv * vn_kv / net.sn_mva;
    let z = Complex64::new(line.r_ohm_per_km, line.x_ohm_per_km) * line.length_km
        / parallel
        / zbase;
    if z.norm() == 0.0 || !z.is_finite() {
        return Err(SolverError::InvalidElement {
            element: "line",
            index: line.index,
            reason: "zero impedance".into(),
        });
    }
    let ys = z.inv();
    let ysh = Complex64::new(
        line.g_us_per_km * 1e-6,
        2.0 * PI * net.f_hz * line.c_nf_per_km * 1e-9,
    ) * line.length_km
        * parallel
        * zbase;
    Ok(BranchStamp {
        from,
        to,
        yff: ys + ysh / 2.0,
        yft: -ys,
        ytf: -ys,
        ytt: ys + ysh / 2.0,
    })
}

/// Rated voltages after applying the tap changer, as `(vn_hv_kv, vn_lv_kv, shift)`.
fn tapped_ratings(trafo: &Transformer) -> (f64, f64, f64) {
    let (mut vn_hv, mut vn_lv, mut shift) = (trafo.vn_hv_kv, trafo.vn_lv_kv, trafo.shift_degree);
    let pos = trafo.tap_pos.filter(|v| v.is_finite());
    let neutral = trafo.tap_neutral.filter(|v| v.is_finite());
    if let (Some(pos), Some(neutral)) = (pos, neutral) {
        let steps = pos - neutral;
        if let Some(step) = trafo.tap_step_percent.filter(|v| v.is_finite()) {
            let factor = 1.0 + steps * step / 100.0;
            match trafo.tap_side.as_deref() {
                Some("lv") => vn_lv *= factor,
                Some("hv") => vn_hv *= factor,
                _ => {}
            }
        }
        if trafo.tap_phase_shifter {
            if let Some(deg) = trafo.tap_step_degree.filter(|v| v.is_finite()) {
                match trafo.tap_side.as_deref() {
                    Some("lv") => shift -= steps * deg,
                    _ => shift += steps * deg,
                }
            }
        }
    }
    (vn_hv, vn_lv, shift)
}

fn trafo_stamp(
    trafo: &Transformer,
    sn_net: f64,
    vn_hv_bus: f64,
    vn_lv_bus: f64,
    angles: bool,
    from: usize,
    to: usize,
) -> Result<BranchStamp, SolverError> {
    finite(
        "trafo",
        trafo.index,
        &[
            trafo.sn_mva,
            trafo.vn_hv_kv,
            trafo.vn_lv_kv,
            trafo.vk_percent,
            trafo.vkr_percent,
            trafo.pfe_kw,
            trafo.i0_percent,
            trafo.shift_degree,
        ],
    )?;
    let invalid = |reason: &str| SolverError::InvalidElement {
        element: "trafo",
        index: trafo.index,
        reason: reason.into(),
    };
    if trafo.sn_mva <= 0.0 || trafo.vn_hv_kv <= 0.0 || trafo.vn_lv_kv <= 0.0 {
        return Err(invalid("ratings must be positive"));
    }
    if trafo.vk_percent <= 0.0 {
        return Err(invalid("zero impedance"));
    }
    if trafo.parallel < 1 {
        return Err(invalid("parallel must be at least 1"));
    }
    let parallel = trafo.parallel as f64;
    let (vn_hv, vn_lv, shift) = tapped_ratings(trafo);

    // short circuit impedance, referred to the lv side on the network base
    let zk = trafo.vk_percent / 100.0;
    let rk = trafo.vkr_percent / 100.0;
    let xk = (zk * zk - rk * rk).max(0.0).sqrt();
    let base = (trafo.vn_lv_kv / vn_lv_bus).powi(2) * sn_net / trafo.sn_mva;
    let z = Complex64::new(rk, xk) * base / parallel;
    if z.norm() == 0.0 || !z.is_finite() {
        return Err(invalid("zero impedance"));
    }
    let ys = z.inv();

    // magnetizing branch
    let g = trafo.pfe_kw / 1000.0 / trafo.sn_mva;
    let y0 = trafo.i0_percent / 100.0;
    let b = (y0 * y0 - g * g).max(0.0).sqrt();
    let ym = Complex64::new(g, -b) / base * parallel;

    let ratio = (vn_hv / vn_hv_bus) / (vn_lv / vn_lv_bus);
    let phase = if angles { shift.to_radians() } else { 0.0 };
    let t = Complex64::from_polar(ratio, phase);
    let y_half = ys + ym / 2.0;
    Ok(BranchStamp {
        from,
        to,
        yff: y_half / t.norm_sqr(),
        yft: -ys / t.conj(),
        ytf: -ys / t,
        ytt: y_half,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::pandapower::NetworkBuilder;

    fn three_bus() -> NetworkBuilder {
        let mut b = NetworkBuilder::new(50.0, 100.0);
        let b0 = b.bus("a", 110.0);
        let b1 = b.bus("b", 110.0);
        let b2 = b.bus("c", 110.0);
        b.ext_grid(b0, 1.02, 0.0);
        b.line(b0, b1, "l0", 10.0, 0.1, 0.4, 10.0, 0.5);
        b.line(b1, b2, "l1", 10.0, 0.1, 0.4, 10.0, 0.5);
        b.load(b2, "", 20.0, 5.0);
        b
    }

    #[test]
    fn ybus_rows_sum_to_shunt_terms() {
        let net = three_bus().build();
        let mut diag = Diagnostics::new();
        let sys = PfSystem::build(&net, true, &mut diag).unwrap();
        assert_eq!(sys.n_nodes, 3);
        assert_eq!(sys.kind[0], NodeKind::Ref);
        let mut row_sum = [Complex64::new(0.0, 0.0); 3];
        for (r, _, y) in sys.ybus.triplet_iter() {
            row_sum[r] += y;
        }
        // only line charging remains; it is purely capacitive
        for s in row_sum {
            assert!(s.re.abs() < 1e-9);
            assert!(s.im > 0.0);
        }
        assert!((sys.s_fixed[2] - Complex64::new(-0.2, -0.05)).norm() < 1e-12);
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn closed_bus_switch_merges_nodes() {
        let mut b = three_bus();
        let b3 = b.bus("d", 110.0);
        b.switch(2, b3, SwitchType::SwitchTwoBuses, true);
        let net = b.build();
        let sys = PfSystem::build(&net, true, &mut Diagnostics::new()).unwrap();
        assert_eq!(sys.n_nodes, 3);
        assert_eq!(sys.bus_node[2], sys.bus_node[3]);
    }

    #[test]
    fn open_line_switch_isolates_downstream_buses() {
        let mut b = three_bus();
        b.switch(1, 1, SwitchType::SwitchBusLine, false);
        let net = b.build();
        let mut diag = Diagnostics::new();
        let sys = PfSystem::build(&net, true, &mut diag).unwrap();
        assert_eq!(sys.n_nodes, 2);
        assert_eq!(sys.bus_node[2], None);
        assert!(sys.line_stamps[1].is_none());
        assert_eq!(diag.warnings().len(), 1);
    }

    #[test]
    fn missing_slack_is_an_error() {
        let mut net = three_bus().build();
        net.ext_grid = None;
        assert!(matches!(
            PfSystem::build(&net, true, &mut Diagnostics::new()),
            Err(SolverError::NoSlack)
        ));
    }

    #[test]
    fn unknown_bus_reference_is_an_error() {
        let mut b = three_bus();
        b.load(42, "ghost", 1.0, 0.0);
        let net = b.build();
        assert!(matches!(
            PfSystem::build(&net, true, &mut Diagnostics::new()),
            Err(SolverError::UnknownBus { element: "load", bus: 42, .. })
        ));
    }

    #[test]
    fn zero_impedance_line_is_rejected() {
        let mut b = three_bus();
        b.line(0, 2, "short", 1.0, 0.0, 0.0, 0.0, 1.0);
        let net = b.build();
        assert!(matches!(
            PfSystem::build(&net, true, &mut Diagnostics::new()),
            Err(SolverError::InvalidElement { element: "line", .. })
        ));
    }

    #[test]
    fn trafo_without_tap_or_shift_is_symmetric() {
        let mut b = NetworkBuilder::new(50.0, 1.0);
        let hv = b.bus("hv", 110.0);
        let lv = b.bus("lv", 20.0);
        b.ext_grid(hv, 1.0, 0.0);
        b.trafo(hv, lv, "t", 25.0, 110.0, 20.0, 12.0, 0.4, 0.0);
        let net = b.build();
        let sys = PfSystem::build(&net, true, &mut Diagnostics::new()).unwrap();
        let s = sys.trafo_stamps[0].unwrap();
        assert!((s.yft - s.ytf).norm() < 1e-12);
        assert!((s.yff - s.ytt).norm() < 1e-12);
        // |z| = vk * sn_net / sn_trafo
        assert!((s.yft.inv().norm() - 0.12 / 25.0).abs() < 1e-12);
    }
}
