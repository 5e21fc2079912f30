//! Bundled example networks.

use std::collections::BTreeMap;

use super::error::{Error, Result};
use super::schema::{ExampleCategoryInfo, ExampleListResponse, ExampleNetworkInfo};
use crate::io::pandapower::{Network, NetworkBuilder, excel::to_excel};

struct ExampleCase {
    case_name: &'static str,
    display_name: &'static str,
    description_zh: &'static str,
    description_en: &'static str,
    build: fn() -> Network,
}

struct ExampleCategory {
    key: &'static str,
    name_zh: &'static str,
    name_en: &'static str,
    cases: &'static [ExampleCase],
}

const CATEGORIES: &[ExampleCategory] = &[
    ExampleCategory {
        key: "test_cases",
        name_zh: "电力系统测试用例",
        name_en: "Power System Test Cases",
        cases: &[
            ExampleCase {
                case_name: "case4gs",
                display_name: "Case 4 GS",
                description_zh: "4节点测试系统（Grainger & Stevenson）",
                description_en: "4-bus test case (Grainger & Stevenson)",
                build: case4gs,
            },
            ExampleCase {
                case_name: "case5",
                display_name: "Case 5",
                description_zh: "5节点PJM测试系统",
                description_en: "5-bus PJM test case",
                build: case5,
            },
            ExampleCase {
                case_name: "case6ww",
                display_name: "Case 6 WW",
                description_zh: "6节点测试系统（Wood & Wollenberg）",
                description_en: "6-bus test case (Wood & Wollenberg)",
                build: case6ww,
            },
            ExampleCase {
                case_name: "case9",
                display_name: "Case 9",
                description_zh: "9节点WSCC测试系统",
                description_en: "9-bus WSCC test case",
                build: case9,
            },
        ],
    },
    ExampleCategory {
        key: "simple_test",
        name_zh: "简单测试网络",
        name_en: "Simple Test Networks",
        cases: &[
            ExampleCase {
                case_name: "simple_four_bus_system",
                display_name: "Simple Four Bus",
                description_zh: "简单四节点系统",
                description_en: "Simple four bus system",
                build: simple_four_bus_system,
            },
            ExampleCase {
                case_name: "panda_four_load_branch",
                display_name: "Four Load Branch",
                description_zh: "四负荷支路测试网络",
                description_en: "Four load branch test network",
                build: panda_four_load_branch,
            },
        ],
    },
];

/// Line parameters per km: `(r_ohm, x_ohm, c_nf, max_i_ka)`.
type LineType = (f64, f64, f64, f64);

const NAYY_4X50_SE: LineType = (0.642, 0.083, 210.0, 0.142);
const NAYY_4X120_SE: LineType = (0.225, 0.08, 264.0, 0.242);

/// Ampacity of MATPOWER branches without a rating.
const UNRATED_KA: f64 = 99.0;

/// Grainger & Stevenson example 6.9: four 230 kV buses on a 100 MVA base.
pub fn case4gs() -> Network {
    let mut b = NetworkBuilder::new(50.0, 100.0);
    b.name("case4gs");
    let buses: Vec<i64> = (1..=4).map(|i| b.bus(&i.to_string(), 230.0)).collect();
    b.ext_grid(buses[0], 1.0, 0.0);
    b.generator(buses[3], "", 318.0, 1.02);

    for (bus, p, q) in [(0, 50.0, 30.99), (1, 170.0, 105.35), (2, 200.0, 123.94), (3, 80.0, 49.58)] {
        b.load(buses[bus], "", p, q);
    }
    for (from, to, r, x, c) in [
        (0, 1, 5.33232, 26.6616, 616.763),
        (0, 2, 3.93576, 19.6788, 466.333),
        (1, 3, 3.93576, 19.6788, 466.333),
        (2, 3, 6.72888, 33.6444, 767.193),
    ] {
        b.line(buses[from], buses[to], "", 1.0, r, x, c, 0.62755);
    }
    b.build()
}

/// PJM five-bus system at 230 kV, slack at bus 4.
pub fn case5() -> Network {
    let mut b = NetworkBuilder::new(50.0, 100.0);
    b.name("case5");
    let buses: Vec<i64> = (1..=5).map(|i| b.bus(&i.to_string(), 230.0)).collect();
    b.ext_grid(buses[3], 1.0, 0.0);
    for (bus, p, q_lim) in [(0, 40.0, 30.0), (0, 170.0, 127.5), (2, 323.49, 390.0), (4, 466.51, 450.0)] {
        let g = b.generator(buses[bus], "", p, 1.0);
        b.q_limits(g, -q_lim, q_lim);
    }

    for (bus, p, q) in [(1, 300.0, 98.61), (2, 300.0, 98.61), (3, 400.0, 131.47)] {
        b.load(buses[bus], "", p, q);
    }
    for (from, to, r, x, c, max_i_ka) in [
        (0, 1, 1.48649, 14.8649, 42.8425, 1.0041),
        (0, 3, 1.60816, 16.0816, 39.5932, UNRATED_KA),
        (0, 4, 0.33856, 3.3856, 188.098, UNRATED_KA),
        (1, 2, 0.57132, 5.7132, 111.439, UNRATED_KA),
        (2, 3, 1.57113, 15.7113, 40.5559, UNRATED_KA),
        (3, 4, 1.57113, 15.7113, 40.5559, 0.60245),
    ] {
        b.line(buses[from], buses[to], "", 1.0, r, x, c, max_i_ka);
    }
    b.build()
}

/// Wood & Wollenberg example 4.1: six 230 kV buses, three generators.
pub fn case6ww() -> Network {
    let mut b = NetworkBuilder::new(50.0, 100.0);
    b.name("case6ww");
    let buses: Vec<i64> = (1..=6).map(|i| b.bus(&i.to_string(), 230.0)).collect();
    b.ext_grid(buses[0], 1.05, 0.0);
    for (bus, p, vm) in [(1, 50.0, 1.05), (2, 60.0, 1.07)] {
        let g = b.generator(buses[bus], "", p, vm);
        b.q_limits(g, -100.0, 100.0);
    }

    for bus in 3..6 {
        b.load(buses[bus], "", 70.0, 70.0);
    }
    for (from, to, r, x, c, max_i_ka) in [
        (0, 1, 52.9, 105.8, 240.688, 0.10041),
        (0, 3, 26.45, 105.8, 240.688, 0.15061),
        (0, 4, 42.32, 158.7, 361.032, 0.10041),
        (1, 2, 26.45, 132.25, 361.032, 0.10041),
        (1, 3, 26.45, 52.9, 120.344, 0.15061),
        (1, 4, 52.9, 158.7, 240.688, 0.075307),
        (1, 5, 37.03, 105.8, 300.86, 0.22592),
        (2, 4, 63.48, 137.54, 300.86, 0.17572),
        (2, 5, 10.58, 52.9, 120.344, 0.20082),
        (3, 4, 105.8, 211.6, 481.376, 0.050204),
        (4, 5, 52.9, 158.7, 361.032, 0.10041),
    ] {
        b.line(buses[from], buses[to], "", 1.0, r, x, c, max_i_ka);
    }
    b.build()
}

/// 0.25 MVA 10/0.4 kV distribution transformer, Dyn5.
fn distribution_trafo(b: &mut NetworkBuilder, hv: i64, lv: i64, name: &str) {
    let t = b.trafo(hv, lv, name, 0.25, 10.0, 0.4, 4.0, 1.2, 150.0);
    b.trafo_losses(t, 0.6, 0.24);
}

fn cable(b: &mut NetworkBuilder, from: i64, to: i64, name: &str, length_km: f64, (r, x, c, i): LineType) {
    b.line(from, to, name, length_km, r, x, c, i);
}

/// One MV bus feeding a short LV feeder with two loads and two PV units.
pub fn simple_four_bus_system() -> Network {
    let mut b = NetworkBuilder::new(50.0, 1.0);
    b.name("simple_four_bus_system");
    let mv = b.bus("bus1", 10.0);
    let lv: Vec<i64> = (2..=4).map(|i| b.bus(&format!("bus{i}"), 0.4)).collect();
    b.ext_grid(mv, 1.0, 0.0);
    distribution_trafo(&mut b, mv, lv[0], "trafo");
    cable(&mut b, lv[0], lv[1], "line1", 0.5, NAYY_4X50_SE);
    cable(&mut b, lv[1], lv[2], "line2", 0.5, NAYY_4X50_SE);
    b.load(lv[1], "load1", 0.03, 0.01);
    b.load(lv[2], "load2", 0.03, 0.01);
    b.sgen(lv[1], "pv1", 0.02, 0.005);
    b.sgen(lv[2], "pv2", 0.015, 0.002);
    b.build()
}

/// An LV branch of four equal loads spaced 50 m apart.
pub fn panda_four_load_branch() -> Network {
    let mut b = NetworkBuilder::new(50.0, 1.0);
    b.name("panda_four_load_branch");
    let mv = b.bus("bus1", 10.0);
    let lv: Vec<i64> = (2..=6).map(|i| b.bus(&format!("bus{i}"), 0.4)).collect();
    b.ext_grid(mv, 1.0, 0.0);
    distribution_trafo(&mut b, mv, lv[0], "");
    for (i, pair) in lv.windows(2).enumerate() {
        cable(&mut b, pair[0], pair[1], &format!("line{}", i + 1), 0.05, NAYY_4X120_SE);
    }
    for &bus in &lv[1..] {
        b.load(bus, "", 0.03, 0.01);
    }
    b.build()
}

/// WSCC three-machine, nine-bus system at 345 kV on a 100 MVA base.
pub fn case9() -> Network {
    let mut b = NetworkBuilder::new(50.0, 100.0);
    b.name("case9");
    let buses: Vec<i64> = (1..=9).map(|i| b.bus(&i.to_string(), 345.0)).collect();
    b.ext_grid(buses[0], 1.0, 0.0);
    for (bus, p) in [(1, 163.0), (2, 85.0)] {
        let g = b.generator(buses[bus], "", p, 1.0);
        b.q_limits(g, -300.0, 300.0);
    }

    for (bus, p, q) in [(4, 90.0, 30.0), (6, 100.0, 35.0), (8, 125.0, 50.0)] {
        b.load(buses[bus], "", p, q);
    }
    for (from, to, r, x, c, max_i_ka) in [
        (0, 3, 0.0, 68.5584, 0.0, 0.41837),
        (3, 4, 20.23425, 109.503, 422.5412, 0.41837),
        (4, 5, 46.41975, 202.3425, 957.4034, 0.25102),
        (2, 5, 0.0, 69.74865, 0.0, 0.50204),
        (5, 6, 14.16398, 119.9772, 558.931, 0.25102),
        (6, 7, 10.11713, 85.698, 398.4724, 0.41837),
        (7, 1, 0.0, 74.39062, 0.0, 0.41837),
        (7, 8, 38.088, 191.63025, 818.3392, 0.41837),
        (8, 3, 11.9025, 101.17125, 470.6788, 0.41837),
    ] {
        b.line(buses[from], buses[to], "", 1.0, r, x, c, max_i_ka);
    }
    b.build()
}

fn find(case_name: &str) -> Result<&'static ExampleCase> {
    CATEGORIES
        .iter()
        .flat_map(|c| c.cases.iter())
        .find(|c| c.case_name == case_name)
        .ok_or_else(|| Error::UnknownExample(case_name.to_string()))
}

pub fn example_list() -> ExampleListResponse {
    let categories = CATEGORIES
        .iter()
        .map(|cat| {
            let networks = cat
                .cases
                .iter()
                .map(|c| ExampleNetworkInfo {
                    case_name: c.case_name.into(),
                    display_name: c.display_name.into(),
                    description_zh: c.description_zh.into(),
                    description_en: c.description_en.into(),
                    bus_count: (c.build)().bus.len(),
                })
                .collect();
            let info = ExampleCategoryInfo {
                name_zh: cat.name_zh.into(),
                name_en: cat.name_en.into(),
                networks,
            };
            (cat.key.to_string(), info)
        })
        .collect::<BTreeMap<_, _>>();
    ExampleListResponse { categories }
}

pub fn example_network(case_name: &str) -> Result<Network> {
    Ok((find(case_name)?.build)())
}

/// The example's element tables as a workbook the excel loader accepts.
pub fn example_workbook(case_name: &str) -> Result<Vec<u8>> {
    let network = example_network(case_name)?;
    Ok(to_excel(&network)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::{Diagnostics, NewtonEngine, PowerFlowSolver, SolveOptions};
    use crate::io::pandapower::excel::load_pandapower_excel;

    #[test]
    fn list_reports_bus_counts() {
        let list = example_list();
        let cat = &list.categories["test_cases"];
        assert_eq!(cat.name_en, "Power System Test Cases");
        let counts: Vec<_> = cat
            .networks
            .iter()
            .map(|n| (n.case_name.as_str(), n.bus_count))
            .collect();
        assert_eq!(counts, [("case4gs", 4), ("case5", 5), ("case6ww", 6), ("case9", 9)]);

        let simple = &list.categories["simple_test"];
        assert_eq!(simple.networks[0].case_name, "simple_four_bus_system");
        assert_eq!(simple.networks[0].bus_count, 4);
        assert_eq!(simple.networks[1].bus_count, 6);
    }

    #[test]
    fn unknown_case_is_an_error() {
        assert!(matches!(example_network("case9999"), Err(Error::UnknownExample(_))));
        assert!(matches!(example_workbook(""), Err(Error::UnknownExample(_))));
    }

    #[test]
    fn examples_solve() {
        let cases = CATEGORIES.iter().flat_map(|c| c.cases.iter()).map(|c| c.case_name);
        for case in cases {
            let mut net = example_network(case).unwrap();
            let mut diag = Diagnostics::new();
            let outcome = NewtonEngine::new()
                .solve(&mut net, &SolveOptions::default(), &mut diag)
                .unwrap();
            assert!(outcome.converged, "{case}: {:?}", diag.warnings());
        }
    }

    #[test]
    fn case4gs_matches_textbook_slack() {
        let mut net = case4gs();
        let mut diag = Diagnostics::new();
        NewtonEngine::new()
            .solve(&mut net, &SolveOptions::default(), &mut diag)
            .unwrap();
        let p = net.res_ext_grid.as_ref().unwrap().get(0, "p_mw").unwrap();
        assert!((p - 186.8).abs() < 2.0, "slack p = {p}");
        let vm = net.res_bus.as_ref().unwrap().get(3, "vm_pu").unwrap();
        assert!((vm - 1.02).abs() < 1e-6);
    }

    #[test]
    fn case6ww_matches_textbook_slack() {
        let mut net = case6ww();
        let mut diag = Diagnostics::new();
        NewtonEngine::new()
            .solve(&mut net, &SolveOptions::default(), &mut diag)
            .unwrap();
        let p = net.res_ext_grid.as_ref().unwrap().get(0, "p_mw").unwrap();
        assert!((p - 107.9).abs() < 2.0, "slack p = {p}");
    }

    #[test]
    fn lv_feeders_stay_near_nominal() {
        for build in [simple_four_bus_system, panda_four_load_branch] {
            let mut net = build();
            let mut diag = Diagnostics::new();
            let outcome = NewtonEngine::new()
                .solve(&mut net, &SolveOptions::default(), &mut diag)
                .unwrap();
            assert!(outcome.converged);
            let res = net.res_bus.as_ref().unwrap();
            for bus in &net.bus {
                let vm = res.get(bus.index, "vm_pu").unwrap();
                assert!((0.9..1.05).contains(&vm), "{:?} bus {}: {vm}", net.name, bus.index);
            }
        }
    }

    #[test]
    fn workbook_round_trips_through_the_loader() {
        let bytes = example_workbook("case9").unwrap();
        let net = load_pandapower_excel(&bytes).unwrap();
        assert_eq!(net.bus.len(), 9);
        assert_eq!(net.lines().len(), 9);
        assert_eq!(net.gens().len(), 2);
        assert_eq!(net.name.as_deref(), Some("case9"));
    }
}
