mod common;

use rustpower_web::prelude::*;
use rustpower_web::service::{self, Error, catalog};
use tempfile::TempDir;

fn service(dir: &TempDir) -> PowerFlowService {
    PowerFlowService::new(SessionStore::open(dir.path().join("sessions")).unwrap())
}

#[test]
fn four_bus_json_upload_run_delete() {
    let dir = TempDir::new().unwrap();
    let svc = service(&dir);
    let bytes = common::to_pandapower_json(&catalog::case4gs());

    let upload = svc.upload(&bytes, "case4gs.json").unwrap();
    assert_eq!(upload.file_format, FileFormat::Json);
    assert_eq!(upload.network_summary.n_bus, 4);
    assert_eq!(upload.network_summary.n_line, 4);
    assert_eq!(upload.message, "Network loaded successfully");
    let id = upload.session_id;

    let result = svc.run(&id, &PowerFlowRequest::default()).unwrap();
    assert_eq!(result.calculation_log.max_iteration, 10);
    assert!(result.converged, "{:?}", result.calculation_log.warnings);
    let bus = result.res_bus.as_ref().unwrap();
    assert_eq!(bus.row_count, 4);
    assert!(result.min_vm_pu.unwrap() <= result.max_vm_pu.unwrap());
    for (_, table) in result.tables() {
        assert_eq!(table.row_count, table.data.len());
    }
    let p = result.calculation_log.slack_p_mw.unwrap();
    let grid = result.res_ext_grid.as_ref().unwrap();
    assert_eq!(grid.data[0]["p_mw"], p);

    svc.delete(&id).unwrap();
    assert!(svc.store().read(&id).is_none());
    assert!(matches!(svc.results(&id), Err(Error::SessionNotFound)));
}

#[test]
fn every_format_yields_the_same_network() {
    let dir = TempDir::new().unwrap();
    let svc = service(&dir);
    let net = catalog::case9();
    let files = [
        ("case9.json", common::to_pandapower_json(&net), FileFormat::Json),
        ("case9.p", common::to_pandapower_pickle(&net), FileFormat::Pickle),
        ("case9.sqlite", common::to_pandapower_sqlite(&net), FileFormat::Sqlite),
        (
            "case9.xlsx",
            pandapower::excel::to_excel(&net).unwrap(),
            FileFormat::Excel,
        ),
    ];

    let mut slack = Vec::new();
    for (name, bytes, format) in files {
        let upload = svc.upload(&bytes, name).unwrap();
        assert_eq!(upload.file_format, format, "{name}");
        assert_eq!(upload.network_summary, net.summary(), "{name}");

        let stored = svc.store().read(&upload.session_id).unwrap();
        assert_eq!(stored.network.bus, net.bus, "{name}");
        assert_eq!(stored.network.lines(), net.lines(), "{name}");
        assert_eq!(stored.network.gens(), net.gens(), "{name}");

        let result = svc.run(&upload.session_id, &PowerFlowRequest::default()).unwrap();
        assert!(result.converged, "{name}");
        slack.push(result.calculation_log.slack_p_mw.unwrap());
    }
    assert!(slack.windows(2).all(|w| w[0] == w[1]), "{slack:?}");
    assert_eq!(svc.session_count(), 4);
}

#[test]
fn workers_share_sessions_through_the_directory() {
    let dir = TempDir::new().unwrap();
    let first = service(&dir);
    let second = service(&dir);

    let bytes = pandapower::excel::to_excel(&catalog::case4gs()).unwrap();
    let id = first.upload(&bytes, "grid.xlsx").unwrap().session_id;
    let result = second.run(&id, &PowerFlowRequest::default()).unwrap();
    assert_eq!(first.results(&id).unwrap(), result);
    assert!(!first.download(&id).unwrap().is_empty());
    second.delete(&id).unwrap();
    assert!(matches!(first.download(&id), Err(Error::SessionNotFound)));
}

#[test]
fn rerun_replaces_the_cached_result() {
    let dir = TempDir::new().unwrap();
    let svc = service(&dir);
    let bytes = common::to_pandapower_json(&catalog::case9());
    let id = svc.upload(&bytes, "case9.JSON").unwrap().session_id;

    let gs = PowerFlowRequest {
        algorithm: "gs".into(),
        max_iteration: Some(3),
        ..Default::default()
    };
    let failed = svc.run(&id, &gs).unwrap();
    assert!(!failed.converged);
    assert_eq!(failed.calculation_log.max_iteration, 3);
    assert_eq!(
        failed.calculation_log.warnings.last().map(String::as_str),
        Some("Power flow did not converge")
    );
    assert!(matches!(svc.download(&id), Err(Error::NoResultsAvailable(_))));

    let ok = svc.run(&id, &PowerFlowRequest::default()).unwrap();
    assert!(ok.converged);
    assert_eq!(svc.results(&id).unwrap(), ok);
}

#[test]
fn uploads_are_validated() {
    let dir = TempDir::new().unwrap();
    let svc = service(&dir);
    assert!(matches!(
        svc.upload(b"{}", "grid.txt"),
        Err(Error::UnsupportedFormat { .. })
    ));
    assert!(matches!(
        svc.upload(b"garbage", "grid.sqlite"),
        Err(Error::InvalidNetwork(_))
    ));
    assert_eq!(svc.session_count(), 0);

    let examples = service::examples();
    assert_eq!(examples.categories["test_cases"].networks.len(), 4);
    assert_eq!(examples.categories["simple_test"].networks.len(), 2);
    assert!(service::download_example("case4gs").is_ok());
}
