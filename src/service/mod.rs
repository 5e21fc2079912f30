//! Session-backed power flow service.
//!
//! Uploads become sessions in a [`SessionStore`]; runs, result queries and
//! exports look the session up again by id, so any process sharing the
//! store directory can serve any request.

pub mod catalog;
pub mod error;
pub mod export;
pub mod extract;
pub mod format;
pub mod iterations;
pub mod loader;
pub mod runner;
pub mod schema;
pub mod session;

pub use error::{Error, Result};
pub use format::FileFormat;
pub use schema::*;
pub use session::{Session, SessionStore};

use tracing::info;

use crate::basic::{NewtonEngine, PowerFlowSolver};

pub const UPLOAD_MESSAGE: &str = "Network loaded successfully";

pub struct PowerFlowService<S = NewtonEngine> {
    store: SessionStore,
    solver: S,
}

impl PowerFlowService<NewtonEngine> {
    pub fn new(store: SessionStore) -> Self {
        Self::with_solver(store, NewtonEngine::new())
    }
}

impl<S: PowerFlowSolver> PowerFlowService<S> {
    pub fn with_solver(store: SessionStore, solver: S) -> Self {
        Self { store, solver }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    fn session(&self, id: &str) -> Result<Session> {
        self.store.read(id).ok_or(Error::SessionNotFound)
    }

    pub fn upload(&self, bytes: &[u8], filename: &str) -> Result<UploadResponse> {
        let (network, format) = loader::load_network(bytes, filename)?;
        let network_summary = network.summary();
        let session_id = self.store.create(network, filename, format)?;
        info!(session_id = %session_id, filename, format = %format, "session created from upload");
        Ok(UploadResponse {
            session_id,
            filename: filename.to_string(),
            file_format: format,
            network_summary,
            message: UPLOAD_MESSAGE.into(),
        })
    }

    /// Solves the session's network and stores the outcome in place of any
    /// earlier result.
    pub fn run(&self, id: &str, request: &PowerFlowRequest) -> Result<PowerFlowResult> {
        request.validate()?;
        let mut session = self.session(id)?;
        let result = runner::run_power_flow(&self.solver, &mut session.network, request);
        session.results = Some(result.clone());
        if !self.store.update(&session)? {
            return Err(Error::SessionNotFound);
        }
        info!(session_id = %id, converged = result.converged, "power flow result stored");
        Ok(result)
    }

    pub fn results(&self, id: &str) -> Result<PowerFlowResult> {
        self.session(id)?.results.ok_or_else(Error::no_results)
    }

    pub fn download(&self, id: &str) -> Result<Vec<u8>> {
        let session = self.session(id)?;
        let results = session.results.as_ref().ok_or_else(Error::no_results)?;
        export::results_workbook(Some(results))
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        if self.store.delete(id)? {
            info!(session_id = %id, "session deleted");
            Ok(())
        } else {
            Err(Error::SessionNotFound)
        }
    }

    pub fn session_count(&self) -> usize {
        self.store.count()
    }
}

/// Supported upload formats and their extensions.
pub fn formats() -> FormatsResponse {
    let formats = FileFormat::ALL
        .into_iter()
        .map(|f| {
            let info = FormatInfo {
                extensions: f.extensions().iter().map(|e| e.to_string()).collect(),
                description: f.description().to_string(),
            };
            (f, info)
        })
        .collect();
    FormatsResponse {
        formats,
        all_extensions: format::supported_extensions()
            .into_iter()
            .map(String::from)
            .collect(),
    }
}

pub fn examples() -> ExampleListResponse {
    catalog::example_list()
}

pub fn download_example(case_name: &str) -> Result<Vec<u8>> {
    catalog::example_workbook(case_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::pandapower::excel::to_excel;
    use tempfile::TempDir;

    fn service() -> (TempDir, PowerFlowService) {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();
        (dir, PowerFlowService::new(store))
    }

    fn case_bytes() -> Vec<u8> {
        to_excel(&catalog::case4gs()).unwrap()
    }

    #[test]
    fn upload_run_fetch_delete() {
        let (_dir, svc) = service();
        let upload = svc.upload(&case_bytes(), "case4gs.xlsx").unwrap();
        assert_eq!(upload.file_format, FileFormat::Excel);
        assert_eq!(upload.network_summary.n_bus, 4);
        assert_eq!(upload.message, UPLOAD_MESSAGE);
        let id = upload.session_id;

        assert!(matches!(svc.results(&id), Err(Error::NoResultsAvailable(_))));
        assert!(matches!(svc.download(&id), Err(Error::NoResultsAvailable(_))));

        let result = svc.run(&id, &PowerFlowRequest::default()).unwrap();
        assert!(result.converged);
        assert_eq!(result.calculation_log.max_iteration, 10);
        assert_eq!(svc.results(&id).unwrap(), result);
        assert!(!svc.download(&id).unwrap().is_empty());

        svc.delete(&id).unwrap();
        assert!(matches!(svc.results(&id), Err(Error::SessionNotFound)));
        assert!(matches!(svc.delete(&id), Err(Error::SessionNotFound)));
        assert_eq!(svc.session_count(), 0);
    }

    #[test]
    fn failed_run_replaces_previous_result() {
        let (_dir, svc) = service();
        let id = svc.upload(&case_bytes(), "case4gs.xlsx").unwrap().session_id;
        assert!(svc.run(&id, &PowerFlowRequest::default()).unwrap().converged);

        let request = PowerFlowRequest {
            algorithm: "fdbx".into(),
            ..Default::default()
        };
        let failed = svc.run(&id, &request).unwrap();
        assert!(!failed.converged);
        assert_eq!(svc.results(&id).unwrap(), failed);
        assert!(svc.store().read(&id).unwrap().network.res_bus.is_none());
        assert_eq!(
            svc.download(&id).unwrap_err().to_string(),
            "No converged results available to export"
        );
    }

    #[test]
    fn invalid_request_and_missing_session() {
        let (_dir, svc) = service();
        let bad = PowerFlowRequest {
            max_iteration: Some(0),
            ..Default::default()
        };
        let id = svc.upload(&case_bytes(), "c.xlsx").unwrap().session_id;
        assert!(matches!(svc.run(&id, &bad), Err(Error::InvalidRequest(_))));
        let missing = uuid::Uuid::new_v4().to_string();
        assert!(matches!(
            svc.run(&missing, &PowerFlowRequest::default()),
            Err(Error::SessionNotFound)
        ));
        assert!(matches!(svc.download(&missing), Err(Error::SessionNotFound)));
    }

    #[test]
    fn format_table_lists_every_extension() {
        let f = formats();
        assert_eq!(f.formats.len(), 4);
        assert_eq!(f.formats[&FileFormat::Pickle].extensions, [".p", ".pkl", ".pickle"]);
        assert_eq!(f.all_extensions.len(), 8);
    }
}
