use std::fs;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use uuid::Uuid;

use super::error::Result;
use super::format::FileFormat;
use super::schema::PowerFlowResult;
use crate::io::pandapower::Network;

const RECORD_EXT: &str = "json";
const LOCK_FILE: &str = ".lock";

/// Everything the service keeps about one uploaded network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub filename: String,
    pub format: FileFormat,
    pub network: Network,
    #[serde(default)]
    pub results: Option<PowerFlowResult>,
}

/// Sessions stored as one JSON record per file under a shared directory.
///
/// Records are replaced atomically, so any process pointed at the same
/// directory sees either the old or the new record, never a partial one.
/// `update` and `delete` hold an exclusive lock on the directory's lock file,
/// so an update that loses the race against a delete cannot bring the record
/// back.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `id`, or `None` when `id` is not a session id.
    fn record_path(&self, id: &str) -> Option<PathBuf> {
        let id = Uuid::parse_str(id).ok()?;
        Some(
            self.dir
                .join(id.as_hyphenated().to_string())
                .with_extension(RECORD_EXT),
        )
    }

    /// Exclusive lock shared by every store on this directory, released on drop.
    fn write_lock(&self) -> Result<fs::File> {
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(LOCK_FILE))?;
        file.lock()?;
        Ok(file)
    }

    fn write_record(&self, path: &Path, session: &Session) -> Result<()> {
        let tmp = NamedTempFile::new_in(&self.dir)?;
        let mut writer = BufWriter::new(tmp);
        serde_json::to_writer(&mut writer, session)?;
        writer.flush()?;
        let tmp = writer.into_inner().map_err(|e| e.into_error())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn create(&self, network: Network, filename: &str, format: FileFormat) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let session = Session {
            id: id.clone(),
            filename: filename.to_string(),
            format,
            network,
            results: None,
        };
        let path = self.dir.join(&id).with_extension(RECORD_EXT);
        self.write_record(&path, &session)?;
        debug!(session_id = %id, "session created");
        Ok(id)
    }

    /// Loads a session. Missing and unreadable records both come back as `None`.
    pub fn read(&self, id: &str) -> Option<Session> {
        let path = self.record_path(id)?;
        let file = match fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(session_id = %id, error = %e, "failed to open session record");
                return None;
            }
        };
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(session_id = %id, error = %e, "failed to decode session record");
                None
            }
        }
    }

    /// Replaces an existing record. Returns `false` if there is none.
    pub fn update(&self, session: &Session) -> Result<bool> {
        let Some(path) = self.record_path(&session.id) else {
            return Ok(false);
        };
        let _lock = self.write_lock()?;
        let updated = self.replace_existing(&path, session)?;
        if updated {
            debug!(session_id = %session.id, "session updated");
        }
        Ok(updated)
    }

    /// Caller holds the write lock.
    fn replace_existing(&self, path: &Path, session: &Session) -> Result<bool> {
        if !path.is_file() {
            return Ok(false);
        }
        self.write_record(path, session)?;
        Ok(true)
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        let Some(path) = self.record_path(id) else {
            return Ok(false);
        };
        let _lock = self.write_lock()?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(session_id = %id, "session deleted");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Number of stored records.
    pub fn count(&self) -> usize {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };
        entries
            .filter_map(|e| e.ok())
            .filter(|e| {
                let path = e.path();
                path.extension().is_some_and(|ext| ext == RECORD_EXT)
                    && path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .is_some_and(|s| Uuid::parse_str(s).is_ok())
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::pandapower::NetworkBuilder;
    use tempfile::TempDir;

    fn network() -> Network {
        let mut b = NetworkBuilder::new(60.0, 10.0);
        let b0 = b.bus("a", 110.0);
        let b1 = b.bus("b", 110.0);
        b.ext_grid(b0, 1.0, 0.0);
        b.load(b1, "l", 3.0, 1.0);
        b.build()
    }

    fn store() -> (TempDir, SessionStore) {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path().join("sessions")).unwrap();
        (dir, store)
    }

    #[test]
    fn create_then_read() {
        let (_dir, store) = store();
        let id = store.create(network(), "grid.json", FileFormat::Json).unwrap();
        let session = store.read(&id).unwrap();
        assert_eq!(session.id, id);
        assert_eq!(session.filename, "grid.json");
        assert_eq!(session.format, FileFormat::Json);
        assert_eq!(session.network.bus, network().bus);
        assert_eq!(session.network.f_hz, 60.0);
        assert!(session.results.is_none());
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn ids_are_unique() {
        let (_dir, store) = store();
        let a = store.create(network(), "a.json", FileFormat::Json).unwrap();
        let b = store.create(network(), "b.json", FileFormat::Json).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn missing_and_malformed_ids_read_as_absent() {
        let (_dir, store) = store();
        assert!(store.read(&Uuid::new_v4().to_string()).is_none());
        assert!(store.read("../../etc/passwd").is_none());
        assert!(store.read("").is_none());
    }

    #[test]
    fn corrupt_record_reads_as_absent() {
        let (_dir, store) = store();
        let id = store.create(network(), "a.json", FileFormat::Json).unwrap();
        fs::write(store.dir().join(format!("{id}.json")), b"{\"id\": trunc").unwrap();
        assert!(store.read(&id).is_none());
    }

    #[test]
    fn update_replaces_and_never_creates() {
        let (_dir, store) = store();
        let id = store.create(network(), "a.xlsx", FileFormat::Excel).unwrap();
        let mut session = store.read(&id).unwrap();
        session.network.name = Some("renamed".into());
        assert!(store.update(&session).unwrap());
        assert_eq!(store.read(&id).unwrap().network.name.as_deref(), Some("renamed"));

        session.id = Uuid::new_v4().to_string();
        assert!(!store.update(&session).unwrap());
        assert!(store.read(&session.id).is_none());
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn delete_reports_whether_anything_was_removed() {
        let (_dir, store) = store();
        let id = store.create(network(), "a.db", FileFormat::Sqlite).unwrap();
        assert!(store.delete(&id).unwrap());
        assert!(!store.delete(&id).unwrap());
        assert!(store.read(&id).is_none());
        assert!(!store.delete("not-an-id").unwrap());
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn stores_share_records_through_the_directory() {
        let (_dir, store) = store();
        let other = SessionStore::open(store.dir()).unwrap();
        let id = store.create(network(), "a.p", FileFormat::Pickle).unwrap();
        assert_eq!(other.read(&id).unwrap().format, FileFormat::Pickle);
        assert!(other.delete(&id).unwrap());
        assert!(store.read(&id).is_none());
    }

    #[test]
    fn delete_waits_for_an_update_in_flight() {
        let (_dir, store) = store();
        let id = store.create(network(), "a.json", FileFormat::Json).unwrap();
        let mut session = store.read(&id).unwrap();
        session.network.name = Some("solved".into());

        let lock = store.write_lock().unwrap();
        let other = SessionStore::open(store.dir()).unwrap();
        let deleter = {
            let id = id.clone();
            std::thread::spawn(move || other.delete(&id).unwrap())
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(store.read(&id).is_some());
        assert!(store.replace_existing(&store.record_path(&id).unwrap(), &session).unwrap());
        drop(lock);

        assert!(deleter.join().unwrap());
        assert!(store.read(&id).is_none());
        assert!(!store.update(&session).unwrap());
        assert_eq!(store.count(), 0);
    }
}
