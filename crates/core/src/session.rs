//! Session: the unit of isolation (spec §3, §4.A).
//!
//! Grounded on `original_source/session/manager.py`'s `SessionManager` for
//! exact lifecycle semantics (id format, retention window, monotonic
//! `sandbox_available` flag), written in the teacher's newtype-plus-registry
//! style.

use crate::error::OrchestratorError;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

crate::define_id! {
    /// Unique identifier for a session: `session_<YYYYMMDD>_<HHMMSS>_<6 hex>`.
    pub struct SessionId("");
}

const RETENTION_DAYS: i64 = 7;

/// A session-scoped database connection descriptor (spec §3, §6
/// `/api/database` routes). The SQL engine itself is out of scope;
/// only the descriptor's lifecycle lives here.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// A record of a generated Dagster-style pipeline script
/// (`sessions/<id>/dagster/jobs/<job_id>.py`, spec §6).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DagsterJobHandle {
    pub job_id: String,
    pub script_path: PathBuf,
}

/// Per-session directories, sandbox handle, DB config, and variable store.
pub struct Session {
    pub id: SessionId,
    pub import_dir: PathBuf,
    pub export_dir: PathBuf,
    pub workspace_dir: PathBuf,
    pub dagster_dir: PathBuf,
    db_config: Mutex<Option<DbConfig>>,
    variables: Mutex<HashMap<String, serde_json::Value>>,
    dagster_jobs: Mutex<Vec<DagsterJobHandle>>,
    sandbox_available: Mutex<bool>,
    sandbox_error: Mutex<Option<String>>,
    /// Serializes concurrent execution attempts against this session's
    /// resources (fallback interpreter, sandbox RPC).
    execution_lock: Mutex<()>,
}

impl Session {
    /// Generate `session_<YYYYMMDD>_<HHMMSS>_<6 hex>` and create its directories.
    fn new(id: SessionId, base_dir: &Path) -> Result<Self, OrchestratorError> {
        let root = base_dir.join(id.as_str());
        let import_dir = root.join("imports");
        let export_dir = root.join("exports");
        let workspace_dir = root.join("workspace");
        let dagster_dir = root.join("dagster").join("jobs");

        for dir in [&import_dir, &export_dir, &workspace_dir, &dagster_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                OrchestratorError::SessionInitFailed(format!(
                    "failed to create {}: {e}",
                    dir.display()
                ))
            })?;
        }

        Ok(Self {
            id,
            import_dir,
            export_dir,
            workspace_dir,
            dagster_dir,
            db_config: Mutex::new(None),
            variables: Mutex::new(HashMap::new()),
            dagster_jobs: Mutex::new(Vec::new()),
            sandbox_available: Mutex::new(true),
            sandbox_error: Mutex::new(None),
            execution_lock: Mutex::new(()),
        })
    }

    /// Sandbox instance name, a pure function of the session id.
    pub fn sandbox_name(&self) -> String {
        format!("sandbox_{}", self.id.as_str())
    }

    /// Mark the sandbox unavailable for the rest of this session's life.
    /// Monotonic: once cleared, stays cleared.
    pub fn mark_sandbox_unavailable(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let mut available = self.sandbox_available.lock();
        if *available {
            *available = false;
            *self.sandbox_error.lock() = Some(reason.clone());
            info!(session = %self.id, %reason, "sandbox marked unavailable for session");
        }
    }

    pub fn is_sandbox_available(&self) -> bool {
        *self.sandbox_available.lock()
    }

    pub fn sandbox_error(&self) -> Option<String> {
        self.sandbox_error.lock().clone()
    }

    pub fn get_variable(&self, name: &str) -> Option<serde_json::Value> {
        self.variables.lock().get(name).cloned()
    }

    pub fn set_variables(&self, vars: HashMap<String, serde_json::Value>) {
        self.variables.lock().extend(vars);
    }

    pub fn variables_snapshot(&self) -> HashMap<String, serde_json::Value> {
        self.variables.lock().clone()
    }

    pub fn clear_variables(&self) {
        self.variables.lock().clear();
    }

    pub fn db_config(&self) -> Option<DbConfig> {
        self.db_config.lock().clone()
    }

    pub fn set_db_config(&self, config: DbConfig) {
        *self.db_config.lock() = Some(config);
    }

    pub fn clear_db_config(&self) {
        *self.db_config.lock() = None;
    }

    pub fn record_dagster_job(&self, handle: DagsterJobHandle) {
        self.dagster_jobs.lock().push(handle);
    }

    pub fn dagster_jobs(&self) -> Vec<DagsterJobHandle> {
        self.dagster_jobs.lock().clone()
    }

    /// Acquire the session's execution lock for the lifetime of the guard.
    pub fn lock_execution(&self) -> parking_lot::MutexGuard<'_, ()> {
        self.execution_lock.lock()
    }

    pub fn list_imports(&self) -> std::io::Result<Vec<PathBuf>> {
        list_dir(&self.import_dir)
    }

    pub fn list_exports(&self) -> std::io::Result<Vec<PathBuf>> {
        list_dir(&self.export_dir)
    }
}

fn list_dir(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    entries.sort();
    Ok(entries)
}

/// Process-wide registry of live sessions. Creates, looks up, and reaps
/// analysis sessions on disk.
pub struct SessionRegistry {
    base_dir: PathBuf,
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    current: Mutex<Option<Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into(), sessions: Mutex::new(HashMap::new()), current: Mutex::new(None) }
    }

    /// Create a session, optionally with a caller-supplied id. Reaps stale
    /// sibling session directories (best-effort, never fails the call) and
    /// sets the new session as current.
    pub fn create(&self, id: Option<String>) -> Result<Arc<Session>, OrchestratorError> {
        let session_id = match id {
            Some(raw) => SessionId::from_string(raw),
            None => SessionId::from_string(generate_session_id()),
        };

        std::fs::create_dir_all(&self.base_dir).map_err(|e| {
            OrchestratorError::SessionInitFailed(format!("failed to create base dir: {e}"))
        })?;

        self.reap_stale_sessions(session_id.as_str());

        let session = Arc::new(Session::new(session_id.clone(), &self.base_dir)?);
        self.sessions.lock().insert(session_id.0.clone(), session.clone());
        *self.current.lock() = Some(session.clone());
        Ok(session)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.lock().get(id).cloned()
    }

    pub fn current(&self) -> Option<Arc<Session>> {
        self.current.lock().clone()
    }

    pub fn set_current(&self, session: Arc<Session>) {
        *self.current.lock() = Some(session);
    }

    pub fn ids(&self) -> Vec<String> {
        self.sessions.lock().keys().cloned().collect()
    }

    /// Remove the in-memory entry. Does not touch the current pointer of
    /// other callers holding their own `Arc<Session>`.
    pub fn cleanup(&self, session: &Session) {
        self.sessions.lock().remove(session.id.as_str());
        let mut current = self.current.lock();
        if let Some(cur) = current.as_ref() {
            if cur.id == session.id {
                *current = None;
            }
        }
    }

    /// Remove sibling session directories older than the retention window.
    /// Parse/remove failures are logged and never raised.
    fn reap_stale_sessions(&self, creating_id: &str) {
        let Ok(read_dir) = std::fs::read_dir(&self.base_dir) else { return };
        let cutoff = Utc::now().date_naive() - ChronoDuration::days(RETENTION_DAYS);

        for entry in read_dir.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
            if name == creating_id {
                continue;
            }
            match parse_session_date(name) {
                Some(date) if date < cutoff => {
                    if let Err(e) = std::fs::remove_dir_all(&path) {
                        warn!(session = name, error = %e, "failed to reap stale session directory");
                    } else {
                        debug!(session = name, "reaped stale session directory");
                    }
                }
                Some(_) => {}
                None => {
                    warn!(session = name, "could not parse session directory name for reaping");
                }
            }
        }
    }
}

fn generate_session_id() -> String {
    let now = Utc::now();
    let suffix = nanoid::nanoid!(6, &['0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f']);
    format!("session_{}_{}", now.format("%Y%m%d_%H%M%S"), suffix)
}

fn parse_session_date(name: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = name.split('_').collect();
    if parts.len() < 3 || parts[0] != "session" {
        return None;
    }
    NaiveDate::parse_from_str(parts[1], "%Y%m%d").ok()
}
