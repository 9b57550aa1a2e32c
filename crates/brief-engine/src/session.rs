//! Session identifiers and on-disk artifact storage
//!
//! Every analysis run gets its own session directory under the engine
//! data dir. The three workflow steps each leave artifacts there, and
//! session status is derived from which artifacts exist.

use crate::{EngineError, Result};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Raw search results from step 1
pub const COLLECTION_DATA_FILE: &str = "collection_data.json";

/// Readable digest of step 1
pub const COLLECTION_REPORT_FILE: &str = "collection_report.md";

/// Structured synthesis from step 2
pub const SYNTHESIS_FILE: &str = "synthesis.json";

/// Final Markdown report from step 3
pub const FINAL_REPORT_FILE: &str = "final_report.md";

/// Unique identifier for one analysis session
///
/// Format: `session_<unix_millis>_<8 hex chars>`, which sorts roughly
/// by creation time and is safe as a directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh session id
    pub fn generate() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let suffix: String = Uuid::new_v4().simple().to_string()[..8].to_string();
        Self(format!("session_{millis}_{suffix}"))
    }

    /// Parse and validate an id string
    pub fn parse(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix("session_")
            .ok_or_else(|| EngineError::InvalidRequest(format!("malformed session id: {s}")))?;
        let (millis, suffix) = rest
            .split_once('_')
            .ok_or_else(|| EngineError::InvalidRequest(format!("malformed session id: {s}")))?;
        let millis_ok = !millis.is_empty() && millis.chars().all(|c| c.is_ascii_digit());
        let suffix_ok = suffix.len() == 8 && suffix.chars().all(|c| c.is_ascii_hexdigit());
        if !millis_ok || !suffix_ok {
            return Err(EngineError::InvalidRequest(format!(
                "malformed session id: {s}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Workflow stage of a session, derived from artifact presence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No session directory on disk
    NotFound,
    /// Step 1 done: collection artifacts exist
    Collected,
    /// Step 2 done: synthesis exists
    Synthesized,
    /// Step 3 done: final report exists
    Completed,
}

/// Filesystem-backed store for session artifacts
pub struct SessionStore {
    data_dir: PathBuf,
}

impl SessionStore {
    /// Create a store rooted at `data_dir` (created on first write)
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Root directory of the store
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory for one session
    pub fn session_dir(&self, session: &SessionId) -> PathBuf {
        self.data_dir.join(session.as_str())
    }

    /// Whether the session has a directory on disk
    pub fn exists(&self, session: &SessionId) -> bool {
        self.session_dir(session).is_dir()
    }

    /// Serialize `value` as pretty JSON into a session artifact
    pub fn write_json<T: Serialize>(
        &self,
        session: &SessionId,
        file: &str,
        value: &T,
    ) -> Result<PathBuf> {
        let path = self.artifact_path(session, file)?;
        std::fs::write(&path, serde_json::to_string_pretty(value)?)?;
        debug!(session = %session, file, "Wrote JSON artifact");
        Ok(path)
    }

    /// Read and deserialize a JSON artifact
    pub fn read_json<T: DeserializeOwned>(&self, session: &SessionId, file: &str) -> Result<T> {
        let raw = self.read_text(session, file)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write a text artifact (Markdown reports)
    pub fn write_text(&self, session: &SessionId, file: &str, text: &str) -> Result<PathBuf> {
        let path = self.artifact_path(session, file)?;
        std::fs::write(&path, text)?;
        debug!(session = %session, file, "Wrote text artifact");
        Ok(path)
    }

    /// Read a text artifact
    ///
    /// A session without a directory is [`EngineError::SessionNotFound`];
    /// a session that exists but lacks this artifact is
    /// [`EngineError::ArtifactMissing`], so callers can tell "no such
    /// analysis" apart from "this step has not run yet".
    pub fn read_text(&self, session: &SessionId, file: &str) -> Result<String> {
        let dir = self.session_dir(session);
        if !dir.is_dir() {
            return Err(EngineError::SessionNotFound(session.to_string()));
        }
        std::fs::read_to_string(dir.join(file)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::ArtifactMissing {
                    session: session.to_string(),
                    file: file.to_string(),
                }
            } else {
                e.into()
            }
        })
    }

    /// Derive the workflow stage from which artifacts exist
    pub fn status(&self, session: &SessionId) -> SessionStatus {
        let dir = self.session_dir(session);
        if !dir.is_dir() {
            return SessionStatus::NotFound;
        }
        if dir.join(FINAL_REPORT_FILE).is_file() {
            SessionStatus::Completed
        } else if dir.join(SYNTHESIS_FILE).is_file() {
            SessionStatus::Synthesized
        } else {
            SessionStatus::Collected
        }
    }

    /// List all session ids present in the data dir, newest last
    pub fn sessions(&self) -> Result<Vec<SessionId>> {
        let mut ids = Vec::new();
        let entries = match std::fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && let Ok(id) = SessionId::parse(name)
            {
                ids.push(id);
            }
        }
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }

    fn artifact_path(&self, session: &SessionId, file: &str) -> Result<PathBuf> {
        let dir = self.session_dir(session);
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join(file))
    }
}
