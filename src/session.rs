//! CLI session state
//!
//! The session remembers which PDF was last processed so a later run can
//! resume with `--resume`. It is a plain value handed to an explicit
//! [`SessionStore`]; nothing here is global.

use crate::PdfError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name used when no state path is given
pub const DEFAULT_STATE_FILE: &str = "state.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub pdf_path: Option<PathBuf>,
    /// Keep the state file after a successful run
    #[serde(default)]
    pub persist_state: bool,
}

impl Session {
    pub fn for_pdf<P: AsRef<Path>>(path: P, persist_state: bool) -> Self {
        Self {
            pdf_path: Some(path.as_ref().to_path_buf()),
            persist_state,
        }
    }
}

pub trait SessionStore {
    /// The stored session, or the default one when nothing is stored
    fn load(&self) -> Result<Session, PdfError>;
    fn save(&self, session: &Session) -> Result<(), PdfError>;
    /// Forget the stored session; a no-op when nothing is stored
    fn clear(&self) -> Result<(), PdfError>;
}

/// Session stored as a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for JsonFileStore {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_FILE)
    }
}

impl SessionStore for JsonFileStore {
    fn load(&self) -> Result<Session, PdfError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No session file at {}", self.path.display());
                return Ok(Session::default());
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content).map_err(|e| {
            PdfError::Session(format!("{}: {}", self.path.display(), e))
        })
    }

    fn save(&self, session: &Session) -> Result<(), PdfError> {
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, json)?;
        debug!("Saved session to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), PdfError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
