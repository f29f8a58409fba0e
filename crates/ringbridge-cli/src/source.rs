use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use ringbridge_core::{ChangeStream, DeviceSnapshot, DeviceSource, SourceError};
use tokio::sync::mpsc;
use tracing::debug;

/// Device snapshot kept in a JSON file, refreshed by polling.
pub struct FileSource {
    path: PathBuf,
    current: RwLock<DeviceSnapshot>,
    listeners: Mutex<Vec<mpsc::UnboundedSender<()>>>,
}

impl FileSource {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SourceError> {
        let path = path.into();
        let snapshot = Self::read_snapshot(&path)?;

        Ok(Self {
            path,
            current: RwLock::new(snapshot),
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// Re-reads the file and notifies listeners if the snapshot changed.
    pub fn refresh(&self) -> Result<bool, SourceError> {
        let fresh = Self::read_snapshot(&self.path)?;
        {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            if *current == fresh {
                return Ok(false);
            }
            *current = fresh;
        }

        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|tx| tx.send(()).is_ok());
        debug!(path = %self.path.display(), listeners = listeners.len(), "snapshot changed");
        Ok(true)
    }

    fn read_snapshot(path: &Path) -> Result<DeviceSnapshot, SourceError> {
        let raw = fs::read(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => SourceError::DeviceNotFound,
            _ => SourceError::Io(format!("failed to read {}: {err}", path.display())),
        })?;

        serde_json::from_slice(&raw)
            .map_err(|err| SourceError::Invalid(format!("{}: {err}", path.display())))
    }
}

impl DeviceSource for FileSource {
    fn snapshot(&self) -> DeviceSnapshot {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// New listeners are seeded with one notification for the current snapshot.
    fn subscribe(&self) -> Result<ChangeStream, SourceError> {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(()).map_err(|_| SourceError::Closed)?;
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        Ok(rx)
    }
}
