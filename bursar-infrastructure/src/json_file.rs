use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::RwLock,
};

use bursar_application::BlobStore;
use serde_json::Value;

/// File-backed blob store: a single JSON document holding every key, written
/// through on each `store`. The engine's blobs are JSON themselves, so they
/// embed as plain values and the file stays readable.
pub struct JsonFileStore {
    path: PathBuf,
    blobs: RwLock<BTreeMap<String, Value>>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let blobs = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(blobs) => blobs,
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "store file unreadable, starting empty");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err),
        };
        Ok(Self {
            path,
            blobs: RwLock::new(blobs),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, blobs: &BTreeMap<String, Value>) {
        match serde_json::to_vec_pretty(blobs) {
            Ok(bytes) => {
                if let Err(err) = fs::write(&self.path, bytes) {
                    tracing::error!(path = %self.path.display(), %err, "failed to write store file");
                }
            }
            Err(err) => tracing::error!(%err, "failed to encode store file"),
        }
    }
}

impl BlobStore for JsonFileStore {
    fn retrieve(&self, key: &str) -> Option<Vec<u8>> {
        let blobs = self.blobs.read().unwrap();
        blobs
            .get(key)
            .and_then(|value| serde_json::to_vec(value).ok())
    }

    fn store(&self, key: &str, value: Vec<u8>) {
        let value = match serde_json::from_slice(&value) {
            Ok(value) => value,
            // Opaque non-JSON payloads survive as strings.
            Err(_) => Value::String(String::from_utf8_lossy(&value).into_owned()),
        };
        let mut blobs = self.blobs.write().unwrap();
        blobs.insert(key.to_owned(), value);
        self.flush(&blobs);
    }
}
