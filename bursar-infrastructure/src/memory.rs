use std::{collections::HashMap, sync::RwLock};

use bursar_application::BlobStore;

/// In-memory blob store. All data is lost when the store is dropped; used
/// for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn retrieve(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.read().unwrap().get(key).cloned()
    }

    fn store(&self, key: &str, value: Vec<u8>) {
        self.blobs.write().unwrap().insert(key.to_owned(), value);
    }
}
