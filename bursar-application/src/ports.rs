/// Key/value persistence provided by the host. Values are opaque blobs; the
/// engine owns their encoding and never assumes anything about how or where
/// the host keeps them.
pub trait BlobStore: Send + Sync {
    fn retrieve(&self, key: &str) -> Option<Vec<u8>>;
    fn store(&self, key: &str, value: Vec<u8>);
}
