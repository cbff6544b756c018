use async_trait::async_trait;

/// Blob store for finished audio clips.
///
/// One object per word; when an object already exists at `path`,
/// implementations must still end up with the new bytes there (last writer
/// wins).
#[async_trait]
pub trait StorageRepository: Send + Sync {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), String>;
}
