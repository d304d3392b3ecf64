use async_trait::async_trait;

use super::error::StorageError;

/// Storage for user-uploaded media, addressed by paths relative to a media root.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store `data` as a new file inside `dir` and return its relative path
    /// (e.g. `posts/0190c1de-....png`).
    async fn save(
        &self,
        dir: &str,
        extension: Option<&str>,
        data: &[u8],
    ) -> Result<String, StorageError>;

    /// Delete a stored file.
    ///
    /// Returns `true` if the file was deleted, `false` if it did not exist.
    async fn delete(&self, path: &str) -> Result<bool, StorageError>;
}
