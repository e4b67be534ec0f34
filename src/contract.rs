//! # contract: backend interface consumed by every view
//!
//! [`CmsApi`] has one async method per (resource, operation) pair. Views only
//! ever talk to the backend through this trait, so tests substitute
//! `MockCmsApi` and the binary plugs in [`crate::client::HttpCmsClient`].
//!
//! Every method resolves only on a 2xx answer; anything else is an
//! [`ApiError`] naming the failed operation. Implementations never retry.
//!
//! [`Confirm`] is the single safeguard in front of destructive actions.

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::errors::ApiError;
use crate::model::{
    Bucket, BucketUpdate, FileDownload, FileRecord, FileUpdate, NewBucket, NewFile,
    NewReleaseNote, ReleaseNote, ReleaseNoteUpdate,
};

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CmsApi: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<Bucket>, ApiError>;

    async fn get_bucket(&self, id: i64) -> Result<Bucket, ApiError>;

    async fn create_bucket(&self, req: NewBucket) -> Result<Bucket, ApiError>;

    async fn update_bucket(&self, id: i64, req: BucketUpdate) -> Result<Bucket, ApiError>;

    async fn delete_bucket(&self, id: i64) -> Result<(), ApiError>;

    /// Files owned by one bucket.
    async fn list_bucket_files(&self, bucket_id: i64) -> Result<Vec<FileRecord>, ApiError>;

    /// Every file, across buckets.
    async fn list_files(&self) -> Result<Vec<FileRecord>, ApiError>;

    async fn get_file(&self, id: i64) -> Result<FileRecord, ApiError>;

    /// Upload a new file into `req.bucket_id`.
    async fn create_file(&self, req: NewFile) -> Result<FileRecord, ApiError>;

    async fn update_file(&self, id: i64, req: FileUpdate) -> Result<FileRecord, ApiError>;

    async fn delete_file(&self, id: i64) -> Result<(), ApiError>;

    async fn download_file(&self, id: i64) -> Result<FileDownload, ApiError>;

    /// Replace the stored bytes of a file, keeping its metadata.
    async fn update_file_content(&self, id: i64, content: Vec<u8>)
        -> Result<FileRecord, ApiError>;

    async fn list_release_notes(&self) -> Result<Vec<ReleaseNote>, ApiError>;

    async fn get_release_note(&self, id: i64) -> Result<ReleaseNote, ApiError>;

    async fn create_release_note(&self, req: NewReleaseNote) -> Result<ReleaseNote, ApiError>;

    async fn update_release_note(
        &self,
        id: i64,
        req: ReleaseNoteUpdate,
    ) -> Result<ReleaseNote, ApiError>;

    async fn delete_release_note(&self, id: i64) -> Result<(), ApiError>;

    /// Liveness probe of the backend.
    async fn health(&self) -> Result<(), ApiError>;
}

/// Interactive yes/no question asked before a destructive action.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Answers yes without asking. Used for `--yes`.
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!(prompt, "Confirmation assumed");
        true
    }
}
