//! Collection pages: one list view per resource plus the bucket details page.
//!
//! A list fetches the whole collection on load and keeps the server order.
//! Deleting asks for confirmation first and then drops exactly that row from
//! local state; the list is not re-fetched. If the fetch fails and fixture
//! data is enabled, the demo dataset is shown instead of an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::contract::{CmsApi, Confirm};
use crate::editor::ContentEditor;
use crate::errors::ApiError;
use crate::fixtures;
use crate::model::{Bucket, Entity, FileDownload, FileRecord, ReleaseNote, ResourceKind};
use crate::routes::Route;
use crate::scope::ViewScope;

/// An entity type that can be shown in a [`ListView`].
#[async_trait]
pub trait Listed: Entity + Clone + Send + Sync + 'static {
    async fn fetch_all(api: &dyn CmsApi) -> Result<Vec<Self>, ApiError>;

    async fn remove(api: &dyn CmsApi, id: i64) -> Result<(), ApiError>;

    fn fixtures() -> Vec<Self>;

    fn label(&self) -> String;

    fn detail(&self) -> String;

    fn edit_route(&self) -> Route;

    fn create_route() -> Route;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListState {
    Loading,
    Ready { from_fixtures: bool },
    Failed(String),
}

/// One rendered row with its edit/delete controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: i64,
    pub label: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
    pub edit: Route,
    /// Id the delete control acts on.
    pub delete: i64,
}

impl Row {
    fn of<T: Listed>(item: &T) -> Row {
        Row {
            id: item.id(),
            label: item.label(),
            detail: item.detail(),
            created_at: item.created_at(),
            edit: item.edit_route(),
            delete: item.id(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed,
    /// The user answered no; nothing was sent.
    Declined,
    /// The view closed while the call was in flight.
    Abandoned,
}

fn delete_prompt(kind: ResourceKind) -> String {
    format!("Are you sure you want to delete this {kind}?")
}

pub struct ListView<T: Listed> {
    api: Arc<dyn CmsApi>,
    use_fixture_data: bool,
    state: ListState,
    items: Vec<T>,
    scope: ViewScope,
}

impl<T: Listed> ListView<T> {
    pub fn new(api: Arc<dyn CmsApi>, use_fixture_data: bool) -> Self {
        ListView {
            api,
            use_fixture_data,
            state: ListState::Loading,
            items: Vec::new(),
            scope: ViewScope::new(),
        }
    }

    pub async fn load(&mut self) -> &ListState {
        let kind = T::KIND;
        self.state = ListState::Loading;

        match self.scope.run(T::fetch_all(self.api.as_ref())).await {
            None => info!(%kind, "List closed before its collection arrived"),
            Some(Ok(items)) => {
                info!(%kind, count = items.len(), "Fetched collection");
                self.items = items;
                self.state = ListState::Ready {
                    from_fixtures: false,
                };
            }
            Some(Err(e)) if self.use_fixture_data => {
                warn!(%kind, error = %e, "Fetch failed, showing fixture data");
                self.items = T::fixtures();
                self.state = ListState::Ready {
                    from_fixtures: true,
                };
            }
            Some(Err(e)) => {
                error!(%kind, error = %e, "Failed to load collection");
                self.state = ListState::Failed(format!("Failed to load {}", kind.plural()));
            }
        }
        &self.state
    }

    pub fn rows(&self) -> Vec<Row> {
        self.items.iter().map(Row::of).collect()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    pub fn create_route(&self) -> Route {
        T::create_route()
    }

    /// Asks `confirm`, then deletes `id` and drops its row locally.
    pub async fn delete(
        &mut self,
        id: i64,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome, ApiError> {
        let kind = T::KIND;
        if !confirm.confirm(&delete_prompt(kind)) {
            info!(%kind, id, "Delete declined");
            return Ok(DeleteOutcome::Declined);
        }
        match self.scope.run(T::remove(self.api.as_ref(), id)).await {
            None => Ok(DeleteOutcome::Abandoned),
            Some(Ok(())) => {
                info!(%kind, id, "Deleted");
                self.items.retain(|item| item.id() != id);
                Ok(DeleteOutcome::Removed)
            }
            Some(Err(e)) => {
                error!(%kind, id, error = %e, "Error deleting");
                Err(e)
            }
        }
    }
}

impl<T: Listed> Drop for ListView<T> {
    fn drop(&mut self) {
        self.scope.close();
    }
}

#[async_trait]
impl Listed for Bucket {
    async fn fetch_all(api: &dyn CmsApi) -> Result<Vec<Self>, ApiError> {
        api.list_buckets().await
    }

    async fn remove(api: &dyn CmsApi, id: i64) -> Result<(), ApiError> {
        api.delete_bucket(id).await
    }

    fn fixtures() -> Vec<Self> {
        fixtures::buckets()
    }

    fn label(&self) -> String {
        self.title.clone()
    }

    fn detail(&self) -> String {
        self.slug.clone()
    }

    fn edit_route(&self) -> Route {
        Route::EditBucket(self.id)
    }

    fn create_route() -> Route {
        Route::NewBucket
    }
}

#[async_trait]
impl Listed for FileRecord {
    async fn fetch_all(api: &dyn CmsApi) -> Result<Vec<Self>, ApiError> {
        api.list_files().await
    }

    async fn remove(api: &dyn CmsApi, id: i64) -> Result<(), ApiError> {
        api.delete_file(id).await
    }

    fn fixtures() -> Vec<Self> {
        fixtures::files()
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn detail(&self) -> String {
        let state = if self.is_published { "published" } else { "draft" };
        match self.file_size {
            Some(size) => format!("bucket {} · {state} · {size} B", self.bucket_id),
            None => format!("bucket {} · {state}", self.bucket_id),
        }
    }

    fn edit_route(&self) -> Route {
        Route::EditFile(self.id)
    }

    fn create_route() -> Route {
        Route::NewFile { bucket_id: None }
    }
}

#[async_trait]
impl Listed for ReleaseNote {
    async fn fetch_all(api: &dyn CmsApi) -> Result<Vec<Self>, ApiError> {
        api.list_release_notes().await
    }

    async fn remove(api: &dyn CmsApi, id: i64) -> Result<(), ApiError> {
        api.delete_release_note(id).await
    }

    fn fixtures() -> Vec<Self> {
        fixtures::release_notes()
    }

    fn label(&self) -> String {
        self.title.clone()
    }

    fn detail(&self) -> String {
        let state = if self.is_published { "published" } else { "draft" };
        format!("v{} · {state}", self.version)
    }

    fn edit_route(&self) -> Route {
        Route::EditReleaseNote(self.id)
    }

    fn create_route() -> Route {
        Route::NewReleaseNote
    }
}

/// A file opened from the details page for editing or previewing.
#[derive(Debug, Clone)]
pub struct OpenFile {
    pub file: FileRecord,
    pub editor: ContentEditor,
}

/// One bucket together with the files it owns.
pub struct BucketDetails {
    api: Arc<dyn CmsApi>,
    bucket_id: i64,
    bucket: Option<Bucket>,
    files: Vec<FileRecord>,
    state: ListState,
    scope: ViewScope,
}

impl BucketDetails {
    pub fn new(api: Arc<dyn CmsApi>, bucket_id: i64) -> Self {
        BucketDetails {
            api,
            bucket_id,
            bucket: None,
            files: Vec::new(),
            state: ListState::Loading,
            scope: ViewScope::new(),
        }
    }

    /// Fetches the bucket and its files concurrently.
    pub async fn load(&mut self) -> &ListState {
        let id = self.bucket_id;
        let api = self.api.as_ref();
        let both = futures::future::try_join(api.get_bucket(id), api.list_bucket_files(id));

        match self.scope.run(both).await {
            None => info!(bucket_id = id, "Details closed before data arrived"),
            Some(Ok((bucket, files))) => {
                info!(bucket_id = id, files = files.len(), "Fetched bucket details");
                self.bucket = Some(bucket);
                self.files = files;
                self.state = ListState::Ready {
                    from_fixtures: false,
                };
            }
            Some(Err(e)) => {
                error!(bucket_id = id, error = %e, "Error fetching bucket details");
                self.state = ListState::Failed(e.to_string());
            }
        }
        &self.state
    }

    pub fn bucket(&self) -> Option<&Bucket> {
        self.bucket.as_ref()
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn rows(&self) -> Vec<Row> {
        self.files.iter().map(Row::of).collect()
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    pub fn new_file_route(&self) -> Route {
        Route::NewFile {
            bucket_id: Some(self.bucket_id),
        }
    }

    pub async fn delete_file(
        &mut self,
        file_id: i64,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome, ApiError> {
        if !confirm.confirm(&delete_prompt(ResourceKind::File)) {
            info!(file_id, "Delete declined");
            return Ok(DeleteOutcome::Declined);
        }
        match self.scope.run(self.api.delete_file(file_id)).await {
            None => Ok(DeleteOutcome::Abandoned),
            Some(Ok(())) => {
                info!(bucket_id = self.bucket_id, file_id, "Deleted file");
                self.files.retain(|f| f.id != file_id);
                Ok(DeleteOutcome::Removed)
            }
            Some(Err(e)) => {
                error!(file_id, error = %e, "Error deleting file");
                Err(e)
            }
        }
    }

    /// Fetches the stored bytes of a file. `None` once the page is closed.
    pub async fn download(&self, file_id: i64) -> Result<Option<FileDownload>, ApiError> {
        match self.scope.run(self.api.download_file(file_id)).await {
            None => {
                info!(file_id, "Details closed before the download finished");
                Ok(None)
            }
            Some(Ok(download)) => Ok(Some(download)),
            Some(Err(e)) => {
                error!(file_id, error = %e, "Error downloading file");
                Err(e)
            }
        }
    }

    /// Loads the stored content of a file into an editor.
    pub async fn open_file(&self, file_id: i64) -> Result<Option<OpenFile>, ApiError> {
        let file = match self.files.iter().find(|f| f.id == file_id) {
            Some(file) => file.clone(),
            None => match self.scope.run(self.api.get_file(file_id)).await {
                Some(found) => found?,
                None => return Ok(None),
            },
        };
        Ok(self.download(file_id).await?.map(|download| OpenFile {
            file,
            editor: ContentEditor::new(download.text()),
        }))
    }

    /// Stores the editor's content and refreshes the matching row.
    /// `None` if the page closed first; the rows are then left as they were.
    pub async fn save_file(&mut self, open: &OpenFile) -> Result<Option<FileRecord>, ApiError> {
        let file_id = open.file.id;
        let bytes = open.editor.content().as_bytes().to_vec();
        let saved = match self
            .scope
            .run(self.api.update_file_content(file_id, bytes))
            .await
        {
            None => {
                info!(file_id, "Details closed before the file was saved");
                return Ok(None);
            }
            Some(Ok(saved)) => saved,
            Some(Err(e)) => {
                error!(file_id, error = %e, "Error saving file");
                return Err(e);
            }
        };
        if let Some(slot) = self.files.iter_mut().find(|f| f.id == file_id) {
            *slot = saved.clone();
        }
        Ok(Some(saved))
    }
}

impl Drop for BucketDetails {
    fn drop(&mut self) {
        self.scope.close();
    }
}
