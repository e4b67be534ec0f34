//! Create/edit forms for a single entity.
//!
//! A [`ResourceForm`] is in one of two modes:
//! - **create**: starts from an empty [`Draft`] and submits one create call,
//! - **edit(id)**: pre-populates from a fetch-by-id and submits one update
//!   call scoped to that id.
//!
//! Changing the title (or a file's name) re-derives the slug in the same
//! update; no other change touches it. Failures are logged and kept in
//! [`ResourceForm::last_error`] while the form stays open.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::contract::CmsApi;
use crate::errors::{ApiError, FormError};
use crate::model::{
    Bucket, BucketUpdate, Entity, FileRecord, FileUpdate, NewBucket, NewFile, NewReleaseNote,
    ReleaseNote, ReleaseNoteUpdate,
};
use crate::routes::Route;
use crate::scope::ViewScope;
use crate::slug::slugify;

/// Local, editable state of one entity type.
#[async_trait]
pub trait Draft: Clone + Default + Send + Sync + 'static {
    type Entity: Entity + Send + Sync;
    type Change: Send;

    /// Copies every editable field of `entity` verbatim.
    fn from_entity(entity: &Self::Entity) -> Self;

    fn apply(&mut self, change: Self::Change);

    fn slug(&self) -> &str;

    /// Names of required fields that are still empty.
    fn missing_fields(&self) -> Vec<&'static str>;

    /// Label/value pairs in display order.
    fn fields(&self) -> Vec<(&'static str, String)>;

    /// The list a finished form navigates back to.
    fn list_route(&self) -> Route;

    async fn fetch(api: &dyn CmsApi, id: i64) -> Result<Self::Entity, ApiError>;

    async fn create(&self, api: &dyn CmsApi) -> Result<Self::Entity, ApiError>;

    async fn update(&self, api: &dyn CmsApi, id: i64) -> Result<Self::Entity, ApiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormState {
    Ready,
    Loading,
    Failed(String),
}

pub struct ResourceForm<D: Draft> {
    api: Arc<dyn CmsApi>,
    mode: FormMode,
    state: FormState,
    draft: D,
    last_error: Option<String>,
    scope: ViewScope,
}

impl<D: Draft> ResourceForm<D> {
    /// Empty form in create mode.
    pub fn create(api: Arc<dyn CmsApi>) -> Self {
        Self::create_with(api, D::default())
    }

    /// Create mode starting from a prepared draft (e.g. a file preset to a bucket).
    pub fn create_with(api: Arc<dyn CmsApi>, draft: D) -> Self {
        ResourceForm {
            api,
            mode: FormMode::Create,
            state: FormState::Ready,
            draft,
            last_error: None,
            scope: ViewScope::new(),
        }
    }

    /// Edit mode for `id`. The draft stays empty until [`ResourceForm::load`] succeeds.
    pub fn edit(api: Arc<dyn CmsApi>, id: i64) -> Self {
        ResourceForm {
            api,
            mode: FormMode::Edit(id),
            state: FormState::Loading,
            draft: D::default(),
            last_error: None,
            scope: ViewScope::new(),
        }
    }

    /// Fetches the entity in edit mode and populates the draft from it.
    pub async fn load(&mut self) -> &FormState {
        let FormMode::Edit(id) = self.mode else {
            return &self.state;
        };
        let kind = <D::Entity as Entity>::KIND;
        self.state = FormState::Loading;

        match self.scope.run(D::fetch(self.api.as_ref(), id)).await {
            None => {
                info!(%kind, id, "Form closed before its entity arrived");
            }
            Some(Ok(entity)) => {
                info!(%kind, id, "Populated form from backend");
                self.draft = D::from_entity(&entity);
                self.state = FormState::Ready;
            }
            Some(Err(e)) => {
                error!(%kind, id, error = %e, "Failed to load entity into form");
                self.state = FormState::Failed(e.to_string());
            }
        }
        &self.state
    }

    pub fn change(&mut self, change: D::Change) {
        self.draft.apply(change);
    }

    /// Validates and sends the draft. On success returns the route of the
    /// owning list; on failure the form keeps its state.
    pub async fn submit(&mut self) -> Result<Route, FormError> {
        let kind = <D::Entity as Entity>::KIND;
        if self.state != FormState::Ready {
            warn!(%kind, state = ?self.state, "Submit refused, form is not ready");
            return Err(FormError::NotReady);
        }
        let missing = self.draft.missing_fields();
        if !missing.is_empty() {
            warn!(%kind, ?missing, "Submit refused, required fields are empty");
            return Err(FormError::MissingFields(missing));
        }

        let api = self.api.as_ref();
        let result = match self.mode {
            FormMode::Create => self.scope.run(self.draft.create(api)).await,
            FormMode::Edit(id) => self.scope.run(self.draft.update(api, id)).await,
        };

        match result {
            None => Err(FormError::Closed),
            Some(Ok(saved)) => {
                info!(%kind, id = saved.id(), mode = ?self.mode, "Saved entity");
                self.last_error = None;
                Ok(self.draft.list_route())
            }
            Some(Err(e)) => {
                error!(%kind, mode = ?self.mode, error = %e, "Error saving entity");
                self.last_error = Some(e.to_string());
                Err(FormError::Api(e))
            }
        }
    }

    /// Discards local state; nothing is sent.
    pub fn cancel(self) -> Route {
        self.draft.list_route()
    }

    pub fn draft(&self) -> &D {
        &self.draft
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    pub fn heading(&self) -> String {
        let kind = <D::Entity as Entity>::KIND.singular();
        match self.mode {
            FormMode::Create => format!("New {kind}"),
            FormMode::Edit(id) => format!("Edit {kind} #{id}"),
        }
    }
}

impl<D: Draft> Drop for ResourceForm<D> {
    fn drop(&mut self) {
        self.scope.close();
    }
}

// ---- buckets -------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketDraft {
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub enum BucketChange {
    Title(String),
}

#[async_trait]
impl Draft for BucketDraft {
    type Entity = Bucket;
    type Change = BucketChange;

    fn from_entity(entity: &Bucket) -> Self {
        BucketDraft {
            title: entity.title.clone(),
            slug: entity.slug.clone(),
        }
    }

    fn apply(&mut self, change: BucketChange) {
        match change {
            BucketChange::Title(title) => {
                self.slug = slugify(&title);
                self.title = title;
            }
        }
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        missing
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![("Title", self.title.clone()), ("Slug", self.slug.clone())]
    }

    fn list_route(&self) -> Route {
        Route::Buckets
    }

    async fn fetch(api: &dyn CmsApi, id: i64) -> Result<Bucket, ApiError> {
        api.get_bucket(id).await
    }

    async fn create(&self, api: &dyn CmsApi) -> Result<Bucket, ApiError> {
        api.create_bucket(NewBucket {
            title: self.title.clone(),
            slug: slugify(&self.title),
        })
        .await
    }

    async fn update(&self, api: &dyn CmsApi, id: i64) -> Result<Bucket, ApiError> {
        api.update_bucket(
            id,
            BucketUpdate {
                title: Some(self.title.clone()),
                slug: Some(self.slug.clone()),
            },
        )
        .await
    }
}

// ---- files ---------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDraft {
    /// Owning bucket; `0` until one is chosen.
    pub bucket_id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// `None` while the stored content is unknown; an update then leaves it as is.
    pub content: Option<String>,
    pub is_published: bool,
}

impl FileDraft {
    pub fn in_bucket(bucket_id: i64) -> Self {
        FileDraft {
            bucket_id,
            ..FileDraft::default()
        }
    }
}

#[derive(Debug, Clone)]
pub enum FileChange {
    Name(String),
    Description(String),
    Content(String),
    Published(bool),
    Bucket(i64),
}

#[async_trait]
impl Draft for FileDraft {
    type Entity = FileRecord;
    type Change = FileChange;

    fn from_entity(entity: &FileRecord) -> Self {
        FileDraft {
            bucket_id: entity.bucket_id,
            name: entity.name.clone(),
            slug: entity.slug.clone(),
            description: entity.description.clone(),
            content: entity.content.clone(),
            is_published: entity.is_published,
        }
    }

    fn apply(&mut self, change: FileChange) {
        match change {
            FileChange::Name(name) => {
                self.slug = slugify(&name);
                self.name = name;
            }
            FileChange::Description(description) => self.description = description,
            FileChange::Content(content) => self.content = Some(content),
            FileChange::Published(flag) => self.is_published = flag,
            FileChange::Bucket(bucket_id) => self.bucket_id = bucket_id,
        }
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.bucket_id <= 0 {
            missing.push("bucket");
        }
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        missing
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Bucket", self.bucket_id.to_string()),
            ("Name", self.name.clone()),
            ("Slug", self.slug.clone()),
            ("Description", self.description.clone()),
            ("Published", self.is_published.to_string()),
            ("Content", self.content.clone().unwrap_or_default()),
        ]
    }

    fn list_route(&self) -> Route {
        if self.bucket_id > 0 {
            Route::BucketDetails(self.bucket_id)
        } else {
            Route::Files
        }
    }

    async fn fetch(api: &dyn CmsApi, id: i64) -> Result<FileRecord, ApiError> {
        api.get_file(id).await
    }

    async fn create(&self, api: &dyn CmsApi) -> Result<FileRecord, ApiError> {
        api.create_file(NewFile {
            bucket_id: self.bucket_id,
            name: self.name.clone(),
            slug: slugify(&self.name),
            description: self.description.clone(),
            content: self.content.clone().unwrap_or_default(),
            is_published: self.is_published,
        })
        .await
    }

    async fn update(&self, api: &dyn CmsApi, id: i64) -> Result<FileRecord, ApiError> {
        api.update_file(
            id,
            FileUpdate {
                bucket_id: Some(self.bucket_id),
                name: Some(self.name.clone()),
                slug: Some(self.slug.clone()),
                description: Some(self.description.clone()),
                content: self.content.clone(),
                is_published: Some(self.is_published),
            },
        )
        .await
    }
}

// ---- release notes -------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseNoteDraft {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub version: String,
    pub release_date: DateTime<Utc>,
    pub is_published: bool,
}

impl Default for ReleaseNoteDraft {
    fn default() -> Self {
        ReleaseNoteDraft {
            title: String::new(),
            slug: String::new(),
            content: String::new(),
            version: String::new(),
            release_date: Utc::now(),
            is_published: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ReleaseNoteChange {
    Title(String),
    Content(String),
    Version(String),
    ReleaseDate(DateTime<Utc>),
    Published(bool),
}

#[async_trait]
impl Draft for ReleaseNoteDraft {
    type Entity = ReleaseNote;
    type Change = ReleaseNoteChange;

    fn from_entity(entity: &ReleaseNote) -> Self {
        ReleaseNoteDraft {
            title: entity.title.clone(),
            slug: entity.slug.clone(),
            content: entity.content.clone(),
            version: entity.version.clone(),
            release_date: entity.release_date,
            is_published: entity.is_published,
        }
    }

    fn apply(&mut self, change: ReleaseNoteChange) {
        match change {
            ReleaseNoteChange::Title(title) => {
                self.slug = slugify(&title);
                self.title = title;
            }
            ReleaseNoteChange::Content(content) => self.content = content,
            ReleaseNoteChange::Version(version) => self.version = version,
            ReleaseNoteChange::ReleaseDate(date) => self.release_date = date,
            ReleaseNoteChange::Published(flag) => self.is_published = flag,
        }
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("title", &self.title),
            ("content", &self.content),
            ("version", &self.version),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Title", self.title.clone()),
            ("Slug", self.slug.clone()),
            ("Version", self.version.clone()),
            ("Release Date", self.release_date.to_rfc3339()),
            ("Published", self.is_published.to_string()),
            ("Content", self.content.clone()),
        ]
    }

    fn list_route(&self) -> Route {
        Route::ReleaseNotes
    }

    async fn fetch(api: &dyn CmsApi, id: i64) -> Result<ReleaseNote, ApiError> {
        api.get_release_note(id).await
    }

    async fn create(&self, api: &dyn CmsApi) -> Result<ReleaseNote, ApiError> {
        api.create_release_note(NewReleaseNote {
            title: self.title.clone(),
            slug: slugify(&self.title),
            content: self.content.clone(),
            version: self.version.clone(),
            release_date: self.release_date,
            is_published: self.is_published,
        })
        .await
    }

    async fn update(&self, api: &dyn CmsApi, id: i64) -> Result<ReleaseNote, ApiError> {
        api.update_release_note(
            id,
            ReleaseNoteUpdate {
                title: Some(self.title.clone()),
                slug: Some(self.slug.clone()),
                content: Some(self.content.clone()),
                version: Some(self.version.clone()),
                release_date: Some(self.release_date),
                is_published: Some(self.is_published),
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockCmsApi;
    use crate::fixtures;
    use mockall::predicate::eq;

    fn bucket(id: i64, title: &str) -> Bucket {
        Bucket {
            id,
            title: title.to_string(),
            slug: slugify(title),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn create_submits_one_call_with_slug_derived_from_title() {
        let mut api = MockCmsApi::new();
        api.expect_create_bucket()
            .times(1)
            .withf(|req: &NewBucket| {
                req.title == "Version 2.0 Launch!" && req.slug == "version-2-0-launch"
            })
            .returning(|req| Ok(bucket(10, &req.title)));
        api.expect_update_bucket().never();

        let mut form: ResourceForm<BucketDraft> = ResourceForm::create_with(
            Arc::new(api),
            BucketDraft {
                title: String::new(),
                slug: "stale-slug".into(),
            },
        );
        form.change(BucketChange::Title("Version 2.0 Launch!".into()));
        assert_eq!(form.draft().slug(), "version-2-0-launch");

        let route = form.submit().await.expect("create succeeds");
        assert_eq!(route, Route::Buckets);
        assert!(form.last_error().is_none());
    }

    #[tokio::test]
    async fn create_payload_has_no_id_or_timestamps() {
        let mut api = MockCmsApi::new();
        api.expect_create_release_note()
            .times(1)
            .withf(|req: &NewReleaseNote| {
                let body = serde_json::to_value(req).unwrap();
                let obj = body.as_object().unwrap();
                !obj.contains_key("id")
                    && !obj.contains_key("created_at")
                    && !obj.contains_key("updated_at")
            })
            .returning(|_| Ok(fixtures::release_notes().remove(0)));

        let mut form: ResourceForm<ReleaseNoteDraft> = ResourceForm::create(Arc::new(api));
        form.change(ReleaseNoteChange::Title("Spring drop".into()));
        form.change(ReleaseNoteChange::Content("## Fixed\n\n- crash".into()));
        form.change(ReleaseNoteChange::Version("3.1.0".into()));
        assert_eq!(form.submit().await.unwrap(), Route::ReleaseNotes);
    }

    #[test]
    fn non_title_changes_never_touch_the_slug() {
        let mut draft = ReleaseNoteDraft::default();
        draft.apply(ReleaseNoteChange::Title("Hello World".into()));
        let slug = draft.slug.clone();
        draft.apply(ReleaseNoteChange::Content("body".into()));
        draft.apply(ReleaseNoteChange::Version("1.0".into()));
        draft.apply(ReleaseNoteChange::Published(true));
        draft.apply(ReleaseNoteChange::ReleaseDate(Utc::now()));
        assert_eq!(draft.slug, slug);

        let mut file = FileDraft::in_bucket(1);
        file.apply(FileChange::Name("Read Me.md".into()));
        file.apply(FileChange::Description("Some Other Title".into()));
        file.apply(FileChange::Content("x".into()));
        file.apply(FileChange::Published(true));
        file.apply(FileChange::Bucket(2));
        assert_eq!(file.slug, "read-me-md");
    }

    #[tokio::test]
    async fn edit_mode_prepopulates_verbatim() {
        let note = ReleaseNote {
            id: 5,
            title: "  Odd  Title ".into(),
            slug: "hand-made-slug".into(),
            content: "line one\r\n\ttabbed <b>html</b>\n".into(),
            version: "v5.0.0-rc.1".into(),
            release_date: Utc::now(),
            is_published: true,
            created_at: Utc::now(),
            updated_at: None,
        };
        let expected = note.clone();
        let mut api = MockCmsApi::new();
        api.expect_get_release_note()
            .with(eq(5))
            .times(1)
            .returning(move |_| Ok(note.clone()));

        let mut form: ResourceForm<ReleaseNoteDraft> = ResourceForm::edit(Arc::new(api), 5);
        assert_eq!(form.state(), &FormState::Loading);
        assert_eq!(form.load().await, &FormState::Ready);

        let draft = form.draft();
        assert_eq!(draft.title, expected.title);
        assert_eq!(draft.slug, expected.slug);
        assert_eq!(draft.content.as_bytes(), expected.content.as_bytes());
        assert_eq!(draft.version, expected.version);
        assert_eq!(draft.release_date, expected.release_date);
        assert_eq!(draft.is_published, expected.is_published);
    }

    #[tokio::test]
    async fn edit_submit_updates_only_that_id() {
        let mut api = MockCmsApi::new();
        api.expect_get_bucket()
            .with(eq(3))
            .returning(|id| Ok(bucket(id, "Old Name")));
        api.expect_update_bucket()
            .times(1)
            .withf(|id, req| {
                *id == 3
                    && req.title.as_deref() == Some("New Name")
                    && req.slug.as_deref() == Some("new-name")
            })
            .returning(|id, _| Ok(bucket(id, "New Name")));
        api.expect_create_bucket().never();

        let mut form: ResourceForm<BucketDraft> = ResourceForm::edit(Arc::new(api), 3);
        form.load().await;
        form.change(BucketChange::Title("New Name".into()));
        assert_eq!(form.submit().await.unwrap(), Route::Buckets);
        assert_eq!(form.heading(), "Edit bucket #3");
    }

    #[tokio::test]
    async fn failed_fetch_leaves_form_unpopulated() {
        let mut api = MockCmsApi::new();
        api.expect_get_file()
            .returning(|id| Err(ApiError::status(format!("get file {id}"), 404)));
        api.expect_update_file().never();

        let mut form: ResourceForm<FileDraft> = ResourceForm::edit(Arc::new(api), 8);
        let state = form.load().await.clone();
        assert!(matches!(state, FormState::Failed(ref msg) if msg.contains("404")));
        assert_eq!(form.draft(), &FileDraft::default());
        assert!(matches!(form.submit().await, Err(FormError::NotReady)));
    }

    #[tokio::test]
    async fn missing_required_fields_block_submission() {
        let mut api = MockCmsApi::new();
        api.expect_create_release_note().never();

        let mut form: ResourceForm<ReleaseNoteDraft> = ResourceForm::create(Arc::new(api));
        form.change(ReleaseNoteChange::Title("Only a title".into()));
        match form.submit().await {
            Err(FormError::MissingFields(fields)) => assert_eq!(fields, vec!["content", "version"]),
            other => panic!("expected missing fields, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn backend_failure_keeps_form_open_with_error() {
        let mut api = MockCmsApi::new();
        api.expect_create_file()
            .times(1)
            .returning(|req| Err(ApiError::status(format!("create file in bucket {}", req.bucket_id), 500)));

        let mut form: ResourceForm<FileDraft> =
            ResourceForm::create_with(Arc::new(api), FileDraft::in_bucket(4));
        form.change(FileChange::Name("notes.md".into()));
        let err = form.submit().await.unwrap_err();
        assert!(matches!(err, FormError::Api(_)));
        assert_eq!(
            form.last_error(),
            Some("create file in bucket 4 failed with HTTP 500")
        );
        assert_eq!(form.draft().name, "notes.md");
    }

    #[tokio::test]
    async fn file_form_returns_to_its_bucket() {
        let mut api = MockCmsApi::new();
        api.expect_create_file()
            .times(1)
            .withf(|req: &NewFile| req.bucket_id == 2 && req.slug == "release-md")
            .returning(|_| Ok(fixtures::files().remove(1)));

        let mut form: ResourceForm<FileDraft> =
            ResourceForm::create_with(Arc::new(api), FileDraft::in_bucket(2));
        form.change(FileChange::Name("Release.md".into()));
        form.change(FileChange::Content("# hi".into()));
        assert_eq!(form.submit().await.unwrap(), Route::BucketDetails(2));
    }

    #[test]
    fn cancel_sends_nothing_and_goes_back() {
        let mut api = MockCmsApi::new();
        api.expect_create_bucket().never();
        let mut form: ResourceForm<BucketDraft> = ResourceForm::create(Arc::new(api));
        form.change(BucketChange::Title("Unsaved".into()));
        assert_eq!(form.cancel(), Route::Buckets);
    }

    #[tokio::test]
    async fn file_edit_leaves_unknown_content_alone() {
        let mut stored = fixtures::files().remove(0);
        stored.content = None;
        let mut api = MockCmsApi::new();
        api.expect_get_file()
            .with(eq(1))
            .returning(move |_| Ok(stored.clone()));
        api.expect_update_file()
            .times(1)
            .withf(|id, req| *id == 1 && req.content.is_none() && req.is_published == Some(false))
            .returning(|_, _| Ok(fixtures::files().remove(0)));

        let mut form: ResourceForm<FileDraft> = ResourceForm::edit(Arc::new(api), 1);
        form.load().await;
        assert_eq!(form.draft().content, None);
        form.change(FileChange::Published(false));
        assert_eq!(form.submit().await.unwrap(), Route::BucketDetails(1));
    }

    #[tokio::test]
    async fn file_edit_sends_content_once_it_is_set() {
        let mut api = MockCmsApi::new();
        api.expect_get_file()
            .returning(|_| Ok(fixtures::files().remove(0)));
        api.expect_update_file()
            .times(1)
            .withf(|_, req| req.content.as_deref() == Some("# Rewritten"))
            .returning(|_, _| Ok(fixtures::files().remove(0)));

        let mut form: ResourceForm<FileDraft> = ResourceForm::edit(Arc::new(api), 1);
        form.load().await;
        form.change(FileChange::Content("# Rewritten".into()));
        form.submit().await.unwrap();
    }

    #[tokio::test]
    async fn closed_form_ignores_late_entity() {
        let mut api = MockCmsApi::new();
        api.expect_get_bucket().never();

        let mut form: ResourceForm<BucketDraft> = ResourceForm::edit(Arc::new(api), 1);
        form.scope().close();
        assert_eq!(form.load().await, &FormState::Loading);
        assert_eq!(form.draft(), &BucketDraft::default());
    }
}
