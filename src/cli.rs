use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::client::HttpCmsClient;
use crate::config::Settings;
use crate::contract::{AssumeYes, CmsApi, Confirm};
use crate::editor::{ContentEditor, Rendered, ViewMode};
use crate::form::{
    BucketChange, BucketDraft, Draft, FileChange, FileDraft, FormState, ReleaseNoteChange,
    ReleaseNoteDraft, ResourceForm,
};
use crate::list::{BucketDetails, DeleteOutcome, ListState, ListView, Listed};
use crate::load_config::load_config;
use crate::model::{Bucket, FileRecord, ReleaseNote};
use crate::routes::Route;
use crate::shell::{render_fields, render_rows, render_table, Layout};

/// CLI for relnotes-admin: manage buckets, files and release notes on a CMS backend.
#[derive(Parser)]
#[clap(
    name = "relnotes-admin",
    version,
    about = "Manage call buckets, files and release notes on a content backend"
)]
pub struct Cli {
    /// Path to a YAML settings file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show demo data when the backend cannot be reached
    #[clap(long, global = true)]
    pub fixtures: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List, inspect and edit call buckets
    Buckets {
        #[clap(subcommand)]
        action: BucketAction,
    },
    /// List, upload and edit files
    Files {
        #[clap(subcommand)]
        action: FileAction,
    },
    /// List, write and publish release notes
    ReleaseNotes {
        #[clap(subcommand)]
        action: ReleaseNoteAction,
    },
    /// Render a local Markdown file the way the content editor does
    Preview {
        path: PathBuf,
        #[clap(long, default_value = "preview")]
        mode: ViewMode,
    },
    /// Render the page behind a console route, e.g. `/buckets/3`
    View { route: Route },
    /// Check that the backend answers
    Health,
}

#[derive(Subcommand)]
pub enum BucketAction {
    List,
    /// Show a bucket with its files
    Show { id: i64 },
    Create {
        #[clap(long)]
        title: String,
    },
    Edit {
        id: i64,
        #[clap(long)]
        title: Option<String>,
    },
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[clap(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum FileAction {
    List {
        /// Only files of this bucket
        #[clap(long)]
        bucket: Option<i64>,
    },
    Show { id: i64 },
    Create {
        #[clap(long)]
        bucket: i64,
        #[clap(long)]
        name: String,
        #[clap(long, default_value = "")]
        description: String,
        /// Read the file content from this path
        #[clap(long)]
        from: Option<PathBuf>,
        #[clap(long)]
        published: bool,
    },
    Edit {
        id: i64,
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        description: Option<String>,
        #[clap(long)]
        from: Option<PathBuf>,
        #[clap(long)]
        published: Option<bool>,
        /// Move the file to another bucket
        #[clap(long)]
        bucket: Option<i64>,
    },
    Delete {
        id: i64,
        #[clap(long)]
        yes: bool,
    },
    /// Save the stored bytes of a file locally
    Download {
        id: i64,
        #[clap(long)]
        out: Option<PathBuf>,
    },
    /// Replace the stored content of a file
    SetContent {
        id: i64,
        #[clap(long)]
        from: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ReleaseNoteAction {
    List,
    Show { id: i64 },
    Create {
        #[clap(long)]
        title: String,
        #[clap(long)]
        version: String,
        #[clap(long, conflicts_with = "content_from")]
        content: Option<String>,
        /// Read the Markdown body from this path
        #[clap(long)]
        content_from: Option<PathBuf>,
        /// RFC 3339 timestamp, defaults to now
        #[clap(long)]
        release_date: Option<DateTime<Utc>>,
        #[clap(long)]
        published: bool,
    },
    Edit {
        id: i64,
        #[clap(long)]
        title: Option<String>,
        #[clap(long)]
        version: Option<String>,
        #[clap(long, conflicts_with = "content_from")]
        content: Option<String>,
        #[clap(long)]
        content_from: Option<PathBuf>,
        #[clap(long)]
        release_date: Option<DateTime<Utc>>,
        #[clap(long)]
        published: Option<bool>,
    },
    Delete {
        id: i64,
        #[clap(long)]
        yes: bool,
    },
}

/// Asks on stderr and reads the answer from stdin. Anything but `y`/`yes` is a no.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        eprint!("{prompt} [y/N] ");
        let _ = io::stderr().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn body_from(content: Option<String>, content_from: Option<PathBuf>) -> Result<Option<String>> {
    match (content, content_from) {
        (Some(text), _) => Ok(Some(text)),
        (None, Some(path)) => read_text(&path).map(Some),
        (None, None) => Ok(None),
    }
}

/// Executes commands against a backend and renders the resulting pages.
pub struct Console {
    api: Arc<dyn CmsApi>,
    settings: Settings,
    confirm: Box<dyn Confirm>,
    layout: Layout,
}

impl Console {
    pub fn new(api: Arc<dyn CmsApi>, settings: Settings, confirm: Box<dyn Confirm>) -> Self {
        Console {
            api,
            settings,
            confirm,
            layout: Layout,
        }
    }

    pub async fn execute(&self, command: Commands) -> Result<String> {
        match command {
            Commands::Buckets { action } => self.buckets(action).await,
            Commands::Files { action } => self.files(action).await,
            Commands::ReleaseNotes { action } => self.release_notes(action).await,
            Commands::Preview { path, mode } => {
                let mut editor = ContentEditor::new(read_text(&path)?);
                editor.set_mode(mode);
                Ok(match editor.render() {
                    Rendered::Source(text) | Rendered::Html(text) => text,
                    Rendered::Split { source, html } => {
                        format!("{source}\n\n---- preview ----\n\n{html}")
                    }
                })
            }
            Commands::View { route } => self.view(route).await,
            Commands::Health => {
                self.api.health().await?;
                Ok("Backend is healthy.\n".to_string())
            }
        }
    }

    async fn buckets(&self, action: BucketAction) -> Result<String> {
        match action {
            BucketAction::List => self.list_page::<Bucket>(Route::Buckets, "Buckets").await,
            BucketAction::Show { id } => self.details_page(id).await,
            BucketAction::Create { title } => {
                let mut form: ResourceForm<BucketDraft> = ResourceForm::create(self.api.clone());
                form.change(BucketChange::Title(title));
                self.submit_form(form).await
            }
            BucketAction::Edit { id, title } => {
                let mut form: ResourceForm<BucketDraft> = ResourceForm::edit(self.api.clone(), id);
                load_form(&mut form).await?;
                if let Some(title) = title {
                    form.change(BucketChange::Title(title));
                }
                self.submit_form(form).await
            }
            BucketAction::Delete { id, yes } => self.delete::<Bucket>(id, yes).await,
        }
    }

    async fn files(&self, action: FileAction) -> Result<String> {
        match action {
            FileAction::List { bucket: None } => {
                self.list_page::<FileRecord>(Route::Files, "Files").await
            }
            FileAction::List { bucket: Some(id) } => self.details_page(id).await,
            FileAction::Show { id } => {
                let form: ResourceForm<FileDraft> = ResourceForm::edit(self.api.clone(), id);
                self.form_page(Route::EditFile(id), form).await
            }
            FileAction::Create {
                bucket,
                name,
                description,
                from,
                published,
            } => {
                let mut form: ResourceForm<FileDraft> =
                    ResourceForm::create_with(self.api.clone(), FileDraft::in_bucket(bucket));
                form.change(FileChange::Name(name));
                form.change(FileChange::Description(description));
                form.change(FileChange::Published(published));
                if let Some(path) = from {
                    form.change(FileChange::Content(read_text(&path)?));
                }
                self.submit_form(form).await
            }
            FileAction::Edit {
                id,
                name,
                description,
                from,
                published,
                bucket,
            } => {
                let mut form: ResourceForm<FileDraft> = ResourceForm::edit(self.api.clone(), id);
                load_form(&mut form).await?;
                if let Some(name) = name {
                    form.change(FileChange::Name(name));
                }
                if let Some(description) = description {
                    form.change(FileChange::Description(description));
                }
                if let Some(path) = from {
                    form.change(FileChange::Content(read_text(&path)?));
                }
                if let Some(flag) = published {
                    form.change(FileChange::Published(flag));
                }
                if let Some(bucket) = bucket {
                    form.change(FileChange::Bucket(bucket));
                }
                self.submit_form(form).await
            }
            FileAction::Delete { id, yes } => self.delete::<FileRecord>(id, yes).await,
            FileAction::Download { id, out } => {
                let download = self.api.download_file(id).await?;
                let target = out.unwrap_or_else(|| {
                    PathBuf::from(
                        download
                            .file_name
                            .clone()
                            .unwrap_or_else(|| format!("file-{id}")),
                    )
                });
                std::fs::write(&target, &download.bytes)
                    .with_context(|| format!("Failed to write {}", target.display()))?;
                Ok(format!(
                    "Saved {} bytes to {}\n",
                    download.bytes.len(),
                    target.display()
                ))
            }
            FileAction::SetContent { id, from } => {
                let text = read_text(&from)?;
                let size = text.len();
                let saved = self.api.update_file_content(id, text.into_bytes()).await?;
                Ok(format!("Updated content of {} ({size} bytes).\n", saved.name))
            }
        }
    }

    async fn release_notes(&self, action: ReleaseNoteAction) -> Result<String> {
        match action {
            ReleaseNoteAction::List => {
                self.list_page::<ReleaseNote>(Route::ReleaseNotes, "Release Notes")
                    .await
            }
            ReleaseNoteAction::Show { id } => {
                let mut form: ResourceForm<ReleaseNoteDraft> =
                    ResourceForm::edit(self.api.clone(), id);
                load_form(&mut form).await?;
                let mut editor = ContentEditor::new(form.draft().content.clone());
                editor.set_mode(ViewMode::Preview);
                let preview = match editor.render() {
                    Rendered::Html(html) => html,
                    _ => String::new(),
                };
                let body = format!(
                    "{}\n---- preview ----\n\n{preview}",
                    render_fields(&form.draft().fields())
                );
                Ok(self
                    .layout
                    .render(&Route::EditReleaseNote(id), &form.heading(), &body))
            }
            ReleaseNoteAction::Create {
                title,
                version,
                content,
                content_from,
                release_date,
                published,
            } => {
                let mut form: ResourceForm<ReleaseNoteDraft> =
                    ResourceForm::create(self.api.clone());
                form.change(ReleaseNoteChange::Title(title));
                form.change(ReleaseNoteChange::Version(version));
                if let Some(body) = body_from(content, content_from)? {
                    form.change(ReleaseNoteChange::Content(body));
                }
                if let Some(date) = release_date {
                    form.change(ReleaseNoteChange::ReleaseDate(date));
                }
                form.change(ReleaseNoteChange::Published(published));
                self.submit_form(form).await
            }
            ReleaseNoteAction::Edit {
                id,
                title,
                version,
                content,
                content_from,
                release_date,
                published,
            } => {
                let mut form: ResourceForm<ReleaseNoteDraft> =
                    ResourceForm::edit(self.api.clone(), id);
                load_form(&mut form).await?;
                if let Some(title) = title {
                    form.change(ReleaseNoteChange::Title(title));
                }
                if let Some(version) = version {
                    form.change(ReleaseNoteChange::Version(version));
                }
                if let Some(body) = body_from(content, content_from)? {
                    form.change(ReleaseNoteChange::Content(body));
                }
                if let Some(date) = release_date {
                    form.change(ReleaseNoteChange::ReleaseDate(date));
                }
                if let Some(flag) = published {
                    form.change(ReleaseNoteChange::Published(flag));
                }
                self.submit_form(form).await
            }
            ReleaseNoteAction::Delete { id, yes } => self.delete::<ReleaseNote>(id, yes).await,
        }
    }

    async fn view(&self, route: Route) -> Result<String> {
        let api = self.api.clone();
        match route {
            Route::Buckets => self.list_page::<Bucket>(route, "Buckets").await,
            Route::Files => self.list_page::<FileRecord>(route, "Files").await,
            Route::ReleaseNotes => {
                self.list_page::<ReleaseNote>(route, "Release Notes")
                    .await
            }
            Route::BucketDetails(id) => self.details_page(id).await,
            Route::NewBucket => {
                self.form_page(route, ResourceForm::<BucketDraft>::create(api))
                    .await
            }
            Route::EditBucket(id) => {
                self.form_page(route, ResourceForm::<BucketDraft>::edit(api, id))
                    .await
            }
            Route::NewFile { bucket_id } => {
                let draft = FileDraft::in_bucket(bucket_id.unwrap_or_default());
                self.form_page(route, ResourceForm::create_with(api, draft))
                    .await
            }
            Route::EditFile(id) => {
                self.form_page(route, ResourceForm::<FileDraft>::edit(api, id))
                    .await
            }
            Route::NewReleaseNote => {
                self.form_page(route, ResourceForm::<ReleaseNoteDraft>::create(api))
                    .await
            }
            Route::EditReleaseNote(id) => {
                self.form_page(route, ResourceForm::<ReleaseNoteDraft>::edit(api, id))
                    .await
            }
        }
    }

    async fn list_page<T: Listed>(&self, route: Route, heading: &str) -> Result<String> {
        let mut view: ListView<T> = ListView::new(self.api.clone(), self.settings.use_fixture_data);
        let state = view.load().await.clone();
        if let ListState::Failed(message) = &state {
            bail!("{message}");
        }
        let body = render_rows(&state, &view.rows(), &view.create_route());
        Ok(self.layout.render(&route, heading, &body))
    }

    async fn details_page(&self, id: i64) -> Result<String> {
        let mut details = BucketDetails::new(self.api.clone(), id);
        let state = details.load().await.clone();
        if let ListState::Failed(message) = &state {
            bail!("{message}");
        }
        let (heading, summary) = match details.bucket() {
            Some(bucket) => (
                bucket.title.clone(),
                render_table(
                    &["Slug", "Created At", "Updated At"],
                    &[vec![
                        bucket.slug.clone(),
                        bucket.created_at.format("%b %d, %Y").to_string(),
                        bucket
                            .updated_at
                            .map(|t| t.format("%b %d, %Y").to_string())
                            .unwrap_or_else(|| "-".to_string()),
                    ]],
                ),
            ),
            None => (format!("Bucket #{id}"), String::new()),
        };
        let files = render_rows(&state, &details.rows(), &details.new_file_route());
        let body = format!("{summary}\nFiles\n\n{files}");
        Ok(self
            .layout
            .render(&Route::BucketDetails(id), &heading, &body))
    }

    async fn form_page<D: Draft>(&self, route: Route, mut form: ResourceForm<D>) -> Result<String> {
        load_form(&mut form).await?;
        let body = render_fields(&form.draft().fields());
        Ok(self.layout.render(&route, &form.heading(), &body))
    }

    async fn submit_form<D: Draft>(&self, mut form: ResourceForm<D>) -> Result<String> {
        let heading = form.heading();
        let next = form
            .submit()
            .await
            .with_context(|| format!("{heading} could not be saved"))?;
        let body = format!(
            "Saved.\n\n{}\nNext: {next}\n",
            render_fields(&form.draft().fields())
        );
        Ok(self.layout.render(&next, &heading, &body))
    }

    async fn delete<T: Listed>(&self, id: i64, yes: bool) -> Result<String> {
        let kind = T::KIND;
        let confirm: &dyn Confirm = if yes { &AssumeYes } else { self.confirm.as_ref() };
        let mut view: ListView<T> = ListView::new(self.api.clone(), false);
        match view.delete(id, confirm).await? {
            DeleteOutcome::Removed => Ok(format!("Deleted {kind} {id}.\n")),
            DeleteOutcome::Declined => Ok("Cancelled, nothing was deleted.\n".to_string()),
            DeleteOutcome::Abandoned => bail!("delete of {kind} {id} was interrupted"),
        }
    }
}

async fn load_form<D: Draft>(form: &mut ResourceForm<D>) -> Result<()> {
    match form.load().await {
        FormState::Ready => Ok(()),
        FormState::Failed(message) => bail!("{message}"),
        FormState::Loading => bail!("form closed before its data arrived"),
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let mut settings = load_config(cli.config.as_deref())?;
    if cli.fixtures {
        settings.use_fixture_data = true;
    }
    let api: Arc<dyn CmsApi> = Arc::new(HttpCmsClient::new(&settings)?);
    let console = Console::new(api, settings, Box::new(StdinConfirm));

    match console.execute(cli.command).await {
        Ok(output) => {
            print!("{output}");
            Ok(())
        }
        Err(e) => {
            eprintln!("[ERROR] {e:#}");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{MockCmsApi, MockConfirm};
    use crate::errors::ApiError;
    use crate::fixtures;
    use crate::model::NewBucket;
    use mockall::predicate::eq;

    fn console(api: MockCmsApi, confirm: MockConfirm, use_fixture_data: bool) -> Console {
        let settings = Settings {
            use_fixture_data,
            ..Settings::default()
        };
        Console::new(Arc::new(api), settings, Box::new(confirm))
    }

    #[test]
    fn parses_nested_subcommands() {
        let cli = Cli::try_parse_from([
            "relnotes-admin",
            "--fixtures",
            "files",
            "edit",
            "3",
            "--published",
            "false",
        ])
        .expect("valid command line");
        assert!(cli.fixtures);
        match cli.command {
            Commands::Files {
                action: FileAction::Edit { id, published, .. },
            } => {
                assert_eq!(id, 3);
                assert_eq!(published, Some(false));
            }
            _ => panic!("parsed the wrong command"),
        }
    }

    #[test]
    fn rejects_both_content_sources() {
        let parsed = Cli::try_parse_from([
            "relnotes-admin",
            "release-notes",
            "create",
            "--title",
            "x",
            "--version",
            "1",
            "--content",
            "a",
            "--content-from",
            "b.md",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn view_takes_a_route() {
        let cli = Cli::try_parse_from(["relnotes-admin", "view", "/buckets/4/files/new"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::View {
                route: Route::NewFile { bucket_id: Some(4) }
            }
        ));
        assert!(Cli::try_parse_from(["relnotes-admin", "view", "/nowhere"]).is_err());
    }

    #[tokio::test]
    async fn create_bucket_reports_next_route() {
        let mut api = MockCmsApi::new();
        api.expect_create_bucket()
            .times(1)
            .withf(|req: &NewBucket| req.slug == "q3-hotfixes")
            .returning(|req| {
                let mut bucket = fixtures::buckets().remove(0);
                bucket.id = 9;
                bucket.title = req.title;
                bucket.slug = req.slug;
                Ok(bucket)
            });
        let out = console(api, MockConfirm::new(), false)
            .execute(Commands::Buckets {
                action: BucketAction::Create {
                    title: "Q3 Hotfixes".into(),
                },
            })
            .await
            .unwrap();
        assert!(out.contains("Slug: q3-hotfixes"), "{out}");
        assert!(out.contains("Next: /"), "{out}");
    }

    #[tokio::test]
    async fn declined_delete_prints_cancel_notice() {
        let mut api = MockCmsApi::new();
        api.expect_delete_release_note().never();
        let mut confirm = MockConfirm::new();
        confirm
            .expect_confirm()
            .withf(|prompt: &str| prompt.contains("release note"))
            .times(1)
            .return_const(false);

        let out = console(api, confirm, false)
            .execute(Commands::ReleaseNotes {
                action: ReleaseNoteAction::Delete { id: 4, yes: false },
            })
            .await
            .unwrap();
        assert_eq!(out, "Cancelled, nothing was deleted.\n");
    }

    #[tokio::test]
    async fn yes_flag_skips_the_prompt() {
        let mut api = MockCmsApi::new();
        api.expect_delete_bucket()
            .with(eq(2))
            .times(1)
            .returning(|_| Ok(()));
        let mut confirm = MockConfirm::new();
        confirm.expect_confirm().never();

        let out = console(api, confirm, false)
            .execute(Commands::Buckets {
                action: BucketAction::Delete { id: 2, yes: true },
            })
            .await
            .unwrap();
        assert_eq!(out, "Deleted bucket 2.\n");
    }

    #[tokio::test]
    async fn list_failure_is_an_error_unless_fixtures_are_on() {
        let failing = || {
            let mut api = MockCmsApi::new();
            api.expect_list_buckets()
                .returning(|| Err(ApiError::status("list buckets", 503)));
            api
        };

        let err = console(failing(), MockConfirm::new(), false)
            .execute(Commands::View {
                route: Route::Buckets,
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to load buckets");

        let out = console(failing(), MockConfirm::new(), true)
            .execute(Commands::View {
                route: Route::Buckets,
            })
            .await
            .unwrap();
        assert!(out.contains("Version 1.2.0 Release"), "{out}");
        assert!(out.contains("[Buckets]"), "{out}");
    }

    #[tokio::test]
    async fn release_note_show_includes_rendered_preview() {
        let mut api = MockCmsApi::new();
        api.expect_get_release_note()
            .with(eq(2))
            .returning(|_| Ok(fixtures::release_notes().remove(1)));

        let out = console(api, MockConfirm::new(), false)
            .execute(Commands::ReleaseNotes {
                action: ReleaseNoteAction::Show { id: 2 },
            })
            .await
            .unwrap();
        assert!(out.contains("Version: 1.1.0"), "{out}");
        assert!(out.contains("<h1>1.1.0</h1>"), "{out}");
        assert!(out.contains("<td>download</td>"), "{out}");
    }

    #[tokio::test]
    async fn edit_file_without_changes_resubmits_loaded_values() {
        let mut api = MockCmsApi::new();
        api.expect_get_file()
            .with(eq(1))
            .returning(|_| Ok(fixtures::files().remove(0)));
        api.expect_update_file()
            .times(1)
            .withf(|id, req| {
                *id == 1
                    && req.name.as_deref() == Some("changelog.md")
                    && req.slug.as_deref() == Some("changelog-md")
                    && req.is_published == Some(false)
            })
            .returning(|_, _| Ok(fixtures::files().remove(0)));

        let out = console(api, MockConfirm::new(), false)
            .execute(Commands::Files {
                action: FileAction::Edit {
                    id: 1,
                    name: None,
                    description: None,
                    from: None,
                    published: Some(false),
                    bucket: None,
                },
            })
            .await
            .unwrap();
        assert!(out.contains("Next: /buckets/1"), "{out}");
    }

    #[tokio::test]
    async fn set_content_is_a_single_upload() {
        let source = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(source.path(), "# Replaced\n").unwrap();

        let mut api = MockCmsApi::new();
        api.expect_get_file().never();
        api.expect_get_bucket().never();
        api.expect_list_bucket_files().never();
        api.expect_download_file().never();
        api.expect_update_file_content()
            .times(1)
            .withf(|id, bytes| *id == 1 && bytes.as_slice() == b"# Replaced\n")
            .returning(|_, _| Ok(fixtures::files().remove(0)));

        let out = console(api, MockConfirm::new(), false)
            .execute(Commands::Files {
                action: FileAction::SetContent {
                    id: 1,
                    from: source.path().to_path_buf(),
                },
            })
            .await
            .unwrap();
        assert_eq!(out, "Updated content of changelog.md (11 bytes).\n");
    }
}
