//! `StblStudio` - string table projects on top of `stblcore`

// Re-export stblcore
pub use stblcore;

pub mod error;
pub mod project;
pub mod settings;
pub mod storage;
pub mod uploads;

pub use error::{Error, Result};

use stblcore::container::ResourceContainer;
use stblcore::locale::Locale;

use project::{DEFAULT_GROUP, Project};
use settings::Settings;
use storage::{KeyValueStore, ProjectStore};
use uploads::{ParseFailure, UploadedFile};

/// Settings plus project storage.
#[derive(Debug)]
pub struct Studio<S> {
    settings: Settings,
    projects: ProjectStore<S>,
}

impl<S: KeyValueStore> Studio<S> {
    pub fn new(settings: Settings, store: S) -> Self {
        Self {
            settings,
            projects: ProjectStore::new(store),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn projects(&mut self) -> &mut ProjectStore<S> {
        &mut self.projects
    }

    /// Build a project from uploaded files and save it.
    ///
    /// Files that fail to parse are skipped and returned alongside the
    /// project.
    pub fn import_project(
        &mut self,
        name: &str,
        primary_locale: Locale,
        files: &[UploadedFile],
        container: Option<&dyn ResourceContainer>,
    ) -> Result<(Project, Vec<ParseFailure>)> {
        let parsed = uploads::parse_files(files, &self.settings, container);
        let instance = parsed.instances.first().copied().unwrap_or_default();
        let stbl = stblcore::resolver::resolve_string_tables(primary_locale, &parsed.tables);

        let mut project = Project::create(name, DEFAULT_GROUP, instance, stbl);
        self.projects.save_project(&mut project)?;
        tracing::info!(
            uuid = project.uuid(),
            entries = project.meta().num_entries,
            failed = parsed.errors.len(),
            "Imported project"
        );
        Ok((project, parsed.errors))
    }

    /// Load a saved project with its table.
    pub fn open_project(&self, uuid: &str) -> Result<Project> {
        self.projects.load_project(uuid)
    }

    /// Save changes made to `project`.
    pub fn save_project(&mut self, project: &mut Project) -> Result<()> {
        self.projects.save_project(project)
    }
}
