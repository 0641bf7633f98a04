use std::fmt::{self, Display};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::msbuild::DescriptorKind;
use crate::writer::SolutionWriter;

const DEBUG: &str = "Debug";
const RELEASE: &str = "Release";
const ANY_CPU: &str = "Any CPU";
const PLATFORMS: [&str; 2] = ["x64", "x86"];

/// Handle of a folder inside [`Solution`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderId(usize);

/// Handle of a project inside [`Solution`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(usize);

impl FolderId {
    /// Solution itself
    pub const ROOT: FolderId = FolderId(0);
}

/// Represents solution configuration/platform pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Configuration {
    /// Configuration name i.e. Debug or Release
    pub configuration: String,
    /// Platform i.e. Any CPU, x86, x64 etc.
    pub platform: String,
}

impl Configuration {
    pub fn new(configuration: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            configuration: configuration.into(),
            platform: platform.into(),
        }
    }

    fn is(&self, configuration: &str, platform: &str) -> bool {
        self.configuration == configuration && self.platform == platform
    }
}

impl Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.configuration, self.platform)
    }
}

/// Represents project configuration/platform pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectConfiguration {
    /// Solution's configuration this project config belongs to
    pub solution_configuration: Configuration,
    /// Project configuration
    pub configuration: String,
    /// Project platform
    pub platform: String,
    /// Whether project is built within solution configuration
    pub enabled: bool,
}

impl ProjectConfiguration {
    /// Project side of the mapping as `Config|Platform`
    #[must_use]
    pub fn project_pair(&self) -> Configuration {
        Configuration::new(&self.configuration, &self.platform)
    }
}

/// Project identity token. Provisional one is generated when project is created
/// and replaced by the one declared in project file (if any) before writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectGuid {
    Provisional(Uuid),
    Final(Uuid),
}

impl ProjectGuid {
    #[must_use]
    pub fn value(self) -> Uuid {
        match self {
            ProjectGuid::Provisional(id) | ProjectGuid::Final(id) => id,
        }
    }
}

/// Solution folder
#[derive(Debug, Clone)]
pub struct Folder {
    guid: Uuid,
    name: String,
    parent: Option<FolderId>,
    folders: Vec<FolderId>,
    projects: Vec<ProjectId>,
}

impl Folder {
    fn new(parent: Option<FolderId>, name: &str) -> Self {
        let guid = if parent.is_some() {
            Uuid::new_v4()
        } else {
            Uuid::nil()
        };
        Self {
            guid,
            name: name.to_owned(),
            parent,
            folders: vec![],
            projects: vec![],
        }
    }

    /// Nil for solution itself
    #[must_use]
    pub fn guid(&self) -> Uuid {
        self.guid
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parent(&self) -> Option<FolderId> {
        self.parent
    }

    #[must_use]
    pub fn folders(&self) -> &[FolderId] {
        &self.folders
    }

    #[must_use]
    pub fn projects(&self) -> &[ProjectId] {
        &self.projects
    }
}

/// Project node of the solution
#[derive(Debug, Clone)]
pub struct Project {
    guid: ProjectGuid,
    folder: FolderId,
    name: String,
    full_path: PathBuf,
    configurations: Vec<ProjectConfiguration>,
}

impl Project {
    /// Creates project that is not attached to any folder yet and has no configurations.
    /// See [`Solution::add_project_node`]
    pub fn new(name: impl Into<String>, full_path: impl Into<PathBuf>) -> Self {
        Self {
            guid: ProjectGuid::Provisional(Uuid::new_v4()),
            folder: FolderId::ROOT,
            name: name.into(),
            full_path: full_path.into(),
            configurations: vec![],
        }
    }

    /// Adds configuration mapping unless solution configuration is already mapped.
    /// Returns new or existing mapping
    pub fn add_configuration(
        &mut self,
        solution_configuration: Configuration,
        configuration: &str,
        platform: &str,
        enabled: bool,
    ) -> &mut ProjectConfiguration {
        let position = self
            .configurations
            .iter()
            .position(|c| c.solution_configuration == solution_configuration);
        let ix = if let Some(ix) = position {
            ix
        } else {
            self.configurations.push(ProjectConfiguration {
                solution_configuration,
                configuration: configuration.to_owned(),
                platform: platform.to_owned(),
                enabled,
            });
            self.configurations.len() - 1
        };
        &mut self.configurations[ix]
    }

    /// Removes configurations with project configuration and platform specified
    pub fn remove_configuration(&mut self, configuration: &str, platform: &str) {
        self.configurations
            .retain(|c| !(c.configuration == configuration && c.platform == platform));
    }

    pub fn reset_configurations(&mut self) {
        self.configurations.clear();
    }

    /// Adds Debug and Release for x64 and x86 solution platforms.
    /// Projects without platforms build as Any CPU
    fn seed_configurations(&mut self, use_platforms: bool) {
        for configuration in [DEBUG, RELEASE] {
            for platform in PLATFORMS {
                self.add_configuration(
                    Configuration::new(configuration, platform),
                    configuration,
                    ANY_CPU,
                    true,
                );
            }
        }

        if use_platforms {
            self.reset_configurations();
            for configuration in [DEBUG, RELEASE] {
                for platform in PLATFORMS {
                    self.add_configuration(
                        Configuration::new(configuration, platform),
                        configuration,
                        platform,
                        true,
                    );
                }
            }
        }
    }

    #[must_use]
    pub fn configurations(&self) -> &[ProjectConfiguration] {
        &self.configurations
    }

    pub fn configurations_mut(&mut self) -> impl Iterator<Item = &mut ProjectConfiguration> {
        self.configurations.iter_mut()
    }

    #[must_use]
    pub fn guid(&self) -> Uuid {
        self.guid.value()
    }

    #[must_use]
    pub fn is_guid_final(&self) -> bool {
        matches!(self.guid, ProjectGuid::Final(_))
    }

    /// Fixes project identity. Authoritative value (read from project file) always
    /// replaces the current one, without it the current identity becomes final
    pub fn finalize_guid(&mut self, authoritative: Option<Uuid>) -> Uuid {
        let id = authoritative.unwrap_or_else(|| self.guid());
        self.guid = ProjectGuid::Final(id);
        id
    }

    /// Owning folder. [`FolderId::ROOT`] means solution root
    #[must_use]
    pub fn folder(&self) -> FolderId {
        self.folder
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name shown in solution i.e. project name without project file extension.
    /// Only `.csproj` and `.vcxproj` are dropped, other dotted parts are kept (`Company.Core`)
    #[must_use]
    pub fn display_name(&self) -> &str {
        DescriptorKind::EXTENSIONS
            .iter()
            .find_map(|ext| {
                let ix = self.name.len().checked_sub(ext.len() + 1)?;
                let (stem, suffix) = self.name.split_at_checked(ix)?;
                let extension = suffix.strip_prefix('.')?;
                extension.eq_ignore_ascii_case(ext).then_some(stem)
            })
            .filter(|stem| !stem.is_empty())
            .unwrap_or(&self.name)
    }

    /// Project file name without path
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.full_path.file_name().and_then(|n| n.to_str())
    }

    #[must_use]
    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    pub fn set_full_path(&mut self, full_path: impl Into<PathBuf>) {
        self.full_path = full_path.into();
    }

    /// Descriptor kind if project file extension is supported
    #[must_use]
    pub fn kind(&self) -> Option<DescriptorKind> {
        DescriptorKind::from_path(&self.full_path).ok()
    }
}

/// Represents Visual Studio solution. Solution is the root folder
/// that owns all folders and projects
#[derive(Debug, Clone)]
pub struct Solution {
    name: String,
    path: PathBuf,
    folders: Vec<Folder>,
    projects: Vec<Project>,
    configurations: Vec<Configuration>,
    startup_project: Option<ProjectId>,
}

impl Solution {
    /// Creates empty solution. Path is full path to the solution file
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        Self {
            folders: vec![Folder::new(None, &name)],
            name,
            path: path.into(),
            projects: vec![],
            configurations: vec![],
            startup_project: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full path to solution file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn root(&self) -> &Folder {
        self.folder(FolderId::ROOT)
    }

    /// # Panics
    ///
    /// Panics if id is not from this solution
    #[must_use]
    pub fn folder(&self, id: FolderId) -> &Folder {
        &self.folders[id.0]
    }

    /// # Panics
    ///
    /// Panics if id is not from this solution
    #[must_use]
    pub fn project(&self, id: ProjectId) -> &Project {
        &self.projects[id.0]
    }

    /// # Panics
    ///
    /// Panics if id is not from this solution
    pub fn project_mut(&mut self, id: ProjectId) -> &mut Project {
        &mut self.projects[id.0]
    }

    /// Iterates all projects in creation order
    pub fn projects(&self) -> impl Iterator<Item = (ProjectId, &Project)> {
        self.projects
            .iter()
            .enumerate()
            .map(|(ix, p)| (ProjectId(ix), p))
    }

    pub fn projects_mut(&mut self) -> impl Iterator<Item = &mut Project> {
        self.projects.iter_mut()
    }

    /// Adds folder into parent folder. Returns existing folder if parent already has one with such name
    pub fn add_folder(&mut self, parent: FolderId, name: &str) -> FolderId {
        if let Some(existing) = self.get_folder(parent, name) {
            return existing;
        }
        let id = FolderId(self.folders.len());
        self.folders.push(Folder::new(Some(parent), name));
        self.folders[parent.0].folders.push(id);
        id
    }

    #[must_use]
    pub fn get_folder(&self, parent: FolderId, name: &str) -> Option<FolderId> {
        self.folder(parent)
            .folders
            .iter()
            .copied()
            .find(|f| self.folder(*f).name == name)
    }

    /// Adds project into folder with default configurations. Returns existing project
    /// if folder already has one with such name.
    ///
    /// Solution configurations `Debug|x64`, `Debug|x86`, `Release|x64` and `Release|x86`
    /// are mapped to `Any CPU` project platform or to the same platform if `use_platforms` set
    pub fn add_project(
        &mut self,
        folder: FolderId,
        name: &str,
        full_path: impl Into<PathBuf>,
        use_platforms: bool,
    ) -> ProjectId {
        if let Some(existing) = self.get_project(folder, name) {
            return existing;
        }
        let mut project = Project::new(name, full_path);
        project.seed_configurations(use_platforms);
        self.attach(folder, project)
    }

    /// Adds project created outside of the solution. Returns existing project
    /// if folder already has one with such name
    pub fn add_project_node(&mut self, folder: FolderId, project: Project) -> ProjectId {
        if let Some(existing) = self.get_project(folder, &project.name) {
            return existing;
        }
        self.attach(folder, project)
    }

    fn attach(&mut self, folder: FolderId, mut project: Project) -> ProjectId {
        let id = ProjectId(self.projects.len());
        project.folder = folder;
        self.projects.push(project);
        self.folders[folder.0].projects.push(id);
        id
    }

    #[must_use]
    pub fn get_project(&self, folder: FolderId, name: &str) -> Option<ProjectId> {
        self.folder(folder)
            .projects
            .iter()
            .copied()
            .find(|p| self.project(*p).name == name)
    }

    /// Adds solution configuration/platform pair if it is not present yet
    pub fn add_configuration(&mut self, configuration: &str, platform: &str) -> &Configuration {
        let ix = if let Some(ix) = self
            .configurations
            .iter()
            .position(|c| c.is(configuration, platform))
        {
            ix
        } else {
            self.configurations
                .push(Configuration::new(configuration, platform));
            self.configurations.len() - 1
        };
        &self.configurations[ix]
    }

    pub fn remove_configuration(&mut self, configuration: &str, platform: &str) {
        self.configurations
            .retain(|c| !c.is(configuration, platform));
    }

    #[must_use]
    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }

    /// Sets project that starts by default. `None` keeps current startup project
    pub fn set_startup_project(&mut self, project: Option<ProjectId>) {
        if let Some(id) = project.filter(|id| id.0 < self.projects.len()) {
            self.startup_project = Some(id);
        }
    }

    #[must_use]
    pub fn startup_project(&self) -> Option<ProjectId> {
        self.startup_project
    }

    /// Writes solution using writer specified
    pub fn save(
        &mut self,
        root_path: &Path,
        target_frameworks: &str,
        writer: &dyn SolutionWriter,
    ) -> miette::Result<()> {
        writer.write(root_path, target_frameworks, self)
    }
}
