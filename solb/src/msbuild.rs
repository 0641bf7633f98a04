use std::{
    fmt::{self, Display},
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use miette::{IntoDiagnostic, WrapErr};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::SolutionError;

pub const ID_SOLUTION_FOLDER: &str = "{2150E333-8FDC-42A3-9474-1A3956D46DE8}";
pub const ID_MANAGED_PROJECT: &str = "{9A19103F-16F7-4668-BE54-9A1E7A4F7556}";
pub const ID_NATIVE_PROJECT: &str = "{8BC9CEB8-8B4A-11D0-8D11-00A0C91BC942}";

pub const TARGET_FRAMEWORK_VAR: &str = "$(TargetFramework)";
const PROJECT_NAME_VAR: &str = "$(ProjectName)";
const TARGET_NAME_VAR: &str = "$(TargetName)";
const DEBUG_CONDITION: &str = "Debug|";

/// Describes project by type id.
/// Returns human-readable description
/// or id itself if it's not match any
#[must_use]
pub fn describe_project(id: &str) -> &str {
    PROJECT_TYPES.get(id).unwrap_or(&id)
}

static PROJECT_TYPES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}" => "C#",
    "{9A19103F-16F7-4668-BE54-9A1E7A4F7556}" => "C# (.Net Core)",
    "{8BC9CEB8-8B4A-11D0-8D11-00A0C91BC942}" => "C++",
    "{F2A71F9B-5D33-465A-A702-920D77279786}" => "F#",
    "{F184B08F-C81C-45F6-A57F-5ABD9991F28F}" => "VB.NET",
    "{778DAE3C-4631-46EA-AA77-85C1314464D9}" => "VB.NET",
    "{2150E333-8FDC-42A3-9474-1A3956D46DE8}" => "Solution Folder",
};

/// Target framework generations a native project can be built for.
/// Native projects encode it into their path, e.g. `Bridge.net472.vcxproj`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFramework {
    /// .NET Framework 4.7.2
    Legacy,
    /// .NET 6 for Windows
    Modern,
}

impl TargetFramework {
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            TargetFramework::Legacy => "net472",
            TargetFramework::Modern => "net6.0-windows",
        }
    }

    /// Infers target framework from the token found in path (case-insensitive)
    #[must_use]
    pub fn infer<P: AsRef<Path>>(path: P) -> Option<TargetFramework> {
        let path = path.as_ref().to_string_lossy().to_lowercase();
        if path.contains(TargetFramework::Modern.token()) {
            Some(TargetFramework::Modern)
        } else if path.contains(TargetFramework::Legacy.token()) {
            Some(TargetFramework::Legacy)
        } else {
            None
        }
    }
}

impl Display for TargetFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Project descriptor kind selected by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    /// C# project (`.csproj`)
    Managed,
    /// C++ project (`.vcxproj`)
    Native,
}

impl DescriptorKind {
    pub const EXTENSIONS: [&'static str; 2] = ["csproj", "vcxproj"];

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<DescriptorKind, SolutionError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csproj") => Ok(DescriptorKind::Managed),
            Some(ext) if ext.eq_ignore_ascii_case("vcxproj") => Ok(DescriptorKind::Native),
            _ => Err(SolutionError::UnsupportedDescriptorKind {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Project type id used in solution's project declaration line
    #[must_use]
    pub fn type_id(self) -> &'static str {
        match self {
            DescriptorKind::Managed => ID_MANAGED_PROJECT,
            DescriptorKind::Native => ID_NATIVE_PROJECT,
        }
    }
}

/// `MSBuild` project structure
#[derive(Debug, Deserialize)]
pub struct Project {
    /// MSBuild project property groups
    #[serde(rename = "PropertyGroup", default)]
    pub property_group: Option<Vec<PropertyGroup>>,

    /// MSBuild project item groups
    #[serde(rename = "ItemGroup", default)]
    pub item_group: Option<Vec<ItemGroup>>,
}

/// Flat set of properties. Only the ones needed to identify a project are read.
/// A property may be repeated with different conditions, so every occurrence is kept
#[derive(Debug, Default, Deserialize)]
pub struct PropertyGroup {
    #[serde(rename = "Condition", default)]
    pub condition: Option<String>,
    #[serde(rename = "AssemblyName", default)]
    pub assembly_name: Vec<String>,
    #[serde(rename = "TargetName", default)]
    pub target_name: Vec<String>,
    #[serde(rename = "ProjectGuid", default)]
    pub project_guid: Vec<String>,
}

/// Represents a group of items within an `MSBuild` project.
///
/// Only references to assemblies and other projects are kept.
#[derive(Debug, Deserialize)]
pub struct ItemGroup {
    #[serde(rename = "Reference", default)]
    pub reference: Option<Vec<Reference>>,
    #[serde(rename = "ProjectReference", default)]
    pub project_reference: Option<Vec<ProjectReference>>,
    #[serde(rename = "Condition", default)]
    pub condition: Option<String>,
}

/// Precompiled assembly reference. Only ones with `HintPath` can be mapped to sources
#[derive(Debug, Deserialize)]
pub struct Reference {
    #[serde(rename = "Include", default)]
    pub include: String,
    #[serde(rename = "HintPath", default)]
    pub hint_path: Vec<String>,
}

/// Represents a project reference in an MSBuild project.
///
/// This structure contains the `Include` element, which specifies the path to the referenced project.
#[derive(Debug, Deserialize)]
pub struct ProjectReference {
    #[serde(rename = "Include", default)]
    pub include: String,
}

impl Project {
    pub fn from_path<P: AsRef<Path>>(path: P) -> miette::Result<Project> {
        let file = File::open(path)
            .into_diagnostic()
            .wrap_err("Failed to read project file")?;
        Project::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> miette::Result<Project> {
        let mut de =
            serde_xml_rs::Deserializer::new_from_reader(reader).non_contiguous_seq_elements(true);
        let project: Project = Project::deserialize(&mut de)
            .into_diagnostic()
            .wrap_err("Failed to deserialize project file")?;
        Ok(project)
    }

    fn property_groups(&self) -> impl Iterator<Item = &PropertyGroup> {
        self.property_group.iter().flatten()
    }

    /// Output assembly name, sans extension. Native projects
    /// get target framework suffix inferred from the path
    #[must_use]
    pub fn assembly_identity(&self, kind: DescriptorKind, path: &Path) -> String {
        let stem = file_stem(path);
        match kind {
            DescriptorKind::Managed => self
                .property_groups()
                .find_map(|g| first_non_empty(&g.assembly_name))
                .map_or(stem, str::to_owned),
            DescriptorKind::Native => {
                let target_name = self
                    .property_groups()
                    .filter(|g| {
                        !g.condition
                            .as_deref()
                            .is_some_and(|c| c.contains(DEBUG_CONDITION))
                    })
                    .find_map(|g| first_non_empty(&g.target_name));
                let Some(target_name) = target_name else {
                    return stem;
                };
                let target_name = target_name
                    .replace(PROJECT_NAME_VAR, &stem)
                    .replace(TARGET_NAME_VAR, &stem);
                match TargetFramework::infer(path) {
                    Some(framework) => format!("{target_name}.{framework}"),
                    None => target_name,
                }
            }
        }
    }

    /// Project GUID declared within any property group
    #[must_use]
    pub fn project_guid(&self) -> Option<Uuid> {
        self.property_groups()
            .flat_map(|g| g.project_guid.iter())
            .filter_map(|g| non_empty(Some(g.as_str())))
            .find_map(|g| Uuid::parse_str(g.trim().trim_start_matches('{').trim_end_matches('}')).ok())
    }

    #[must_use]
    pub fn references(&self) -> Vec<ReferenceDecl> {
        let groups = self.item_group.iter().flatten();
        let mut result = vec![];
        for group in groups {
            let assemblies = group
                .reference
                .iter()
                .flatten()
                .filter_map(|r| first_non_empty(&r.hint_path))
                .map(|hint_path| ReferenceDecl::Assembly {
                    hint_path: hint_path.to_owned(),
                });
            result.extend(assemblies);

            let projects = group
                .project_reference
                .iter()
                .flatten()
                .filter(|r| !r.include.is_empty())
                .map(|r| ReferenceDecl::Project {
                    include: r.include.clone(),
                });
            result.extend(projects);
        }
        result
    }
}

/// Reference declaration found in project's item groups
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceDecl {
    /// `<Reference>` with `HintPath` to precompiled assembly
    Assembly { hint_path: String },
    /// `<ProjectReference>` with `Include` path that may contain `$(TargetFramework)`
    Project { include: String },
}

impl ReferenceDecl {
    /// Assembly identity of precompiled assembly reference i.e. hint path's file name without extension
    #[must_use]
    pub fn assembly_identity(&self) -> Option<String> {
        match self {
            ReferenceDecl::Assembly { hint_path } => {
                Some(file_stem(&crate::make_path(Path::new(""), hint_path)))
            }
            ReferenceDecl::Project { .. } => None,
        }
    }
}

/// Read-only view of a project file parsed once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    path: PathBuf,
    kind: DescriptorKind,
    identity: String,
    guid: Option<Uuid>,
    references: Vec<ReferenceDecl>,
}

impl Descriptor {
    /// Opens and parses project file specified. Path is canonicalized if possible
    pub fn from_path<P: AsRef<Path>>(path: P) -> miette::Result<Descriptor> {
        let path = path.as_ref();
        DescriptorKind::from_path(path)?;
        let full_path = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let file = File::open(&full_path).map_err(|e| SolutionError::UnparseableDescriptor {
            path: full_path.clone(),
            reason: e.to_string(),
        })?;
        Descriptor::from_reader(full_path, file)
    }

    /// Parses project content from reader. Path is used to select
    /// descriptor kind and to infer names
    pub fn from_reader<R: Read>(path: PathBuf, reader: R) -> miette::Result<Descriptor> {
        let kind = DescriptorKind::from_path(&path)?;
        let project =
            Project::from_reader(reader).map_err(|e| SolutionError::UnparseableDescriptor {
                path: path.clone(),
                reason: e.chain().map(ToString::to_string).join(": "),
            })?;
        Ok(Descriptor {
            identity: project.assembly_identity(kind, &path),
            guid: project.project_guid(),
            references: project.references(),
            kind,
            path,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn kind(&self) -> DescriptorKind {
        self.kind
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[must_use]
    pub fn guid(&self) -> Option<Uuid> {
        self.guid
    }

    #[must_use]
    pub fn references(&self) -> &[ReferenceDecl] {
        &self.references
    }

    /// Project file name without extension
    #[must_use]
    pub fn name(&self) -> String {
        file_stem(&self.path)
    }

    #[must_use]
    pub fn target_framework(&self) -> Option<TargetFramework> {
        TargetFramework::infer(&self.path)
    }
}

/// Reads assembly identity of the project file specified
pub fn read_assembly_identity<P: AsRef<Path>>(path: P) -> miette::Result<String> {
    Descriptor::from_path(path).map(|d| d.identity)
}

/// Reads assembly and project references of the project file specified
pub fn read_references<P: AsRef<Path>>(path: P) -> miette::Result<Vec<ReferenceDecl>> {
    Descriptor::from_path(path).map(|d| d.references)
}

/// Reads `ProjectGuid` property of the project file specified if any
pub fn read_project_guid<P: AsRef<Path>>(path: P) -> miette::Result<Option<Uuid>> {
    Descriptor::from_path(path).map(|d| d.guid)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn first_non_empty(values: &[String]) -> Option<&str> {
    values.iter().find_map(|v| non_empty(Some(v.as_str())))
}
