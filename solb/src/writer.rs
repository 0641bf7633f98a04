use std::fmt::{self, Display};
use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use uuid::Uuid;

use crate::api::{FolderId, Project, ProjectId, Solution};
use crate::error::SolutionError;
use crate::msbuild::{self, DescriptorKind, TargetFramework};

const BOM: &[u8] = b"\xEF\xBB\xBF";

const HEADER: [&str; 4] = [
    "Microsoft Visual Studio Solution File, Format Version 12.00",
    "# Visual Studio Version 17",
    "VisualStudioVersion = 17.6.33815.320",
    "MinimumVisualStudioVersion = 10.0.40219.1",
];

/// Writes line terminated by CRLF whatever host OS is
macro_rules! crlf {
    ($f:expr, $($arg:tt)*) => {{
        $f.write_fmt(format_args!($($arg)*))?;
        $f.write_str("\r\n")
    }};
}

/// Serializes [`Solution`] into some persistent form
pub trait SolutionWriter {
    /// Writes solution. Relative solution and project paths are resolved against `root_path`.
    /// Native projects which target framework is not contained in `target_frameworks` are omitted
    fn write(
        &self,
        root_path: &Path,
        target_frameworks: &str,
        solution: &mut Solution,
    ) -> miette::Result<()>;
}

/// Writes Visual Studio solution file (Format Version 12.00)
#[derive(Debug, Default, Clone, Copy)]
pub struct SlnWriter;

impl SolutionWriter for SlnWriter {
    fn write(
        &self,
        root_path: &Path,
        target_frameworks: &str,
        solution: &mut Solution,
    ) -> miette::Result<()> {
        let path = crate::absolutize(root_path, solution.path());
        let dir = crate::parent_of(&path);
        fs::create_dir_all(dir).map_err(|source| SolutionError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let solution_dir = dunce::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());

        finalize_guids(root_path, target_frameworks, solution);

        let text = SolutionText {
            solution,
            root_path,
            solution_dir: &solution_dir,
            target_frameworks,
        }
        .to_string();

        fs::write(&path, [BOM, text.as_bytes()].concat())
            .map_err(|source| SolutionError::Io { path: path.clone(), source })?;
        log::info!("Solution written to {}", path.display());
        Ok(())
    }
}

/// Project's GUID declared in the project file replaces provisional one
fn finalize_guids(root_path: &Path, target_frameworks: &str, solution: &mut Solution) {
    for project in solution.projects_mut() {
        if project.kind().is_none() {
            log::warn!(
                "{} is not written into solution: {}",
                project.name(),
                SolutionError::UnsupportedDescriptorKind {
                    path: project.full_path().to_path_buf()
                }
            );
            continue;
        }
        if emitted_kind(project, target_frameworks).is_none() {
            log::debug!("{} filtered out by target frameworks", project.name());
            continue;
        }
        let full_path = crate::absolutize(root_path, project.full_path());
        let declared = msbuild::read_project_guid(&full_path).unwrap_or_else(|e| {
            log::debug!("No project GUID read from {}: {e}", full_path.display());
            None
        });
        project.finalize_guid(declared);
    }
}

/// Kind of project that is emitted. None means that the project is skipped
fn emitted_kind(project: &Project, target_frameworks: &str) -> Option<DescriptorKind> {
    let kind = project.kind()?;
    match kind {
        DescriptorKind::Managed => Some(kind),
        DescriptorKind::Native => TargetFramework::infer(project.full_path())
            .is_none_or(|framework| target_frameworks.contains(framework.token()))
            .then_some(kind),
    }
}

fn braced(id: Uuid) -> String {
    id.braced().to_string().to_uppercase()
}

struct SolutionText<'a> {
    solution: &'a Solution,
    root_path: &'a Path,
    solution_dir: &'a Path,
    target_frameworks: &'a str,
}

impl SolutionText<'_> {
    fn write_project(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: ProjectId,
        platform_projects: &mut Vec<ProjectId>,
    ) -> fmt::Result {
        let project = self.solution.project(id);
        let Some(kind) = emitted_kind(project, self.target_frameworks) else {
            return Ok(());
        };
        crlf!(
            f,
            r#"Project("{}") = "{}", "{}", "{}""#,
            kind.type_id(),
            project.display_name(),
            self.relative_path(project),
            braced(project.guid())
        )?;
        crlf!(f, "EndProject")?;
        platform_projects.push(id);
        Ok(())
    }

    fn write_folder(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: FolderId,
        platform_projects: &mut Vec<ProjectId>,
    ) -> fmt::Result {
        let folder = self.solution.folder(id);
        crlf!(
            f,
            r#"Project("{}") = "{}", "{}", "{}""#,
            msbuild::ID_SOLUTION_FOLDER,
            folder.name(),
            folder.name(),
            braced(folder.guid())
        )?;
        crlf!(f, "EndProject")?;

        let startup = self.solution.startup_project();
        for project in folder.projects().iter().filter(|p| Some(**p) != startup) {
            self.write_project(f, *project, platform_projects)?;
        }
        for child in folder.folders() {
            self.write_folder(f, *child, platform_projects)?;
        }
        Ok(())
    }

    fn write_nested_folder(&self, f: &mut fmt::Formatter<'_>, id: FolderId) -> fmt::Result {
        let folder = self.solution.folder(id);
        if let Some(parent) = folder.parent().map(|p| self.solution.folder(p)) {
            if !folder.guid().is_nil() && !parent.guid().is_nil() {
                crlf!(f, "\t\t{} = {}", braced(folder.guid()), braced(parent.guid()))?;
            }
        }
        for child in folder.folders() {
            self.write_nested_folder(f, *child)?;
        }
        for project in folder.projects() {
            self.write_nested_project(f, *project)?;
        }
        Ok(())
    }

    fn write_nested_project(&self, f: &mut fmt::Formatter<'_>, id: ProjectId) -> fmt::Result {
        let project = self.solution.project(id);
        if emitted_kind(project, self.target_frameworks).is_none() {
            return Ok(());
        }
        let parent = self.solution.folder(project.folder());
        if !project.guid().is_nil() && !parent.guid().is_nil() {
            crlf!(f, "\t\t{} = {}", braced(project.guid()), braced(parent.guid()))?;
        }
        Ok(())
    }

    /// Project path relative to solution's directory with Windows separators
    fn relative_path(&self, project: &Project) -> String {
        let full_path = crate::absolutize(self.root_path, project.full_path());
        let dir = crate::parent_of(&full_path);
        let dir = dunce::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        let file_name = full_path.file_name().unwrap_or_default();

        match pathdiff::diff_paths(&dir, self.solution_dir) {
            Some(relative) => relative
                .join(file_name)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .join("\\"),
            None => dir.join(file_name).to_string_lossy().into_owned(),
        }
    }
}

impl Display for SolutionText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in HEADER {
            crlf!(f, "{line}")?;
        }

        let mut platform_projects = vec![];
        let startup = self.solution.startup_project();
        if let Some(id) = startup {
            self.write_project(f, id, &mut platform_projects)?;
        }
        let root = self.solution.root();
        for project in root.projects().iter().filter(|p| Some(**p) != startup) {
            self.write_project(f, *project, &mut platform_projects)?;
        }
        for folder in root.folders() {
            self.write_folder(f, *folder, &mut platform_projects)?;
        }

        crlf!(f, "Global")?;

        crlf!(f, "\tGlobalSection(SolutionConfigurationPlatforms) = preSolution")?;
        for configuration in self.solution.configurations() {
            crlf!(f, "\t\t{configuration} = {configuration}")?;
        }
        crlf!(f, "\tEndGlobalSection")?;

        crlf!(f, "\tGlobalSection(ProjectConfigurationPlatforms) = postSolution")?;
        for id in &platform_projects {
            let project = self.solution.project(*id);
            let guid = braced(project.guid());
            for configuration in project.configurations() {
                let solution_pair = &configuration.solution_configuration;
                let project_pair = configuration.project_pair();
                crlf!(f, "\t\t{guid}.{solution_pair}.ActiveCfg = {project_pair}")?;
                if configuration.enabled {
                    crlf!(f, "\t\t{guid}.{solution_pair}.Build.0 = {project_pair}")?;
                }
            }
        }
        crlf!(f, "\tEndGlobalSection")?;

        crlf!(f, "\tGlobalSection(SolutionProperties) = preSolution")?;
        crlf!(f, "\t\tHideSolutionNode = FALSE")?;
        crlf!(f, "\tEndGlobalSection")?;

        crlf!(f, "\tGlobalSection(NestedProjects) = preSolution")?;
        for folder in root.folders() {
            self.write_nested_folder(f, *folder)?;
        }
        for project in root.projects() {
            self.write_nested_project(f, *project)?;
        }
        crlf!(f, "\tEndGlobalSection")?;

        crlf!(f, "\tGlobalSection(ExtensibilityGlobals) = postSolution")?;
        crlf!(f, "\t\tSolutionGuid = {}", braced(Uuid::new_v4()))?;
        crlf!(f, "\tEndGlobalSection")?;

        crlf!(f, "EndGlobal")
    }
}

/// Full path of the solution file that would be written
#[must_use]
pub fn target_path(root_path: &Path, solution: &Solution) -> PathBuf {
    crate::absolutize(root_path, solution.path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Configuration, FolderId};
    use rstest::rstest;
    use tempfile::TempDir;

    const MANAGED: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <TargetFramework>net6.0</TargetFramework>
  </PropertyGroup>
</Project>"#;

    const NATIVE: &str = r#"<Project xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup Label="Globals">
    <ProjectGuid>{5b1d9a3e-2f4c-4e71-9d0a-0c6e7f3b8a21}</ProjectGuid>
  </PropertyGroup>
</Project>"#;

    fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn save(dir: &TempDir, solution: &mut Solution, target_frameworks: &str) -> String {
        solution
            .save(dir.path(), target_frameworks, &SlnWriter)
            .unwrap();
        let bytes = fs::read(target_path(dir.path(), solution)).unwrap();
        assert!(bytes.starts_with(BOM));
        String::from_utf8(bytes[BOM.len()..].to_vec()).unwrap()
    }

    fn project_lines(text: &str) -> Vec<&str> {
        text.lines().filter(|l| l.starts_with("Project(")).collect()
    }

    #[test]
    fn write_single_project() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let app = write_file(dir.path(), "App/App.csproj", MANAGED);
        let mut solution = Solution::new("App", "App.sln");
        solution.add_configuration("Debug", "x64");
        let mut project = Project::new("App", app);
        project.add_configuration(Configuration::new("Debug", "x64"), "Debug", "x64", true);
        let id = solution.add_project_node(FolderId::ROOT, project);

        // Act
        let text = save(&dir, &mut solution, "");

        // Assert
        let guid = braced(solution.project(id).guid());
        assert_eq!(
            vec![format!(
                r#"Project("{}") = "App", "App\App.csproj", "{guid}""#,
                msbuild::ID_MANAGED_PROJECT
            )],
            project_lines(&text)
        );
        assert_eq!(1, text.lines().filter(|l| *l == "EndProject").count());
        assert!(text.contains("\r\n\t\tDebug|x64 = Debug|x64\r\n"));
        assert_eq!(1, text.matches(".ActiveCfg = ").count());
        assert!(text.contains(&format!("\t\t{guid}.Debug|x64.ActiveCfg = Debug|x64\r\n")));
        assert!(text.contains(&format!("\t\t{guid}.Debug|x64.Build.0 = Debug|x64\r\n")));
        assert!(text.starts_with("Microsoft Visual Studio Solution File, Format Version 12.00\r\n"));
        assert!(text.ends_with("EndGlobal\r\n"));
        assert!(!text.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn write_sections_in_order() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let app = write_file(dir.path(), "App/App.csproj", MANAGED);
        let mut solution = Solution::new("App", "App.sln");
        solution.add_project(FolderId::ROOT, "App", app, false);

        // Act
        let text = save(&dir, &mut solution, "");

        // Assert
        let sections = [
            "Global\r\n",
            "\tGlobalSection(SolutionConfigurationPlatforms) = preSolution",
            "\tGlobalSection(ProjectConfigurationPlatforms) = postSolution",
            "\tGlobalSection(SolutionProperties) = preSolution\r\n\t\tHideSolutionNode = FALSE",
            "\tGlobalSection(NestedProjects) = preSolution\r\n\tEndGlobalSection",
            "\tGlobalSection(ExtensibilityGlobals) = postSolution\r\n\t\tSolutionGuid = {",
            "EndGlobal\r\n",
        ];
        let positions = sections
            .iter()
            .map(|s| text.find(s).unwrap())
            .collect::<Vec<_>>();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn disabled_configuration_has_no_build_line() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let app = write_file(dir.path(), "App/App.csproj", MANAGED);
        let mut solution = Solution::new("App", "App.sln");
        let id = solution.add_project(FolderId::ROOT, "App", app, false);
        for configuration in solution.project_mut(id).configurations_mut() {
            configuration.enabled = configuration.solution_configuration.platform == "x64";
        }

        // Act
        let text = save(&dir, &mut solution, "");

        // Assert
        assert_eq!(4, text.matches(".ActiveCfg = ").count());
        assert_eq!(2, text.matches(".Build.0 = ").count());
        assert!(text.contains(".Release|x86.ActiveCfg = Release|Any CPU\r\n"));
        assert!(!text.contains(".Release|x86.Build.0"));
    }

    #[rstest]
    #[case("net472", "Bridge.net472", "Bridge.net6.0-windows")]
    #[case("net6.0-windows", "Bridge.net6.0-windows", "Bridge.net472")]
    #[trace]
    fn native_projects_filtered(
        #[case] target_frameworks: &str,
        #[case] expected: &str,
        #[case] suppressed: &str,
    ) {
        // Arrange
        let dir = TempDir::new().unwrap();
        let legacy = write_file(dir.path(), "Bridge/Bridge.net472.vcxproj", "<Project></Project>");
        let modern = write_file(
            dir.path(),
            "Bridge/Bridge.net6.0-windows.vcxproj",
            "<Project></Project>",
        );
        let mut solution = Solution::new("s", "s.sln");
        let native = solution.add_folder(FolderId::ROOT, "Native");
        let legacy = solution.add_project(native, "Bridge.net472.vcxproj", legacy, true);
        let modern = solution.add_project(native, "Bridge.net6.0-windows.vcxproj", modern, true);
        let suppressed_id = if expected.ends_with("net472") { modern } else { legacy };
        let suppressed_guid = braced(solution.project(suppressed_id).guid());

        // Act
        let text = save(&dir, &mut solution, target_frameworks);

        // Assert
        let lines = project_lines(&text);
        assert_eq!(2, lines.len());
        assert!(lines[1].contains(&format!(r#"= "{expected}", "Bridge\{expected}.vcxproj""#)));
        assert!(lines[1].starts_with(&format!(r#"Project("{}")"#, msbuild::ID_NATIVE_PROJECT)));
        assert!(!text.contains(suppressed));
        assert!(!text.contains(&suppressed_guid));
        assert_eq!(4, text.matches(".ActiveCfg = ").count());
    }

    #[test]
    fn native_project_without_framework_written() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let native = write_file(dir.path(), "Native/Native.vcxproj", "<Project></Project>");
        let mut solution = Solution::new("s", "s.sln");
        solution.add_project(FolderId::ROOT, "Native", native, true);

        // Act
        let text = save(&dir, &mut solution, "net472");

        // Assert
        assert_eq!(1, project_lines(&text).len());
    }

    #[test]
    fn nested_folders() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let app = write_file(dir.path(), "App/App.csproj", MANAGED);
        let core = write_file(dir.path(), "Core/Core.csproj", MANAGED);
        let deep = write_file(dir.path(), "Deep/Deep.csproj", MANAGED);
        let mut solution = Solution::new("s", "s.sln");
        let libs = solution.add_folder(FolderId::ROOT, "Libs");
        let sub = solution.add_folder(libs, "Sub");
        let app = solution.add_project(FolderId::ROOT, "App", app, false);
        let core = solution.add_project(libs, "Core", core, false);
        let deep = solution.add_project(sub, "Deep", deep, false);

        // Act
        let text = save(&dir, &mut solution, "");

        // Assert
        let guid_of = |id| braced(solution.project(id).guid());
        let libs_guid = braced(solution.folder(libs).guid());
        let sub_guid = braced(solution.folder(sub).guid());
        let names = project_lines(&text)
            .iter()
            .map(|l| l.split('"').nth(3).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(vec!["App", "Libs", "Core", "Sub", "Deep"], names);
        assert!(text.contains(&format!(
            r#"Project("{}") = "Libs", "Libs", "{libs_guid}""#,
            msbuild::ID_SOLUTION_FOLDER
        )));
        assert!(text.contains(&format!("\t\t{sub_guid} = {libs_guid}\r\n")));
        assert!(text.contains(&format!("\t\t{} = {libs_guid}\r\n", guid_of(core))));
        assert!(text.contains(&format!("\t\t{} = {sub_guid}\r\n", guid_of(deep))));
        assert!(!text.contains(&format!("\t\t{} = ", guid_of(app))));
    }

    #[test]
    fn startup_project_first() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let a = write_file(dir.path(), "A/A.csproj", MANAGED);
        let b = write_file(dir.path(), "B/B.csproj", MANAGED);
        let c = write_file(dir.path(), "C/C.csproj", MANAGED);
        let mut solution = Solution::new("s", "s.sln");
        let tools = solution.add_folder(FolderId::ROOT, "Tools");
        solution.add_project(FolderId::ROOT, "A", a, false);
        solution.add_project(FolderId::ROOT, "B", b, false);
        let c = solution.add_project(tools, "C", c, false);
        solution.set_startup_project(Some(c));

        // Act
        let text = save(&dir, &mut solution, "");

        // Assert
        let names = project_lines(&text)
            .iter()
            .map(|l| l.split('"').nth(3).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(vec!["C", "A", "B", "Tools"], names);
        let c_guid = braced(solution.project(c).guid());
        let tools_guid = braced(solution.folder(tools).guid());
        assert!(text.contains(&format!("\t\t{c_guid} = {tools_guid}\r\n")));
    }

    #[test]
    fn declared_guid_replaces_provisional() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let native = write_file(dir.path(), "Native/Native.vcxproj", NATIVE);
        let mut solution = Solution::new("s", "s.sln");
        let id = solution.add_project(FolderId::ROOT, "Native", native, true);
        let provisional = solution.project(id).guid();

        // Act
        let text = save(&dir, &mut solution, "");

        // Assert
        let declared = Uuid::parse_str("5b1d9a3e-2f4c-4e71-9d0a-0c6e7f3b8a21").unwrap();
        assert_ne!(provisional, declared);
        assert_eq!(declared, solution.project(id).guid());
        assert!(text.contains("\"{5B1D9A3E-2F4C-4E71-9D0A-0C6E7F3B8A21}\"\r\n"));
        assert!(!text.contains(&braced(provisional)));
    }

    #[test]
    fn declared_guid_read_after_path_corrected() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let native = write_file(dir.path(), "Native/Native.vcxproj", NATIVE);
        let mut solution = Solution::new("s", "s.sln");
        let id = solution.add_project(FolderId::ROOT, "Native", "Moved/Native.vcxproj", true);
        let provisional = solution.project(id).guid();
        save(&dir, &mut solution, "");

        // Act
        solution.project_mut(id).set_full_path(native);
        let text = save(&dir, &mut solution, "");

        // Assert
        let declared = Uuid::parse_str("5b1d9a3e-2f4c-4e71-9d0a-0c6e7f3b8a21").unwrap();
        assert_eq!(declared, solution.project(id).guid());
        assert!(text.contains(&braced(declared)));
        assert!(!text.contains(&braced(provisional)));
    }

    #[test]
    fn provisional_guid_kept_without_declared() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let app = write_file(dir.path(), "App/App.csproj", MANAGED);
        let mut solution = Solution::new("s", "s.sln");
        let id = solution.add_project(FolderId::ROOT, "App", app, false);
        let provisional = solution.project(id).guid();

        // Act
        let text = save(&dir, &mut solution, "");

        // Assert
        assert_eq!(provisional, solution.project(id).guid());
        assert!(text.contains(&braced(provisional)));
    }

    #[test]
    fn creates_missing_directories_and_overwrites() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let app = write_file(dir.path(), "src/App/App.csproj", MANAGED);
        let mut solution = Solution::new("App", "out/nested/App.sln");
        solution.add_project(FolderId::ROOT, "App", app, false);
        write_file(dir.path(), "out/nested/App.sln", "garbage that is longer than nothing");

        // Act
        let text = save(&dir, &mut solution, "");

        // Assert
        assert!(dir.path().join("out/nested/App.sln").is_file());
        assert!(!text.contains("garbage"));
        assert!(project_lines(&text)[0].contains(r#""..\..\src\App\App.csproj""#));
    }

    #[test]
    fn relative_project_path_resolved_against_root() {
        // Arrange
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "App/App.csproj", MANAGED);
        let mut solution = Solution::new("App", "App.sln");
        solution.add_project(FolderId::ROOT, "App", "App/App.csproj", false);

        // Act
        let text = save(&dir, &mut solution, "");

        // Assert
        assert!(project_lines(&text)[0].contains(r#""App\App.csproj""#));
    }

    #[test]
    fn unsupported_project_not_written() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let readme = write_file(dir.path(), "Docs/readme.txt", "text");
        let mut solution = Solution::new("s", "s.sln");
        let folder = solution.add_folder(FolderId::ROOT, "Docs");
        solution.add_project(folder, "readme", readme, false);

        // Act
        let text = save(&dir, &mut solution, "");

        // Assert
        assert_eq!(1, project_lines(&text).len());
        assert!(!text.contains("readme"));
        assert!(!text.contains(".ActiveCfg"));
    }

    #[test]
    fn write_into_file_in_place_of_directory_fails() {
        // Arrange
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "blocker", "file");
        let mut solution = Solution::new("s", "blocker/s.sln");

        // Act
        let result = solution.save(dir.path(), "", &SlnWriter);

        // Assert
        assert!(result.is_err());
    }
}
