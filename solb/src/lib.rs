/*!
A library for generating Microsoft Visual Studio solution file
from a single project and everything it references.

Projects referenced (by `ProjectReference` or by `HintPath` of prebuilt assembly) are
looked up in source trees specified. Only projects which sources are found get into solution.

## Example: generating solution for a project

```no_run
use std::path::Path;

use solb::writer::SlnWriter;

let root = Path::new("/src");
let mut analysis = solb::analyze_project(
    Path::new("/src/App/App.sln"),
    Path::new("/src/App/App.csproj"),
    &[root],
    &solb::index::DEFAULT_IGNORED_PATTERNS,
)
.unwrap();

analysis
    .solution
    .save(root, solb::DEFAULT_TARGET_FRAMEWORKS, &SlnWriter)
    .unwrap();
```
*/

#![warn(unused_extern_crates)]
#![allow(clippy::missing_errors_doc)]
use std::path::{Path, PathBuf};

use api::{FolderId, Solution};
use index::SourceIndex;
use msbuild::{Descriptor, DescriptorKind, TargetFramework};
use resolve::Resolver;

pub mod api;
pub mod error;
pub mod index;
pub mod msbuild;
pub mod resolve;
pub mod writer;

pub use error::SolutionError;

#[cfg(test)] // <-- not needed in integration tests
extern crate rstest;

/// Target frameworks which native projects are written into solution by default
pub const DEFAULT_TARGET_FRAMEWORKS: &str = "net472,net6.0-windows";

const TEST_PATH_MARKER: &str = ".Test.";

/// Result of project analysis
#[derive(Debug)]
pub struct Analysis {
    /// Solution with every project resolved. Root project is the startup one
    pub solution: Solution,
    /// Root project and everything it references, root first
    pub closure: Vec<Descriptor>,
    /// Project files found in source trees that cannot be parsed
    pub skipped: Vec<PathBuf>,
}

/// `analyze_project` scans search roots for project files, resolves every project
/// root project references directly or transitively, and creates solution
/// containing all of them.
///
/// ## Remarks
/// Solution is named after solution file. Projects are added into solution's root,
/// Debug and Release configurations for x64 and x86 platforms are added.
///
/// # Errors
///
/// This function will return an error if root project cannot be read.
pub fn analyze_project<P, S>(
    solution_path: &Path,
    root_project: &Path,
    search_roots: &[P],
    ignored_patterns: &[S],
) -> miette::Result<Analysis>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let index = SourceIndex::build(search_roots, ignored_patterns);
    let closure = Resolver::new(&index).resolve(root_project)?;
    let solution = populate_solution(solution_path, &closure);
    Ok(Analysis {
        solution,
        closure,
        skipped: index.skipped().to_vec(),
    })
}

/// Creates solution from projects specified. The first one becomes startup project
#[must_use]
pub fn populate_solution(solution_path: &Path, projects: &[Descriptor]) -> Solution {
    let name = solution_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut solution = Solution::new(name, solution_path);

    let mut startup = None;
    for descriptor in projects {
        let Some(file_name) = descriptor.path().file_name() else {
            continue;
        };
        let id = solution.add_project(
            FolderId::ROOT,
            &file_name.to_string_lossy(),
            descriptor.path(),
            uses_platforms(descriptor),
        );
        if startup.is_none() {
            startup = Some(id);
        }
    }

    for configuration in ["Debug", "Release"] {
        for platform in ["x64", "x86"] {
            solution.add_configuration(configuration, platform);
        }
    }
    solution.set_startup_project(startup);
    solution
}

/// Native, framework specific and test projects are built for concrete platforms
fn uses_platforms(descriptor: &Descriptor) -> bool {
    TargetFramework::infer(descriptor.path()).is_some()
        || descriptor.kind() == DescriptorKind::Native
        || descriptor.path().to_string_lossy().contains(TEST_PATH_MARKER)
}

#[must_use]
pub fn parent_of(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}

/// Relative path is joined to base. Absolute one returned as is
#[must_use]
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[must_use]
#[cfg(not(target_os = "windows"))]
pub fn make_path(dir: &Path, relative: &str) -> PathBuf {
    // Converts all possible Windows paths into Unix ones
    relative
        .split('\\')
        .fold(PathBuf::from(&dir), |pb, s| pb.join(s))
}

#[must_use]
#[cfg(target_os = "windows")]
pub fn make_path(dir: &Path, relative: &str) -> PathBuf {
    PathBuf::from(&dir).join(relative)
}

/// On Windows trailing back slash (\) to be added if volume and colon passed (like c:).
/// It needed paths look to be more pleasant
#[cfg(target_os = "windows")]
fn decorate_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    if raw.len() == 2 && raw.ends_with(':') {
        PathBuf::from(format!("{raw}\\"))
    } else {
        path.to_path_buf()
    }
}

/// On Unix just passthrough as is
#[cfg(not(target_os = "windows"))]
fn decorate_path(path: &Path) -> PathBuf {
    path.to_path_buf()
}
