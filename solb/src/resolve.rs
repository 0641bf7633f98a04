use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::SolutionError;
use crate::index::SourceIndex;
use crate::msbuild::{self, Descriptor, ReferenceDecl, TargetFramework};

const FRAMEWORK_PROJECT_SUFFIX: &str = "$(TargetFramework).vcxproj";

/// Computes transitive closure of projects referenced by a root project.
/// Only projects which sources are present in the index participate
pub struct Resolver<'a> {
    index: &'a SourceIndex,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(index: &'a SourceIndex) -> Self {
        Self { index }
    }

    /// Resolves root project and everything it references directly or transitively.
    /// Root comes first, then projects in depth-first discovery order, each path only once.
    ///
    /// # Errors
    ///
    /// Fails only if the root project cannot be read. Broken references are skipped
    pub fn resolve<P: AsRef<Path>>(&self, root: P) -> miette::Result<Vec<Descriptor>> {
        let root = Descriptor::from_path(root)?;
        log::debug!("Resolving references of {}", root.path().display());

        let mut visited = HashSet::new();
        visited.insert(root.path().to_path_buf());
        let mut closure = vec![];
        self.expand(&root, &mut visited, &mut closure);
        closure.insert(0, root);

        log::info!("{} projects resolved", closure.len());
        Ok(closure)
    }

    fn expand(
        &self,
        descriptor: &Descriptor,
        visited: &mut HashSet<PathBuf>,
        closure: &mut Vec<Descriptor>,
    ) {
        for found in self.direct_references(descriptor) {
            if visited.insert(found.path().to_path_buf()) {
                closure.push(found.clone());
                self.expand(found, visited, closure);
            }
        }
    }

    /// Projects from index that descriptor references
    #[must_use]
    pub fn direct_references(&self, descriptor: &Descriptor) -> Vec<&'a Descriptor> {
        let dir = descriptor.path().parent().unwrap_or_else(|| Path::new(""));
        let mut found = vec![];
        for reference in descriptor.references() {
            match reference {
                ReferenceDecl::Assembly { .. } => {
                    if let Some(identity) = reference.assembly_identity() {
                        found.extend(self.index.lookup(&identity));
                    }
                }
                ReferenceDecl::Project { include } => {
                    found.extend(self.project_reference(dir, include));
                }
            }
        }
        found
    }

    fn project_reference(&self, dir: &Path, include: &str) -> Vec<&'a Descriptor> {
        let templated = include.ends_with(FRAMEWORK_PROJECT_SUFFIX);
        let concrete = if templated {
            include.replace(msbuild::TARGET_FRAMEWORK_VAR, TargetFramework::Legacy.token())
        } else {
            include.to_owned()
        };

        let mut found = self.lookup_project_file(&crate::make_path(dir, &concrete));

        let sibling = if templated {
            Some(include.replace(msbuild::TARGET_FRAMEWORK_VAR, TargetFramework::Modern.token()))
        } else {
            modern_sibling(&concrete)
        };
        if let Some(sibling) = sibling
            .map(|s| crate::make_path(dir, &s))
            .filter(|p| p.is_file())
        {
            found.extend(self.lookup_project_file(&sibling));
        }
        found
    }

    fn lookup_project_file(&self, path: &Path) -> Vec<&'a Descriptor> {
        if !path.is_file() {
            log::warn!(
                "{}",
                SolutionError::MissingReferencedDescriptor {
                    path: path.to_path_buf()
                }
            );
            return vec![];
        }
        match msbuild::read_assembly_identity(path) {
            Ok(identity) => self.index.lookup(&identity),
            Err(e) => {
                log::warn!("Reference skipped: {e}");
                vec![]
            }
        }
    }
}

/// Modern framework sibling of a legacy framework project file. Only file name is changed
fn modern_sibling(path: &str) -> Option<String> {
    let legacy = TargetFramework::Legacy.token();
    let split = path.rfind(['/', '\\']).map_or(0, |i| i + 1);
    let (dir, file) = path.split_at(split);
    file.contains(legacy)
        .then(|| format!("{dir}{}", file.replace(legacy, TargetFramework::Modern.token())))
}
