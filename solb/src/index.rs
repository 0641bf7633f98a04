use std::collections::HashMap;
use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};
use rayon::prelude::*;

use crate::msbuild::{Descriptor, DescriptorKind, TargetFramework};

/// Path fragments of source trees that are known to be unresolvable
pub const DEFAULT_IGNORED_PATTERNS: [&str; 3] = ["/Bentley.", "Haestad.Arx", "Shanghai"];

/// Assembly identity to project descriptor map built from source trees
#[derive(Debug, Default)]
pub struct SourceIndex {
    projects: HashMap<String, Descriptor>,
    skipped: Vec<PathBuf>,
}

impl SourceIndex {
    /// Scans all roots specified recursively for `.csproj` and `.vcxproj` files.
    /// Files which path contains any of ignored patterns are not read.
    ///
    /// ## Remarks
    /// Files that cannot be parsed are skipped and remembered (see [`SourceIndex::skipped`]).
    /// If several projects produce the same assembly identity the first one found wins
    pub fn build<P, S>(roots: &[P], ignored_patterns: &[S]) -> Self
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        let mut index = SourceIndex::default();
        for root in roots {
            let paths = find_descriptors(root.as_ref(), ignored_patterns);
            log::debug!(
                "{} project files found in {}",
                paths.len(),
                root.as_ref().display()
            );

            let parsed = paths
                .into_par_iter()
                .map(|p| {
                    let descriptor = Descriptor::from_path(&p);
                    (p, descriptor)
                })
                .collect::<Vec<_>>();

            for (path, descriptor) in parsed {
                match descriptor {
                    Ok(d) => {
                        index.insert(d);
                    }
                    Err(e) => {
                        log::warn!("Skipping {}: {e}", path.display());
                        index.skipped.push(path);
                    }
                }
            }
        }
        log::info!(
            "{} projects indexed, {} skipped",
            index.projects.len(),
            index.skipped.len()
        );
        index
    }

    /// Adds descriptor unless its identity is already known. Returns whether it was added
    pub fn insert(&mut self, descriptor: Descriptor) -> bool {
        if let Some(existing) = self.projects.get(descriptor.identity()) {
            log::debug!(
                "{} has the same assembly identity {} as {}, ignored",
                descriptor.path().display(),
                descriptor.identity(),
                existing.path().display()
            );
            return false;
        }
        self.projects
            .insert(descriptor.identity().to_owned(), descriptor);
        true
    }

    #[must_use]
    pub fn get(&self, identity: &str) -> Option<&Descriptor> {
        self.projects.get(identity)
    }

    /// Dual-target lookup. Returns the project with identity specified if any.
    /// Otherwise the identity is treated as native project's one without framework suffix,
    /// so legacy framework project and its modern sibling (if present) are returned.
    #[must_use]
    pub fn lookup(&self, identity: &str) -> Vec<&Descriptor> {
        if let Some(d) = self.projects.get(identity) {
            return vec![d];
        }

        let legacy = format!("{identity}.{}", TargetFramework::Legacy);
        let Some(legacy) = self.projects.get(&legacy) else {
            return vec![];
        };

        let modern = format!("{identity}.{}", TargetFramework::Modern);
        std::iter::once(legacy)
            .chain(self.projects.get(&modern))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Project files that were found but cannot be parsed
    #[must_use]
    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Descriptor)> {
        self.projects.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn find_descriptors<S: AsRef<str>>(root: &Path, ignored_patterns: &[S]) -> Vec<PathBuf> {
    let parallelism = Parallelism::RayonNewPool(num_cpus::get_physical());
    WalkDir::new(crate::decorate_path(root))
        .skip_hidden(false)
        .follow_links(false)
        .sort(true)
        .parallelism(parallelism)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|f| f.file_type().is_file())
        .map(|f| f.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| DescriptorKind::EXTENSIONS.iter().any(|k| k.eq_ignore_ascii_case(e)))
        })
        .filter(|p| !is_ignored(p, ignored_patterns))
        .collect()
}

fn is_ignored<S: AsRef<str>>(path: &Path, ignored_patterns: &[S]) -> bool {
    let path = path.to_string_lossy().replace('\\', "/");
    ignored_patterns
        .iter()
        .any(|pattern| path.contains(&pattern.as_ref().replace('\\', "/")))
}
