use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while reading project descriptors or writing solutions
#[derive(Debug, Error, Diagnostic)]
pub enum SolutionError {
    /// Descriptor exists but cannot be opened or deserialized.
    /// Scanning recovers from it by skipping the file
    #[error("Project file {} cannot be parsed: {reason}", path.display())]
    #[diagnostic(code(solb::unparseable_descriptor))]
    UnparseableDescriptor { path: PathBuf, reason: String },

    /// Extension is neither `.csproj` nor `.vcxproj`
    #[error("Unknown project file extension: {}", path.display())]
    #[diagnostic(
        code(solb::unsupported_descriptor_kind),
        help("Only .csproj and .vcxproj project files are supported")
    )]
    UnsupportedDescriptorKind { path: PathBuf },

    /// `ProjectReference` points to a file that does not exist
    #[error("Referenced project file not found: {}", path.display())]
    #[diagnostic(code(solb::missing_referenced_descriptor))]
    MissingReferencedDescriptor { path: PathBuf },

    #[error("Failed to write solution file {}", path.display())]
    #[diagnostic(code(solb::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
