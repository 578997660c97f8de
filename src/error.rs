//! # Error Handling
//!
//! This module defines the centralized error type for `pom-tree`. It uses the
//! `thiserror` library to build a single `Error` enum covering every failure
//! that can escape the library, with contextual fields to aid debugging.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Each variant corresponds to one kind of
//!   failure and carries the path or coordinate it concerns.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Note that most resolution failures are *not* errors. An unresolved parent
//! or an unresolvable import-scope entry is logged and treated as absent, so
//! the merge engine itself is infallible. Errors surface from parsing a root
//! descriptor, from the artifact resolver, from configuration loading, and
//! from persisting a descriptor back to disk.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for pom-tree operations
#[derive(Error, Debug)]
pub enum Error {
    /// A descriptor file could not be parsed.
    ///
    /// Raised for the root of a discovery pass; module descriptors that fail
    /// to parse are skipped instead.
    #[error("Descriptor parse error in {}: {message}", path.display())]
    DescriptorParse { path: PathBuf, message: String },

    /// The artifact resolver could not provide a file for a coordinate.
    #[error("Artifact resolution error for {coordinate}: {message}")]
    ArtifactResolution { coordinate: String, message: String },

    /// A coordinate string was not in `groupId:artifactId[:type[:classifier]]:version` form.
    #[error("Invalid coordinate '{coordinate}': {message}")]
    InvalidCoordinate { coordinate: String, message: String },

    /// A version range expression could not be parsed.
    #[error("Invalid version range '{range}': {message}")]
    InvalidVersionRange { range: String, message: String },

    /// The resolver configuration file was malformed. YAML syntax and
    /// unknown-key errors land here with a hint.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A descriptor could not be written back to its source file.
    #[error("Persist error for {}: {message}", path.display())]
    Persist { path: PathBuf, message: String },

    /// The file declares a text encoding this crate cannot round-trip.
    #[error("Unsupported encoding '{encoding}' in {}", path.display())]
    UnsupportedEncoding { path: PathBuf, encoding: String },

    /// An error occurred with the on-disk resolution cache.
    #[error("Cache operation error: {message}")]
    Cache { message: String },

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON error from the resolution cache, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
