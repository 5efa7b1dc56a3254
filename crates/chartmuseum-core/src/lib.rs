//! Core types for chartmuseum-rs
//!
//! Chart identity, Helm chart-version records and the ordinal version
//! ordering used to pick "latest" versions.

pub mod chart;
pub mod error;
pub mod identity;
pub mod index;
pub mod version;

pub use chart::{ChartVersion, ChartVersions, Dependency, Maintainer, Metadata};
pub use error::{CoreError, Result};
pub use identity::{ChartRef, RepoPath};
pub use index::IndexFile;
pub use version::{OrdinalVersion, compare_versions, compile_pattern, latest_matching};
