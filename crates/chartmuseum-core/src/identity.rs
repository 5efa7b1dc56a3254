//! Chart identity: repository paths and chart references
//!
//! A repository path is the namespace a chart lives under on the server
//! (`org/team` in `api/org/team/charts`). Paths are normalized once at parse
//! time so that every URL built from them has exactly one separator between
//! segments.

use std::fmt;

use crate::error::{CoreError, Result};

/// Normalized, non-empty repository path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoPath {
    segments: Vec<String>,
}

impl RepoPath {
    /// Parse a repository path, trimming separators and collapsing empty segments
    pub fn parse(raw: &str) -> Result<Self> {
        let segments: Vec<String> = raw
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        if segments.is_empty() {
            return Err(CoreError::InvalidRepoPath {
                path: raw.to_string(),
                reason: "repository path cannot be empty".to_string(),
            });
        }

        if let Some(bad) = segments.iter().find(|s| *s == "." || *s == "..") {
            return Err(CoreError::InvalidRepoPath {
                path: raw.to_string(),
                reason: format!("relative segment '{}' is not allowed", bad),
            });
        }

        Ok(Self { segments })
    }

    /// Path segments in order
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Path joined with `/`
    pub fn as_path(&self) -> String {
        self.segments.join("/")
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_path())
    }
}

impl std::str::FromStr for RepoPath {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A chart within a repository, optionally pinned to a version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRef {
    pub repo: RepoPath,
    pub name: String,
    pub version: Option<String>,
}

impl ChartRef {
    /// Reference a chart by repository and name
    pub fn new(repo: RepoPath, name: impl Into<String>) -> Self {
        Self {
            repo,
            name: name.into(),
            version: None,
        }
    }

    /// Pin this reference to a version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Chart name, failing when blank
    pub fn require_name(&self) -> Result<&str> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CoreError::MissingField {
                field: "chart name".to_string(),
            });
        }
        Ok(name)
    }

    /// Chart version, failing when absent or blank
    pub fn require_version(&self) -> Result<&str> {
        match self.version.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(CoreError::MissingField {
                field: "chart version".to_string(),
            }),
        }
    }

    /// Archive file name, `<name>-<version>.tgz`
    pub fn archive_name(&self) -> Result<String> {
        Ok(format!(
            "{}-{}.tgz",
            self.require_name()?,
            self.require_version()?
        ))
    }
}

impl fmt::Display for ChartRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.repo, self.name)?;
        if let Some(version) = &self.version {
            write!(f, "-{}", version)?;
        }
        Ok(())
    }
}
