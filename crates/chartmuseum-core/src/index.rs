//! Repository index (`index.yaml`)
//!
//! Helm-compatible index format as generated by ChartMuseum for each
//! repository path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::chart::{ChartVersion, ChartVersions};
use crate::error::Result;
use crate::version::compare_versions;

/// Repository index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexFile {
    /// API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// When this index was generated
    #[serde(default)]
    pub generated: Option<DateTime<Utc>>,

    /// Chart versions indexed by chart name
    #[serde(default)]
    pub entries: HashMap<String, ChartVersions>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

impl Default for IndexFile {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            generated: None,
            entries: HashMap::new(),
        }
    }
}

impl IndexFile {
    /// Parse index from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse index from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_yaml::from_slice(bytes)?)
    }

    /// All versions of a chart
    pub fn get(&self, name: &str) -> Option<&ChartVersions> {
        self.entries.get(name)
    }

    /// Highest version of a chart under ordinal ordering
    pub fn latest(&self, name: &str) -> Option<&ChartVersion> {
        self.entries
            .get(name)?
            .iter()
            .max_by(|a, b| compare_versions(a.version(), b.version()))
    }

    /// A specific version of a chart
    pub fn get_version(&self, name: &str, version: &str) -> Option<&ChartVersion> {
        self.entries
            .get(name)?
            .iter()
            .find(|cv| cv.version() == version)
    }

    /// Chart names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> IndexFile {
        let yaml = r#"
apiVersion: v1
generated: "2024-01-01T00:00:00Z"
entries:
  mysql:
    - name: mysql
      version: "9.3.4"
      appVersion: "8.0.31"
      urls:
        - charts/mysql-9.3.4.tgz
      digest: "abc123"
    - name: mysql
      version: "10.0.1"
      appVersion: "8.0.32"
      urls:
        - charts/mysql-10.0.1.tgz
    - name: mysql
      version: "8.8.19"
      urls:
        - charts/mysql-8.8.19.tgz
  redis:
    - name: redis
      version: "17.2.0"
      description: Redis database
      keywords:
        - cache
      urls:
        - charts/redis-17.2.0.tgz
"#;
        IndexFile::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_parse_index() {
        let index = sample_index();
        assert_eq!(index.entries.len(), 2);
        assert_eq!(index.names(), ["mysql", "redis"]);
        assert_eq!(index.get("mysql").unwrap().len(), 3);
        assert!(index.generated.is_some());
    }

    #[test]
    fn test_latest_uses_ordinal_ordering() {
        let index = sample_index();
        assert_eq!(index.latest("mysql").unwrap().version(), "10.0.1");
        assert!(index.latest("postgresql").is_none());
    }

    #[test]
    fn test_get_version() {
        let index = sample_index();
        let cv = index.get_version("mysql", "9.3.4").unwrap();
        assert_eq!(cv.metadata.app_version.as_deref(), Some("8.0.31"));
        assert!(index.get_version("mysql", "1.0.0").is_none());
    }

    #[test]
    fn test_empty_index() {
        let index = IndexFile::from_bytes(b"apiVersion: v1\n").unwrap();
        assert!(index.entries.is_empty());
        assert_eq!(IndexFile::default().api_version, "v1");
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(IndexFile::from_yaml("entries: [not, a, map").is_err());
    }
}
