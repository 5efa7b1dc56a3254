//! Chart operations
//!
//! Paths follow the ChartMuseum API layout:
//!
//! | operation | method | path |
//! |-----------|--------|------|
//! | list charts | GET | `api/<repo>/charts` |
//! | list versions | GET | `api/<repo>/charts/<name>` |
//! | get version | GET | `api/<repo>/charts/<name>/<version>` |
//! | chart exists | HEAD | `api/<repo>/charts/<name>` |
//! | version exists | HEAD | `api/<repo>/charts/<name>/<version>` |
//! | upload | POST | `api/<repo>/charts` |
//! | delete | DELETE | `api/<repo>/charts/<name>/<version>` |
//! | download | GET | `<repo>/charts/<name>-<version>.tgz` |
//! | repository index | GET | `<repo>/index.yaml` |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chartmuseum_core::{ChartRef, ChartVersion, ChartVersions, IndexFile, RepoPath};
use reqwest::Method;
use tracing::info;

use crate::client::Client;
use crate::download::AtomicFile;
use crate::error::Result;
use crate::request::{Body, RequestOption};
use crate::response::{Destination, Probe, Response};

/// Chart operations, obtained from [`Client::charts`]
#[derive(Debug, Clone, Copy)]
pub struct ChartService<'a> {
    client: &'a Client,
}

impl<'a> ChartService<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// All charts in `repo`, keyed by chart name
    pub async fn list_charts(
        &self,
        repo: &str,
        options: &[RequestOption],
    ) -> Result<HashMap<String, ChartVersions>> {
        let repo = RepoPath::parse(repo)?;
        let path = format!("api/{}/charts", repo);

        let mut charts = HashMap::new();
        self.get_json(&path, &mut charts, options).await?;
        Ok(charts)
    }

    /// All versions of one chart
    pub async fn list_versions(
        &self,
        repo: &str,
        name: &str,
        options: &[RequestOption],
    ) -> Result<ChartVersions> {
        let chart = chart_ref(repo, name)?;
        let path = format!("api/{}/charts/{}", chart.repo, chart.require_name()?);

        let mut versions = ChartVersions::new();
        self.get_json(&path, &mut versions, options).await?;
        Ok(versions)
    }

    /// Metadata of one chart version
    pub async fn get_version(
        &self,
        repo: &str,
        name: &str,
        version: &str,
        options: &[RequestOption],
    ) -> Result<ChartVersion> {
        let path = version_path(&chart_ref(repo, name)?.with_version(version))?;

        let mut record = ChartVersion::default();
        self.get_json(&path, &mut record, options).await?;
        Ok(record)
    }

    /// Whether any version of a chart exists
    pub async fn exists(&self, repo: &str, name: &str, options: &[RequestOption]) -> Probe {
        let path = chart_ref(repo, name).and_then(|chart| {
            let name = chart.require_name()?;
            Ok(format!("api/{}/charts/{}", chart.repo, name))
        });
        match path {
            Ok(path) => self.head(&path, options).await,
            Err(err) => Probe::Missing(err.into()),
        }
    }

    /// Whether a specific chart version exists
    pub async fn version_exists(
        &self,
        repo: &str,
        name: &str,
        version: &str,
        options: &[RequestOption],
    ) -> Probe {
        let path = chart_ref(repo, name)
            .map(|chart| chart.with_version(version))
            .and_then(|chart| version_path(&chart));
        match path {
            Ok(path) => self.head(&path, options).await,
            Err(err) => Probe::Missing(err.into()),
        }
    }

    /// Upload a packaged chart
    ///
    /// The file must exist and must not be a directory; both are checked
    /// before anything is sent.
    pub async fn upload_chart(
        &self,
        repo: &str,
        package: &Path,
        options: &[RequestOption],
    ) -> Result<Response> {
        let repo = RepoPath::parse(repo)?;
        let path = format!("api/{}/charts", repo);

        let request = self.client.new_request(
            Method::POST,
            &path,
            Body::File(package.to_path_buf()),
            options,
        )?;
        let response = self.client.execute(&request, Destination::Discard).await?;

        info!(repo = %repo, package = %package.display(), status = response.status.as_u16(), "Uploaded chart");
        Ok(response)
    }

    /// Delete one chart version
    pub async fn delete_chart(
        &self,
        repo: &str,
        name: &str,
        version: &str,
        options: &[RequestOption],
    ) -> Result<Response> {
        let chart = chart_ref(repo, name)?.with_version(version);
        let path = version_path(&chart)?;

        let request = self.client.new_request(Method::DELETE, &path, Body::None, options)?;
        let response = self.client.execute(&request, Destination::Discard).await?;

        info!(chart = %chart, status = response.status.as_u16(), "Deleted chart");
        Ok(response)
    }

    /// Download a chart package into `dest_dir` as `<name>-<version>.tgz`
    ///
    /// The package is streamed into a temporary file in `dest_dir` and only
    /// renamed into place once complete. Returns the final path.
    pub async fn download_chart(
        &self,
        repo: &str,
        name: &str,
        version: &str,
        dest_dir: &Path,
        options: &[RequestOption],
    ) -> Result<PathBuf> {
        let chart = chart_ref(repo, name)?.with_version(version);
        let archive = chart.archive_name()?;
        let path = format!("{}/charts/{}", chart.repo, archive);

        let request = self.client.new_request(Method::GET, &path, Body::None, options)?;

        let mut file = AtomicFile::create(dest_dir, &archive)?;
        self.client
            .execute(&request, Destination::Raw(&mut file))
            .await?
            .ready()?;
        let saved = file.persist()?;

        info!(chart = %chart, path = %saved.display(), "Downloaded chart");
        Ok(saved)
    }

    /// Highest version of a chart whose version string matches `pattern`
    ///
    /// Versions are compared ordinally (digit runs as whole numbers), so
    /// `10.0.0` beats `9.3.4`. Returns `None` when nothing matches.
    pub async fn latest_version_matching(
        &self,
        repo: &str,
        name: &str,
        pattern: &str,
        options: &[RequestOption],
    ) -> Result<Option<String>> {
        let pattern = chartmuseum_core::compile_pattern(pattern)?;
        let versions = self.list_versions(repo, name, options).await?;

        Ok(
            chartmuseum_core::latest_matching(versions.iter().map(ChartVersion::version), &pattern)
                .map(str::to_string),
        )
    }

    /// The repository's Helm `index.yaml`
    pub async fn repo_index(&self, repo: &str, options: &[RequestOption]) -> Result<IndexFile> {
        let repo = RepoPath::parse(repo)?;
        let path = format!("{}/index.yaml", repo);

        let request = self.client.new_request(Method::GET, &path, Body::None, options)?;
        let mut body = Vec::new();
        self.client
            .execute(&request, Destination::Raw(&mut body))
            .await?
            .ready()?;

        Ok(IndexFile::from_bytes(&body)?)
    }

    async fn get_json<T>(&self, path: &str, target: &mut T, options: &[RequestOption]) -> Result<()>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        let request = self.client.new_request(Method::GET, path, Body::None, options)?;
        self.client
            .execute(&request, Destination::Json(target))
            .await?
            .ready()?;
        Ok(())
    }

    async fn head(&self, path: &str, options: &[RequestOption]) -> Probe {
        let result = match self.client.new_request(Method::HEAD, path, Body::None, options) {
            Ok(request) => self.client.execute(&request, Destination::Discard).await,
            Err(err) => Err(err),
        };
        Probe::from(result)
    }
}

fn chart_ref(repo: &str, name: &str) -> chartmuseum_core::Result<ChartRef> {
    let chart = ChartRef::new(RepoPath::parse(repo)?, name.trim());
    chart.require_name()?;
    Ok(chart)
}

fn version_path(chart: &ChartRef) -> chartmuseum_core::Result<String> {
    Ok(format!(
        "api/{}/charts/{}/{}",
        chart.repo,
        chart.require_name()?,
        chart.require_version()?
    ))
}
