//! ChartMuseum Client
//!
//! Typed async client for ChartMuseum Helm chart repositories:
//!
//! - **Charts**: list, fetch, upload, delete, download and probe chart versions
//! - **Server info**: landing page, health and version
//! - **Retries**: bounded, honoring `RateLimit-Reset` on 429 and backing off
//!   linearly on server errors
//! - **Cancellation**: per-request [`CancelToken`] and timeout options
//!
//! ## Example
//!
//! ```rust,no_run
//! use chartmuseum_client::{Client, RequestOption};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::basic_auth("https://charts.example.com", "admin", "password")?;
//!
//! let options = [RequestOption::Timeout(Duration::from_secs(10))];
//! let latest = client
//!     .charts()
//!     .latest_version_matching("stable", "mysql", r"^1\.", &options)
//!     .await?;
//!
//! if let Some(version) = latest {
//!     let path = client
//!         .charts()
//!         .download_chart("stable", "mysql", &version, "./charts".as_ref(), &options)
//!         .await?;
//!     println!("saved {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Notes
//!
//! - Credentials are never logged; URLs in logs and errors are sanitized
//! - Downloads are written atomically, never leaving partial packages

pub mod auth;
pub mod cancel;
pub mod charts;
pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod info;
pub mod redact;
pub mod request;
pub mod response;
pub mod retry;
pub mod sniff;
pub mod transport;

// Re-exports for convenience
pub use auth::{Auth, AuthConfig};
pub use cancel::CancelToken;
pub use charts::ChartService;
pub use client::Client;
pub use config::{ClientConfig, DEFAULT_USER_AGENT, RetryConfig};
pub use error::{ApiError, ClientError, Result};
pub use info::{Health, InfoService, ServerInfo};
pub use request::{ApiRequest, Body, RequestOption};
pub use response::{Destination, JsonTarget, Probe, Response};
pub use retry::{Clock, Outcome, RetryPolicy, RetryStrategy, SystemClock};

pub use chartmuseum_core::{ChartRef, ChartVersion, ChartVersions, IndexFile, RepoPath};
