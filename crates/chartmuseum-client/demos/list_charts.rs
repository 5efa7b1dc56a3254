//! List the charts of a ChartMuseum repository
//!
//! ```text
//! cargo run -p chartmuseum-client --example list_charts -- \
//!     --url https://charts.example.com --username admin --repo stable
//! ```

use chartmuseum_client::{Client, ClientConfig, RequestOption};
use clap::Parser;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "list_charts")]
#[command(about = "List charts and their latest versions", long_about = None)]
struct Args {
    /// Server base URL
    #[arg(long, env = "CHARTMUSEUM_URL")]
    url: String,

    /// Repository path
    #[arg(short, long, default_value = "test")]
    repo: String,

    /// Basic auth username
    #[arg(short, long, env = "CHARTMUSEUM_USERNAME")]
    username: Option<String>,

    /// Basic auth password
    #[arg(short, long, env = "CHARTMUSEUM_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Only show versions matching this regex
    #[arg(long)]
    filter: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = ClientConfig::new(&args.url);
    if let Some(username) = &args.username {
        config = config.with_basic_auth(username, args.password.clone().unwrap_or_default());
    }
    let client = Client::new(config)?;
    let options = [RequestOption::Timeout(Duration::from_secs(args.timeout))];

    let charts = client.charts().list_charts(&args.repo, &options).await?;
    let mut names: Vec<&String> = charts.keys().collect();
    names.sort();

    for name in names {
        let latest = match &args.filter {
            Some(filter) => {
                client
                    .charts()
                    .latest_version_matching(&args.repo, name, filter, &options)
                    .await?
            }
            None => charts[name]
                .iter()
                .map(|v| v.version())
                .max_by(|a, b| chartmuseum_core::compare_versions(a, b))
                .map(str::to_string),
        };

        match latest {
            Some(version) => println!("{:<30} {:>4} versions  latest {}", name, charts[name].len(), version),
            None => println!("{:<30} {:>4} versions", name, charts[name].len()),
        }
    }

    Ok(())
}
