//! Server configuration from command-line flags and environment.
//!
//! | Option | Env Var | Default |
//! |--------|---------|---------|
//! | `--bind` | `TANDEM_BIND` | `127.0.0.1:8080` |
//! | `--api1-url` | `APIURLS__API1` | none |
//! | `--api2-url` | `APIURLS__API2` | none |
//! | `--results-path` | `TANDEM_RESULTS_PATH` | `results.txt` |
//! | `--request-timeout-secs` | `TANDEM_REQUEST_TIMEOUT_SECS` | `60` (0 disables) |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tandem_core::ApiUrls;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "tandem",
    version,
    about = "Aggregates two upstream APIs behind one cached, retrying endpoint"
)]
pub struct ServerConfig {
    /// Address the HTTP server listens on.
    #[arg(long, env = "TANDEM_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// URL of the first upstream source (`ApiUrls:Api1`).
    #[arg(long = "api1-url", env = "APIURLS__API1")]
    pub api1_url: Option<String>,

    /// URL of the second upstream source (`ApiUrls:Api2`).
    #[arg(long = "api2-url", env = "APIURLS__API2")]
    pub api2_url: Option<String>,

    /// File the latest POSTed result is written to.
    #[arg(long, env = "TANDEM_RESULTS_PATH", default_value = "results.txt")]
    pub results_path: PathBuf,

    /// Deadline for fetching both upstream sources in one request.
    #[arg(long, env = "TANDEM_REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn api_urls(&self) -> ApiUrls {
        ApiUrls {
            api1: self.api1_url.clone().filter(|url| !url.trim().is_empty()),
            api2: self.api2_url.clone().filter(|url| !url.trim().is_empty()),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}
