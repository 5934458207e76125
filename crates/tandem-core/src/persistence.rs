use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Aggregated upstream bodies plus the caller's input, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultRecord {
    pub api1: String,
    pub api2: String,
    pub input_data: String,
}

impl ResultRecord {
    pub fn new(api1: impl Into<String>, api2: impl Into<String>, input_data: impl Into<String>) -> Self {
        Self {
            api1: api1.into(),
            api2: api2.into(),
            input_data: input_data.into(),
        }
    }
}

pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), FetchError>> + Send + 'a>>;

/// Destination for submitted results.
pub trait ResultSink: Send + Sync {
    fn write<'a>(&'a self, record: ResultRecord) -> SinkFuture<'a>;
}

/// Writes the latest record as JSON to a single file, replacing its contents.
#[derive(Debug, Clone)]
pub struct FileResultSink {
    path: PathBuf,
}

impl Default for FileResultSink {
    fn default() -> Self {
        Self::new("results.txt")
    }
}

impl FileResultSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for FileResultSink {
    fn write<'a>(&'a self, record: ResultRecord) -> SinkFuture<'a> {
        Box::pin(async move {
            let json = serde_json::to_string(&record)?;
            tokio::fs::write(&self.path, json).await?;
            tracing::debug!(path = %self.path.display(), "result record written");
            Ok(())
        })
    }
}
