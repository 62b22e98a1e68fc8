//! Startup job list and the append-only response file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Result, ServerError};
use crate::scheduler::Job;

/// Read the job list, one job per line, in file order.
pub async fn load_jobs(path: &Path) -> Result<Vec<Job>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ServerError::JobList {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(content.lines().map(Job::from).collect())
}

/// Destination for accepted `(job, response)` pairs.
pub trait ResponseSink: Send + Sync {
    fn record(&self, job: &Job, response: &str) -> std::io::Result<()>;
}

/// Appends `job<TAB>response` lines to a file, flushing after each one.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| ServerError::ResponseSink {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResponseSink for FileSink {
    fn record(&self, job: &Job, response: &str) -> std::io::Result<()> {
        let line = format!("{}\t{}\n", job, response);
        let mut file = self.file.lock();
        file.write_all(line.as_bytes())?;
        file.flush()
    }
}

/// Keeps recorded pairs in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(Job, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(Job, String)> {
        self.records.lock().clone()
    }
}

impl ResponseSink for MemorySink {
    fn record(&self, job: &Job, response: &str) -> std::io::Result<()> {
        self.records.lock().push((job.clone(), response.to_string()));
        Ok(())
    }
}
