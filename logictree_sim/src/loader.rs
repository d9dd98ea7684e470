//! Loading logic-tree documents and job parameters from disk.
//!
//! Trees are read from their JSON rendering. Job parameters are read either
//! from a JSON object or from `key = value` lines as found in a job
//! descriptor (section headers and comments are skipped).

use logictree_core::{LogicTree, LogicTreeError};
use logictree_env::{EnvError, JobParams};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised by the harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse '{origin}': {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode '{path}': {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    LogicTree(#[from] LogicTreeError),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error("Invalid arguments: {0}")]
    Usage(String),
}

impl HarnessError {
    pub fn usage(message: impl Into<String>) -> Self {
        HarnessError::Usage(message.into())
    }
}

fn read(path: &Path) -> Result<String, HarnessError> {
    fs::read_to_string(path).map_err(|source| HarnessError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Parses a tree from its JSON rendering; `origin` names it in errors.
pub fn parse_tree(json: &str, origin: &str) -> Result<LogicTree, HarnessError> {
    serde_json::from_str(json).map_err(|source| HarnessError::Parse {
        origin: origin.to_string(),
        source,
    })
}

/// Loads and validates a tree document.
pub fn load_tree(path: impl AsRef<Path>) -> Result<LogicTree, HarnessError> {
    let path = path.as_ref();
    parse_tree(&read(path)?, &path.display().to_string())
}

/// Parses job parameters from JSON or from `key = value` lines.
pub fn parse_job(text: &str, origin: &str) -> Result<JobParams, HarnessError> {
    if text.trim_start().starts_with('{') {
        let job: JobParams = serde_json::from_str(text).map_err(|source| HarnessError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        job.validate()?;
        return Ok(job);
    }

    let pairs = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('['))
        .filter_map(|line| line.split_once('='));

    Ok(JobParams::from_pairs(pairs)?)
}

/// Loads job parameters from a file.
pub fn load_job(path: impl AsRef<Path>) -> Result<JobParams, HarnessError> {
    let path = path.as_ref();
    parse_job(&read(path)?, &path.display().to_string())
}
