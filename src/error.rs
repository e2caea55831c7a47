use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Failures from running the `az` client.
#[derive(Error, Debug)]
pub enum AzError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("`{command}` produced no output")]
    EmptyOutput { command: String },

    #[error("could not parse output of `{command}`: {source}")]
    Parse {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures while fetching or converting a single attachment.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("{program} failed for {}: {stderr}", path.display())]
    Tool {
        program: String,
        path: PathBuf,
        stderr: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The invocation did not name a usable work item.
#[derive(Error, Debug)]
#[error("pass --id or a --link containing /_workitems/edit/<id>")]
pub struct UsageError;
