use async_trait::async_trait;
use std::process::Stdio;

use super::{Expand, WorkItemSource};
use crate::config::AzConfig;
use crate::error::AzError;
use crate::model::work_item::WorkItem;

/// Azure DevOps resource id, used to request AAD tokens for the service.
pub const AZURE_DEVOPS_RESOURCE: &str = "499b84ac-1321-427f-aa17-267ca6975798";

/// Work items fetched through a logged-in `az` CLI with the `azure-devops`
/// extension installed.
pub struct AzCli {
    config: AzConfig,
}

impl AzCli {
    pub fn new(config: AzConfig) -> Self {
        Self { config }
    }

    fn command_line(&self, args: &[&str]) -> String {
        format!("{} {}", self.config.program.display(), args.join(" "))
    }

    /// Run `az` with `args` and return its stdout.
    async fn run(&self, args: &[&str]) -> Result<String, AzError> {
        let command = self.command_line(args);
        tracing::debug!(%command, "running az");

        let output = tokio::process::Command::new(&self.config.program)
            .args(args)
            .envs(self.config.env_overrides())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| AzError::Spawn {
                program: self.config.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(AzError::CommandFailed {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(AzError::EmptyOutput { command });
        }
        Ok(stdout)
    }
}

#[async_trait]
impl WorkItemSource for AzCli {
    fn name(&self) -> &str {
        "Azure DevOps"
    }

    async fn show_work_item(&self, id: u64, expand: Expand) -> Result<WorkItem, AzError> {
        let id_arg = id.to_string();
        let args = [
            "boards",
            "work-item",
            "show",
            "--id",
            id_arg.as_str(),
            "--expand",
            expand.as_str(),
            "--output",
            "json",
        ];
        let stdout = self.run(&args).await?;

        let raw: serde_json::Value = serde_json::from_str(&stdout).map_err(|source| AzError::Parse {
            command: self.command_line(&args),
            source,
        })?;
        WorkItem::from_value(raw).map_err(|source| AzError::Parse {
            command: self.command_line(&args),
            source,
        })
    }

    async fn access_token(&self) -> Result<String, AzError> {
        self.run(&[
            "account",
            "get-access-token",
            "--resource",
            AZURE_DEVOPS_RESOURCE,
            "--query",
            "accessToken",
            "-o",
            "tsv",
        ])
        .await
    }
}
