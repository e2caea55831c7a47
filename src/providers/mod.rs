pub mod azure_cli;

use async_trait::async_trait;
use std::fmt;

use crate::error::AzError;
use crate::model::work_item::WorkItem;

/// How much of a work item `az boards work-item show` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expand {
    None,
    Relations,
}

impl Expand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Expand::None => "none",
            Expand::Relations => "relations",
        }
    }
}

impl fmt::Display for Expand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where work items and download credentials come from.
#[async_trait]
pub trait WorkItemSource: Send + Sync {
    fn name(&self) -> &str;
    async fn show_work_item(&self, id: u64, expand: Expand) -> Result<WorkItem, AzError>;
    /// Bearer token accepted by the attachment endpoints.
    async fn access_token(&self) -> Result<String, AzError>;
}
