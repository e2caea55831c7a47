use anyhow::{Context, Result};
use clap::Parser;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::attachments::AttachmentDownloader;
use crate::config::{self, AzConfig};
use crate::error::UsageError;
use crate::fetch::{fetch_context, FetchOptions, OutputLayout};
use crate::providers::azure_cli::AzCli;

static EDIT_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/_workitems/edit/(\d+)").expect("valid edit link pattern"));

/// Fetch an Azure DevOps work item with its relations and attachments and
/// write a context.md summary next to them.
#[derive(Parser, Debug)]
#[command(name = "work-context", version)]
pub struct Args {
    /// Work item id (if absent, taken from --link)
    #[arg(long)]
    pub id: Option<u64>,

    /// Work item link, e.g. https://dev.azure.com/org/proj/_workitems/edit/25459
    #[arg(long)]
    pub link: Option<String>,

    /// Organization URL, e.g. https://dev.azure.com/Contoso
    #[arg(long)]
    pub org_url: Option<String>,

    /// Exact project name
    #[arg(long)]
    pub project: Option<String>,

    /// Repository to write context/ into (default: current directory)
    #[arg(long)]
    pub repo_root: Option<PathBuf>,

    /// Output directory (default: <repo-root>/context/hu-<id>)
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Do not download attachments
    #[arg(long)]
    pub no_attachments: bool,

    /// Do not download related work items
    #[arg(long)]
    pub no_related: bool,

    /// Path to the az executable
    #[arg(long)]
    pub az_path: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Extract the id from a work item edit link such as
/// `https://dev.azure.com/org/proj/_workitems/edit/25459`.
pub fn parse_work_item_id_from_link(link: &str) -> Option<u64> {
    EDIT_LINK
        .captures(link)
        .and_then(|caps| caps[1].parse().ok())
}

/// `--id` wins; otherwise the id comes from `--link`. Zero is not an id.
pub fn resolve_work_item_id(id: Option<u64>, link: Option<&str>) -> Result<u64, UsageError> {
    id.filter(|id| *id > 0)
        .or_else(|| link.and_then(parse_work_item_id_from_link))
        .filter(|id| *id > 0)
        .ok_or(UsageError)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    Ok(cwd.join(path))
}

/// Run one fetch as described by `args`. Returns the path of the rendered
/// context document.
pub async fn handle_fetch(args: Args) -> Result<PathBuf> {
    let id = resolve_work_item_id(args.id, args.link.as_deref())?;

    let repo_root = match &args.repo_root {
        Some(root) => absolute(root)?,
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };
    let repo_root = repo_root.canonicalize().unwrap_or(repo_root);
    let out_dir = args.out_dir.as_deref().map(absolute).transpose()?;
    let layout = OutputLayout::new(&repo_root, out_dir.as_deref(), id);

    let file_config = config::load_config()?;
    let az_config = AzConfig::resolve(args.org_url, args.project, args.az_path, &file_config);
    tracing::debug!(?az_config, ?layout, "resolved configuration");

    let source = AzCli::new(az_config);
    let downloader = AttachmentDownloader::with_system_tools();
    let options = FetchOptions {
        attachments: !args.no_attachments,
        related: !args.no_related,
    };

    fetch_context(&source, &downloader, &layout, id, options).await
}
