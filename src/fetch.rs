use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::attachments::AttachmentDownloader;
use crate::context::write_context;
use crate::model::relations::extract_relations;
use crate::model::work_item::Attachment;
use crate::providers::{Expand, WorkItemSource};

/// Where one work item's context lands on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub out_dir: PathBuf,
    pub attachments_dir: PathBuf,
    pub related_dir: PathBuf,
}

impl OutputLayout {
    /// `<repo_root>/context/hu-<id>` unless `out_dir` is given.
    pub fn new(repo_root: &Path, out_dir: Option<&Path>, id: u64) -> Self {
        let out_dir = match out_dir {
            Some(dir) => dir.to_path_buf(),
            None => repo_root.join("context").join(format!("hu-{id}")),
        };
        Self {
            attachments_dir: out_dir.join("attachments"),
            related_dir: out_dir.join("related-workitems"),
            out_dir,
        }
    }

    pub fn root_json(&self, id: u64) -> PathBuf {
        self.out_dir.join(format!("{id}.json"))
    }

    pub fn related_json(&self, id: u64) -> PathBuf {
        self.related_dir.join(format!("{id}.json"))
    }

    pub fn context_md(&self) -> PathBuf {
        self.out_dir.join("context.md")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub attachments: bool,
    pub related: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            attachments: true,
            related: true,
        }
    }
}

/// Pretty JSON with a trailing newline, non-ASCII left as-is.
fn write_json(path: &Path, value: &Value) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))
}

/// Fetch work item `id` with its related items and attachments, and write
/// the context document. Returns the path of `context.md`.
///
/// Only the root item and the download token are required; a related item
/// or attachment that cannot be fetched is logged and left out.
pub async fn fetch_context(
    source: &dyn WorkItemSource,
    downloader: &AttachmentDownloader,
    layout: &OutputLayout,
    id: u64,
    options: FetchOptions,
) -> Result<PathBuf> {
    tracing::info!(id, source = source.name(), "fetching work item");
    let item = source
        .show_work_item(id, Expand::Relations)
        .await
        .with_context(|| format!("Failed to fetch work item #{id}"))?;
    create_dir(&layout.out_dir)?;
    write_json(&layout.root_json(id), item.raw())?;

    let (related_ids, attachment_relations) = extract_relations(item.relations.as_deref());

    let mut related = Vec::new();
    if options.related && !related_ids.is_empty() {
        create_dir(&layout.related_dir)?;
        for rid in related_ids {
            match source.show_work_item(rid, Expand::None).await {
                Ok(rel) => {
                    write_json(&layout.related_json(rid), rel.raw())?;
                    related.push(rel);
                }
                Err(e) => tracing::warn!(id = rid, error = %e, "could not fetch related work item"),
            }
        }
    }

    let mut attachment_files = Vec::new();
    if options.attachments && !attachment_relations.is_empty() {
        let bearer = source
            .access_token()
            .await
            .context("Failed to get an access token for attachment downloads")?;
        create_dir(&layout.attachments_dir)?;
        for relation in &attachment_relations {
            let Some(attachment) = Attachment::from_relation(relation) else {
                tracing::debug!(url = %relation.url, "skipping attachment without name or url");
                continue;
            };
            match downloader
                .fetch(&attachment, &bearer, &layout.attachments_dir)
                .await
            {
                Ok(files) => attachment_files.extend(files),
                Err(e) => tracing::warn!(name = %attachment.name, error = %e, "could not download attachment"),
            }
        }
    }

    let context_path = layout.context_md();
    write_context(&item, &related, &attachment_files, &context_path)?;
    Ok(context_path)
}
