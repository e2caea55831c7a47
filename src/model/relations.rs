use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::work_item::Relation;

static WORK_ITEM_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/workItems/(\d+)$").expect("valid work item url pattern"));

/// Split a work item's relations into the ids of linked work items and the
/// attachment relations.
///
/// Links whose URL does not end in `/workItems/<id>` (hyperlinks, commits,
/// pull requests) are dropped. Attachments keep their original order.
pub fn extract_relations(relations: Option<&[Relation]>) -> (BTreeSet<u64>, Vec<Relation>) {
    let mut ids = BTreeSet::new();
    let mut attachments = Vec::new();

    for relation in relations.unwrap_or_default() {
        if relation.is_attachment() {
            attachments.push(relation.clone());
            continue;
        }
        if let Some(id) = work_item_id_from_url(&relation.url) {
            ids.insert(id);
        }
    }

    (ids, attachments)
}

fn work_item_id_from_url(url: &str) -> Option<u64> {
    WORK_ITEM_URL
        .captures(url)
        .and_then(|caps| caps[1].parse().ok())
}
