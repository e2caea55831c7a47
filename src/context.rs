use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::model::work_item::{fields, WorkItem};
use crate::util::html::html_to_text;

/// Optional metadata lines, in display order. Each is omitted when the
/// field is absent or empty.
const OPTIONAL_METADATA: &[(&str, &str)] = &[
    ("Área", fields::AREA_PATH),
    ("Iteración", fields::ITERATION_PATH),
    ("Prioridad", fields::PRIORITY),
    ("Estimación original (h)", fields::ORIGINAL_ESTIMATE),
    ("Creado", fields::CREATED_DATE),
    ("Activado", fields::ACTIVATED_DATE),
    ("Último cambio", fields::CHANGED_DATE),
    ("Cambio de estado", fields::STATE_CHANGE_DATE),
];

fn or_none(value: Option<String>) -> String {
    value.unwrap_or_else(|| "None".to_string())
}

/// Render the context document for `item`.
pub fn render_context(item: &WorkItem, related: &[WorkItem], attachment_files: &[PathBuf]) -> String {
    let title = or_none(item.title());
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "# Contexto HU {} — {}", item.id, title);
    out.push('\n');

    out.push_str("## Metadatos\n");
    let _ = writeln!(
        out,
        "- **Work item**: {} ({})",
        item.id,
        or_none(item.work_item_type())
    );
    let _ = writeln!(out, "- **Título**: {title}");
    let _ = writeln!(out, "- **Estado**: {}", or_none(item.state()));
    for (label, field) in OPTIONAL_METADATA {
        if let Some(value) = item.field_text(field) {
            let _ = writeln!(out, "- **{label}**: {value}");
        }
    }
    if let Some(assignee) = item.assigned_to() {
        let _ = writeln!(out, "- **Asignado a**: {assignee}");
    }

    out.push('\n');
    out.push_str("## Descripción (texto plano)\n");
    out.push_str(&html_to_text(item.description_html()));
    out.push('\n');

    out.push('\n');
    out.push_str("## Criterios de aceptación (texto plano)\n");
    out.push_str(&html_to_text(item.acceptance_criteria_html()));
    out.push('\n');

    out.push('\n');
    out.push_str("## Anexos (descargados)\n");
    if attachment_files.is_empty() {
        out.push_str("- (Sin anexos)\n");
    }
    for path in attachment_files {
        let _ = writeln!(out, "- `{}`", path.display());
    }

    out.push('\n');
    out.push_str("## Work items relacionados (descargados)\n");
    if related.is_empty() {
        out.push_str("- (Sin relaciones)\n");
    }
    for rel in related {
        let _ = writeln!(
            out,
            "- **#{}** — {} ({}) — {}",
            rel.id,
            or_none(rel.title()),
            or_none(rel.work_item_type()),
            or_none(rel.state()),
        );
    }

    out
}

/// Render and write the context document, replacing any previous one.
pub fn write_context(
    item: &WorkItem,
    related: &[WorkItem],
    attachment_files: &[PathBuf],
    out_path: &Path,
) -> Result<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = render_context(item, related, attachment_files);
    std::fs::write(out_path, content)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn root() -> WorkItem {
        WorkItem::from_value(json!({
            "id": 25459,
            "fields": {
                "System.Title": "Pago con PSE",
                "System.WorkItemType": "User Story",
                "System.State": "Active",
                "System.AreaPath": "Pagos\\Checkout",
                "System.IterationPath": "Pagos\\Sprint 14",
                "Microsoft.VSTS.Common.Priority": 2,
                "Microsoft.VSTS.Scheduling.OriginalEstimate": 8.0,
                "System.CreatedDate": "2024-05-02T14:03:11.63Z",
                "System.ChangedDate": "2024-05-20T09:00:00Z",
                "System.AssignedTo": { "displayName": "Ana Gómez", "uniqueName": "ana@corp.com" },
                "System.Description": "<div>Como <b>cliente</b> quiero pagar con PSE.</div>",
                "Microsoft.VSTS.Common.AcceptanceCriteria": "<ul><li>Redirige al banco</li><li>Confirma el pago</li></ul>"
            }
        }))
        .unwrap()
    }

    fn related(id: u64, title: &str, kind: &str, state: &str) -> WorkItem {
        WorkItem::from_value(json!({
            "id": id,
            "fields": {
                "System.Title": title,
                "System.WorkItemType": kind,
                "System.State": state
            }
        }))
        .unwrap()
    }

    #[test]
    fn renders_full_document() {
        let files = vec![
            PathBuf::from("/repo/context/hu-25459/attachments/flujo.docx"),
            PathBuf::from("/repo/context/hu-25459/attachments/flujo.txt"),
        ];
        let rel = vec![related(25460, "Integrar API PSE", "Task", "New")];

        let doc = render_context(&root(), &rel, &files);

        let expected = "\
# Contexto HU 25459 — Pago con PSE

## Metadatos
- **Work item**: 25459 (User Story)
- **Título**: Pago con PSE
- **Estado**: Active
- **Área**: Pagos\\Checkout
- **Iteración**: Pagos\\Sprint 14
- **Prioridad**: 2
- **Estimación original (h)**: 8.0
- **Creado**: 2024-05-02T14:03:11.63Z
- **Último cambio**: 2024-05-20T09:00:00Z
- **Asignado a**: Ana Gómez

## Descripción (texto plano)
Como cliente quiero pagar con PSE.

## Criterios de aceptación (texto plano)
- Redirige al banco
- Confirma el pago

## Anexos (descargados)
- `/repo/context/hu-25459/attachments/flujo.docx`
- `/repo/context/hu-25459/attachments/flujo.txt`

## Work items relacionados (descargados)
- **#25460** — Integrar API PSE (Task) — New
";
        assert_eq!(doc, expected);
    }

    #[test]
    fn placeholders_when_nothing_was_downloaded() {
        let doc = render_context(&root(), &[], &[]);
        assert!(doc.contains("\n- (Sin anexos)\n"));
        assert!(doc.contains("\n- (Sin relaciones)\n"));
    }

    #[test]
    fn absent_optional_fields_are_omitted() {
        let bare = WorkItem::from_value(json!({
            "id": 1,
            "fields": { "System.Title": "Solo", "System.AreaPath": "" }
        }))
        .unwrap();

        let doc = render_context(&bare, &[], &[]);

        assert!(doc.contains("- **Work item**: 1 (None)\n"));
        assert!(doc.contains("- **Estado**: None\n"));
        for label in ["Área", "Iteración", "Prioridad", "Creado", "Asignado a"] {
            assert!(!doc.contains(&format!("**{label}**")), "{label} should be omitted");
        }
        assert!(doc.contains("## Descripción (texto plano)\n\n\n## Criterios"));
    }

    #[test]
    fn empty_title_is_printed_empty_not_none() {
        let item = WorkItem::from_value(json!({
            "id": 5,
            "fields": { "System.Title": "", "System.WorkItemType": "Bug", "System.State": null }
        }))
        .unwrap();

        let doc = render_context(&item, &[item.clone()], &[]);

        assert!(doc.starts_with("# Contexto HU 5 — \n"));
        assert!(doc.contains("- **Título**: \n"));
        assert!(doc.contains("- **Estado**: None\n"));
        assert!(doc.contains("- **#5** —  (Bug) — None\n"));
    }

    #[test]
    fn zero_priority_is_still_shown() {
        let item = WorkItem::from_value(json!({
            "id": 3,
            "fields": { "Microsoft.VSTS.Common.Priority": 0 }
        }))
        .unwrap();
        assert!(render_context(&item, &[], &[]).contains("- **Prioridad**: 0\n"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let rel = vec![related(2, "B", "Bug", "Closed"), related(3, "C", "Task", "New")];
        let files = vec![PathBuf::from("a.png")];
        assert_eq!(
            render_context(&root(), &rel, &files),
            render_context(&root(), &rel, &files)
        );
    }

    #[test]
    fn write_creates_parents_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("context").join("hu-25459").join("context.md");
        std::fs::create_dir_all(out.parent().unwrap()).unwrap();
        std::fs::write(&out, "stale content that is much longer than nothing").unwrap();

        write_context(&root(), &[], &[], &out).unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written, render_context(&root(), &[], &[]));
        assert!(!written.contains("stale"));
    }
}
