use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

pub const ATTACHED_FILE: &str = "AttachedFile";

pub mod fields {
    pub const TITLE: &str = "System.Title";
    pub const WORK_ITEM_TYPE: &str = "System.WorkItemType";
    pub const STATE: &str = "System.State";
    pub const AREA_PATH: &str = "System.AreaPath";
    pub const ITERATION_PATH: &str = "System.IterationPath";
    pub const PRIORITY: &str = "Microsoft.VSTS.Common.Priority";
    pub const ORIGINAL_ESTIMATE: &str = "Microsoft.VSTS.Scheduling.OriginalEstimate";
    pub const CREATED_DATE: &str = "System.CreatedDate";
    pub const ACTIVATED_DATE: &str = "Microsoft.VSTS.Common.ActivatedDate";
    pub const CHANGED_DATE: &str = "System.ChangedDate";
    pub const STATE_CHANGE_DATE: &str = "Microsoft.VSTS.Common.StateChangeDate";
    pub const ASSIGNED_TO: &str = "System.AssignedTo";
    pub const DESCRIPTION: &str = "System.Description";
    pub const ACCEPTANCE_CRITERIA: &str = "Microsoft.VSTS.Common.AcceptanceCriteria";
}

/// A work item as returned by `az boards work-item show`.
///
/// The document `az` printed is kept untouched in `raw` so it can be written
/// back to disk exactly; `fields` and `relations` are the parsed views the
/// rest of the tool reads from.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: u64,
    pub fields: Map<String, Value>,
    pub relations: Option<Vec<Relation>>,
    raw: Value,
}

#[derive(Deserialize)]
struct WorkItemDoc {
    id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    fields: Map<String, Value>,
    #[serde(default)]
    relations: Option<Vec<Relation>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Relation {
    #[serde(default, deserialize_with = "null_as_default")]
    pub rel: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: Map<String, Value>,
}

/// A key that is present but `null` reads the same as a missing one.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Relation {
    pub fn is_attachment(&self) -> bool {
        self.rel == ATTACHED_FILE
    }

    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// An `AttachedFile` relation that carries everything needed to download it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

impl Attachment {
    /// Returns None when the relation lacks a name or a URL.
    pub fn from_relation(relation: &Relation) -> Option<Self> {
        let name = relation.attribute_str("name").filter(|n| !n.is_empty())?;
        if relation.url.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            url: relation.url.clone(),
        })
    }
}

impl WorkItem {
    pub fn from_value(raw: Value) -> Result<Self, serde_json::Error> {
        let doc = WorkItemDoc::deserialize(&raw)?;
        Ok(Self {
            id: doc.id,
            fields: doc.fields,
            relations: doc.relations,
            raw,
        })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Non-null value of a field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    /// Field rendered as text, treating empty strings as absent.
    pub fn field_text(&self, name: &str) -> Option<String> {
        self.field(name)
            .map(display_value)
            .filter(|s| !s.is_empty())
    }

    pub fn title(&self) -> Option<String> {
        self.field(fields::TITLE).map(display_value)
    }

    pub fn work_item_type(&self) -> Option<String> {
        self.field(fields::WORK_ITEM_TYPE).map(display_value)
    }

    pub fn state(&self) -> Option<String> {
        self.field(fields::STATE).map(display_value)
    }

    pub fn description_html(&self) -> &str {
        self.field(fields::DESCRIPTION)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn acceptance_criteria_html(&self) -> &str {
        self.field(fields::ACCEPTANCE_CRITERIA)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Name of the assignee. Azure DevOps usually returns an identity
    /// object, but older processes store a bare display name.
    pub fn assigned_to(&self) -> Option<String> {
        match self.field(fields::ASSIGNED_TO)? {
            Value::Object(identity) => ["displayName", "uniqueName", "mailAddress", "mail"]
                .iter()
                .filter_map(|key| identity.get(*key).and_then(Value::as_str))
                .find(|name| !name.is_empty())
                .map(String::from),
            other => Some(display_value(other)).filter(|s| !s.is_empty()),
        }
    }
}

/// Strings print bare; everything else uses its JSON form (so `8.0` stays `8.0`).
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
