//! Records as seen through a record source.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A reference stored in a linked-record cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl LinkedRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// A cell value in its host JSON shape.
///
/// Linked-record cells are lists of `{ "id": ... }` objects; everything else is kept as the plain
/// JSON scalar so display names can be derived from any primary field type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Links(Vec<LinkedRecord>),
    Text(String),
    Number(f64),
    Bool(bool),
    Null,
    Other(serde_json::Value),
}

impl CellValue {
    pub fn links(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Links(ids.into_iter().map(LinkedRecord::new).collect())
    }

    pub fn as_links(&self) -> &[LinkedRecord] {
        match self {
            Self::Links(links) => links,
            _ => &[],
        }
    }

    /// Renders the value the way a primary field is shown as a record name.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Links(links) => links
                .iter()
                .map(|l| l.name.as_deref().unwrap_or(l.id.as_str()))
                .collect::<Vec<_>>()
                .join(", "),
            Self::Text(s) => s.clone(),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Self::Bool(b) => (if *b { "checked" } else { "" }).to_string(),
            Self::Null => String::new(),
            Self::Other(v) => match v {
                serde_json::Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
                other => other.to_string(),
            },
        }
    }
}

/// A read-only record projected through a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub name: String,
    /// View-assigned color name (or literal hex); `None` when the view does not color the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub cell_values_by_field_id: IndexMap<String, CellValue>,
}

impl Record {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: None,
            cell_values_by_field_id: IndexMap::new(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_cell(mut self, field_id: impl Into<String>, value: CellValue) -> Self {
        self.cell_values_by_field_id.insert(field_id.into(), value);
        self
    }

    pub fn cell_value(&self, field_id: &str) -> Option<&CellValue> {
        self.cell_values_by_field_id.get(field_id)
    }

    /// Ids referenced by a linked-record cell, in cell order. Non-link cells yield nothing.
    pub fn linked_record_ids<'a>(&'a self, field_id: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.cell_value(field_id)
            .map(CellValue::as_links)
            .unwrap_or(&[])
            .iter()
            .map(|l| l.id.as_str())
    }
}

/// The record-source signals a flowchart watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordChange {
    Records,
    CellValues,
    RecordColors,
}

impl RecordChange {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Records => "records",
            Self::CellValues => "cellValues",
            Self::RecordColors => "recordColors",
        }
    }
}

/// The live set of records a flowchart is drawn from.
pub trait RecordSource {
    fn is_data_loaded(&self) -> bool;

    /// Visible records in display order.
    fn records(&self) -> Vec<Record>;

    /// Looks a record up in the current visible set; `None` once it was deleted or filtered out.
    fn record_by_id_if_exists(&self, record_id: &str) -> Option<Record>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_cells_deserialize_from_host_json() {
        let v: CellValue =
            serde_json::from_str(r#"[{"id":"recB","name":"B"},{"id":"recC"}]"#).unwrap();
        assert_eq!(
            v.as_links().iter().map(|l| l.id.as_str()).collect::<Vec<_>>(),
            ["recB", "recC"]
        );
        assert_eq!(v.to_display_string(), "B, recC");
    }

    #[test]
    fn scalar_cells_deserialize_and_display() {
        let text: CellValue = serde_json::from_str(r#""Ship it""#).unwrap();
        assert_eq!(text.to_display_string(), "Ship it");
        let number: CellValue = serde_json::from_str("42").unwrap();
        assert_eq!(number.to_display_string(), "42");
        let null: CellValue = serde_json::from_str("null").unwrap();
        assert_eq!(null, CellValue::Null);
        let tags: CellValue = serde_json::from_str(r#"["a","b"]"#).unwrap();
        assert_eq!(tags.to_display_string(), "a, b");
        assert!(tags.as_links().is_empty());
    }

    #[test]
    fn linked_record_ids_ignore_non_link_cells() {
        let r = Record::new("recA", "A")
            .with_cell("fldName", CellValue::Text("A".into()))
            .with_cell("fldNext", CellValue::links(["recB", "recC"]));
        assert_eq!(r.linked_record_ids("fldNext").collect::<Vec<_>>(), ["recB", "recC"]);
        assert_eq!(r.linked_record_ids("fldName").count(), 0);
        assert_eq!(r.linked_record_ids("fldMissing").count(), 0);
    }
}
