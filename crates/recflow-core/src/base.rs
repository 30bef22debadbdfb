//! In-memory base: tables, fields, views and records.
//!
//! This stands in for the host platform's data layer. [`BaseHandle`] is the live, shared copy
//! that emits [`RecordChange`] notifications; [`ViewQuery`] is the record source a flowchart
//! reads from ("records of a view, projected through one field").

use crate::record::{CellValue, Record, RecordChange, RecordSource};
use crate::settings::RecordSourceSpec;
use crate::{Error, Result};
use futures::channel::mpsc as notify;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    SingleLineText,
    MultilineText,
    Number,
    Checkbox,
    SingleSelect,
    MultipleSelects,
    MultipleRecordLinks,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_table_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub options: FieldOptions,
}

impl Field {
    /// The table a linked-record field points at.
    pub fn linked_table_id(&self) -> Option<&str> {
        match self.field_type {
            FieldType::MultipleRecordLinks => self.options.linked_table_id.as_deref(),
            _ => None,
        }
    }

    /// A linked-record field whose allowed target is its own host table.
    pub fn is_self_link_of(&self, table_id: &str) -> bool {
        self.linked_table_id() == Some(table_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub id: String,
    pub name: String,
    /// Visible records in view order. `None` shows every record in table order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_ids: Option<Vec<String>>,
    /// View-assigned record colors by record id.
    #[serde(default)]
    pub record_colors: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub id: String,
    #[serde(default)]
    pub cell_values_by_field_id: IndexMap<String, CellValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: String,
    pub name: String,
    pub primary_field_id: String,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub views: Vec<View>,
    #[serde(default)]
    pub records: Vec<StoredRecord>,
}

impl Table {
    pub fn field(&self, field_id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == field_id)
    }

    pub fn view(&self, view_id: &str) -> Option<&View> {
        self.views.iter().find(|v| v.id == view_id)
    }

    pub fn record(&self, record_id: &str) -> Option<&StoredRecord> {
        self.records.iter().find(|r| r.id == record_id)
    }

    /// Primary-field value rendered as a display name (empty when the cell is empty).
    pub fn record_name(&self, record: &StoredRecord) -> String {
        record
            .cell_values_by_field_id
            .get(&self.primary_field_id)
            .map(CellValue::to_display_string)
            .unwrap_or_default()
    }

    /// Records visible in `view`, in view order. Ids the table no longer has are skipped.
    pub fn visible_records<'a>(&'a self, view: &'a View) -> Vec<&'a StoredRecord> {
        match &view.record_ids {
            Some(ids) => ids.iter().filter_map(|id| self.record(id)).collect(),
            None => self.records.iter().collect(),
        }
    }

    fn project(&self, view: &View, record: &StoredRecord, field_id: &str) -> Record {
        let mut out = Record::new(record.id.clone(), self.record_name(record));
        out.color = view.record_colors.get(&record.id).cloned();
        if let Some(value) = record.cell_values_by_field_id.get(field_id) {
            out.cell_values_by_field_id
                .insert(field_id.to_string(), value.clone());
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Base {
    pub tables: Vec<Table>,
}

impl Base {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn table(&self, table_id: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == table_id)
    }

    fn table_mut(&mut self, table_id: &str) -> Result<&mut Table> {
        self.tables
            .iter_mut()
            .find(|t| t.id == table_id)
            .ok_or_else(|| Error::UnknownTable {
                table_id: table_id.to_string(),
            })
    }
}

#[derive(Debug, Default)]
struct BaseState {
    base: Option<Base>,
    revision: u64,
    watchers: Vec<notify::UnboundedSender<RecordChange>>,
}

impl BaseState {
    fn notify(&mut self, change: RecordChange) {
        self.revision += 1;
        tracing::trace!(change = change.as_str(), revision = self.revision, "base changed");
        self.watchers.retain(|tx| tx.unbounded_send(change).is_ok());
    }
}

/// Shared live base. Clones observe the same data.
#[derive(Debug, Clone, Default)]
pub struct BaseHandle {
    inner: Arc<RwLock<BaseState>>,
}

impl BaseHandle {
    pub fn new(base: Base) -> Self {
        let handle = Self::loading();
        handle.write().base = Some(base);
        handle
    }

    /// A handle whose data has not arrived yet.
    pub fn loading() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BaseState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BaseState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn finish_loading(&self, base: Base) {
        let mut state = self.write();
        state.base = Some(base);
        state.notify(RecordChange::Records);
    }

    pub fn is_loaded(&self) -> bool {
        self.read().base.is_some()
    }

    /// Monotonic counter bumped by every data change.
    pub fn revision(&self) -> u64 {
        self.read().revision
    }

    pub fn with_base<R>(&self, f: impl FnOnce(&Base) -> R) -> Option<R> {
        self.read().base.as_ref().map(f)
    }

    /// A copy of the current schema and data (empty while loading).
    pub fn snapshot(&self) -> Base {
        self.with_base(Base::clone).unwrap_or_default()
    }

    pub fn watch(&self) -> notify::UnboundedReceiver<RecordChange> {
        let (tx, rx) = notify::unbounded();
        self.write().watchers.push(tx);
        rx
    }

    fn mutate(
        &self,
        change: RecordChange,
        f: impl FnOnce(&mut Base) -> Result<()>,
    ) -> Result<()> {
        let mut state = self.write();
        let base = state.base.get_or_insert_with(Base::default);
        f(base)?;
        state.notify(change);
        Ok(())
    }

    pub fn set_cell_value(
        &self,
        table_id: &str,
        record_id: &str,
        field_id: &str,
        value: CellValue,
    ) -> Result<()> {
        self.mutate(RecordChange::CellValues, |base| {
            let table = base.table_mut(table_id)?;
            let record = table
                .records
                .iter_mut()
                .find(|r| r.id == record_id)
                .ok_or_else(|| Error::UnknownRecord {
                    record_id: record_id.to_string(),
                })?;
            record
                .cell_values_by_field_id
                .insert(field_id.to_string(), value);
            Ok(())
        })
    }

    /// Sets (or with `None`, removes) the color a view assigns to a record.
    pub fn set_record_color(
        &self,
        table_id: &str,
        view_id: &str,
        record_id: &str,
        color: Option<String>,
    ) -> Result<()> {
        self.mutate(RecordChange::RecordColors, |base| {
            let table = base.table_mut(table_id)?;
            let Some(view) = table.views.iter_mut().find(|v| v.id == view_id) else {
                return Ok(());
            };
            match color {
                Some(color) => {
                    view.record_colors.insert(record_id.to_string(), color);
                }
                None => {
                    view.record_colors.shift_remove(record_id);
                }
            }
            Ok(())
        })
    }

    /// Appends a record to the table and to every view with an explicit record list.
    pub fn create_record(&self, table_id: &str, record: StoredRecord) -> Result<()> {
        self.mutate(RecordChange::Records, |base| {
            let table = base.table_mut(table_id)?;
            for view in &mut table.views {
                if let Some(ids) = view.record_ids.as_mut() {
                    ids.push(record.id.clone());
                }
            }
            table.records.push(record);
            Ok(())
        })
    }

    pub fn delete_record(&self, table_id: &str, record_id: &str) -> Result<()> {
        self.mutate(RecordChange::Records, |base| {
            let table = base.table_mut(table_id)?;
            let before = table.records.len();
            table.records.retain(|r| r.id != record_id);
            if table.records.len() == before {
                return Err(Error::UnknownRecord {
                    record_id: record_id.to_string(),
                });
            }
            for view in &mut table.views {
                if let Some(ids) = view.record_ids.as_mut() {
                    ids.retain(|id| id != record_id);
                }
                view.record_colors.shift_remove(record_id);
            }
            Ok(())
        })
    }

    /// Binds a record source to this base.
    pub fn query(&self, spec: &RecordSourceSpec) -> ViewQuery {
        ViewQuery {
            base: self.clone(),
            spec: spec.clone(),
        }
    }
}

/// Records of one view, projected through one field. Reads always see the live base.
#[derive(Debug, Clone)]
pub struct ViewQuery {
    base: BaseHandle,
    spec: RecordSourceSpec,
}

impl ViewQuery {
    pub fn spec(&self) -> &RecordSourceSpec {
        &self.spec
    }

    /// Name of the queried view, used for export file names.
    pub fn view_name(&self) -> Option<String> {
        self.base
            .with_base(|base| {
                base.table(&self.spec.table_id)?
                    .view(&self.spec.view_id)
                    .map(|v| v.name.clone())
            })
            .flatten()
    }

    fn with_view<R>(&self, f: impl FnOnce(&Table, &View) -> R) -> Option<R> {
        self.base
            .with_base(|base| {
                let table = base.table(&self.spec.table_id)?;
                let view = table.view(&self.spec.view_id)?;
                Some(f(table, view))
            })
            .flatten()
    }
}

impl RecordSource for ViewQuery {
    fn is_data_loaded(&self) -> bool {
        self.with_view(|_, _| ()).is_some()
    }

    fn records(&self) -> Vec<Record> {
        self.with_view(|table, view| {
            table
                .visible_records(view)
                .into_iter()
                .map(|r| table.project(view, r, &self.spec.field_id))
                .collect()
        })
        .unwrap_or_default()
    }

    fn record_by_id_if_exists(&self, record_id: &str) -> Option<Record> {
        self.with_view(|table, view| {
            table
                .visible_records(view)
                .into_iter()
                .find(|r| r.id == record_id)
                .map(|r| table.project(view, r, &self.spec.field_id))
        })
        .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use futures::executor::block_on;

    fn sample() -> Base {
        Base::from_json_str(
            r#"{
              "tables": [{
                "id": "tblTasks",
                "name": "Tasks",
                "primaryFieldId": "fldName",
                "fields": [
                  {"id": "fldName", "name": "Name", "type": "singleLineText"},
                  {"id": "fldNext", "name": "Next", "type": "multipleRecordLinks",
                   "options": {"linkedTableId": "tblTasks"}},
                  {"id": "fldDue", "name": "Due", "type": "date"}
                ],
                "views": [
                  {"id": "viwAll", "name": "All"},
                  {"id": "viwOpen", "name": "Open", "recordIds": ["recB", "recA"],
                   "recordColors": {"recA": "greenLight2"}}
                ],
                "records": [
                  {"id": "recA", "cellValuesByFieldId": {"fldName": "A", "fldNext": [{"id": "recB"}]}},
                  {"id": "recB", "cellValuesByFieldId": {"fldName": "B", "fldDue": "2024-01-01"}},
                  {"id": "recC", "cellValuesByFieldId": {}}
                ]
              }]
            }"#,
        )
        .unwrap()
    }

    fn spec(view_id: &str) -> RecordSourceSpec {
        RecordSourceSpec {
            table_id: "tblTasks".into(),
            view_id: view_id.into(),
            field_id: "fldNext".into(),
        }
    }

    #[test]
    fn unknown_field_types_deserialize_as_other() {
        let base = sample();
        let table = base.table("tblTasks").unwrap();
        assert_eq!(table.field("fldDue").unwrap().field_type, FieldType::Other);
        assert!(table.field("fldNext").unwrap().is_self_link_of("tblTasks"));
        assert!(!table.field("fldName").unwrap().is_self_link_of("tblTasks"));
    }

    #[test]
    fn view_query_projects_records_in_view_order() {
        let handle = BaseHandle::new(sample());
        let query = handle.query(&spec("viwOpen"));
        let records = query.records();
        assert_eq!(
            records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            ["recB", "recA"]
        );
        let a = &records[1];
        assert_eq!(a.name, "A");
        assert_eq!(a.color.as_deref(), Some("greenLight2"));
        assert_eq!(a.linked_record_ids("fldNext").collect::<Vec<_>>(), ["recB"]);
        assert!(a.cell_value("fldName").is_none(), "only the link field is projected");
        assert!(query.record_by_id_if_exists("recC").is_none());
        assert_eq!(query.view_name().as_deref(), Some("Open"));
    }

    #[test]
    fn loading_handle_reports_not_loaded() {
        let handle = BaseHandle::loading();
        let query = handle.query(&spec("viwAll"));
        assert!(!query.is_data_loaded());
        assert!(query.records().is_empty());
        handle.finish_loading(sample());
        assert!(query.is_data_loaded());
        assert_eq!(query.records().len(), 3);
    }

    #[test]
    fn mutations_bump_revision_and_notify() {
        let handle = BaseHandle::new(sample());
        let mut changes = handle.watch();
        let rev = handle.revision();

        handle
            .set_cell_value("tblTasks", "recB", "fldNext", CellValue::links(["recC"]))
            .unwrap();
        handle
            .set_record_color("tblTasks", "viwAll", "recC", Some("redBright".into()))
            .unwrap();
        handle.delete_record("tblTasks", "recA").unwrap();

        assert_eq!(handle.revision(), rev + 3);
        let got: Vec<_> = block_on(changes.by_ref().take(3).collect());
        assert_eq!(
            got,
            [
                RecordChange::CellValues,
                RecordChange::RecordColors,
                RecordChange::Records
            ]
        );

        let query = handle.query(&spec("viwOpen"));
        assert_eq!(
            query.records().iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            ["recB"]
        );
    }

    #[test]
    fn deleting_a_missing_record_is_an_error() {
        let handle = BaseHandle::new(sample());
        let rev = handle.revision();
        assert!(matches!(
            handle.delete_record("tblTasks", "recZ"),
            Err(Error::UnknownRecord { .. })
        ));
        assert_eq!(handle.revision(), rev);
    }
}
