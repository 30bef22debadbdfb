//! Settings validation.
//!
//! Turns the raw persisted selections into either a fully resolved [`ValidSettings`] or a partial
//! [`Settings`] plus the reason it cannot be used yet. Validation is a pure function of the base
//! schema and the config snapshot, so it is re-run on every upstream change.

use crate::base::{Base, Field, Table, View};
use crate::config::{ChartOrientation, ConfigKey, GlobalConfig, LinkStyle, RecordShape};
use crate::graph::StyleConfig;
use serde::{Deserialize, Serialize};

/// Where the flowchart reads its records from: one view of one table, through one link field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSourceSpec {
    pub table_id: String,
    pub view_id: String,
    pub field_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidReason {
    #[error("Pick a table")]
    NoTable,
    #[error("Pick a view")]
    NoView,
    #[error("Pick a linked record field that links to records in the same table")]
    NoSelfLinkField,
}

/// Partially resolved selections, for the settings panel.
///
/// An id is only present when it still resolves in the base; a stale id reads as "not selected".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub table_id: Option<String>,
    pub view_id: Option<String>,
    pub field_id: Option<String>,
    pub chart_orientation: ChartOrientation,
    pub link_style: LinkStyle,
    pub record_shape: RecordShape,
}

/// Fully resolved settings. Only obtainable from a successful [`validate_settings`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ValidSettings {
    pub table_id: String,
    pub table_name: String,
    pub view_id: String,
    pub view_name: String,
    pub field_id: String,
    pub field_name: String,
    pub record_source: RecordSourceSpec,
    pub chart_orientation: ChartOrientation,
    pub link_style: LinkStyle,
    pub record_shape: RecordShape,
}

impl ValidSettings {
    pub fn style_config(&self) -> StyleConfig {
        StyleConfig::new(self.chart_orientation, self.link_style, self.record_shape)
    }

    pub fn settings(&self) -> Settings {
        Settings {
            table_id: Some(self.table_id.clone()),
            view_id: Some(self.view_id.clone()),
            field_id: Some(self.field_id.clone()),
            chart_orientation: self.chart_orientation,
            link_style: self.link_style,
            record_shape: self.record_shape,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsValidation {
    Valid(ValidSettings),
    Invalid {
        settings: Settings,
        reason: InvalidReason,
    },
}

impl SettingsValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn valid(&self) -> Option<&ValidSettings> {
        match self {
            Self::Valid(v) => Some(v),
            Self::Invalid { .. } => None,
        }
    }

    pub fn into_valid(self) -> Option<ValidSettings> {
        match self {
            Self::Valid(v) => Some(v),
            Self::Invalid { .. } => None,
        }
    }

    /// User-facing message; `None` when valid.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Valid(_) => None,
            Self::Invalid { reason, .. } => Some(reason.to_string()),
        }
    }

    pub fn settings(&self) -> Settings {
        match self {
            Self::Valid(v) => v.settings(),
            Self::Invalid { settings, .. } => settings.clone(),
        }
    }
}

/// Validates the persisted selections against the base schema.
///
/// Rules run in order and the first failure wins: table, then view, then a linked-record field
/// that targets its own table.
pub fn validate_settings(base: &Base, config: &GlobalConfig) -> SettingsValidation {
    let mut settings = Settings {
        chart_orientation: config.chart_orientation(),
        link_style: config.link_style(),
        record_shape: config.record_shape(),
        ..Settings::default()
    };
    let invalid = |settings: Settings, reason| SettingsValidation::Invalid { settings, reason };

    let table: Option<&Table> = config.get_str(ConfigKey::TableId).and_then(|id| base.table(id));
    let Some(table) = table else {
        return invalid(settings, InvalidReason::NoTable);
    };
    settings.table_id = Some(table.id.clone());

    let view: Option<&View> = config.get_str(ConfigKey::ViewId).and_then(|id| table.view(id));
    let field: Option<&Field> = config
        .get_str(ConfigKey::FieldId)
        .and_then(|id| table.field(id));
    settings.field_id = field.map(|f| f.id.clone());

    let Some(view) = view else {
        return invalid(settings, InvalidReason::NoView);
    };
    settings.view_id = Some(view.id.clone());

    let Some(field) = field.filter(|f| f.is_self_link_of(&table.id)) else {
        return invalid(settings, InvalidReason::NoSelfLinkField);
    };

    SettingsValidation::Valid(ValidSettings {
        table_id: table.id.clone(),
        table_name: table.name.clone(),
        view_id: view.id.clone(),
        view_name: view.name.clone(),
        field_id: field.id.clone(),
        field_name: field.name.clone(),
        record_source: RecordSourceSpec {
            table_id: table.id.clone(),
            view_id: view.id.clone(),
            field_id: field.id.clone(),
        },
        chart_orientation: settings.chart_orientation,
        link_style: settings.link_style,
        record_shape: settings.record_shape,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Base {
        serde_json::from_value(json!({
            "tables": [
                {
                    "id": "tblTasks", "name": "Tasks", "primaryFieldId": "fldName",
                    "fields": [
                        {"id": "fldName", "name": "Name", "type": "singleLineText"},
                        {"id": "fldNext", "name": "Next", "type": "multipleRecordLinks",
                         "options": {"linkedTableId": "tblTasks"}},
                        {"id": "fldOwner", "name": "Owner", "type": "multipleRecordLinks",
                         "options": {"linkedTableId": "tblPeople"}}
                    ],
                    "views": [{"id": "viwAll", "name": "All tasks"}]
                },
                {
                    "id": "tblPeople", "name": "People", "primaryFieldId": "fldPName",
                    "fields": [{"id": "fldPName", "name": "Name", "type": "singleLineText"}],
                    "views": [{"id": "viwPeople", "name": "Everyone"}]
                }
            ]
        }))
        .unwrap()
    }

    fn config(value: serde_json::Value) -> GlobalConfig {
        GlobalConfig::from_value(value)
    }

    #[test]
    fn missing_table_is_reported_first() {
        let v = validate_settings(&base(), &config(json!({"viewId": "viwAll"})));
        assert!(!v.is_valid());
        assert_eq!(v.message().as_deref(), Some("Pick a table"));
    }

    #[test]
    fn missing_view_is_reported_before_field() {
        let v = validate_settings(&base(), &config(json!({"tableId": "tblTasks"})));
        assert_eq!(v.message().as_deref(), Some("Pick a view"));
        assert_eq!(v.settings().table_id.as_deref(), Some("tblTasks"));
    }

    #[test]
    fn stale_ids_count_as_unselected() {
        let v = validate_settings(
            &base(),
            &config(json!({"tableId": "tblGone", "viewId": "viwAll", "fieldId": "fldNext"})),
        );
        assert_eq!(v.message().as_deref(), Some("Pick a table"));

        let v = validate_settings(
            &base(),
            &config(json!({"tableId": "tblTasks", "viewId": "viwGone", "fieldId": "fldNext"})),
        );
        assert_eq!(v.message().as_deref(), Some("Pick a view"));
    }

    #[test]
    fn field_must_link_to_its_own_table() {
        for field in [None, Some("fldName"), Some("fldOwner"), Some("fldGone")] {
            let mut raw = json!({"tableId": "tblTasks", "viewId": "viwAll"});
            if let Some(field) = field {
                raw["fieldId"] = json!(field);
            }
            let v = validate_settings(&base(), &config(raw));
            assert_eq!(
                v.message().as_deref(),
                Some("Pick a linked record field that links to records in the same table"),
                "field {field:?}"
            );
        }
    }

    #[test]
    fn view_from_another_table_does_not_resolve() {
        let v = validate_settings(
            &base(),
            &config(json!({"tableId": "tblTasks", "viewId": "viwPeople", "fieldId": "fldNext"})),
        );
        assert_eq!(v.message().as_deref(), Some("Pick a view"));
    }

    #[test]
    fn complete_selection_is_valid_with_style_defaults() {
        let v = validate_settings(
            &base(),
            &config(json!({
                "tableId": "tblTasks", "viewId": "viwAll", "fieldId": "fldNext",
                "linkStyle": "bogus"
            })),
        );
        let valid = v.valid().expect("valid");
        assert_eq!(v.message(), None);
        assert_eq!(valid.view_name, "All tasks");
        assert_eq!(
            valid.record_source,
            RecordSourceSpec {
                table_id: "tblTasks".into(),
                view_id: "viwAll".into(),
                field_id: "fldNext".into(),
            }
        );
        assert_eq!(valid.chart_orientation, ChartOrientation::Vertical);
        assert_eq!(valid.link_style, LinkStyle::RightAngles);
        assert_eq!(valid.record_shape, RecordShape::Rounded);
    }

    #[test]
    fn style_options_are_carried_through() {
        let v = validate_settings(
            &base(),
            &config(json!({
                "tableId": "tblTasks", "viewId": "viwAll", "fieldId": "fldNext",
                "chartOrientation": "horizontal", "linkStyle": "straightLines",
                "recordShape": "diamond"
            })),
        );
        let style = v.valid().unwrap().style_config();
        assert_eq!(style.orientation, ChartOrientation::Horizontal);
        assert_eq!(style.link_style, LinkStyle::StraightLines);
        assert_eq!(style.shape, RecordShape::Diamond);
    }
}
