//! Persisted flowchart configuration.
//!
//! Reads are one-directional snapshots ([`ConfigStore::snapshot`]); writes go through an explicit
//! write-intent channel ([`ConfigWriter`]) that the store applies and then broadcasts as change
//! notifications ([`ConfigStore::watch`]).

use crate::{Error, Result};
use futures::channel::mpsc;
use futures::{FutureExt as _, StreamExt as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    TableId,
    ViewId,
    FieldId,
    ChartOrientation,
    LinkStyle,
    RecordShape,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 6] = [
        ConfigKey::TableId,
        ConfigKey::ViewId,
        ConfigKey::FieldId,
        ConfigKey::ChartOrientation,
        ConfigKey::LinkStyle,
        ConfigKey::RecordShape,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TableId => "tableId",
            Self::ViewId => "viewId",
            Self::FieldId => "fieldId",
            Self::ChartOrientation => "chartOrientation",
            Self::LinkStyle => "linkStyle",
            Self::RecordShape => "recordShape",
        }
    }

    /// Keys naming base objects; everything else is a style option.
    fn is_selection(self) -> bool {
        matches!(self, Self::TableId | Self::ViewId | Self::FieldId)
    }

    fn validate(self, value: &Value) -> Result<()> {
        let invalid = |message: String| Error::InvalidConfigValue {
            key: self.as_str().to_string(),
            message,
        };
        match (self, value) {
            (_, Value::Null) => Ok(()),
            (Self::TableId | Self::ViewId | Self::FieldId, Value::String(_)) => Ok(()),
            (Self::ChartOrientation, Value::String(s)) => s.parse::<ChartOrientation>().map(drop),
            (Self::LinkStyle, Value::String(s)) => s.parse::<LinkStyle>().map(drop),
            (Self::RecordShape, Value::String(s)) => s.parse::<RecordShape>().map(drop),
            (_, other) => Err(invalid(format!("expected a string, got {other}"))),
        }
    }
}

impl FromStr for ConfigKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| Error::UnknownConfigKey { key: s.to_string() })
    }
}

macro_rules! config_enum {
    ($name:ident, $key:expr, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            /// Reads a persisted value, falling back to the default for missing or unknown values.
            pub fn from_config(value: Option<&str>) -> Self {
                value.and_then(|v| v.parse().ok()).unwrap_or_default()
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(Error::InvalidConfigValue {
                        key: $key.as_str().to_string(),
                        message: format!("unknown value `{other}`"),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartOrientation {
    #[default]
    Vertical,
    Horizontal,
}

config_enum!(ChartOrientation, ConfigKey::ChartOrientation, {
    Vertical => "vertical",
    Horizontal => "horizontal",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkStyle {
    #[default]
    RightAngles,
    StraightLines,
}

config_enum!(LinkStyle, ConfigKey::LinkStyle, {
    RightAngles => "rightAngles",
    StraightLines => "straightLines",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordShape {
    #[default]
    Rounded,
    Rectangle,
    Ellipse,
    Circle,
    Diamond,
}

config_enum!(RecordShape, ConfigKey::RecordShape, {
    Rounded => "rounded",
    Rectangle => "rectangle",
    Ellipse => "ellipse",
    Circle => "circle",
    Diamond => "diamond",
});

/// A snapshot of the persisted key-value configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalConfig(Value);

impl Default for GlobalConfig {
    fn default() -> Self {
        Self::empty_object()
    }
}

impl GlobalConfig {
    pub fn empty_object() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn get(&self, key: ConfigKey) -> Option<&Value> {
        self.0.as_object()?.get(key.as_str())
    }

    pub fn get_str(&self, key: ConfigKey) -> Option<&str> {
        self.get(key)?.as_str()
    }

    pub fn chart_orientation(&self) -> ChartOrientation {
        ChartOrientation::from_config(self.get_str(ConfigKey::ChartOrientation))
    }

    pub fn link_style(&self) -> LinkStyle {
        LinkStyle::from_config(self.get_str(ConfigKey::LinkStyle))
    }

    pub fn record_shape(&self) -> RecordShape {
        RecordShape::from_config(self.get_str(ConfigKey::RecordShape))
    }

    /// Sets (or with `Value::Null`, clears) a key. Returns whether the stored value changed.
    fn set(&mut self, key: ConfigKey, value: Value) -> bool {
        // Stores are JSON objects; coerce anything else so this never panics on user input.
        if !self.0.is_object() {
            self.0 = Value::Object(Map::new());
        }
        let Value::Object(ref mut map) = self.0 else {
            return false;
        };
        if value.is_null() {
            return map.remove(key.as_str()).is_some();
        }
        if map.get(key.as_str()) == Some(&value) {
            return false;
        }
        map.insert(key.as_str().to_string(), value);
        true
    }
}

/// A request to change one persisted key. `Value::Null` clears the key.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteIntent {
    pub key: ConfigKey,
    pub value: Value,
}

impl WriteIntent {
    pub fn set(key: ConfigKey, value: impl Into<Value>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    pub fn clear(key: ConfigKey) -> Self {
        Self {
            key,
            value: Value::Null,
        }
    }

    /// Parses a `key=value` pair (an empty value clears the key).
    pub fn parse_assignment(text: &str) -> Result<Self> {
        let (key, value) = text.split_once('=').ok_or_else(|| Error::InvalidConfigValue {
            key: text.to_string(),
            message: "expected `key=value`".to_string(),
        })?;
        let key = key.parse::<ConfigKey>()?;
        let value = value.trim();
        Ok(if value.is_empty() {
            Self::clear(key)
        } else {
            Self::set(key, value)
        })
    }
}

/// Write side of the configuration: settings UIs send intents, they never mutate state directly.
#[derive(Debug, Clone)]
pub struct ConfigWriter {
    tx: mpsc::UnboundedSender<WriteIntent>,
}

impl ConfigWriter {
    /// Queues an intent. Returns `false` once the store is gone.
    pub fn request(&self, intent: WriteIntent) -> bool {
        self.tx.unbounded_send(intent).is_ok()
    }
}

#[derive(Debug)]
struct StoreInner {
    config: GlobalConfig,
    watchers: Vec<mpsc::UnboundedSender<ConfigKey>>,
    intents: mpsc::UnboundedReceiver<WriteIntent>,
}

/// The persisted key-value store with change notification.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    inner: Arc<Mutex<StoreInner>>,
    intents_tx: mpsc::UnboundedSender<WriteIntent>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(GlobalConfig::default())
    }
}

impl ConfigStore {
    pub fn new(config: GlobalConfig) -> Self {
        let (intents_tx, intents) = mpsc::unbounded();
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                config,
                watchers: Vec::new(),
                intents,
            })),
            intents_tx,
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(Error::InvalidConfigValue {
                key: "<root>".to_string(),
                message: "expected a JSON object".to_string(),
            });
        }
        // Style options load as stored; their getters fall back to defaults.
        for key in ConfigKey::ALL.into_iter().filter(|k| k.is_selection()) {
            if let Some(v) = value.get(key.as_str()) {
                key.validate(v)?;
            }
        }
        Ok(Self::new(GlobalConfig::from_value(value)))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self.snapshot().as_value())?;
        std::fs::write(path, text)?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> GlobalConfig {
        self.lock().config.clone()
    }

    pub fn writer(&self) -> ConfigWriter {
        ConfigWriter {
            tx: self.intents_tx.clone(),
        }
    }

    /// Subscribes to key changes. Each applied change is delivered once per watcher.
    pub fn watch(&self) -> mpsc::UnboundedReceiver<ConfigKey> {
        let (tx, rx) = mpsc::unbounded();
        self.lock().watchers.push(tx);
        rx
    }

    /// Applies one intent immediately. Returns whether the stored value changed.
    pub fn apply(&self, intent: WriteIntent) -> Result<bool> {
        intent.key.validate(&intent.value)?;
        let mut inner = self.lock();
        let changed = inner.config.set(intent.key, intent.value);
        if changed {
            tracing::debug!(key = intent.key.as_str(), "config changed");
            inner
                .watchers
                .retain(|tx| tx.unbounded_send(intent.key).is_ok());
        }
        Ok(changed)
    }

    /// Drains queued intents from every [`ConfigWriter`]. Returns how many keys changed.
    ///
    /// Invalid intents are rejected individually; the first error is returned after the rest of
    /// the queue has been applied.
    pub fn apply_pending(&self) -> Result<usize> {
        let pending: Vec<WriteIntent> = {
            let mut inner = self.lock();
            let mut pending = Vec::new();
            while let Some(Some(intent)) = inner.intents.next().now_or_never() {
                pending.push(intent);
            }
            pending
        };
        let mut changed = 0usize;
        let mut first_err = None;
        for intent in pending {
            match self.apply(intent) {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(%err, "rejected config write");
                    first_err.get_or_insert(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(changed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use futures::executor::block_on;

    #[test]
    fn style_values_fall_back_to_defaults() {
        let cfg = GlobalConfig::from_value(serde_json::json!({
            "chartOrientation": "sideways",
            "recordShape": "diamond",
        }));
        assert_eq!(cfg.chart_orientation(), ChartOrientation::Vertical);
        assert_eq!(cfg.link_style(), LinkStyle::RightAngles);
        assert_eq!(cfg.record_shape(), RecordShape::Diamond);
    }

    #[test]
    fn writes_go_through_intents_and_notify_watchers() {
        let store = ConfigStore::default();
        let mut changes = store.watch();
        let writer = store.writer();

        assert!(writer.request(WriteIntent::set(ConfigKey::TableId, "tblTasks")));
        assert!(writer.request(WriteIntent::set(ConfigKey::TableId, "tblTasks")));
        assert_eq!(store.snapshot().get_str(ConfigKey::TableId), None);

        assert_eq!(store.apply_pending().unwrap(), 1);
        assert_eq!(
            store.snapshot().get_str(ConfigKey::TableId),
            Some("tblTasks")
        );
        assert_eq!(block_on(changes.next()), Some(ConfigKey::TableId));
    }

    #[test]
    fn invalid_style_writes_are_rejected() {
        let store = ConfigStore::default();
        let err = store
            .apply(WriteIntent::set(ConfigKey::LinkStyle, "wiggly"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
        assert_eq!(store.snapshot().get(ConfigKey::LinkStyle), None);
    }

    #[test]
    fn unknown_stored_style_values_load_and_fall_back() {
        let text = r#"{"tableId":"tblTasks","linkStyle":"bogus","recordShape":7}"#;
        let store = ConfigStore::from_json_str(text).unwrap();
        let cfg = store.snapshot();
        assert_eq!(cfg.get_str(ConfigKey::TableId), Some("tblTasks"));
        assert_eq!(cfg.link_style(), LinkStyle::RightAngles);
        assert_eq!(cfg.record_shape(), RecordShape::Rounded);

        assert!(ConfigStore::from_json_str(r#"{"tableId":5}"#).is_err());
        assert!(ConfigStore::from_json_str("[]").is_err());
    }

    #[test]
    fn queued_writes_survive_a_dropped_writer() {
        let store = ConfigStore::default();
        let writer = store.writer();
        assert!(writer.request(WriteIntent::set(ConfigKey::ViewId, "viwAll")));
        assert!(writer.request(WriteIntent::set(ConfigKey::LinkStyle, "wiggly")));
        drop(writer);
        assert!(store.apply_pending().is_err());
        assert_eq!(store.snapshot().get_str(ConfigKey::ViewId), Some("viwAll"));
        assert_eq!(store.apply_pending().unwrap(), 0);
    }

    #[test]
    fn clearing_a_key_removes_it() {
        let store = ConfigStore::from_json_str(r#"{"viewId":"viwAll"}"#).unwrap();
        assert!(store.apply(WriteIntent::clear(ConfigKey::ViewId)).unwrap());
        assert_eq!(store.snapshot().get(ConfigKey::ViewId), None);
        assert!(!store.apply(WriteIntent::clear(ConfigKey::ViewId)).unwrap());
    }

    #[test]
    fn parses_assignments() {
        let intent = WriteIntent::parse_assignment("recordShape=circle").unwrap();
        assert_eq!(intent, WriteIntent::set(ConfigKey::RecordShape, "circle"));
        let intent = WriteIntent::parse_assignment("fieldId=").unwrap();
        assert_eq!(intent, WriteIntent::clear(ConfigKey::FieldId));
        assert!(WriteIntent::parse_assignment("color=red").is_err());
        assert!(WriteIntent::parse_assignment("nonsense").is_err());
    }
}
