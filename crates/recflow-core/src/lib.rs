#![forbid(unsafe_code)]

//! Record model, settings validation and graph construction (headless).
//!
//! Design goals:
//! - pure, re-evaluable settings validation (no side effects)
//! - deterministic graph construction (byte-identical output for unchanged inputs)
//! - runtime-agnostic change notification (`futures` channels, no specific executor required)

pub mod base;
pub mod color;
pub mod config;
pub mod error;
pub mod graph;
pub mod record;
pub mod settings;

pub use base::{Base, BaseHandle, Field, FieldType, Table, View, ViewQuery};
pub use config::{
    ChartOrientation, ConfigKey, ConfigStore, ConfigWriter, GlobalConfig, LinkStyle, RecordShape,
    WriteIntent,
};
pub use error::{Error, Result};
pub use graph::{BuildOutcome, Edge, Graph, MAX_RECORDS, Node, StyleConfig, build_graph};
pub use record::{CellValue, LinkedRecord, Record, RecordChange, RecordSource};
pub use settings::{
    InvalidReason, RecordSourceSpec, Settings, SettingsValidation, ValidSettings,
    validate_settings,
};
