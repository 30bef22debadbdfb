//! Records + a self-link field -> abstract directed graph.

use crate::color::{DEFAULT_FILL, DEFAULT_STROKE, fill_for_record};
use crate::config::{ChartOrientation, LinkStyle, RecordShape};
use crate::record::Record;
use rustc_hash::FxHashSet;
use serde::Serialize;

/// Largest record set the flowchart will lay out.
pub const MAX_RECORDS: usize = 100;

/// Label used for records whose primary field is empty.
pub const UNNAMED_RECORD: &str = "Unnamed record";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleConfig {
    pub orientation: ChartOrientation,
    pub link_style: LinkStyle,
    pub shape: RecordShape,
    pub default_fill: String,
    pub stroke: String,
}

impl StyleConfig {
    pub fn new(orientation: ChartOrientation, link_style: LinkStyle, shape: RecordShape) -> Self {
        Self {
            orientation,
            link_style,
            shape,
            default_fill: DEFAULT_FILL.to_string(),
            stroke: DEFAULT_STROKE.to_string(),
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self::new(
            ChartOrientation::default(),
            LinkStyle::default(),
            RecordShape::default(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub label: String,
    pub shape: RecordShape,
    pub fill_color: String,
    pub stroke_color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub from_id: String,
    pub to_id: String,
    pub style: LinkStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub orientation: ChartOrientation,
    pub link_style: LinkStyle,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BuildOutcome {
    Empty,
    CapExceeded { count: usize, limit: usize },
    Graph(Graph),
}

impl BuildOutcome {
    pub fn graph(&self) -> Option<&Graph> {
        match self {
            Self::Graph(g) => Some(g),
            Self::Empty | Self::CapExceeded { .. } => None,
        }
    }
}

/// Builds the flowchart graph for a visible record set.
///
/// Node and edge order follow record order, then cell order, so identical inputs produce identical
/// graphs. Links to records outside the set and self-links are dropped; repeated links are kept.
pub fn build_graph(records: &[Record], link_field_id: &str, style: &StyleConfig) -> BuildOutcome {
    if records.len() > MAX_RECORDS {
        return BuildOutcome::CapExceeded {
            count: records.len(),
            limit: MAX_RECORDS,
        };
    }
    if records.is_empty() {
        return BuildOutcome::Empty;
    }

    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut unique: Vec<&Record> = Vec::with_capacity(records.len());
    for record in records {
        if seen.insert(record.id.as_str()) {
            unique.push(record);
        } else {
            tracing::trace!(record_id = %record.id, "duplicate record id, keeping first");
        }
    }

    let nodes = unique
        .iter()
        .map(|r| Node {
            id: r.id.clone(),
            label: if r.name.trim().is_empty() {
                UNNAMED_RECORD.to_string()
            } else {
                r.name.clone()
            },
            shape: style.shape,
            fill_color: fill_for_record(r.color.as_deref(), &style.default_fill),
            stroke_color: style.stroke.clone(),
        })
        .collect();

    let mut edges = Vec::new();
    for record in &unique {
        for target in record.linked_record_ids(link_field_id) {
            if target == record.id {
                tracing::trace!(record_id = %record.id, "dropping self-link");
                continue;
            }
            if !seen.contains(target) {
                tracing::trace!(from = %record.id, to = %target, "dropping link to record outside the view");
                continue;
            }
            edges.push(Edge {
                from_id: record.id.clone(),
                to_id: target.to_string(),
                style: style.link_style,
            });
        }
    }

    BuildOutcome::Graph(Graph {
        nodes,
        edges,
        orientation: style.orientation,
        link_style: style.link_style,
    })
}
