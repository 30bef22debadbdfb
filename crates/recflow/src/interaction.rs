//! Pointer events on a drawing -> source records.

use crate::normalize::Drawing;
use futures::channel::mpsc;
use recflow_core::{Record, RecordSource};
use std::str::FromStr;

/// The host's "expand record detail" action. Fire-and-forget: implementations must not block.
pub trait RecordExpander {
    fn expand_record(&self, record: &Record);
}

/// Forwards expand requests over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelExpander {
    tx: mpsc::UnboundedSender<Record>,
}

impl ChannelExpander {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Record>) {
        let (tx, rx) = mpsc::unbounded();
        (Self { tx }, rx)
    }
}

impl RecordExpander for ChannelExpander {
    fn expand_record(&self, record: &Record) {
        if self.tx.unbounded_send(record.clone()).is_err() {
            tracing::debug!(record_id = %record.id, "expand request dropped, receiver gone");
        }
    }
}

/// Where a click landed: an element addressed by id (or the drawing root), then a path of
/// element-child indices below it.
///
/// Text form: `recB` is the element with id `recB`; `recB/1` its second child element;
/// `/0/2` walks from the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickTarget {
    pub anchor: Option<String>,
    pub path: Vec<usize>,
}

impl ClickTarget {
    pub fn element(id: impl Into<String>) -> Self {
        Self {
            anchor: Some(id.into()),
            path: Vec::new(),
        }
    }

    pub fn child(mut self, index: usize) -> Self {
        self.path.push(index);
        self
    }
}

impl FromStr for ClickTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        let anchor = parts
            .next()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);
        let path = parts
            .filter(|p| !p.trim().is_empty())
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .map_err(|_| format!("invalid child index `{p}` in `{s}`"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { anchor, path })
    }
}

fn locate<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
    target: &ClickTarget,
) -> Option<roxmltree::Node<'a, 'input>> {
    let root = doc.root_element();
    let mut node = match &target.anchor {
        None => root,
        Some(id) => root
            .descendants()
            .find(|n| n.is_element() && n.attribute("id") == Some(id.as_str()))?,
    };
    for &index in &target.path {
        node = node.children().filter(|n| n.is_element()).nth(index)?;
    }
    Some(node)
}

fn is_node_element(node: &roxmltree::Node<'_, '_>) -> bool {
    node.attribute("class")
        .is_some_and(|c| c.split_whitespace().any(|t| t == "node"))
}

/// Resolves clicks on the displayed drawing to live records.
pub struct InteractionResolver<'a, S: RecordSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: RecordSource + ?Sized> InteractionResolver<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Walks from the target up to (not including) the drawing root; the first node element that
    /// maps to a record still present in the source wins.
    pub fn resolve(&self, drawing: &Drawing, target: &ClickTarget) -> Option<Record> {
        if !self.source.is_data_loaded() {
            return None;
        }
        let doc = match roxmltree::Document::parse(&drawing.markup) {
            Ok(doc) => doc,
            Err(err) => {
                tracing::warn!(%err, "displayed drawing is not readable");
                return None;
            }
        };
        let root_id = doc.root_element().id();
        let start = locate(&doc, target)?;
        start
            .ancestors()
            .take_while(|n| n.id() != root_id)
            .filter(|n| n.is_element() && is_node_element(n))
            .filter_map(|n| n.attribute("id"))
            .filter_map(|id| drawing.record_id_for_element(id))
            .find_map(|record_id| self.source.record_by_id_if_exists(record_id))
    }

    /// [`resolve`](Self::resolve), then hands the record to `expander`.
    pub fn click(
        &self,
        drawing: &Drawing,
        target: &ClickTarget,
        expander: &dyn RecordExpander,
    ) -> Option<String> {
        let record = self.resolve(drawing, target)?;
        tracing::debug!(record_id = %record.id, "expanding record");
        expander.expand_record(&record);
        Some(record.id)
    }
}
