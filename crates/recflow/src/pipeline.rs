//! The reactive flowchart controller.
//!
//! `Flowchart` ties the pieces together: it re-validates settings and rebuilds the graph when the
//! base or the persisted config change, starts layouts, and exposes what the host should display.
//! Layouts run outside the controller as [`LayoutTask`]s so hosts can drive them on whatever
//! executor they have; results land in the shared [`DrawingSlot`] in request order.

use crate::export::{ExportFile, ExportFormat, export};
use crate::interaction::{ClickTarget, InteractionResolver, RecordExpander};
use crate::layout::{DrawingSlot, LayoutAdapter, RawDrawing};
use crate::normalize::{ContainerBox, Drawing, normalize};
use crate::{Error, Result};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt as _, StreamExt as _};
use recflow_core::{
    BaseHandle, BuildOutcome, ConfigKey, ConfigStore, ConfigWriter, Graph, RecordChange,
    RecordSource, SettingsValidation, ValidSettings, build_graph, validate_settings,
};
use std::sync::Arc;

pub const LOADING_PROMPT: &str = "Loading...";
pub const EMPTY_PROMPT: &str = "Add some records to get started";

pub fn too_many_records_prompt(limit: usize) -> String {
    format!(
        "The flowchart app can only visualize up to {limit} records. Try deleting some records or filtering them out of the view."
    )
}

/// What the host should show.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayState {
    Invalid(String),
    Loading,
    Empty,
    TooManyRecords { count: usize, limit: usize },
    /// A layout is running and nothing has been drawn for the current inputs yet.
    Pending,
    /// The newest layout failed and there is no earlier drawing to keep showing. The message is
    /// for logs and diagnostics; the surface stays blank.
    LayoutFailed(String),
    Drawing(Arc<Drawing>),
}

impl DisplayState {
    /// The prompt text for non-drawing states. Engine failures never reach the surface.
    pub fn prompt(&self) -> Option<String> {
        match self {
            Self::Invalid(message) => Some(message.clone()),
            Self::Loading => Some(LOADING_PROMPT.to_string()),
            Self::Empty => Some(EMPTY_PROMPT.to_string()),
            Self::TooManyRecords { limit, .. } => Some(too_many_records_prompt(*limit)),
            Self::Pending | Self::LayoutFailed(_) | Self::Drawing(_) => None,
        }
    }

    pub fn drawing(&self) -> Option<&Arc<Drawing>> {
        match self {
            Self::Drawing(d) => Some(d),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "invalid",
            Self::Loading => "loading",
            Self::Empty => "empty",
            Self::TooManyRecords { .. } => "tooManyRecords",
            Self::Pending => "pending",
            Self::LayoutFailed(_) => "layoutFailed",
            Self::Drawing(_) => "drawing",
        }
    }
}

/// The host's viewport.
pub trait Viewport: Send + Sync {
    fn enter_fullscreen_if_possible(&self);
}

/// A viewport that cannot change size.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedViewport;

impl Viewport for FixedViewport {
    fn enter_fullscreen_if_possible(&self) {}
}

/// An upstream signal the controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Records(RecordChange),
    Config(ConfigKey),
}

/// A started layout. Await [`run`](Self::run) to apply its result.
#[must_use = "a layout task does nothing until it is run"]
pub struct LayoutTask {
    seq: u64,
    container: ContainerBox,
    slot: Arc<DrawingSlot>,
    layout: BoxFuture<'static, crate::layout::Result<RawDrawing>>,
}

impl std::fmt::Debug for LayoutTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutTask")
            .field("seq", &self.seq)
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

impl LayoutTask {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Waits for the layout and applies it. Returns whether the drawing was shown.
    pub async fn run(self) -> bool {
        let seq = self.seq;
        let outcome = self
            .layout
            .await
            .and_then(|raw| normalize(&raw, self.container));
        match outcome {
            Ok(drawing) => {
                let applied = self.slot.apply(seq, drawing);
                tracing::debug!(seq, applied, "layout finished");
                applied
            }
            Err(err) => {
                tracing::warn!(seq, %err, "layout failed");
                self.slot.fail(seq, err.to_string());
                false
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Invalid(String),
    Loading,
    Empty,
    TooManyRecords { count: usize, limit: usize },
    Graph,
}

/// Inputs a drawing was computed from. Identical inputs never trigger a second layout.
#[derive(Debug, Clone, PartialEq)]
struct Fingerprint {
    settings: ValidSettings,
    revision: u64,
    container: ContainerBox,
}

pub struct Flowchart {
    base: BaseHandle,
    config: ConfigStore,
    adapter: LayoutAdapter,
    viewport: Box<dyn Viewport>,
    container: ContainerBox,
    slot: Arc<DrawingSlot>,
    changes: BoxStream<'static, Change>,
    validation: Option<SettingsValidation>,
    phase: Phase,
    graph: Option<Graph>,
    fingerprint: Option<Fingerprint>,
    settings_open: bool,
}

impl std::fmt::Debug for Flowchart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flowchart")
            .field("container", &self.container)
            .field("phase", &self.phase)
            .field("settings_open", &self.settings_open)
            .finish_non_exhaustive()
    }
}

impl Flowchart {
    pub fn new(base: BaseHandle, config: ConfigStore) -> Self {
        let changes = futures::stream::select(
            base.watch().map(Change::Records),
            config.watch().map(Change::Config),
        )
        .boxed();
        Self {
            base,
            config,
            adapter: LayoutAdapter::default(),
            viewport: Box::new(FixedViewport),
            container: ContainerBox::default(),
            slot: Arc::new(DrawingSlot::new()),
            changes,
            validation: None,
            phase: Phase::Loading,
            graph: None,
            fingerprint: None,
            settings_open: false,
        }
    }

    pub fn with_adapter(mut self, adapter: LayoutAdapter) -> Self {
        self.adapter = adapter;
        self
    }

    pub fn with_viewport(mut self, viewport: impl Viewport + 'static) -> Self {
        self.viewport = Box::new(viewport);
        self
    }

    pub fn with_container(mut self, container: ContainerBox) -> Self {
        self.container = container;
        self
    }

    pub fn set_container(&mut self, container: ContainerBox) {
        self.container = container;
    }

    pub fn base(&self) -> &BaseHandle {
        &self.base
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Write side for settings UIs. Intents take effect on the next [`refresh`](Self::refresh).
    pub fn config_writer(&self) -> ConfigWriter {
        self.config.writer()
    }

    pub fn slot(&self) -> &Arc<DrawingSlot> {
        &self.slot
    }

    /// Result of the last validation; `None` before the first refresh.
    pub fn validation(&self) -> Option<&SettingsValidation> {
        self.validation.as_ref()
    }

    pub fn valid_settings(&self) -> Option<&ValidSettings> {
        self.validation.as_ref().and_then(SettingsValidation::valid)
    }

    /// The graph of the current inputs, when there is one to draw.
    pub fn graph(&self) -> Option<&Graph> {
        self.graph.as_ref()
    }

    /// DOT source the engine receives for the current graph.
    pub fn dot(&self) -> Option<String> {
        let graph = self.graph.as_ref()?;
        let name = self.view_name()?;
        Some(self.adapter.dot(graph, &name))
    }

    fn view_name(&self) -> Option<String> {
        let settings = self.valid_settings()?;
        self.base
            .query(&settings.record_source)
            .view_name()
            .or_else(|| Some(settings.view_name.clone()))
    }

    pub fn is_settings_open(&self) -> bool {
        self.settings_open
    }

    pub fn open_settings(&mut self) {
        if !self.settings_open {
            self.settings_open = true;
            self.viewport.enter_fullscreen_if_possible();
        }
    }

    /// Closes the settings panel. Refused while the settings are invalid.
    pub fn close_settings(&mut self) -> bool {
        if self.valid_settings().is_none() {
            return false;
        }
        self.settings_open = false;
        true
    }

    /// Waits for the next upstream change. `None` once every source is gone.
    pub async fn next_change(&mut self) -> Option<Change> {
        self.changes.next().await
    }

    /// Changes that already arrived, without waiting.
    pub fn drain_changes(&mut self) -> Vec<Change> {
        let mut out = Vec::new();
        while let Some(Some(change)) = self.changes.next().now_or_never() {
            out.push(change);
        }
        out
    }

    /// Re-derives everything from the current base and config. Returns a layout to run when the
    /// inputs changed and there is a graph to draw.
    pub fn refresh(&mut self) -> Option<LayoutTask> {
        if let Err(err) = self.config.apply_pending() {
            tracing::warn!(%err, "ignoring invalid settings write");
        }

        if !self.base.is_loaded() {
            self.enter(Phase::Loading);
            return None;
        }

        let config = self.config.snapshot();
        let validation = self
            .base
            .with_base(|base| validate_settings(base, &config))?;
        let valid = validation.valid().cloned();
        self.validation = Some(validation);

        let Some(settings) = valid else {
            let message = self
                .validation
                .as_ref()
                .and_then(SettingsValidation::message)
                .unwrap_or_default();
            self.enter(Phase::Invalid(message));
            self.open_settings();
            return None;
        };

        let query = self.base.query(&settings.record_source);
        if !query.is_data_loaded() {
            self.enter(Phase::Loading);
            return None;
        }

        let fingerprint = Fingerprint {
            settings: settings.clone(),
            revision: self.base.revision(),
            container: self.container,
        };
        if self.fingerprint.as_ref() == Some(&fingerprint) {
            tracing::trace!("inputs unchanged, skipping recompute");
            return None;
        }
        self.fingerprint = Some(fingerprint);

        let records = query.records();
        match build_graph(&records, &settings.field_id, &settings.style_config()) {
            BuildOutcome::Empty => {
                self.enter(Phase::Empty);
                None
            }
            BuildOutcome::CapExceeded { count, limit } => {
                tracing::debug!(count, limit, "too many records to draw");
                self.enter(Phase::TooManyRecords { count, limit });
                None
            }
            BuildOutcome::Graph(graph) => {
                let name = query
                    .view_name()
                    .unwrap_or_else(|| settings.view_name.clone());
                let seq = self.slot.begin();
                tracing::debug!(
                    seq,
                    nodes = graph.nodes.len(),
                    edges = graph.edges.len(),
                    "starting layout"
                );
                let layout = self.adapter.layout(&graph, &name);
                self.graph = Some(graph);
                self.phase = Phase::Graph;
                Some(LayoutTask {
                    seq,
                    container: self.container,
                    slot: Arc::clone(&self.slot),
                    layout,
                })
            }
        }
    }

    /// Moves to a non-drawing phase; anything in flight becomes stale.
    fn enter(&mut self, phase: Phase) {
        if !matches!(phase, Phase::Empty | Phase::TooManyRecords { .. }) {
            self.fingerprint = None;
        }
        self.graph = None;
        self.slot.invalidate();
        self.phase = phase;
    }

    /// [`refresh`](Self::refresh), then runs the layout to completion on this thread.
    pub fn refresh_blocking(&mut self) -> DisplayState {
        if let Some(task) = self.refresh() {
            futures::executor::block_on(task.run());
        }
        self.display_state()
    }

    pub fn display_state(&self) -> DisplayState {
        match &self.phase {
            Phase::Invalid(message) => DisplayState::Invalid(message.clone()),
            Phase::Loading => DisplayState::Loading,
            Phase::Empty => DisplayState::Empty,
            Phase::TooManyRecords { count, limit } => DisplayState::TooManyRecords {
                count: *count,
                limit: *limit,
            },
            Phase::Graph => match self.slot.current() {
                Some(drawing) => DisplayState::Drawing(drawing),
                None if self.slot.is_pending() => DisplayState::Pending,
                None => self
                    .slot
                    .error()
                    .map_or(DisplayState::Pending, DisplayState::LayoutFailed),
            },
        }
    }

    /// Export is offered only with valid settings and a drawing on display.
    pub fn can_export(&self) -> bool {
        self.valid_settings().is_some() && self.display_state().drawing().is_some()
    }

    pub fn export(&self, format: ExportFormat) -> Result<ExportFile> {
        let name = self.view_name().ok_or(Error::ExportUnavailable)?;
        let drawing = self
            .display_state()
            .drawing()
            .cloned()
            .ok_or(Error::ExportUnavailable)?;
        Ok(export(&drawing, &name, format)?)
    }

    /// Resolves a click on the displayed drawing and expands the record it landed on.
    pub fn click(&self, target: &ClickTarget, expander: &dyn RecordExpander) -> Option<String> {
        let settings = self.valid_settings()?;
        let drawing = self.display_state().drawing().cloned()?;
        let query = self.base.query(&settings.record_source);
        InteractionResolver::new(&query).click(&drawing, target, expander)
    }
}
