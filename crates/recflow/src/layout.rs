//! Layout engine adapter.
//!
//! A layout request serializes the graph to DOT on the calling thread, then runs the engine on a
//! worker thread and resolves a `futures` oneshot. Requests are numbered; [`DrawingSlot`] only
//! accepts a result that is newer than the drawing it currently shows, so a slow request that
//! finishes after a later one is discarded instead of replacing it.

use crate::dot::{LayoutStyle, to_dot};
use crate::normalize::Drawing;
use futures::FutureExt as _;
use futures::channel::oneshot;
use futures::future::BoxFuture;
use recflow_core::Graph;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("layout failed: {0}")]
    Engine(#[from] siren::Error),
    #[error("layout engine produced unreadable markup: {0}")]
    Markup(#[from] roxmltree::Error),
    #[error("layout engine produced a drawing without a size")]
    MissingSize,
    #[error("failed to start layout worker: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("layout worker stopped before producing a drawing")]
    Canceled,
}

pub type Result<T> = std::result::Result<T, LayoutError>;

/// Engine output before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDrawing {
    pub markup: String,
    pub width: f64,
    pub height: f64,
}

/// A graph-drawing engine: DOT text in, SVG out. Implementations must be pure functions of their
/// input.
pub trait LayoutEngine: Send + Sync {
    fn render(&self, dot: &str) -> Result<RawDrawing>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SirenEngine;

impl LayoutEngine for SirenEngine {
    fn render(&self, dot: &str) -> Result<RawDrawing> {
        let rendered = siren::render(dot)?;
        Ok(RawDrawing {
            markup: rendered.svg,
            width: rendered.width,
            height: rendered.height,
        })
    }
}

#[derive(Clone)]
pub struct LayoutAdapter {
    engine: Arc<dyn LayoutEngine>,
    style: LayoutStyle,
}

impl std::fmt::Debug for LayoutAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutAdapter")
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}

impl Default for LayoutAdapter {
    fn default() -> Self {
        Self::new(SirenEngine)
    }
}

impl LayoutAdapter {
    pub fn new(engine: impl LayoutEngine + 'static) -> Self {
        Self {
            engine: Arc::new(engine),
            style: LayoutStyle::default(),
        }
    }

    pub fn with_style(mut self, style: LayoutStyle) -> Self {
        self.style = style;
        self
    }

    pub fn style(&self) -> &LayoutStyle {
        &self.style
    }

    pub fn dot(&self, graph: &Graph, name: &str) -> String {
        to_dot(graph, name, &self.style)
    }

    /// Runs the engine on the current thread.
    pub fn layout_blocking(&self, graph: &Graph, name: &str) -> Result<RawDrawing> {
        self.engine.render(&self.dot(graph, name))
    }

    /// Starts a layout on a worker thread. The worker runs to completion even if the returned
    /// future is dropped; its result is then simply lost.
    pub fn layout(&self, graph: &Graph, name: &str) -> BoxFuture<'static, Result<RawDrawing>> {
        let dot = self.dot(graph, name);
        let engine = Arc::clone(&self.engine);
        let (tx, rx) = oneshot::channel();
        let spawned = std::thread::Builder::new()
            .name("recflow-layout".to_string())
            .spawn(move || {
                let _ = tx.send(engine.render(&dot));
            });
        async move {
            spawned?;
            rx.await.map_err(|_| LayoutError::Canceled)?
        }
        .boxed()
    }
}

#[derive(Debug, Default)]
struct Applied {
    seq: u64,
    drawing: Option<Arc<Drawing>>,
    error: Option<String>,
}

/// The currently displayed drawing plus the request counter.
#[derive(Debug, Default)]
pub struct DrawingSlot {
    next_seq: AtomicU64,
    applied: Mutex<Applied>,
}

impl DrawingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Applied> {
        self.applied.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocates the sequence number for a new request. Numbers start at 1 and strictly increase.
    pub fn begin(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Shows `drawing` if it is newer than the one on display. Returns whether it was applied.
    pub fn apply(&self, seq: u64, drawing: Drawing) -> bool {
        let mut applied = self.lock();
        if seq <= applied.seq {
            tracing::debug!(seq, applied = applied.seq, "discarding stale layout");
            return false;
        }
        applied.seq = seq;
        applied.drawing = Some(Arc::new(drawing));
        applied.error = None;
        true
    }

    /// Records a failed request. The displayed drawing, if any, stays up.
    pub fn fail(&self, seq: u64, message: String) -> bool {
        let mut applied = self.lock();
        if seq <= applied.seq {
            return false;
        }
        applied.seq = seq;
        applied.error = Some(message);
        true
    }

    /// Drops the displayed drawing and makes every in-flight request stale.
    pub fn invalidate(&self) {
        let seq = self.begin();
        let mut applied = self.lock();
        applied.seq = applied.seq.max(seq);
        applied.drawing = None;
        applied.error = None;
    }

    pub fn current(&self) -> Option<Arc<Drawing>> {
        self.lock().drawing.clone()
    }

    /// Message of the newest request if it failed.
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn applied_seq(&self) -> u64 {
        self.lock().seq
    }

    pub fn latest_seq(&self) -> u64 {
        self.next_seq.load(Ordering::SeqCst)
    }

    /// Whether a request newer than the displayed drawing is still outstanding.
    pub fn is_pending(&self) -> bool {
        self.latest_seq() > self.applied_seq()
    }
}
