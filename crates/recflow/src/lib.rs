#![forbid(unsafe_code)]

//! Headless flowcharts for tables whose records link to each other.
//!
//! Records of one view become nodes, a linked-record field pointing back at the same table becomes
//! edges, and the result is laid out with [`siren`], fitted to a viewport and exported as SVG or
//! PNG. The building blocks live in [`recflow_core`]; this crate adds the drawing pipeline and the
//! reactive [`Flowchart`] controller.
//!
//! ```no_run
//! use recflow::{BaseHandle, ConfigStore, ExportFormat, Flowchart};
//!
//! let base = BaseHandle::new(recflow::Base::load("base.json")?);
//! let config = ConfigStore::load("config.json")?;
//! let mut chart = Flowchart::new(base, config);
//! if chart.refresh_blocking().drawing().is_some() {
//!     let file = chart.export(ExportFormat::Svg)?;
//!     file.write_to("out")?;
//! }
//! # Ok::<(), recflow::Error>(())
//! ```

pub mod dot;
pub mod export;
pub mod interaction;
pub mod layout;
pub mod normalize;
pub mod pipeline;

pub use dot::{LayoutStyle, to_dot};
pub use export::{ExportError, ExportFile, ExportFormat, RASTER_SCALE, export, standalone_svg};
pub use interaction::{ChannelExpander, ClickTarget, InteractionResolver, RecordExpander};
pub use layout::{DrawingSlot, LayoutAdapter, LayoutEngine, LayoutError, RawDrawing, SirenEngine};
pub use normalize::{ContainerBox, Drawing, normalize};
pub use pipeline::{
    Change, DisplayState, EMPTY_PROMPT, FixedViewport, Flowchart, LOADING_PROMPT, LayoutTask,
    Viewport, too_many_records_prompt,
};

pub use recflow_core::{
    Base, BaseHandle, BuildOutcome, ConfigKey, ConfigStore, ConfigWriter, GlobalConfig, Graph,
    MAX_RECORDS, Record, RecordSource, SettingsValidation, ValidSettings, WriteIntent,
    build_graph, validate_settings,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] recflow_core::Error),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("nothing to export: settings are invalid or no drawing is displayed")]
    ExportUnavailable,
}

pub type Result<T> = std::result::Result<T, Error>;
