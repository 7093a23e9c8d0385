//! Rendering: renderer dispatch, built-in value widgets and the
//! virtualized settings list

pub mod canvas;
pub mod context;
pub mod header;
pub mod list;
pub mod registry;
pub mod widgets;

pub use canvas::{Canvas, ScrollState};
pub use context::{PickerState, RenderContext, StyleCache, TransientState};
pub use header::{HeaderControl, HeaderView, HEADER_HEIGHT};
pub use list::{draw_picker_popup, owner_rows, FocusTarget, FrameStats, ListRow, ListView};
pub use registry::{RegistryError, RendererRegistry, RowSlot, Strategy, TypeRenderer};
