//! Rendering layer
//!
//! The graphics context supplies backend enum values, the display holds the
//! compiled display list and active render state, and a [`RenderBackend`]
//! consumes the display list draw by draw.
//!
//! ```text
//! Scene graph
//!      ↓  compile (one pass)
//! Display (display list + active stencil state)
//!      ↓  render
//! RenderBackend (GPU API)
//! ```

mod backend;
mod context;
mod display;
mod state;

pub use backend::{BackendCall, BackendResult, RecordingBackend, RenderBackend, RenderError};
pub use context::{GraphicsContext, WebGlConstants};
pub use display::{Display, DisplayObject, RenderStats};
pub use state::StencilBufferState;
