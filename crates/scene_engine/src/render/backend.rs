//! Backend abstraction traits for the rendering system
//!
//! A backend receives stencil state changes and draw calls from
//! [`Display::render`](super::Display::render). Enum arguments are the values
//! previously resolved from the backend's [`GraphicsContext`](super::GraphicsContext).

use super::display::DisplayObject;
use thiserror::Error;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Rendering errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The backend rejected an operation
    #[error("Backend error: {0}")]
    Backend(String),

    /// Geometry referenced by the display list is unknown to the backend
    #[error("Unknown geometry core '{0}'")]
    UnknownGeometry(String),
}

/// Main rendering backend trait
pub trait RenderBackend {
    /// Enable or disable the stencil test
    fn set_stencil_test(&mut self, enabled: bool) -> BackendResult<()>;

    /// Clear the stencil buffer to `value`
    fn clear_stencil(&mut self, value: i32) -> BackendResult<()>;

    /// Set the stencil comparison function, reference value and mask
    fn stencil_func(&mut self, func: u32, reference: i32, mask: u32) -> BackendResult<()>;

    /// Set the stencil operations for fail, depth-fail and pass
    fn stencil_op(&mut self, sfail: u32, dpfail: u32, dppass: u32) -> BackendResult<()>;

    /// Draw one display object
    fn draw(&mut self, object: &DisplayObject) -> BackendResult<()>;
}

/// A call received by a [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    /// `set_stencil_test`
    StencilTest(bool),
    /// `clear_stencil`
    ClearStencil(i32),
    /// `stencil_func`
    StencilFunc {
        /// Comparison function
        func: u32,
        /// Reference value
        reference: i32,
        /// Comparison mask
        mask: u32,
    },
    /// `stencil_op`
    StencilOp {
        /// Stencil-fail operation
        sfail: u32,
        /// Depth-fail operation
        dpfail: u32,
        /// Pass operation
        dppass: u32,
    },
    /// `draw`, identified by geometry core id
    Draw(String),
}

/// Backend that records every call instead of talking to a GPU
///
/// Used by tests and headless tools to inspect what a frame would issue.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    /// Calls in the order they were received
    pub calls: Vec<BackendCall>,
}

impl RecordingBackend {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of draw calls recorded
    pub fn draw_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, BackendCall::Draw(_)))
            .count()
    }
}

impl RenderBackend for RecordingBackend {
    fn set_stencil_test(&mut self, enabled: bool) -> BackendResult<()> {
        self.calls.push(BackendCall::StencilTest(enabled));
        Ok(())
    }

    fn clear_stencil(&mut self, value: i32) -> BackendResult<()> {
        self.calls.push(BackendCall::ClearStencil(value));
        Ok(())
    }

    fn stencil_func(&mut self, func: u32, reference: i32, mask: u32) -> BackendResult<()> {
        self.calls.push(BackendCall::StencilFunc { func, reference, mask });
        Ok(())
    }

    fn stencil_op(&mut self, sfail: u32, dpfail: u32, dppass: u32) -> BackendResult<()> {
        self.calls.push(BackendCall::StencilOp { sfail, dpfail, dppass });
        Ok(())
    }

    fn draw(&mut self, object: &DisplayObject) -> BackendResult<()> {
        self.calls.push(BackendCall::Draw(object.geometry.clone()));
        Ok(())
    }
}
