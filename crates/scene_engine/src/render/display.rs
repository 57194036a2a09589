//! Display list and active render state
//!
//! The display is the mutable surface a compilation pass writes into: the
//! active stencil state, the redraw-needed flag, and the display list of
//! objects to draw. Opaque objects are drawn before transparent ones.

use std::collections::HashSet;

use log::{debug, trace};

use super::backend::{BackendResult, RenderBackend};
use super::state::StencilBufferState;
use crate::foundation::math::Mat4;
use crate::scene::{Color, NodeId, RenderFlags};

/// One drawable entry of the display list
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayObject {
    /// Geometry node this object was compiled from
    pub node: NodeId,
    /// Geometry core id, e.g. `"box"`
    pub geometry: String,
    /// Accumulated model matrix
    pub world: Mat4,
    /// Material color in effect
    pub color: Color,
    /// Material alpha in effect
    pub alpha: f32,
    /// Render flags in effect
    pub flags: RenderFlags,
    /// Stencil state in effect
    pub stencil: StencilBufferState,
}

impl DisplayObject {
    /// Whether the object is drawn in the transparent bin
    pub fn is_transparent(&self) -> bool {
        self.flags.contains(RenderFlags::TRANSPARENT)
    }
}

/// Statistics for one [`Display::render`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Number of draw calls issued
    pub draw_calls: usize,
    /// Number of times stencil state was (re)applied
    pub state_changes: usize,
    /// Number of stencil clears issued
    pub stencil_clears: usize,
    /// True when rendering was skipped because nothing changed
    pub skipped: bool,
}

/// The display surface written by compilation and read by rendering
#[derive(Debug, Default)]
pub struct Display {
    stencil_buffer: Option<StencilBufferState>,
    image_dirty: bool,
    list_stale: bool,
    objects: Vec<DisplayObject>,
}

impl Display {
    /// Create an empty display
    pub fn new() -> Self {
        Self::default()
    }

    /// Active stencil state, `None` before the first compilation pass
    pub const fn stencil_buffer(&self) -> Option<StencilBufferState> {
        self.stencil_buffer
    }

    pub(crate) fn set_stencil_buffer(&mut self, state: StencilBufferState) {
        self.stencil_buffer = Some(state);
    }

    /// Whether the image needs to be redrawn
    pub const fn image_dirty(&self) -> bool {
        self.image_dirty
    }

    /// Request a redraw on the next [`render`](Self::render)
    pub fn mark_dirty(&mut self) {
        self.image_dirty = true;
    }

    /// Whether the display list predates a graph or state change
    ///
    /// Set together with `image_dirty` by node insertion and removal, state
    /// setters and context binding; cleared when a compilation pass finishes.
    pub const fn needs_compile(&self) -> bool {
        self.list_stale
    }

    pub(crate) fn mark_stale(&mut self) {
        self.list_stale = true;
        self.image_dirty = true;
    }

    /// The compiled display list in draw order
    pub fn objects(&self) -> &[DisplayObject] {
        &self.objects
    }

    /// Number of opaque objects in the display list
    pub fn opaque_count(&self) -> usize {
        self.objects.iter().filter(|o| !o.is_transparent()).count()
    }

    /// Number of transparent objects in the display list
    pub fn transparent_count(&self) -> usize {
        self.objects.iter().filter(|o| o.is_transparent()).count()
    }

    pub(crate) fn begin_pass(&mut self) {
        self.objects.clear();
    }

    pub(crate) fn push_object(&mut self, object: DisplayObject) {
        self.objects.push(object);
    }

    /// Order the list for drawing and flag it for redraw
    ///
    /// The sort only bins by transparency. A transparent object that writes
    /// the stencil buffer is therefore drawn after the opaque objects of
    /// every scope, including readers it was meant to mask; stencil writers
    /// should stay opaque.
    pub(crate) fn finish_pass(&mut self) {
        // Stable: preserves graph order within each bin
        self.objects.sort_by_key(DisplayObject::is_transparent);
        self.list_stale = false;
        self.image_dirty = true;
    }

    /// Issue the display list to a backend
    ///
    /// The list is replayed as compiled; [`Scene::render`](crate::scene::Scene::render)
    /// recompiles first when [`needs_compile`](Self::needs_compile) is set.
    ///
    /// Stencil state is applied only when it differs from the previous
    /// object's state, and a state with `clear` set clears the stencil
    /// buffer the first time it is applied in a frame. Nothing is issued
    /// when the image is clean unless `force` is set.
    ///
    /// # Errors
    ///
    /// Propagates the first backend error; the image stays dirty.
    pub fn render(&mut self, backend: &mut dyn RenderBackend, force: bool) -> BackendResult<RenderStats> {
        if !self.image_dirty && !force {
            trace!("Display clean, skipping render");
            return Ok(RenderStats { skipped: true, ..RenderStats::default() });
        }

        let mut stats = RenderStats::default();
        let mut current: Option<u32> = None;
        let mut cleared = HashSet::new();

        for object in &self.objects {
            let state = &object.stencil;
            if current != Some(state.state_id) {
                backend.set_stencil_test(state.enabled)?;
                if state.enabled {
                    if state.clear && cleared.insert(state.state_id) {
                        backend.clear_stencil(state.clear_value)?;
                        stats.stencil_clears += 1;
                    }
                    backend.stencil_func(state.func, state.reference, state.mask)?;
                    backend.stencil_op(state.sfail, state.dpfail, state.dppass)?;
                }
                current = Some(state.state_id);
                stats.state_changes += 1;
            }
            backend.draw(object)?;
            stats.draw_calls += 1;
        }

        self.image_dirty = false;
        debug!(
            "Rendered {} objects with {} stencil state changes",
            stats.draw_calls, stats.state_changes
        );
        Ok(stats)
    }
}
