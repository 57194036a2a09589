//! Resolved render state recorded on the display

/// Stencil-buffer state with backend enum values resolved
///
/// This is what the display records as its active stencil state and what
/// every display object snapshots at compile time. `state_id` identifies the
/// core the state came from so the renderer can skip redundant state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilBufferState {
    /// Identifier of the originating core (0 for the default state)
    pub state_id: u32,
    /// Whether the stencil test is enabled
    pub enabled: bool,
    /// Whether the stencil buffer is cleared before drawing with this state
    pub clear: bool,
    /// Value the stencil buffer is cleared to
    pub clear_value: i32,
    /// Resolved comparison function
    pub func: u32,
    /// Reference value for the comparison
    pub reference: i32,
    /// Mask ANDed with reference and stored value
    pub mask: u32,
    /// Resolved operation when the stencil test fails
    pub sfail: u32,
    /// Resolved operation when the stencil test passes and the depth test fails
    pub dpfail: u32,
    /// Resolved operation when both tests pass
    pub dppass: u32,
}
