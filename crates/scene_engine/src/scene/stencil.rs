//! Stencil-buffer state node
//!
//! A `stencilBuffer` node configures the stencil test for its subtree. The
//! configuration is symbolic (`"always"`, `"keep"`, ...) and validated when it
//! is set; backend enum values are resolved against a [`GraphicsContext`] the
//! first time the core is compiled with one, and cached until the function or
//! operation changes.

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::NodeId;
use crate::render::{Display, GraphicsContext, StencilBufferState};

const SUPPORTED_FUNCTIONS: &str =
    "'never', 'less', 'equal', 'lequal', 'greater', 'notequal', 'gequal' and 'always'";
const SUPPORTED_OPERATIONS: &str =
    "'keep', 'zero', 'replace', 'incr', 'incr_wrap', 'decr', 'decr_wrap' and 'invert'";

/// Stencil configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StencilError {
    /// Unknown comparison function name
    #[error("unsupported value for 'stencilFunc' on stencilBuffer node: '{}' - supported values are {}", .0, SUPPORTED_FUNCTIONS)]
    UnsupportedFunction(String),

    /// Unknown stencil operation name
    #[error("unsupported value for 'stencilOp' on stencilBuffer node: '{}' - supported values are {}", .0, SUPPORTED_OPERATIONS)]
    UnsupportedOperation(String),

    /// The graphics context does not define a constant
    #[error("{backend} does not define constant '{name}'")]
    MissingConstant {
        /// Constant that was looked up
        name: &'static str,
        /// Backend that lacks it
        backend: String,
    },
}

/// Stencil comparison function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilFunction {
    /// Never passes
    Never,
    /// Passes if `(ref & mask) < (stencil & mask)`
    Less,
    /// Passes if `(ref & mask) == (stencil & mask)`
    Equal,
    /// Passes if `(ref & mask) <= (stencil & mask)`
    Lequal,
    /// Passes if `(ref & mask) > (stencil & mask)`
    Greater,
    /// Passes if `(ref & mask) != (stencil & mask)`
    Notequal,
    /// Passes if `(ref & mask) >= (stencil & mask)`
    Gequal,
    /// Always passes
    Always,
}

impl StencilFunction {
    /// Every comparison function
    pub const ALL: [Self; 8] = [
        Self::Never,
        Self::Less,
        Self::Equal,
        Self::Lequal,
        Self::Greater,
        Self::Notequal,
        Self::Gequal,
        Self::Always,
    ];

    /// Symbolic name used in node parameters
    pub const fn name(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Less => "less",
            Self::Equal => "equal",
            Self::Lequal => "lequal",
            Self::Greater => "greater",
            Self::Notequal => "notequal",
            Self::Gequal => "gequal",
            Self::Always => "always",
        }
    }

    /// Name of the backend constant
    pub const fn constant_name(self) -> &'static str {
        match self {
            Self::Never => "NEVER",
            Self::Less => "LESS",
            Self::Equal => "EQUAL",
            Self::Lequal => "LEQUAL",
            Self::Greater => "GREATER",
            Self::Notequal => "NOTEQUAL",
            Self::Gequal => "GEQUAL",
            Self::Always => "ALWAYS",
        }
    }
}

impl FromStr for StencilFunction {
    type Err = StencilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|func| func.name() == s)
            .ok_or_else(|| StencilError::UnsupportedFunction(s.to_string()))
    }
}

impl fmt::Display for StencilFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Action applied to the stored stencil value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOperation {
    /// Keep the current value
    Keep,
    /// Set the value to 0
    Zero,
    /// Set the value to the reference value
    Replace,
    /// Increment, clamping at the maximum
    Incr,
    /// Increment, wrapping to 0
    IncrWrap,
    /// Decrement, clamping at 0
    Decr,
    /// Decrement, wrapping to the maximum
    DecrWrap,
    /// Bitwise invert
    Invert,
}

impl StencilOperation {
    /// Every stencil operation
    pub const ALL: [Self; 8] = [
        Self::Keep,
        Self::Zero,
        Self::Replace,
        Self::Incr,
        Self::IncrWrap,
        Self::Decr,
        Self::DecrWrap,
        Self::Invert,
    ];

    /// Symbolic name used in node parameters
    pub const fn name(self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Zero => "zero",
            Self::Replace => "replace",
            Self::Incr => "incr",
            Self::IncrWrap => "incr_wrap",
            Self::Decr => "decr",
            Self::DecrWrap => "decr_wrap",
            Self::Invert => "invert",
        }
    }

    /// Name of the backend constant
    pub const fn constant_name(self) -> &'static str {
        match self {
            Self::Keep => "KEEP",
            Self::Zero => "ZERO",
            Self::Replace => "REPLACE",
            Self::Incr => "INCR",
            Self::IncrWrap => "INCR_WRAP",
            Self::Decr => "DECR",
            Self::DecrWrap => "DECR_WRAP",
            Self::Invert => "INVERT",
        }
    }
}

impl FromStr for StencilOperation {
    type Err = StencilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| StencilError::UnsupportedOperation(s.to_string()))
    }
}

impl fmt::Display for StencilOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validated comparison function configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilFuncState {
    /// Comparison function
    pub func: StencilFunction,
    /// Reference value
    pub reference: i32,
    /// Comparison mask
    pub mask: u32,
}

impl StencilFuncState {
    /// Reference value used when none is given
    pub const DEFAULT_REFERENCE: i32 = 1;
    /// Mask used when none is given
    pub const DEFAULT_MASK: u32 = 0xff;
}

impl Default for StencilFuncState {
    fn default() -> Self {
        Self {
            func: StencilFunction::Always,
            reference: Self::DEFAULT_REFERENCE,
            mask: Self::DEFAULT_MASK,
        }
    }
}

/// Validated operation configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilOpState {
    /// Operation when the stencil test fails
    pub sfail: StencilOperation,
    /// Operation when the stencil test passes and the depth test fails
    pub dpfail: StencilOperation,
    /// Operation when both tests pass
    pub dppass: StencilOperation,
}

impl Default for StencilOpState {
    fn default() -> Self {
        Self {
            sfail: StencilOperation::Keep,
            dpfail: StencilOperation::Keep,
            dppass: StencilOperation::Keep,
        }
    }
}

/// Symbolic comparison function parameters, e.g. `{ func = "equal", ref = 1 }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StencilFuncParams {
    /// Function name such as `"always"`
    pub func: String,
    /// Reference value, defaults to 1
    #[serde(rename = "ref")]
    pub reference: Option<i32>,
    /// Comparison mask, defaults to `0xff`
    pub mask: Option<u32>,
}

impl StencilFuncParams {
    /// Parameters with explicit reference and mask
    pub fn new(func: impl Into<String>, reference: i32, mask: u32) -> Self {
        Self {
            func: func.into(),
            reference: Some(reference),
            mask: Some(mask),
        }
    }

    /// Parameters naming only the function
    pub fn named(func: impl Into<String>) -> Self {
        Self {
            func: func.into(),
            reference: None,
            mask: None,
        }
    }
}

impl TryFrom<&StencilFuncParams> for StencilFuncState {
    type Error = StencilError;

    fn try_from(params: &StencilFuncParams) -> Result<Self, Self::Error> {
        Ok(Self {
            func: params.func.parse()?,
            reference: params.reference.unwrap_or(Self::DEFAULT_REFERENCE),
            mask: params.mask.unwrap_or(Self::DEFAULT_MASK),
        })
    }
}

/// Symbolic operation parameters, e.g. `{ sfail = "keep", dpfail = "keep", dppass = "replace" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StencilOpParams {
    /// Operation name when the stencil test fails
    pub sfail: String,
    /// Operation name when the depth test fails
    pub dpfail: String,
    /// Operation name when both tests pass
    pub dppass: String,
}

impl StencilOpParams {
    /// Create operation parameters
    pub fn new(sfail: impl Into<String>, dpfail: impl Into<String>, dppass: impl Into<String>) -> Self {
        Self {
            sfail: sfail.into(),
            dpfail: dpfail.into(),
            dppass: dppass.into(),
        }
    }
}

impl TryFrom<&StencilOpParams> for StencilOpState {
    type Error = StencilError;

    fn try_from(params: &StencilOpParams) -> Result<Self, Self::Error> {
        Ok(Self {
            sfail: params.sfail.parse()?,
            dpfail: params.dpfail.parse()?,
            dppass: params.dppass.parse()?,
        })
    }
}

/// Parameters a `stencilBuffer` node is initialized from
///
/// Omitted fields keep the core's current value, except when the node
/// defines a new core: then they take the node defaults (enabled, cleared to
/// 1 before drawing, `always` with ref 1 and mask `0xff`, `keep` everywhere).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StencilBufferParams {
    /// Enable the stencil test
    pub enabled: Option<bool>,
    /// Clear the stencil buffer before drawing the subtree
    pub clear: Option<bool>,
    /// Clear value, clamped to `0..=1`
    pub clear_stencil: Option<i32>,
    /// Comparison function
    pub stencil_func: Option<StencilFuncParams>,
    /// Stencil operations
    pub stencil_op: Option<StencilOpParams>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResolvedEnums {
    func: u32,
    sfail: u32,
    dpfail: u32,
    dppass: u32,
}

/// Shared stencil-buffer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StencilCore {
    state_id: u32,
    enabled: bool,
    clear: bool,
    clear_stencil: i32,
    func: StencilFuncState,
    op: StencilOpState,
    resolved: Option<ResolvedEnums>,
}

impl StencilCore {
    /// State id of the scene's default core
    pub const DEFAULT_STATE_ID: u32 = 0;

    /// Create a core with the default stencil configuration: disabled, not
    /// cleared, clear value 0, `always` / `keep`
    pub fn new(state_id: u32) -> Self {
        Self {
            state_id,
            enabled: false,
            clear: false,
            clear_stencil: 0,
            func: StencilFuncState::default(),
            op: StencilOpState::default(),
            resolved: None,
        }
    }

    /// The scene-wide default core
    pub fn default_core() -> Self {
        Self::new(Self::DEFAULT_STATE_ID)
    }

    /// Identifier of this core's state
    pub const fn state_id(&self) -> u32 {
        self.state_id
    }

    /// Whether the stencil test is enabled
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the stencil buffer is cleared before drawing
    pub const fn clear(&self) -> bool {
        self.clear
    }

    /// Stencil clear value
    pub const fn clear_stencil(&self) -> i32 {
        self.clear_stencil
    }

    /// Comparison function configuration
    pub const fn stencil_func(&self) -> StencilFuncState {
        self.func
    }

    /// Operation configuration
    pub const fn stencil_op(&self) -> StencilOpState {
        self.op
    }

    /// Whether backend enum values are cached
    pub const fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// Returns true if the value changed
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        if self.enabled == enabled {
            return false;
        }
        self.enabled = enabled;
        true
    }

    /// Returns true if the value changed
    pub fn set_clear(&mut self, clear: bool) -> bool {
        if self.clear == clear {
            return false;
        }
        self.clear = clear;
        true
    }

    /// Set the clear value, clamped to `0..=1`. Returns true if it changed.
    pub fn set_clear_stencil(&mut self, value: i32) -> bool {
        let clamped = value.clamp(0, 1);
        if clamped != value {
            warn!("Stencil clear value {value} clamped to {clamped}");
        }
        if self.clear_stencil == clamped {
            return false;
        }
        self.clear_stencil = clamped;
        true
    }

    /// Set the comparison function. Returns true if it changed.
    pub fn set_stencil_func(&mut self, func: StencilFuncState) -> bool {
        if self.func == func {
            return false;
        }
        self.func = func;
        self.resolved = None;
        true
    }

    /// Set the stencil operations. Returns true if they changed.
    pub fn set_stencil_op(&mut self, op: StencilOpState) -> bool {
        if self.op == op {
            return false;
        }
        self.op = op;
        self.resolved = None;
        true
    }

    /// Apply initialization parameters
    ///
    /// All symbolic names are validated before anything is changed, so a
    /// failed call leaves the core untouched. Returns true if anything changed.
    ///
    /// # Errors
    ///
    /// Fails on unsupported function or operation names.
    pub fn apply_params(&mut self, params: &StencilBufferParams, defines_core: bool) -> Result<bool, StencilError> {
        let func = params
            .stencil_func
            .as_ref()
            .map(StencilFuncState::try_from)
            .transpose()?;
        let op = params
            .stencil_op
            .as_ref()
            .map(StencilOpState::try_from)
            .transpose()?;

        let mut changed = false;
        if let Some(enabled) = params.enabled.or(defines_core.then_some(true)) {
            changed |= self.set_enabled(enabled);
        }
        if let Some(value) = params.clear_stencil.or(defines_core.then_some(1)) {
            changed |= self.set_clear_stencil(value);
        }
        if let Some(func) = func.or_else(|| defines_core.then(StencilFuncState::default)) {
            changed |= self.set_stencil_func(func);
        }
        if let Some(op) = op.or_else(|| defines_core.then(StencilOpState::default)) {
            changed |= self.set_stencil_op(op);
        }
        if let Some(clear) = params.clear.or(defines_core.then_some(true)) {
            changed |= self.set_clear(clear);
        }
        Ok(changed)
    }

    /// Resolve against a graphics context
    ///
    /// Backend enum values are looked up on the first call after the
    /// function or operation changed and cached for later calls.
    ///
    /// # Errors
    ///
    /// Fails if the context lacks one of the needed constants.
    pub fn resolve(&mut self, context: &dyn GraphicsContext) -> Result<StencilBufferState, StencilError> {
        let enums = match self.resolved {
            Some(enums) => enums,
            None => {
                let enums = ResolvedEnums {
                    func: lookup(context, self.func.func.constant_name())?,
                    sfail: lookup(context, self.op.sfail.constant_name())?,
                    dpfail: lookup(context, self.op.dpfail.constant_name())?,
                    dppass: lookup(context, self.op.dppass.constant_name())?,
                };
                debug!(
                    "Resolved stencil state {} against {}: func={} op=({}, {}, {})",
                    self.state_id,
                    context.backend_name(),
                    self.func.func,
                    self.op.sfail,
                    self.op.dpfail,
                    self.op.dppass
                );
                self.resolved = Some(enums);
                enums
            }
        };

        Ok(StencilBufferState {
            state_id: self.state_id,
            enabled: self.enabled,
            clear: self.clear,
            clear_value: self.clear_stencil,
            func: enums.func,
            reference: self.func.reference,
            mask: self.func.mask,
            sfail: enums.sfail,
            dpfail: enums.dpfail,
            dppass: enums.dppass,
        })
    }

    /// Drop cached backend values, e.g. after a context change
    pub fn invalidate(&mut self) {
        self.resolved = None;
    }
}

fn lookup(context: &dyn GraphicsContext, name: &'static str) -> Result<u32, StencilError> {
    context.constant(name).ok_or_else(|| StencilError::MissingConstant {
        name,
        backend: context.backend_name().to_string(),
    })
}

/// Accessor/mutator view of one `stencilBuffer` node
///
/// Mutators write through to the node's (possibly shared) core and flag the
/// display for redraw when a value actually changes.
#[derive(Debug)]
pub struct StencilBufferNode<'a> {
    node: NodeId,
    use_count: usize,
    core: &'a mut StencilCore,
    display: &'a mut Display,
}

impl<'a> StencilBufferNode<'a> {
    pub(crate) fn new(node: NodeId, use_count: usize, core: &'a mut StencilCore, display: &'a mut Display) -> Self {
        Self {
            node,
            use_count,
            core,
            display,
        }
    }

    fn touch(&mut self, changed: bool) -> &mut Self {
        if changed {
            self.display.mark_stale();
        }
        self
    }

    /// Node id
    pub const fn id(&self) -> NodeId {
        self.node
    }

    /// Number of nodes sharing this node's core
    pub const fn use_count(&self) -> usize {
        self.use_count
    }

    /// The underlying core
    pub fn core(&self) -> &StencilCore {
        &*self.core
    }

    /// Enable or disable the stencil test
    pub fn set_enabled(&mut self, enabled: bool) -> &mut Self {
        let changed = self.core.set_enabled(enabled);
        self.touch(changed)
    }

    /// Whether the stencil test is enabled
    pub fn enabled(&self) -> bool {
        self.core.enabled()
    }

    /// Clear the stencil buffer before drawing the subtree
    pub fn set_clear(&mut self, clear: bool) -> &mut Self {
        let changed = self.core.set_clear(clear);
        self.touch(changed)
    }

    /// Whether the stencil buffer is cleared before drawing
    pub fn clear(&self) -> bool {
        self.core.clear()
    }

    /// Set the clear value, clamped to `0..=1`
    pub fn set_clear_stencil(&mut self, value: i32) -> &mut Self {
        let changed = self.core.set_clear_stencil(value);
        self.touch(changed)
    }

    /// Stencil clear value
    pub fn clear_stencil(&self) -> i32 {
        self.core.clear_stencil()
    }

    /// Set the comparison function
    ///
    /// # Errors
    ///
    /// Fails with the offending name if the function is unsupported.
    pub fn set_stencil_func(&mut self, params: &StencilFuncParams) -> Result<&mut Self, StencilError> {
        let func = StencilFuncState::try_from(params)?;
        let changed = self.core.set_stencil_func(func);
        Ok(self.touch(changed))
    }

    /// Comparison function configuration
    pub fn stencil_func(&self) -> StencilFuncState {
        self.core.stencil_func()
    }

    /// Set the stencil operations
    ///
    /// # Errors
    ///
    /// Fails with the offending name if an operation is unsupported.
    pub fn set_stencil_op(&mut self, params: &StencilOpParams) -> Result<&mut Self, StencilError> {
        let op = StencilOpState::try_from(params)?;
        let changed = self.core.set_stencil_op(op);
        Ok(self.touch(changed))
    }

    /// Operation configuration
    pub fn stencil_op(&self) -> StencilOpState {
        self.core.stencil_op()
    }
}
