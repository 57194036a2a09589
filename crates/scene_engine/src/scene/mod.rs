//! Scene graph
//!
//! Declarative node trees compiled into the display list. Render-state nodes
//! such as the stencil buffer reference shared *cores*: state objects that
//! several nodes may point at through a common `core_id`.
//!
//! ## Compilation
//!
//! ```text
//! Scene::compile
//!      ↓  resolve default state, reset stacks
//! depth-first walk with CompileContext
//!      ↓  push/pop ambient state per node
//! Display (display list + active state)
//! ```

mod compile;
mod core_stack;
mod cores;
mod error;
mod graph;
mod manager;
mod node;
mod stencil;

pub use compile::{CompileContext, CompileStats, MaterialState};
pub use core_stack::CoreStack;
pub use cores::{CoreKey, CoreRegistry};
pub use error::SceneError;
pub use graph::SceneGraph;
pub use manager::Scene;
pub use node::{Color, FlagsOverride, Node, NodeId, NodeKind, RenderFlags};
pub use stencil::{
    StencilBufferNode, StencilBufferParams, StencilCore, StencilError, StencilFuncParams,
    StencilFuncState, StencilFunction, StencilOpParams, StencilOpState, StencilOperation,
};

#[cfg(test)]
mod tests;
