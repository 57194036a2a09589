//! Scene error types

use thiserror::Error;

use super::stencil::StencilError;
use super::NodeId;

/// Errors raised by scene graph operations and compilation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// The node id does not refer to a live node
    #[error("Node {0:?} does not exist")]
    NodeNotFound(NodeId),

    /// The node exists but has a different type than the operation needs
    #[error("Node {node:?} is a '{actual}' node, expected '{expected}'")]
    WrongNodeType {
        /// Offending node
        node: NodeId,
        /// Type the operation expected
        expected: &'static str,
        /// Type the node actually has
        actual: &'static str,
    },

    /// Node kinds that own a core must be created through their constructor
    #[error("'{0}' nodes must be created with their dedicated constructor")]
    CoreNodeKind(&'static str),

    /// The root node cannot be removed
    #[error("The root node cannot be removed")]
    RemoveRoot,

    /// Compilation needs a bound graphics context
    #[error("No graphics context bound to the scene")]
    NoGraphicsContext,

    /// A node references a core that is no longer registered
    #[error("Node {0:?} references a released core")]
    MissingCore(NodeId),

    /// Stencil configuration or resolution failed
    #[error(transparent)]
    Stencil(#[from] StencilError),

    /// The render backend failed
    #[error(transparent)]
    Render(#[from] crate::render::RenderError),
}
