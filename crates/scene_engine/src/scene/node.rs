//! Node types

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::cores::CoreKey;
use crate::foundation::math::Vec3;

slotmap::new_key_type! {
    /// Stable handle to a node in a [`SceneGraph`](super::SceneGraph)
    pub struct NodeId;
}

bitflags! {
    /// Per-subtree render flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderFlags: u32 {
        /// Geometry in scope is drawn
        const ENABLED = 1;
        /// Geometry in scope goes to the transparent bin
        const TRANSPARENT = 1 << 1;
        /// Geometry in scope takes part in picking
        const PICKING = 1 << 2;
        /// Back faces are drawn
        const BACKFACES = 1 << 3;
    }
}

impl Default for RenderFlags {
    fn default() -> Self {
        Self::ENABLED | Self::PICKING | Self::BACKFACES
    }
}

/// Flags a `flags` node sets or clears relative to its parent scope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagsOverride {
    /// Flags forced on
    pub set: RenderFlags,
    /// Flags forced off
    pub unset: RenderFlags,
}

impl FlagsOverride {
    /// Override that only marks the subtree transparent
    pub const fn transparent() -> Self {
        Self {
            set: RenderFlags::TRANSPARENT,
            unset: RenderFlags::empty(),
        }
    }

    /// Override that disables drawing of the subtree
    pub const fn disabled() -> Self {
        Self {
            set: RenderFlags::empty(),
            unset: RenderFlags::ENABLED,
        }
    }

    /// Apply this override on top of the parent's flags
    #[must_use]
    pub fn apply(self, parent: RenderFlags) -> RenderFlags {
        (parent | self.set) - self.unset
    }
}

/// RGB color with components in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
}

impl Color {
    /// Opaque white
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    /// Create a color
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// What a node does when compiled
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Plain grouping node
    Group,
    /// Translation of the subtree
    Translate(Vec3),
    /// Rotation of `angle` degrees about `axis`
    Rotate {
        /// Rotation axis, need not be normalized
        axis: Vec3,
        /// Angle in degrees
        angle: f32,
    },
    /// Non-uniform scale of the subtree
    Scale(Vec3),
    /// Render flag override for the subtree
    Flags(FlagsOverride),
    /// Material for geometry in the subtree
    Material {
        /// Base color
        color: Color,
        /// Opacity in `[0, 1]`
        alpha: f32,
    },
    /// Reference to a shared geometry core
    Geometry {
        /// Geometry core id, e.g. `"box"`
        core_id: String,
    },
    /// Stencil-buffer state for the subtree
    StencilBuffer(CoreKey),
}

impl NodeKind {
    /// Type name used in diagnostics and events
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Group => "node",
            Self::Translate(_) => "translate",
            Self::Rotate { .. } => "rotate",
            Self::Scale(_) => "scale",
            Self::Flags(_) => "flags",
            Self::Material { .. } => "material",
            Self::Geometry { .. } => "geometry",
            Self::StencilBuffer(_) => "stencilBuffer",
        }
    }

    /// Geometry reference to core `core_id`
    pub fn geometry(core_id: impl Into<String>) -> Self {
        Self::Geometry { core_id: core_id.into() }
    }
}

/// A node in the scene graph
#[derive(Debug, Clone)]
pub struct Node {
    /// What the node does
    pub kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) const fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
        }
    }

    /// Parent node, `None` for the root
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in compile order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override() {
        let parent = RenderFlags::default();
        let flags = FlagsOverride::transparent().apply(parent);
        assert!(flags.contains(RenderFlags::TRANSPARENT | RenderFlags::ENABLED));

        let disabled = FlagsOverride::disabled().apply(flags);
        assert!(!disabled.contains(RenderFlags::ENABLED));
        assert!(disabled.contains(RenderFlags::TRANSPARENT));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(NodeKind::geometry("box").type_name(), "geometry");
        assert_eq!(NodeKind::Group.type_name(), "node");
    }
}
