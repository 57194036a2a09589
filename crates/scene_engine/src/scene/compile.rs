//! Single-pass scene compilation
//!
//! Ambient render state travels down the walk on the [`CompileContext`]
//! stacks. Each state node pushes before compiling its children and pops
//! after, so a node's children see it while its siblings see the parent's
//! state again.

use log::trace;

use super::core_stack::CoreStack;
use super::cores::{CoreKey, CoreRegistry};
use super::graph::SceneGraph;
use super::node::{Color, NodeId, NodeKind, RenderFlags};
use super::stencil::StencilCore;
use super::SceneError;
use crate::foundation::math::{rotation, scaling, translation, Mat4};
use crate::render::{Display, DisplayObject, GraphicsContext, StencilBufferState};

/// Material in effect for geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialState {
    /// Base color
    pub color: Color,
    /// Opacity
    pub alpha: f32,
}

impl Default for MaterialState {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            alpha: 1.0,
        }
    }
}

/// Per-pass stacks of ambient state
#[derive(Debug, Clone)]
pub struct CompileContext {
    /// Active stencil-buffer state
    pub stencil: CoreStack<StencilBufferState>,
    /// Accumulated model matrix
    pub transform: CoreStack<Mat4>,
    /// Active material
    pub material: CoreStack<MaterialState>,
    /// Active render flags
    pub flags: CoreStack<RenderFlags>,
}

impl CompileContext {
    /// Fresh stacks falling back to `default_stencil` and identity state
    pub fn new(default_stencil: StencilBufferState) -> Self {
        Self {
            stencil: CoreStack::new(default_stencil),
            transform: CoreStack::new(Mat4::identity()),
            material: CoreStack::new(MaterialState::default()),
            flags: CoreStack::new(RenderFlags::default()),
        }
    }

    /// True when every stack is back at its default
    pub fn is_balanced(&self) -> bool {
        self.stencil.is_empty() && self.transform.is_empty() && self.material.is_empty() && self.flags.is_empty()
    }
}

/// Statistics for one compilation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileStats {
    /// Pass number, starting at 1
    pub pass: u64,
    /// Nodes visited, root included
    pub nodes_visited: usize,
    /// Objects written to the display list
    pub objects: usize,
    /// Geometry nodes skipped because drawing was disabled
    pub disabled: usize,
    /// Stencil nodes compiled
    pub stencil_nodes: usize,
    /// Deepest stencil nesting seen
    pub max_stencil_depth: usize,
}

pub(crate) struct Compiler<'a> {
    graph: &'a SceneGraph,
    stencil_cores: &'a mut CoreRegistry<StencilCore>,
    context: &'a dyn GraphicsContext,
    display: &'a mut Display,
    stats: CompileStats,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(
        graph: &'a SceneGraph,
        stencil_cores: &'a mut CoreRegistry<StencilCore>,
        context: &'a dyn GraphicsContext,
        display: &'a mut Display,
        pass: u64,
    ) -> Self {
        Self {
            graph,
            stencil_cores,
            context,
            display,
            stats: CompileStats {
                pass,
                ..CompileStats::default()
            },
        }
    }

    pub(crate) fn run(mut self, ctx: &mut CompileContext) -> Result<CompileStats, SceneError> {
        self.display.begin_pass();
        self.display.set_stencil_buffer(*ctx.stencil.top());

        let root = self.graph.root();
        self.compile_node(ctx, root)?;

        debug_assert!(ctx.is_balanced());
        self.display.finish_pass();
        Ok(self.stats)
    }

    fn compile_children(&mut self, ctx: &mut CompileContext, id: NodeId) -> Result<(), SceneError> {
        let graph = self.graph;
        for &child in graph.children(id) {
            self.compile_node(ctx, child)?;
        }
        Ok(())
    }

    fn compile_node(&mut self, ctx: &mut CompileContext, id: NodeId) -> Result<(), SceneError> {
        let graph = self.graph;
        let node = graph.try_node(id)?;
        self.stats.nodes_visited += 1;

        match &node.kind {
            NodeKind::Group => self.compile_children(ctx, id),
            NodeKind::Translate(offset) => self.compile_transformed(ctx, id, translation(offset)),
            NodeKind::Rotate { axis, angle } => self.compile_transformed(ctx, id, rotation(axis, *angle)),
            NodeKind::Scale(factors) => self.compile_transformed(ctx, id, scaling(factors)),
            NodeKind::Flags(flags) => {
                ctx.flags.push(flags.apply(*ctx.flags.top()));
                self.compile_children(ctx, id)?;
                ctx.flags.pop();
                Ok(())
            }
            NodeKind::Material { color, alpha } => {
                ctx.material.push(MaterialState {
                    color: *color,
                    alpha: alpha.clamp(0.0, 1.0),
                });
                self.compile_children(ctx, id)?;
                ctx.material.pop();
                Ok(())
            }
            NodeKind::Geometry { core_id } => {
                self.emit(ctx, id, core_id);
                self.compile_children(ctx, id)
            }
            NodeKind::StencilBuffer(key) => self.compile_stencil(ctx, id, *key),
        }
    }

    fn compile_transformed(&mut self, ctx: &mut CompileContext, id: NodeId, local: Mat4) -> Result<(), SceneError> {
        ctx.transform.push(ctx.transform.top() * local);
        self.compile_children(ctx, id)?;
        ctx.transform.pop();
        Ok(())
    }

    fn compile_stencil(&mut self, ctx: &mut CompileContext, id: NodeId, key: CoreKey) -> Result<(), SceneError> {
        let core = self.stencil_cores.get_mut(key).ok_or(SceneError::MissingCore(id))?;
        let state = core.resolve(self.context)?;

        ctx.stencil.push(state);
        self.display.set_stencil_buffer(state);
        self.stats.stencil_nodes += 1;
        self.stats.max_stencil_depth = self.stats.max_stencil_depth.max(ctx.stencil.depth());
        trace!("Push stencil state {} at depth {}", state.state_id, ctx.stencil.depth());

        self.compile_children(ctx, id)?;

        ctx.stencil.pop();
        self.display.set_stencil_buffer(*ctx.stencil.top());
        trace!("Pop stencil state {}, active {}", state.state_id, ctx.stencil.top().state_id);
        Ok(())
    }

    fn emit(&mut self, ctx: &CompileContext, id: NodeId, core_id: &str) {
        let flags = *ctx.flags.top();
        if !flags.contains(RenderFlags::ENABLED) {
            self.stats.disabled += 1;
            return;
        }

        let material = ctx.material.top();
        self.display.push_object(DisplayObject {
            node: id,
            geometry: core_id.to_string(),
            world: *ctx.transform.top(),
            color: material.color,
            alpha: material.alpha,
            flags,
            stencil: *ctx.stencil.top(),
        });
        self.stats.objects += 1;
    }
}
