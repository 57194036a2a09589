//! Scene host
//!
//! Owns the node graph, the shared cores, the display and the graphics
//! context, and drives compilation and rendering.

use log::{debug, info};

use super::compile::{CompileContext, CompileStats, Compiler};
use super::cores::CoreRegistry;
use super::graph::SceneGraph;
use super::node::{NodeId, NodeKind};
use super::stencil::{StencilBufferNode, StencilBufferParams, StencilCore};
use super::SceneError;
use crate::events::{Event, EventArg, EventHandler, EventSystem, SceneEventType};
use crate::render::{Display, GraphicsContext, RenderBackend, RenderStats, StencilBufferState};

/// A scene: graph, state cores, display and the bound graphics context
///
/// Construction and configuration never need a graphics context; symbolic
/// state is validated up front and resolved to backend values when
/// [`compile`](Self::compile) runs with a context bound.
pub struct Scene {
    graph: SceneGraph,
    stencil_cores: CoreRegistry<StencilCore>,
    default_stencil: StencilCore,
    display: Display,
    context: Option<Box<dyn GraphicsContext>>,
    events: EventSystem,
    next_state_id: u32,
    passes: u64,
}

impl Scene {
    /// Create an empty scene without a graphics context
    pub fn new() -> Self {
        Self {
            graph: SceneGraph::new(),
            stencil_cores: CoreRegistry::new(),
            default_stencil: StencilCore::default_core(),
            display: Display::new(),
            context: None,
            events: EventSystem::new(),
            next_state_id: StencilCore::DEFAULT_STATE_ID + 1,
            passes: 0,
        }
    }

    /// Create an empty scene bound to `context`
    pub fn with_context(context: Box<dyn GraphicsContext>) -> Self {
        let mut scene = Self::new();
        scene.bind_context(context);
        scene
    }

    /// Bind (or replace) the graphics context
    ///
    /// Cached backend values belong to the previous context and are dropped.
    pub fn bind_context(&mut self, context: Box<dyn GraphicsContext>) {
        info!("Binding graphics context '{}'", context.backend_name());
        self.default_stencil.invalidate();
        for core in self.stencil_cores.iter_mut() {
            core.invalidate();
        }
        self.context = Some(context);
        self.display.mark_stale();
    }

    /// Whether a graphics context is bound
    pub const fn has_context(&self) -> bool {
        self.context.is_some()
    }

    /// The node graph
    pub const fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// The root node
    pub const fn root(&self) -> NodeId {
        self.graph.root()
    }

    /// The display
    pub const fn display(&self) -> &Display {
        &self.display
    }

    /// Shared stencil cores
    pub const fn stencil_cores(&self) -> &CoreRegistry<StencilCore> {
        &self.stencil_cores
    }

    /// Number of completed compilation passes
    pub const fn passes(&self) -> u64 {
        self.passes
    }

    /// Register a handler for scene events
    pub fn register_handler(&mut self, event_type: SceneEventType, handler: Box<dyn EventHandler>) {
        self.events.register_handler(event_type, handler);
    }

    /// Deliver queued node events now instead of at the next compile
    pub fn dispatch_events(&mut self) {
        self.events.dispatch();
    }

    /// Append a node under `parent`
    ///
    /// # Errors
    ///
    /// Fails if `parent` does not exist, or for stencil-buffer kinds, which
    /// must go through [`add_stencil_buffer`](Self::add_stencil_buffer).
    pub fn add_node(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, SceneError> {
        if let NodeKind::StencilBuffer(_) = kind {
            return Err(SceneError::CoreNodeKind(kind.type_name()));
        }
        let type_name = kind.type_name();
        let id = self.graph.add_node(parent, kind)?;
        self.node_created(id, type_name);
        Ok(id)
    }

    /// Append a `stencilBuffer` node under `parent`
    ///
    /// Nodes passing the same `core_id` share one core. The node that creates
    /// a core fills omitted parameters with node defaults; later nodes only
    /// apply the parameters they specify.
    ///
    /// # Errors
    ///
    /// Fails if `parent` does not exist or a parameter names an unsupported
    /// function or operation. Nothing is inserted on failure.
    pub fn add_stencil_buffer(
        &mut self,
        parent: NodeId,
        core_id: Option<&str>,
        params: &StencilBufferParams,
    ) -> Result<NodeId, SceneError> {
        self.graph.try_node(parent)?;

        let state_id = self.next_state_id;
        let (key, created) = self.stencil_cores.acquire(core_id, || StencilCore::new(state_id));
        if created {
            self.next_state_id += 1;
        }

        let applied = self
            .stencil_cores
            .get_mut(key)
            .ok_or(SceneError::MissingCore(parent))
            .and_then(|core| core.apply_params(params, created).map_err(SceneError::from));
        let changed = match applied {
            Ok(changed) => changed,
            Err(err) => {
                self.stencil_cores.release(key);
                return Err(err);
            }
        };

        let id = match self.graph.add_node(parent, NodeKind::StencilBuffer(key)) {
            Ok(id) => id,
            Err(err) => {
                self.stencil_cores.release(key);
                return Err(err);
            }
        };
        if changed {
            self.display.mark_stale();
        }
        debug!(
            "Added stencilBuffer node {:?} (core {:?}, use count {})",
            id,
            core_id,
            self.stencil_cores.use_count(key)
        );
        self.node_created(id, "stencilBuffer");
        Ok(id)
    }

    /// Accessor/mutator view of a `stencilBuffer` node
    ///
    /// # Errors
    ///
    /// Fails if the node does not exist or is not a stencil-buffer node.
    pub fn stencil_buffer(&mut self, id: NodeId) -> Result<StencilBufferNode<'_>, SceneError> {
        let node = self.graph.try_node(id)?;
        let NodeKind::StencilBuffer(key) = node.kind else {
            return Err(SceneError::WrongNodeType {
                node: id,
                expected: "stencilBuffer",
                actual: node.kind.type_name(),
            });
        };
        let use_count = self.stencil_cores.use_count(key);
        let core = self.stencil_cores.get_mut(key).ok_or(SceneError::MissingCore(id))?;
        Ok(StencilBufferNode::new(id, use_count, core, &mut self.display))
    }

    /// Remove a node and its subtree, releasing the cores they held
    ///
    /// Returns the number of nodes removed.
    ///
    /// # Errors
    ///
    /// Fails for the root node and for ids that do not exist.
    pub fn remove_node(&mut self, id: NodeId) -> Result<usize, SceneError> {
        let removed = self.graph.remove_subtree(id)?;
        for (removed_id, node) in &removed {
            if let NodeKind::StencilBuffer(key) = node.kind {
                self.stencil_cores.release(key);
            }
            self.events.send(
                Event::new(SceneEventType::NodeDestroyed, self.passes)
                    .with_arg("node", EventArg::Node(*removed_id))
                    .with_arg("node_type", EventArg::NodeType(node.kind.type_name())),
            );
        }
        self.display.mark_stale();
        Ok(removed.len())
    }

    /// The default stencil state resolved against the bound context
    ///
    /// # Errors
    ///
    /// Fails without a context or if the context lacks a needed constant.
    pub fn default_stencil_state(&mut self) -> Result<StencilBufferState, SceneError> {
        let context = self.context.as_deref().ok_or(SceneError::NoGraphicsContext)?;
        Ok(self.default_stencil.resolve(context)?)
    }

    /// Run one compilation pass, rebuilding the display list
    ///
    /// The default stencil state is resolved (once per context) and installed
    /// on the display, the stacks start empty, and every state node pushes
    /// and pops around its subtree. After the pass the display's active
    /// stencil state is the default again.
    ///
    /// # Errors
    ///
    /// Fails without a bound context or when state cannot be resolved. The
    /// display is left with the default stencil state.
    pub fn compile(&mut self) -> Result<CompileStats, SceneError> {
        let context = self.context.as_deref().ok_or(SceneError::NoGraphicsContext)?;
        let default = self.default_stencil.resolve(context)?;

        let pass = self.passes + 1;
        self.events.send(
            Event::new(SceneEventType::SceneCompiling, pass)
                .with_arg("nodes", EventArg::NodeCount(self.graph.node_count())),
        );
        self.events.dispatch();

        let mut ctx = CompileContext::new(default);
        let result = Compiler::new(&self.graph, &mut self.stencil_cores, context, &mut self.display, pass).run(&mut ctx);
        let stats = match result {
            Ok(stats) => stats,
            Err(err) => {
                self.display.set_stencil_buffer(default);
                return Err(err);
            }
        };
        self.passes = pass;

        debug!(
            "Compiled pass {}: {} nodes, {} objects, {} stencil nodes (max depth {})",
            stats.pass, stats.nodes_visited, stats.objects, stats.stencil_nodes, stats.max_stencil_depth
        );
        self.events.send(
            Event::new(SceneEventType::SceneCompiled, pass)
                .with_arg("objects", EventArg::ObjectCount(stats.objects))
                .with_arg("nodes", EventArg::NodeCount(stats.nodes_visited)),
        );
        self.events.dispatch();
        Ok(stats)
    }

    /// Issue the display list to `backend`
    ///
    /// A display list made stale by node or state changes is recompiled
    /// first. Skipped when the display is clean unless `force` is set.
    ///
    /// # Errors
    ///
    /// Propagates compile errors and backend failures.
    pub fn render(&mut self, backend: &mut dyn RenderBackend, force: bool) -> Result<RenderStats, SceneError> {
        if self.display.needs_compile() {
            debug!("Display list is stale, recompiling before render");
            self.compile()?;
        }
        Ok(self.display.render(backend, force)?)
    }

    fn node_created(&mut self, id: NodeId, type_name: &'static str) {
        self.display.mark_stale();
        self.events.send(
            Event::new(SceneEventType::NodeCreated, self.passes)
                .with_arg("node", EventArg::Node(id))
                .with_arg("node_type", EventArg::NodeType(type_name)),
        );
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("nodes", &self.graph.node_count())
            .field("stencil_cores", &self.stencil_cores.len())
            .field("context", &self.context.as_ref().map(|c| c.backend_name().to_string()))
            .field("passes", &self.passes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{BackendCall, RecordingBackend, WebGlConstants};
    use crate::scene::stencil::{StencilFuncParams, StencilFunction, StencilOpParams};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn scene() -> Scene {
        Scene::with_context(Box::new(WebGlConstants::new()))
    }

    #[test]
    fn test_compile_requires_context() {
        let mut scene = Scene::new();
        assert_eq!(scene.compile(), Err(SceneError::NoGraphicsContext));

        scene.bind_context(Box::new(WebGlConstants::new()));
        assert!(scene.compile().is_ok());
        assert_eq!(scene.passes(), 1);
    }

    #[test]
    fn test_stencil_node_defaults() {
        let mut scene = scene();
        let root = scene.root();
        let id = scene.add_stencil_buffer(root, None, &StencilBufferParams::default()).unwrap();

        let node = scene.stencil_buffer(id).unwrap();
        assert!(node.enabled());
        assert!(node.clear());
        assert_eq!(node.clear_stencil(), 1);
        assert_eq!(node.stencil_func().func, StencilFunction::Always);
        assert_eq!(node.use_count(), 1);
    }

    #[test]
    fn test_shared_core_between_nodes() {
        let mut scene = scene();
        let root = scene.root();
        let params = StencilBufferParams {
            stencil_func: Some(StencilFuncParams::new("equal", 1, 0xff)),
            ..StencilBufferParams::default()
        };
        let a = scene.add_stencil_buffer(root, Some("mask"), &params).unwrap();
        let b = scene.add_stencil_buffer(root, Some("mask"), &StencilBufferParams::default()).unwrap();
        assert_eq!(scene.stencil_cores().len(), 1);

        scene.stencil_buffer(b).unwrap().set_enabled(false);
        let node = scene.stencil_buffer(a).unwrap();
        assert!(!node.enabled());
        assert_eq!(node.stencil_func().func, StencilFunction::Equal);
        assert_eq!(node.use_count(), 2);

        scene.remove_node(a).unwrap();
        assert_eq!(scene.stencil_cores().len(), 1);
        scene.remove_node(b).unwrap();
        assert!(scene.stencil_cores().is_empty());
    }

    #[test]
    fn test_invalid_params_insert_nothing() {
        let mut scene = scene();
        let root = scene.root();
        let params = StencilBufferParams {
            stencil_op: Some(StencilOpParams::new("keep", "melt", "keep")),
            ..StencilBufferParams::default()
        };
        let err = scene.add_stencil_buffer(root, Some("bad"), &params).unwrap_err();
        assert!(err.to_string().contains("'melt'"));
        assert_eq!(scene.graph().node_count(), 1);
        assert!(scene.stencil_cores().is_empty());
    }

    #[test]
    fn test_stencil_accessor_rejects_other_nodes() {
        let mut scene = scene();
        let root = scene.root();
        let group = scene.add_node(root, NodeKind::Group).unwrap();
        assert_eq!(
            scene.stencil_buffer(group).unwrap_err(),
            SceneError::WrongNodeType {
                node: group,
                expected: "stencilBuffer",
                actual: "node"
            }
        );
    }

    #[test]
    fn test_identical_configuration_does_not_dirty() {
        let mut scene = scene();
        let root = scene.root();
        let id = scene.add_stencil_buffer(root, None, &StencilBufferParams::default()).unwrap();
        scene.compile().unwrap();
        scene.render(&mut RecordingBackend::new(), false).unwrap();
        assert!(!scene.display().image_dirty());

        scene
            .stencil_buffer(id)
            .unwrap()
            .set_stencil_func(&StencilFuncParams::new("always", 1, 0xff))
            .unwrap()
            .set_enabled(true)
            .set_clear_stencil(1);
        assert!(!scene.display().image_dirty());

        scene.stencil_buffer(id).unwrap().set_clear(false);
        assert!(scene.display().image_dirty());
    }

    #[test]
    fn test_rebinding_context_re_resolves() {
        let mut scene = scene();
        let root = scene.root();
        let id = scene.add_stencil_buffer(root, None, &StencilBufferParams::default()).unwrap();
        scene.compile().unwrap();
        assert!(scene.stencil_buffer(id).unwrap().core().is_resolved());

        scene.bind_context(Box::new(WebGlConstants::new().without("KEEP")));
        assert!(!scene.stencil_buffer(id).unwrap().core().is_resolved());
        assert!(matches!(scene.compile(), Err(SceneError::Stencil(_))));
    }

    #[test]
    fn test_failed_pass_restores_default_state() {
        let mut scene = Scene::with_context(Box::new(WebGlConstants::new().without("EQUAL")));
        let root = scene.root();
        let params = StencilBufferParams {
            stencil_func: Some(StencilFuncParams::named("equal")),
            ..StencilBufferParams::default()
        };
        scene.add_stencil_buffer(root, None, &params).unwrap();

        assert!(scene.compile().is_err());
        assert_eq!(scene.display().stencil_buffer().map(|s| s.state_id), Some(0));
        assert_eq!(scene.passes(), 0);
    }

    #[test]
    fn test_render_applies_state_per_change() {
        let mut scene = scene();
        let root = scene.root();
        let params = StencilBufferParams {
            stencil_func: Some(StencilFuncParams::new("equal", 1, 0xff)),
            ..StencilBufferParams::default()
        };
        let mask = scene.add_stencil_buffer(root, None, &params).unwrap();
        scene.add_node(mask, NodeKind::geometry("a")).unwrap();
        scene.add_node(mask, NodeKind::geometry("b")).unwrap();
        scene.add_node(root, NodeKind::geometry("c")).unwrap();
        scene.compile().unwrap();

        let mut backend = RecordingBackend::new();
        let stats = scene.render(&mut backend, false).unwrap();

        assert_eq!(stats.draw_calls, 3);
        assert_eq!(stats.state_changes, 2);
        assert_eq!(stats.stencil_clears, 1);
        assert_eq!(
            backend.calls,
            vec![
                BackendCall::StencilTest(true),
                BackendCall::ClearStencil(1),
                BackendCall::StencilFunc { func: 0x0202, reference: 1, mask: 0xff },
                BackendCall::StencilOp { sfail: 0x1E00, dpfail: 0x1E00, dppass: 0x1E00 },
                BackendCall::Draw("a".to_string()),
                BackendCall::Draw("b".to_string()),
                BackendCall::StencilTest(false),
                BackendCall::Draw("c".to_string()),
            ]
        );

        let again = scene.render(&mut backend, false).unwrap();
        assert!(again.skipped);
    }

    #[test]
    fn test_compile_events() {
        struct Recorder(Rc<RefCell<Vec<(SceneEventType, Option<usize>)>>>);

        impl EventHandler for Recorder {
            fn on_event(&mut self, event: &Event) -> bool {
                self.0.borrow_mut().push((event.event_type, event.get_object_count()));
                false
            }
        }

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scene = scene();
        scene.register_handler(SceneEventType::SceneCompiling, Box::new(Recorder(log.clone())));
        scene.register_handler(SceneEventType::SceneCompiled, Box::new(Recorder(log.clone())));
        scene.register_handler(SceneEventType::NodeCreated, Box::new(Recorder(log.clone())));

        let root = scene.root();
        scene.add_node(root, NodeKind::geometry("box")).unwrap();
        scene.compile().unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                (SceneEventType::NodeCreated, None),
                (SceneEventType::SceneCompiling, None),
                (SceneEventType::SceneCompiled, Some(1)),
            ]
        );
    }

    #[test]
    fn test_render_after_setter_recompiles() {
        let mut scene = scene();
        let root = scene.root();
        let params = StencilBufferParams {
            stencil_func: Some(StencilFuncParams::new("equal", 1, 0xff)),
            ..StencilBufferParams::default()
        };
        let mask = scene.add_stencil_buffer(root, None, &params).unwrap();
        scene.add_node(mask, NodeKind::geometry("a")).unwrap();
        scene.compile().unwrap();
        scene.render(&mut RecordingBackend::new(), false).unwrap();
        assert!(!scene.display().needs_compile());

        scene.stencil_buffer(mask).unwrap().set_enabled(false);
        assert!(scene.display().image_dirty());
        assert!(scene.display().needs_compile());

        let mut backend = RecordingBackend::new();
        let stats = scene.render(&mut backend, false).unwrap();
        assert!(!stats.skipped);
        assert_eq!(scene.passes(), 2);
        assert_eq!(
            backend.calls,
            vec![BackendCall::StencilTest(false), BackendCall::Draw("a".to_string())]
        );
        assert!(!scene.display().image_dirty());
        assert!(!scene.display().needs_compile());
    }

    #[test]
    fn test_render_after_insert_recompiles() {
        let mut scene = scene();
        let root = scene.root();
        scene.add_node(root, NodeKind::geometry("a")).unwrap();
        scene.compile().unwrap();
        scene.render(&mut RecordingBackend::new(), false).unwrap();

        scene.add_node(root, NodeKind::geometry("b")).unwrap();
        let mut backend = RecordingBackend::new();
        let stats = scene.render(&mut backend, false).unwrap();
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(backend.draw_count(), 2);
    }

    #[test]
    fn test_remove_node_emits_destroyed_events() {
        struct Recorder(Rc<RefCell<Vec<(Option<NodeId>, Option<&'static str>)>>>);

        impl EventHandler for Recorder {
            fn on_event(&mut self, event: &Event) -> bool {
                self.0.borrow_mut().push((event.get_node(), event.get_node_type()));
                false
            }
        }

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scene = scene();
        scene.register_handler(SceneEventType::NodeDestroyed, Box::new(Recorder(log.clone())));

        let root = scene.root();
        let group = scene.add_node(root, NodeKind::Group).unwrap();
        let mask = scene.add_stencil_buffer(group, Some("mask"), &StencilBufferParams::default()).unwrap();
        let geometry = scene.add_node(mask, NodeKind::geometry("box")).unwrap();
        scene.compile().unwrap();
        scene.render(&mut RecordingBackend::new(), false).unwrap();
        assert!(!scene.display().image_dirty());

        assert_eq!(scene.remove_node(group).unwrap(), 3);
        assert!(scene.display().image_dirty());
        assert!(scene.stencil_cores().is_empty());
        assert_eq!(scene.graph().node_count(), 1);

        scene.dispatch_events();
        assert_eq!(
            *log.borrow(),
            vec![
                (Some(group), Some("node")),
                (Some(mask), Some("stencilBuffer")),
                (Some(geometry), Some("geometry")),
            ]
        );
    }

    #[test]
    fn test_forced_render_on_clean_display() {
        let mut scene = scene();
        let root = scene.root();
        scene.add_node(root, NodeKind::geometry("a")).unwrap();
        scene.add_node(root, NodeKind::geometry("b")).unwrap();
        scene.compile().unwrap();

        let mut backend = RecordingBackend::new();
        scene.render(&mut backend, false).unwrap();
        assert!(scene.render(&mut backend, false).unwrap().skipped);
        assert_eq!(backend.draw_count(), 2);

        let forced = scene.render(&mut backend, true).unwrap();
        assert!(!forced.skipped);
        assert_eq!(forced.draw_calls, 2);
        assert_eq!(backend.draw_count(), 4);
        assert_eq!(scene.passes(), 1);
    }
}
