//! Integration tests for stencil masking of scattered content
//!
//! Builds the classic two-pass mask: one stencil node writes the mask,
//! a second node draws scattered objects only where the mask is set.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::procedural::{scatter_random_objects, ScatterParams, SCATTER_GEOMETRY};
use crate::render::{BackendCall, RecordingBackend, WebGlConstants};
use crate::scene::{
    FlagsOverride, NodeKind, Scene, StencilBufferParams, StencilFuncParams, StencilOpParams, StencilOperation,
};

fn mask_scene(count: usize) -> (Scene, usize) {
    let mut scene = Scene::with_context(Box::new(WebGlConstants::new()));
    let root = scene.root();

    let writer = scene
        .add_stencil_buffer(
            root,
            Some("mask-write"),
            &StencilBufferParams {
                stencil_func: Some(StencilFuncParams::new("always", 1, 0xff)),
                stencil_op: Some(StencilOpParams::new("keep", "keep", "replace")),
                ..StencilBufferParams::default()
            },
        )
        .unwrap();
    scene.add_node(writer, NodeKind::geometry("quad")).unwrap();

    let reader = scene
        .add_stencil_buffer(
            root,
            Some("mask-read"),
            &StencilBufferParams {
                clear: Some(false),
                stencil_func: Some(StencilFuncParams::new("equal", 1, 0xff)),
                ..StencilBufferParams::default()
            },
        )
        .unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let instances = scatter_random_objects(&mut scene, reader, &ScatterParams::new(count), &mut rng).unwrap();

    (scene, instances.len())
}

#[test]
fn test_scattered_objects_inherit_reader_state() {
    let (mut scene, count) = mask_scene(25);
    let stats = scene.compile().unwrap();

    assert_eq!(stats.objects, count + 1);
    assert_eq!(stats.stencil_nodes, 2);
    assert_eq!(stats.max_stencil_depth, 1);

    let objects = scene.display().objects();
    assert_eq!(objects[0].geometry, "quad");
    assert_eq!(objects[0].stencil.dppass, 0x1E01);
    for object in &objects[1..] {
        assert_eq!(object.geometry, SCATTER_GEOMETRY);
        assert_eq!(object.stencil.func, 0x0202);
        assert!(!object.stencil.clear);
    }
}

#[test]
fn test_balanced_pass_restores_default() {
    let (mut scene, _) = mask_scene(5);
    let default = scene.default_stencil_state().unwrap();

    for _ in 0..3 {
        scene.compile().unwrap();
        assert_eq!(scene.display().stencil_buffer(), Some(default));
    }
    assert_eq!(scene.passes(), 3);
    assert!(!default.enabled);
}

#[test]
fn test_render_issues_two_state_changes() {
    let (mut scene, count) = mask_scene(10);
    scene.compile().unwrap();

    let mut backend = RecordingBackend::new();
    let stats = scene.render(&mut backend, false).unwrap();

    assert_eq!(stats.draw_calls, count + 1);
    assert_eq!(stats.state_changes, 2);
    assert_eq!(stats.stencil_clears, 1);
    assert_eq!(backend.draw_count(), count + 1);
    let funcs: Vec<&BackendCall> = backend
        .calls
        .iter()
        .filter(|c| matches!(c, BackendCall::StencilFunc { .. }))
        .collect();
    assert_eq!(funcs.len(), 2);
}

#[test]
fn test_reconfigure_after_compile() {
    let (mut scene, _) = mask_scene(3);
    scene.compile().unwrap();
    scene.render(&mut RecordingBackend::new(), false).unwrap();

    let reader = scene.graph().children(scene.root())[1];
    let err = scene
        .stencil_buffer(reader)
        .unwrap()
        .set_stencil_func(&StencilFuncParams::named("mostly"))
        .unwrap_err();
    assert!(err.to_string().contains("'mostly'"));
    assert!(!scene.display().image_dirty());

    scene
        .stencil_buffer(reader)
        .unwrap()
        .set_stencil_op(&StencilOpParams::new("keep", "keep", "incr_wrap"))
        .unwrap();
    assert!(scene.display().image_dirty());

    scene.compile().unwrap();
    let last = scene.display().objects().last().unwrap();
    assert_eq!(last.stencil.dppass, 0x8507);
    assert_eq!(
        scene.stencil_buffer(reader).unwrap().stencil_op().dppass,
        StencilOperation::IncrWrap
    );
}

#[test]
fn test_transparent_scatter_sorted_last() {
    let mut scene = Scene::with_context(Box::new(WebGlConstants::new()));
    let root = scene.root();
    let mut rng = StdRng::seed_from_u64(99);
    let params = ScatterParams {
        alpha: 0.4,
        random_transparency: Some(0.5),
        ..ScatterParams::new(60)
    };
    let instances = scatter_random_objects(&mut scene, root, &params, &mut rng).unwrap();
    let transparent = instances.iter().filter(|i| i.transparent).count();

    scene.compile().unwrap();
    let display = scene.display();
    assert_eq!(display.transparent_count(), transparent);
    assert_eq!(display.opaque_count(), 60 - transparent);

    let split = display.opaque_count();
    assert!(display.objects()[..split].iter().all(|o| !o.is_transparent()));
    assert!(display.objects()[split..].iter().all(|o| o.is_transparent() && (o.alpha - 0.4).abs() < 1e-6));
}

#[test]
fn test_reader_change_visible_on_next_render() {
    let (mut scene, count) = mask_scene(4);
    scene.compile().unwrap();
    scene.render(&mut RecordingBackend::new(), false).unwrap();

    let reader = scene.graph().children(scene.root())[1];
    scene
        .stencil_buffer(reader)
        .unwrap()
        .set_stencil_op(&StencilOpParams::new("keep", "keep", "invert"))
        .unwrap();
    let mut backend = RecordingBackend::new();
    let stats = scene.render(&mut backend, false).unwrap();

    assert_eq!(stats.draw_calls, count + 1);
    assert!(backend
        .calls
        .contains(&BackendCall::StencilOp { sfail: 0x1E00, dpfail: 0x1E00, dppass: 0x150A }));
}

#[test]
fn test_transparent_writer_drawn_after_readers() {
    let mut scene = Scene::with_context(Box::new(WebGlConstants::new()));
    let root = scene.root();
    let writer = scene
        .add_stencil_buffer(
            root,
            None,
            &StencilBufferParams {
                stencil_op: Some(StencilOpParams::new("keep", "keep", "replace")),
                ..StencilBufferParams::default()
            },
        )
        .unwrap();
    let glass = scene.add_node(writer, NodeKind::Flags(FlagsOverride::transparent())).unwrap();
    scene.add_node(glass, NodeKind::geometry("quad")).unwrap();
    let reader = scene
        .add_stencil_buffer(
            root,
            None,
            &StencilBufferParams {
                stencil_func: Some(StencilFuncParams::new("equal", 1, 0xff)),
                ..StencilBufferParams::default()
            },
        )
        .unwrap();
    scene.add_node(reader, NodeKind::geometry("box")).unwrap();

    scene.compile().unwrap();
    let order: Vec<&str> = scene.display().objects().iter().map(|o| o.geometry.as_str()).collect();
    assert_eq!(order, vec!["box", "quad"]);
}
