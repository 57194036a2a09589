//! Stencil mask demo
//!
//! Builds a scene where a full-screen quad writes a stencil mask and a cloud
//! of randomly scattered boxes is drawn only where the mask is set, then
//! compiles it and renders one frame to a logging backend.
//!
//! Usage: `scatter_demo [config.toml|config.ron]`

use log::{debug, error, info};
use scene_engine::foundation::logging;
use scene_engine::prelude::*;
use scene_engine::render::BackendResult;
use thiserror::Error;

/// Demo-level errors
#[derive(Error, Debug)]
enum AppError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

/// Backend that logs the calls a GPU backend would receive
#[derive(Default)]
struct LogBackend {
    draws: usize,
}

impl RenderBackend for LogBackend {
    fn set_stencil_test(&mut self, enabled: bool) -> BackendResult<()> {
        info!("stencil test {}", if enabled { "on" } else { "off" });
        Ok(())
    }

    fn clear_stencil(&mut self, value: i32) -> BackendResult<()> {
        info!("clear stencil to {value}");
        Ok(())
    }

    fn stencil_func(&mut self, func: u32, reference: i32, mask: u32) -> BackendResult<()> {
        info!("stencil func {func:#06x} ref={reference} mask={mask:#04x}");
        Ok(())
    }

    fn stencil_op(&mut self, sfail: u32, dpfail: u32, dppass: u32) -> BackendResult<()> {
        info!("stencil op {sfail:#06x} {dpfail:#06x} {dppass:#06x}");
        Ok(())
    }

    fn draw(&mut self, object: &DisplayObject) -> BackendResult<()> {
        self.draws += 1;
        debug!(
            "draw '{}' at ({:.1}, {:.1}, {:.1}) alpha {:.2}",
            object.geometry, object.world.m14, object.world.m24, object.world.m34, object.alpha
        );
        Ok(())
    }
}

fn load_config() -> Result<SceneConfig, AppError> {
    let config = match std::env::args().nth(1) {
        Some(path) => SceneConfig::load_from_file(&path)?,
        None => SceneConfig::default(),
    };
    config.validate().map_err(AppError::InvalidConfig)?;
    Ok(config)
}

fn run(config: &SceneConfig) -> Result<(), AppError> {
    let mut scene = Scene::with_context(Box::new(WebGlConstants::new()));
    let root = scene.root();

    // Pass 1: write 1 into the stencil buffer wherever the quad covers
    let writer = scene.add_stencil_buffer(
        root,
        Some("mask-write"),
        &StencilBufferParams {
            stencil_func: Some(StencilFuncParams::new("always", 1, 0xff)),
            stencil_op: Some(StencilOpParams::new("keep", "keep", "replace")),
            ..StencilBufferParams::default()
        },
    )?;
    let quad = scene.add_node(writer, NodeKind::Scale(Vec3::new(200.0, 200.0, 1.0)))?;
    scene.add_node(quad, NodeKind::geometry("quad"))?;

    // Pass 2: draw the scattered boxes only where the mask is 1
    let reader = scene.add_stencil_buffer(
        root,
        Some("mask-read"),
        &StencilBufferParams {
            clear: Some(false),
            stencil_func: Some(StencilFuncParams::new("equal", 1, 0xff)),
            ..StencilBufferParams::default()
        },
    )?;

    let mut rng = rand::thread_rng();
    let instances = scatter_random_objects(&mut scene, reader, &config.scatter, &mut rng)?;
    info!("Scattered {} instances", instances.len());

    let stats = scene.compile()?;
    info!(
        "Compiled {} nodes into {} display objects ({} opaque, {} transparent)",
        stats.nodes_visited,
        stats.objects,
        scene.display().opaque_count(),
        scene.display().transparent_count()
    );

    let mut backend = LogBackend::default();
    let frame = scene.render(&mut backend, config.render.force_render)?;
    info!(
        "Frame: {} draws, {} stencil state changes, {} clears",
        backend.draws, frame.state_changes, frame.stencil_clears
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    logging::init_with_level(&config.engine.log_level)?;

    info!("Starting stencil scatter demo");
    match run(&config) {
        Ok(()) => {
            info!("Demo completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Demo failed: {e}");
            Err(e.into())
        }
    }
}
