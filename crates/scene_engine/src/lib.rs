//! # Scene Engine
//!
//! A retained-mode 3D scene graph. Declarative node trees (transforms,
//! materials, flags, geometry references and render state) are compiled into
//! a display list that a GPU rendering backend consumes.
//!
//! ## Features
//!
//! - **Scene Graph**: Slot-map backed node arena with shared state cores
//! - **Stencil State**: Stencil-buffer nodes resolved lazily against a graphics context
//! - **Compilation**: Single-pass walk carrying ambient render state on explicit stacks
//! - **Procedural Content**: Scatter generator for randomized instance subtrees
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut scene = Scene::with_context(Box::new(WebGlConstants::new()));
//!     let root = scene.root();
//!
//!     let mask = scene.add_stencil_buffer(root, Some("mask"), &StencilBufferParams::default())?;
//!     let mut rng = rand::thread_rng();
//!     scatter_random_objects(&mut scene, mask, &ScatterParams::default(), &mut rng)?;
//!
//!     let stats = scene.compile()?;
//!     println!("compiled {} objects", stats.objects);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod events;
pub mod foundation;
pub mod procedural;
pub mod render;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, EngineConfig, RenderConfig, SceneConfig},
        events::{Event, EventArg, EventHandler, EventSystem, SceneEventType},
        foundation::math::{Mat4, Vec3},
        procedural::{scatter_random_objects, ScatterInstance, ScatterParams},
        render::{
            BackendCall, Display, DisplayObject, GraphicsContext, RecordingBackend, RenderBackend,
            RenderError, RenderStats, StencilBufferState, WebGlConstants,
        },
        scene::{
            Color, CompileStats, FlagsOverride, NodeId, NodeKind, RenderFlags, Scene, SceneError,
            StencilBufferNode, StencilBufferParams, StencilError, StencilFuncParams,
            StencilFunction, StencilOpParams, StencilOperation,
        },
    };
}
