//! Procedural content generation
//!
//! One-shot builders that insert generated subtrees into a scene. They keep
//! no state of their own beyond the nodes they insert.

mod scatter;

pub use scatter::{
    scatter_random_objects, ScatterInstance, ScatterParams, INSTANCE_SCALE, SCATTER_EXTENT, SCATTER_GEOMETRY,
};
