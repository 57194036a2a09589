//! Randomly scattered objects
//!
//! Each instance is an independent chain
//! `translate → rotate → scale → [flags] → [material] → geometry`
//! hanging off the given parent.

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;
use crate::scene::{Color, FlagsOverride, NodeId, NodeKind, Scene, SceneError};

/// Instances are placed in `[-SCATTER_EXTENT, SCATTER_EXTENT)` on each axis
pub const SCATTER_EXTENT: f32 = 250.0;

/// Scale applied to every instance
pub const INSTANCE_SCALE: [f32; 3] = [3.0, 6.0, 3.0];

/// Geometry core every instance references
pub const SCATTER_GEOMETRY: &str = "box";

/// Parameters for [`scatter_random_objects`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterParams {
    /// Number of instances to create
    pub num_objects: usize,
    /// Give each instance a random material
    pub materials: bool,
    /// Alpha of transparent instances
    pub alpha: f32,
    /// Probability that an instance is transparent; `None` or 0 disables
    /// per-instance randomness
    pub random_transparency: Option<f32>,
}

impl ScatterParams {
    /// Parameters for `num_objects` opaque, randomly colored instances
    pub fn new(num_objects: usize) -> Self {
        Self {
            num_objects,
            ..Self::default()
        }
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns a description of the first out-of-range value.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(format!("Scatter alpha must be within [0, 1], got {}", self.alpha));
        }
        if let Some(p) = self.random_transparency {
            if !(0.0..=1.0).contains(&p) {
                return Err(format!("Random transparency must be within [0, 1], got {p}"));
            }
        }
        Ok(())
    }
}

impl Default for ScatterParams {
    fn default() -> Self {
        Self {
            num_objects: 1000,
            materials: true,
            alpha: 1.0,
            random_transparency: None,
        }
    }
}

/// Nodes created for one instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScatterInstance {
    /// Top of the instance chain
    pub translate: NodeId,
    /// Material node, if materials are enabled
    pub material: Option<NodeId>,
    /// Geometry reference at the bottom of the chain
    pub geometry: NodeId,
    /// Whether a transparency flags node was inserted
    pub transparent: bool,
}

/// Insert `params.num_objects` randomly placed instances under `parent`
///
/// Each instance gets a translation uniform in `[-250, 250)` per axis, a
/// rotation of `[0, 360)` degrees about a random axis, a fixed `(3, 6, 3)`
/// scale and a reference to the `"box"` geometry core. With materials
/// enabled it also gets a random color; transparency is decided per instance
/// with probability `random_transparency`, or for every instance when
/// `alpha < 1` and no probability is given.
///
/// # Errors
///
/// Propagates node insertion failures, e.g. when `parent` does not exist.
pub fn scatter_random_objects<R: Rng + ?Sized>(
    scene: &mut Scene,
    parent: NodeId,
    params: &ScatterParams,
    rng: &mut R,
) -> Result<Vec<ScatterInstance>, SceneError> {
    let alpha = params.alpha.clamp(0.0, 1.0);
    let transparency = params.random_transparency.filter(|p| *p > 0.0);

    let mut instances = Vec::with_capacity(params.num_objects);
    for _ in 0..params.num_objects {
        let position = Vec3::new(
            rng.gen_range(-SCATTER_EXTENT..SCATTER_EXTENT),
            rng.gen_range(-SCATTER_EXTENT..SCATTER_EXTENT),
            rng.gen_range(-SCATTER_EXTENT..SCATTER_EXTENT),
        );
        let translate = scene.add_node(parent, NodeKind::Translate(position))?;

        let axis = Vec3::new(rng.gen(), rng.gen(), rng.gen());
        let angle = rng.gen_range(0.0..360.0);
        let mut node = scene.add_node(translate, NodeKind::Rotate { axis, angle })?;

        let [sx, sy, sz] = INSTANCE_SCALE;
        node = scene.add_node(node, NodeKind::Scale(Vec3::new(sx, sy, sz)))?;

        let mut material = None;
        let mut transparent = false;
        if params.materials {
            transparent = match transparency {
                Some(p) => rng.gen::<f32>() < p,
                None => alpha < 1.0,
            };
            if transparent {
                node = scene.add_node(node, NodeKind::Flags(FlagsOverride::transparent()))?;
            }

            let color = Color::new(rng.gen(), rng.gen(), rng.gen());
            let instance_alpha = if transparent { alpha } else { 1.0 };
            node = scene.add_node(node, NodeKind::Material { color, alpha: instance_alpha })?;
            material = Some(node);
        }

        let geometry = scene.add_node(node, NodeKind::geometry(SCATTER_GEOMETRY))?;
        instances.push(ScatterInstance {
            translate,
            material,
            geometry,
            transparent,
        });
    }

    debug!(
        "Scattered {} objects ({} transparent)",
        instances.len(),
        instances.iter().filter(|i| i.transparent).count()
    );
    Ok(instances)
}
